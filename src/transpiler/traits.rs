//! Transpiler traits.

use sqlparser::ast::Statement;

use crate::error::TranslateResult;
use crate::transpiler::dialect::Dialect;
use crate::transpiler::overrides::OverrideTable;

/// Trait for dialect-specific SQL generation.
pub trait SqlGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Node-kind overrides applied on top of the default serialization.
    fn overrides(&self) -> OverrideTable;
}

/// Parse/generate capability the translation core depends on.
///
/// The core only needs these two operations; everything dialect-specific on
/// the output side goes through the [`OverrideTable`] passed to `generate`.
pub trait SqlCapability: Send + Sync {
    /// Parse `sql` written in `dialect`.
    ///
    /// Fails with [`TranslateError::DialectParse`](crate::error::TranslateError::DialectParse),
    /// which carries the original text.
    fn parse(&self, sql: &str, dialect: Dialect) -> TranslateResult<Vec<Statement>>;

    /// Serialize `statements` for `dialect`, applying `overrides` first.
    fn generate(
        &self,
        statements: Vec<Statement>,
        dialect: Dialect,
        overrides: &OverrideTable,
    ) -> TranslateResult<String>;
}
