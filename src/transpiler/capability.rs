//! [`SqlCapability`] backed by `sqlparser`.

use sqlparser::ast::Statement;
use sqlparser::parser::Parser;
use tracing::debug;

use crate::error::{TranslateError, TranslateResult};
use crate::transpiler::dialect::Dialect;
use crate::transpiler::overrides::OverrideTable;
use crate::transpiler::traits::SqlCapability;

/// Statement separator in generated output.
const STATEMENT_SEPARATOR: &str = ";\n";

#[derive(Debug, Default, Clone, Copy)]
pub struct SqlParserCapability;

impl SqlCapability for SqlParserCapability {
    fn parse(&self, sql: &str, dialect: Dialect) -> TranslateResult<Vec<Statement>> {
        let grammar = dialect.parser();
        let statements = Parser::parse_sql(grammar.as_ref(), sql)
            .map_err(|e| TranslateError::parse(dialect, e.to_string(), sql))?;
        debug!(%dialect, count = statements.len(), "parsed statements");
        Ok(statements)
    }

    fn generate(
        &self,
        mut statements: Vec<Statement>,
        dialect: Dialect,
        overrides: &OverrideTable,
    ) -> TranslateResult<String> {
        overrides.apply(&mut statements)?;
        debug!(%dialect, ?overrides, "generated statements");
        Ok(statements
            .iter()
            .map(|stmt| stmt.to_string())
            .collect::<Vec<_>>()
            .join(STATEMENT_SEPARATOR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_round_trip_without_overrides() {
        let cap = SqlParserCapability;
        let stmts = cap.parse("select a from t; select b from u", Dialect::Postgres).unwrap();
        let sql = cap
            .generate(stmts, Dialect::Postgres, &OverrideTable::new())
            .unwrap();
        assert_eq!(sql, "SELECT a FROM t;\nSELECT b FROM u");
    }

    #[test]
    fn test_parse_error_keeps_original_text() {
        let err = SqlParserCapability
            .parse("SELEC a FROM", Dialect::Postgres)
            .unwrap_err();
        match err {
            TranslateError::DialectParse { dialect, sql, .. } => {
                assert_eq!(dialect, Dialect::Postgres);
                assert_eq!(sql, "SELEC a FROM");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
