//! Translation engine.
//!
//! [`Translator`] runs one translation unit through the whole pipeline:
//! pre-pass rewrites, template protection, parse, generate with the target
//! dialect's overrides, template restoration and table-reference rewriting.
//! Recoverable failures never escape [`Translator::translate`]; they degrade
//! the output and are reported as [`Diagnostic`]s.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::crosstab::CROSSTAB_PLACEHOLDER;
use crate::error::{TranslateError, TranslateResult};
use crate::prepass::PrePass;
use crate::references::{ExternalTableCatalog, TableReferenceRewriter};
use crate::template;
use crate::transpiler::{Dialect, OverrideTable, SqlCapability, SqlParserCapability};

pub use crate::references::produced_tables;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A structured note about one translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(severity: Severity, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&TranslateError> for Diagnostic {
    fn from(err: &TranslateError) -> Self {
        let severity = match err {
            TranslateError::DialectParse { .. } | TranslateError::Io(_) => Severity::Error,
            _ => Severity::Warning,
        };
        Self::new(severity, err.code(), err.to_string())
    }
}

/// How the output text was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    /// Fully translated.
    Translated,
    /// Replaced by an inert placeholder.
    Placeholder,
    /// The original text, unchanged.
    Passthrough,
}

/// Result of translating one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Translation {
    pub sql: String,
    pub outcome: Outcome,
    pub diagnostics: Vec<Diagnostic>,
}

impl Translation {
    fn translated(sql: String) -> Self {
        Self {
            sql,
            outcome: Outcome::Translated,
            diagnostics: Vec::new(),
        }
    }

    /// Degrade according to `err`: crosstab failures become the placeholder,
    /// everything else returns `original`.
    fn degraded(original: &str, err: &TranslateError) -> Self {
        let (sql, outcome) = if err.is_crosstab() {
            (CROSSTAB_PLACEHOLDER.to_string(), Outcome::Placeholder)
        } else {
            (original.to_string(), Outcome::Passthrough)
        };
        Self {
            sql,
            outcome,
            diagnostics: vec![Diagnostic::from(err)],
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.outcome != Outcome::Translated
    }
}

/// Whether a unit's produced tables are visible to the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Block,
    Model,
}

/// One named input of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationUnit {
    pub name: String,
    pub sql: String,
    pub kind: UnitKind,
}

impl TranslationUnit {
    pub fn model(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
            kind: UnitKind::Model,
        }
    }

    pub fn block(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
            kind: UnitKind::Block,
        }
    }
}

/// Translates SQL units from a source to a target dialect.
///
/// Holds only read-only state, so a single instance can be shared across
/// threads.
pub struct Translator {
    source: Dialect,
    target: Dialect,
    catalog: ExternalTableCatalog,
    capability: Box<dyn SqlCapability>,
    overrides: OverrideTable,
    prepass: PrePass,
}

impl Default for Translator {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl Translator {
    pub fn new(config: &Config) -> Self {
        Self::with_capability(config, Box::new(SqlParserCapability))
    }

    /// Use a different parse/generate backend.
    pub fn with_capability(config: &Config, capability: Box<dyn SqlCapability>) -> Self {
        Self {
            source: config.source_dialect,
            target: config.target_dialect,
            catalog: config.catalog(),
            capability,
            overrides: config.target_dialect.generator().overrides(),
            prepass: PrePass::new(),
        }
    }

    pub fn source(&self) -> Dialect {
        self.source
    }

    pub fn target(&self) -> Dialect {
        self.target
    }

    pub fn catalog(&self) -> &ExternalTableCatalog {
        &self.catalog
    }

    /// Translate `sql`, failing on the first recoverable error.
    pub fn try_translate(&self, sql: &str, siblings: &BTreeSet<String>) -> TranslateResult<String> {
        let expanded = template::expand_includes(sql);
        let rewritten = self.prepass.run(&expanded)?;
        let (protected, spans) = template::protect(&rewritten);
        debug!(spans = spans.len(), "protected template spans");

        let statements = self
            .capability
            .parse(&protected, self.source)
            .map_err(|err| match err {
                TranslateError::DialectParse {
                    dialect, message, ..
                } => TranslateError::parse(dialect, message, sql),
                other => other,
            })?;
        let generated = self
            .capability
            .generate(statements, self.target, &self.overrides)?;

        let restored = spans.restore(&generated);
        Ok(TableReferenceRewriter::new(&self.catalog).rewrite(&restored, siblings))
    }

    pub fn translate(&self, sql: &str) -> Translation {
        self.translate_with_siblings(sql, &BTreeSet::new())
    }

    /// Translate `sql`, treating `siblings` as tables that need no rewriting.
    pub fn translate_with_siblings(&self, sql: &str, siblings: &BTreeSet<String>) -> Translation {
        match self.try_translate(sql, siblings) {
            Ok(out) => Translation::translated(out),
            Err(err) => {
                warn!(code = err.code(), error = %err, "translation degraded");
                Translation::degraded(sql, &err)
            }
        }
    }

    /// Translate every unit, blocks first.
    ///
    /// Tables produced by block units are siblings of every model unit.
    /// Results keep the input order; a failing unit never affects another.
    pub fn translate_batch(&self, units: &[TranslationUnit]) -> Vec<Translation> {
        let mut results: Vec<Option<Translation>> = vec![None; units.len()];
        let mut block_tables = BTreeSet::new();

        for (i, unit) in units.iter().enumerate() {
            if unit.kind != UnitKind::Block {
                continue;
            }
            let translation = self.translate(&unit.sql);
            let produced = produced_tables(&translation.sql);
            debug!(unit = %unit.name, tables = ?produced, "translated block");
            block_tables.extend(produced);
            results[i] = Some(translation);
        }

        for (i, unit) in units.iter().enumerate() {
            if unit.kind != UnitKind::Model {
                continue;
            }
            debug!(unit = %unit.name, "translating model");
            results[i] = Some(self.translate_with_siblings(&unit.sql, &block_tables));
        }

        let results: Vec<Translation> = results.into_iter().flatten().collect();
        let degraded = results.iter().filter(|t| t.is_degraded()).count();
        info!(
            units = results.len(),
            degraded,
            block_tables = block_tables.len(),
            "batch translated"
        );
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_translate_rewrites_and_references() {
        let out = Translator::default()
            .translate("SELECT id FROM orders WHERE tag = ANY(ARRAY['a', 'b'])");
        assert_eq!(out.outcome, Outcome::Translated);
        assert_eq!(
            out.sql,
            "SELECT id FROM {{ ref('orders') }} WHERE ARRAY_CONTAINS(TO_VARIANT(tag), ARRAY_CONSTRUCT('a', 'b'))"
        );
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_parse_failure_returns_original() {
        let sql = "SELEC broken FROM";
        let out = Translator::default().translate(sql);
        assert_eq!(out.outcome, Outcome::Passthrough);
        assert_eq!(out.sql, sql);
        assert_eq!(out.diagnostics[0].code, "dialect-parse");
        assert_eq!(out.diagnostics[0].severity, Severity::Error);
    }

    #[test]
    fn test_try_translate_parse_error_carries_input() {
        let err = Translator::default()
            .try_translate("SELECT (", &BTreeSet::new())
            .unwrap_err();
        match err {
            TranslateError::DialectParse { sql, .. } => assert_eq!(sql, "SELECT ("),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_crosstab_failure_becomes_placeholder() {
        let out = Translator::default()
            .translate("SELECT * FROM crosstab($$ SELECT a, b FROM t $$) AS ct(a int)");
        assert_eq!(out.outcome, Outcome::Placeholder);
        assert_eq!(out.sql, CROSSTAB_PLACEHOLDER);
        assert_eq!(out.diagnostics[0].code, "malformed-column-list");
    }

    #[test]
    fn test_zero_step_series_returns_original() {
        let sql = "SELECT a FROM generate_series(1, 5, 0) AS s(a)";
        let out = Translator::default().translate(sql);
        assert_eq!(out.outcome, Outcome::Passthrough);
        assert_eq!(out.sql, sql);
        assert_eq!(out.diagnostics[0].code, "unsupported-series");
    }

    #[test]
    fn test_template_spans_survive() {
        let out = Translator::default()
            .translate("SELECT x FROM {{ shared_block() }} WHERE d > '${since}'");
        assert_eq!(
            out.sql,
            "SELECT x FROM {{ shared_block() }} WHERE d > '${since}'"
        );
    }

    #[test]
    fn test_postgres_target_is_identity_for_expressions() {
        let config = Config::builder().target(Dialect::Postgres).build();
        let out = Translator::new(&config).translate("SELECT ARRAY[1, 2] FROM t");
        assert_eq!(out.sql, "SELECT ARRAY[1, 2] FROM {{ ref('t') }}");
    }

    #[test]
    fn test_translator_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Translator>();
    }
}
