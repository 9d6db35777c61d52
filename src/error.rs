//! Error types for dbtshift.

use thiserror::Error;

use crate::transpiler::Dialect;

/// The main error type for translation operations.
///
/// Every variant except [`TranslateError::Config`] and [`TranslateError::Io`]
/// is recoverable: the engine turns it into a diagnostic and degrades to the
/// original text or an inert placeholder instead of aborting.
#[derive(Debug, Error)]
pub enum TranslateError {
    /// The input does not parse in the declared source dialect.
    #[error("{dialect} parse error: {message}")]
    DialectParse {
        dialect: Dialect,
        message: String,
        /// The untranslated input, returned to the caller as-is.
        sql: String,
    },

    /// The crosstab block has a shape the decomposer refuses to guess at.
    #[error("Unsupported crosstab shape: {0}")]
    UnsupportedCrosstabShape(String),

    /// A column list could not be split into well-formed entries.
    #[error("Malformed column list: {0}")]
    MalformedColumnList(String),

    /// A series generator that cannot be expressed in the target dialect.
    #[error("Unsupported series: {0}")]
    UnsupportedSeries(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TranslateError {
    /// Create a parse error that carries the original text.
    pub fn parse(dialect: Dialect, message: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::DialectParse {
            dialect,
            message: message.into(),
            sql: sql.into(),
        }
    }

    /// Create an unsupported crosstab shape error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedCrosstabShape(message.into())
    }

    /// Create a malformed column list error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedColumnList(message.into())
    }

    /// Short machine-readable code used in diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DialectParse { .. } => "dialect-parse",
            Self::UnsupportedCrosstabShape(_) => "unsupported-crosstab",
            Self::MalformedColumnList(_) => "malformed-column-list",
            Self::UnsupportedSeries(_) => "unsupported-series",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
        }
    }

    /// Crosstab failures are replaced by a placeholder; everything else falls
    /// back to the original text.
    pub fn is_crosstab(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedCrosstabShape(_) | Self::MalformedColumnList(_)
        )
    }
}

/// Result type alias for translation operations.
pub type TranslateResult<T> = Result<T, TranslateError>;
