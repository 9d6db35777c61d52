//! Translator configuration

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{TranslateError, TranslateResult};
use crate::references::{DEFAULT_EXTERNAL_SCHEMA, DEFAULT_EXTERNAL_TABLES, ExternalTableCatalog};
use crate::transpiler::Dialect;

/// File looked up in the working directory when no path is given.
pub const LOCAL_CONFIG_FILE: &str = "dbtshift.toml";

/// Main translator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source_dialect: Dialect,

    pub target_dialect: Dialect,

    /// Schema prefix for external tables
    pub external_schema: String,

    /// Tables qualified with `external_schema` instead of becoming model refs
    pub external_tables: Vec<String>,

    /// Input files whose name contains one of these (case-insensitive) are skipped
    pub ignored_keywords: Vec<String>,

    /// Directory name marking block units, translated in a first pass
    pub blocks_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_dialect: Dialect::Postgres,
            target_dialect: Dialect::Snowflake,
            external_schema: DEFAULT_EXTERNAL_SCHEMA.to_string(),
            external_tables: DEFAULT_EXTERNAL_TABLES.iter().map(|t| t.to_string()).collect(),
            ignored_keywords: Vec::new(),
            blocks_dir: "blocks".to_string(),
        }
    }
}

impl Config {
    /// Create a new configuration builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn from_toml_str(content: &str) -> TranslateResult<Self> {
        toml::from_str(content).map_err(|e| TranslateError::Config(e.to_string()))
    }

    pub fn from_file(path: &Path) -> TranslateResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| TranslateError::Config(format!("{}: {e}", path.display())))
    }

    /// Candidate files, in lookup order.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("dbtshift").join("config.toml"));
        }
        paths
    }

    /// Load `explicit` if given, else the first existing file of
    /// [`search_paths`](Self::search_paths), else the defaults.
    pub fn load(explicit: Option<&Path>) -> TranslateResult<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        for path in Self::search_paths() {
            if path.is_file() {
                debug!(path = %path.display(), "loading config");
                return Self::from_file(&path);
            }
        }
        debug!("no config file found, using defaults");
        Ok(Self::default())
    }

    pub fn catalog(&self) -> ExternalTableCatalog {
        ExternalTableCatalog::new(self.external_schema.clone(), self.external_tables.clone())
    }

    pub fn is_ignored(&self, file_name: &str) -> bool {
        let name = file_name.to_lowercase();
        self.ignored_keywords
            .iter()
            .any(|k| !k.is_empty() && name.contains(&k.to_lowercase()))
    }
}

/// Builder for Config
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn source(mut self, dialect: Dialect) -> Self {
        self.config.source_dialect = dialect;
        self
    }

    pub fn target(mut self, dialect: Dialect) -> Self {
        self.config.target_dialect = dialect;
        self
    }

    /// Set the external schema prefix
    pub fn external_schema(mut self, schema: impl Into<String>) -> Self {
        self.config.external_schema = schema.into();
        self
    }

    /// Replace the external table list
    pub fn external_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.external_tables = tables.into_iter().map(Into::into).collect();
        self
    }

    pub fn ignore(mut self, keyword: impl Into<String>) -> Self {
        self.config.ignored_keywords.push(keyword.into());
        self
    }

    pub fn blocks_dir(mut self, name: impl Into<String>) -> Self {
        self.config.blocks_dir = name.into();
        self
    }

    /// Build the configuration
    pub fn build(self) -> Config {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.source_dialect, Dialect::Postgres);
        assert_eq!(config.target_dialect, Dialect::Snowflake);
        assert!(config.catalog().contains("patient"));
        assert_eq!(config.catalog().qualify("patient"), "STG.P{{praktijk_agb}}.patient");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            source_dialect = "postgresql"
            external_tables = ["visits"]
            ignored_keywords = ["OLD", "test"]
            "#,
        )
        .unwrap();
        assert_eq!(config.source_dialect, Dialect::Postgres);
        assert_eq!(config.external_schema, DEFAULT_EXTERNAL_SCHEMA);
        assert_eq!(config.external_tables, vec!["visits"]);
        assert!(config.is_ignored("report_old_v2.sql"));
        assert!(!config.is_ignored("report.sql"));
    }

    #[test]
    fn test_unknown_dialect_is_config_error() {
        let err = Config::from_toml_str(r#"target_dialect = "oracle""#).unwrap_err();
        assert!(matches!(err, TranslateError::Config(_)));
    }

    #[test]
    fn test_missing_explicit_file_is_io_error() {
        let err = Config::load(Some(Path::new("/nonexistent/dbtshift.toml"))).unwrap_err();
        assert!(matches!(err, TranslateError::Io(_)));
    }

    #[test]
    fn test_builder() {
        let config = Config::builder()
            .source(Dialect::Snowflake)
            .external_schema("RAW")
            .external_tables(["a", "b"])
            .ignore("draft")
            .blocks_dir("shared")
            .build();
        assert_eq!(config.source_dialect, Dialect::Snowflake);
        assert_eq!(config.catalog().qualify("a"), "RAW.a");
        assert_eq!(config.ignored_keywords, vec!["draft"]);
        assert_eq!(config.blocks_dir, "shared");
    }
}
