use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlparser::dialect::{Dialect as ParserDialect, PostgreSqlDialect, SnowflakeDialect};

use crate::error::TranslateError;
use crate::transpiler::sql::postgres::PostgresGenerator;
use crate::transpiler::sql::snowflake::SnowflakeGenerator;
use crate::transpiler::traits::SqlGenerator;

/// Supported SQL Dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[serde(alias = "postgresql")]
    Postgres,
    Snowflake,
}

impl Default for Dialect {
    fn default() -> Self {
        Self::Postgres
    }
}

impl Dialect {
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::Snowflake => "snowflake",
        }
    }

    /// Grammar used when parsing text written in this dialect.
    pub fn parser(&self) -> Box<dyn ParserDialect> {
        match self {
            Dialect::Postgres => Box::new(PostgreSqlDialect {}),
            Dialect::Snowflake => Box::new(SnowflakeDialect {}),
        }
    }

    /// Serializer overrides used when emitting text in this dialect.
    pub fn generator(&self) -> Box<dyn SqlGenerator> {
        match self {
            Dialect::Postgres => Box::new(PostgresGenerator),
            Dialect::Snowflake => Box::new(SnowflakeGenerator),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = TranslateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            "snowflake" => Ok(Dialect::Snowflake),
            other => Err(TranslateError::Config(format!(
                "unknown dialect '{other}', expected postgres or snowflake"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_from_str() {
        assert_eq!("PostgreSQL".parse::<Dialect>().unwrap(), Dialect::Postgres);
        assert_eq!("snowflake".parse::<Dialect>().unwrap(), Dialect::Snowflake);
        assert!("oracle".parse::<Dialect>().is_err());
    }

    #[test]
    fn test_dialect_generators() {
        assert!(Dialect::Postgres.generator().overrides().is_empty());
        assert_eq!(Dialect::Snowflake.generator().name(), "snowflake");
    }
}
