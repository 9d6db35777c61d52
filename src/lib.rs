//! # dbtshift
//!
//! Translates PostgreSQL report queries into Snowflake SQL for dbt models.
//!
//! Most of the work is a plain dialect round trip through `sqlparser`. A few
//! constructs have no direct Snowflake counterpart and get rewritten on the
//! way: `crosstab()` pivots, `generate_series`, `unnest(ARRAY[...])` row
//! sources, `= ANY(array)` and interval casts. Table references are finally
//! turned into dbt `ref()` calls or external-schema names.
//!
//! ## Quick Example
//!
//! ```
//! use dbtshift::prelude::*;
//!
//! let translator = Translator::default();
//! let out = translator.translate("SELECT CAST('7 days' AS INTERVAL) FROM visits");
//! assert_eq!(out.sql, "SELECT INTERVAL '7 days' FROM {{ ref('visits') }}");
//! assert_eq!(out.outcome, Outcome::Translated);
//! ```

pub mod config;
pub mod crosstab;
pub mod discover;
pub mod engine;
pub mod error;
pub mod prepass;
pub mod references;
pub mod series;
pub mod template;
pub mod text;
pub mod transpiler;

pub mod prelude {
    pub use crate::config::Config;
    pub use crate::engine::{
        Diagnostic, Outcome, Severity, Translation, TranslationUnit, Translator, UnitKind,
        produced_tables,
    };
    pub use crate::error::*;
    pub use crate::references::ExternalTableCatalog;
    pub use crate::transpiler::Dialect;
}

pub use engine::{Translation, Translator, produced_tables};
pub use error::{TranslateError, TranslateResult};
