//! Dialect-aware parse and generate.
//!
//! Parsing is delegated to `sqlparser`; generation serializes the AST back to
//! text after applying the target dialect's [`OverrideTable`].

pub mod capability;
pub mod dialect;
pub mod overrides;
pub mod sql;
pub mod traits;

pub use capability::SqlParserCapability;
pub use dialect::Dialect;
pub use overrides::{NodeKind, OverrideFn, OverrideTable};
pub use traits::{SqlCapability, SqlGenerator};
