use crate::transpiler::overrides::OverrideTable;
use crate::transpiler::traits::SqlGenerator;

/// PostgreSQL output uses the parser's own serialization unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresGenerator;

impl SqlGenerator for PostgresGenerator {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn overrides(&self) -> OverrideTable {
        OverrideTable::new()
    }
}
