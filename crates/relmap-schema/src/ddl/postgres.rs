//! PostgreSQL DDL generator.

use relmap_core::{Dialect, Result, TableDefinition};

use super::{DdlGenerator, create_comments, create_indexes, create_table};

/// DDL generator for PostgreSQL. Adds `COMMENT ON` statements after the
/// table and its indexes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDdlGenerator;

impl DdlGenerator for PostgresDdlGenerator {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn generate(&self, def: &TableDefinition) -> Result<Vec<String>> {
        tracing::debug!(dialect = "postgres", table = %def.full_name(), "Generating DDL");

        let mut statements = vec![create_table(def)];
        statements.extend(create_indexes(def)?);
        statements.extend(create_comments(def, Dialect::Postgres));
        Ok(statements)
    }
}
