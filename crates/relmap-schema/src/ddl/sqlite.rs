//! SQLite DDL generator.
//!
//! SQLite has no comment syntax, so definition comments are dropped.

use relmap_core::{Dialect, Result, TableDefinition};

use super::{DdlGenerator, create_indexes, create_table};

/// DDL generator for SQLite.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDdlGenerator;

impl DdlGenerator for SqliteDdlGenerator {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn generate(&self, def: &TableDefinition) -> Result<Vec<String>> {
        tracing::debug!(dialect = "sqlite", table = %def.full_name(), "Generating DDL");

        let mut statements = vec![create_table(def)];
        statements.extend(create_indexes(def)?);
        Ok(statements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relmap_core::{ColumnDefinition, IndexDefinition};

    #[test]
    fn test_generate_ignores_comments() {
        let def = TableDefinition::new("Blog", "blogs")
            .comment("all blogs")
            .column(ColumnDefinition::new("blog_id", "integer").primary_key())
            .column(ColumnDefinition::new("url", "text").comment("address"))
            .index(IndexDefinition::unique(["url"]));
        let statements = SqliteDdlGenerator.generate(&def).unwrap();
        assert_eq!(statements.len(), 2);
        assert!(statements.iter().all(|s| !s.contains("COMMENT")));
    }
}
