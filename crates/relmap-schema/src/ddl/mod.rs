//! DDL generation from table definitions.
//!
//! Every statement is idempotent (`IF NOT EXISTS`) so provisioning can run
//! against an already-provisioned schema. Index names are derived from the
//! index position and the table name: `i<n>_<table>`, with `n` starting at 1.

mod postgres;
mod sqlite;

pub use postgres::PostgresDdlGenerator;
pub use sqlite::SqliteDdlGenerator;

use relmap_core::{
    ColumnDefinition, Dialect, RelationColumn, Result, TableDefinition, quote_ident, quote_literal,
};

/// Generates the statements provisioning one table for a dialect.
pub trait DdlGenerator {
    fn dialect(&self) -> Dialect;

    /// Table, index and (where supported) comment statements, in execution order.
    fn generate(&self, def: &TableDefinition) -> Result<Vec<String>>;
}

/// Generator for `dialect`.
#[must_use]
pub fn generator_for(dialect: Dialect) -> Box<dyn DdlGenerator> {
    match dialect {
        Dialect::Sqlite => Box::new(SqliteDdlGenerator),
        Dialect::Postgres => Box::new(PostgresDdlGenerator),
    }
}

/// Name of the index at zero-based `position` in the definition.
#[must_use]
pub fn index_name(def: &TableDefinition, position: usize) -> String {
    format!("i{}_{}", position + 1, def.table_name)
}

fn column_clause(column: &ColumnDefinition) -> String {
    let mut clause = format!("{} {}", quote_ident(&column.column_name), column.column_type);
    if !column.is_nullable {
        clause.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default_value {
        clause.push_str(" DEFAULT ");
        clause.push_str(default);
    }
    if column.is_unique_key && !column.is_primary_key {
        clause.push_str(" UNIQUE");
    }
    clause
}

fn relation_clause(column: &RelationColumn) -> String {
    let mut clause = format!("{} {}", quote_ident(&column.column_name), column.column_type);
    if !column.is_nullable {
        clause.push_str(" NOT NULL");
    }
    clause
}

/// `CREATE TABLE IF NOT EXISTS` with scalar columns, then relation columns,
/// then the primary-key clause.
#[must_use]
pub fn create_table(def: &TableDefinition) -> String {
    let mut clauses: Vec<String> = def.columns.iter().map(column_clause).collect();
    for relation in &def.parent_relations {
        for column in &relation.columns {
            // A relation column may also be mapped as a scalar field.
            if def.columns.iter().any(|c| c.column_name == column.column_name) {
                continue;
            }
            clauses.push(relation_clause(column));
        }
    }

    let primary: Vec<String> = def
        .primary_keys()
        .iter()
        .map(|c| quote_ident(&c.column_name))
        .collect();
    if !primary.is_empty() {
        clauses.push(format!("PRIMARY KEY ({})", primary.join(", ")));
    }

    let sql = format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        def.qualified_name(),
        clauses.join(", ")
    );
    tracing::trace!(sql = %sql, "Generated CREATE TABLE");
    sql
}

/// One `CREATE [UNIQUE] INDEX IF NOT EXISTS` per index definition.
pub fn create_indexes(def: &TableDefinition) -> Result<Vec<String>> {
    def.indexes
        .iter()
        .enumerate()
        .map(|(position, index)| {
            let columns: Vec<String> = def
                .index_columns(index)?
                .iter()
                .map(|c| quote_ident(&c.column_name))
                .collect();
            // Indexes land in the table's schema, so the name stays unqualified.
            let name = quote_ident(&index_name(def, position));
            let sql = format!(
                "CREATE {}INDEX IF NOT EXISTS {name} ON {} ({})",
                if index.is_unique { "UNIQUE " } else { "" },
                def.qualified_name(),
                columns.join(", ")
            );
            tracing::trace!(sql = %sql, "Generated CREATE INDEX");
            Ok(sql)
        })
        .collect()
}

/// `COMMENT ON TABLE/COLUMN` statements. Empty for dialects without comments.
#[must_use]
pub fn create_comments(def: &TableDefinition, dialect: Dialect) -> Vec<String> {
    if !dialect.supports_comments() {
        return Vec::new();
    }
    let table = def.qualified_name();
    let mut statements = Vec::new();
    if let Some(comment) = &def.comment {
        statements.push(format!("COMMENT ON TABLE {table} IS {}", quote_literal(comment)));
    }
    for column in &def.columns {
        if let Some(comment) = &column.comment {
            statements.push(format!(
                "COMMENT ON COLUMN {table}.{} IS {}",
                quote_ident(&column.column_name),
                quote_literal(comment)
            ));
        }
    }
    for relation in &def.parent_relations {
        let Some(comment) = &relation.comment else {
            continue;
        };
        for column in &relation.columns {
            statements.push(format!(
                "COMMENT ON COLUMN {table}.{} IS {}",
                quote_ident(&column.column_name),
                quote_literal(comment)
            ));
        }
    }
    statements
}

/// Every provisioning statement for `def`, in execution order.
pub fn create_statements(def: &TableDefinition, dialect: Dialect) -> Result<Vec<String>> {
    generator_for(dialect).generate(def)
}
