//! Schema provisioning for relmap.
//!
//! `relmap-schema` renders [`TableDefinition`](relmap_core::TableDefinition)s
//! into idempotent DDL: `CREATE TABLE IF NOT EXISTS`, one
//! `CREATE [UNIQUE] INDEX IF NOT EXISTS` per index, and `COMMENT ON`
//! statements for dialects that support them.
//!
//! Migrations and schema diffing are out of scope: running the statements
//! against an existing table changes nothing.

pub mod ddl;

pub use ddl::{
    DdlGenerator, PostgresDdlGenerator, SqliteDdlGenerator, create_comments, create_indexes,
    create_statements, create_table, generator_for, index_name,
};
