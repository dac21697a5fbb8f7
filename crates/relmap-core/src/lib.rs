//! Core types and traits for relmap.
//!
//! `relmap-core` is the **foundation layer** of the workspace. It defines the
//! data model and the contracts every other crate builds on.
//!
//! # Role In The Architecture
//!
//! - **Definition model**: [`TableDefinition`], [`ColumnDefinition`],
//!   [`IndexDefinition`] and [`ParentRelationDefinition`] describe how an
//!   entity type maps to a table. Pure data with derived views.
//! - **Contract layer**: [`Entity`] is implemented by host objects, and
//!   [`Connection`]/[`RowCursor`] by database drivers.
//! - **Data model**: [`Value`], [`Row`] and [`Statement`] are exchanged between
//!   the generators, the materializer and the driver.
//! - **Registry**: [`Registry`] maps entity type names to definitions and
//!   factories, built once and read-only thereafter.
//!
//! # Who Uses This Crate
//!
//! - `relmap-query` reads definitions to build DML and joined SELECTs.
//! - `relmap-schema` reads definitions to generate DDL.
//! - `relmap-session` drives [`Connection`] and writes into [`Entity`] instances.
//! - `relmap-sqlite` implements [`Connection`].
//!
//! Most applications should use the `relmap` facade.

pub mod config;
pub mod connection;
pub mod dynamic;
pub mod entity;
pub mod error;
pub mod field;
pub mod identifiers;
pub mod registry;
pub mod relationship;
pub mod row;
pub mod statement;
pub mod table;
pub mod value;

pub use config::{Dialect, MapperConfig};
pub use connection::{BufferedCursor, Connection, RowCursor};
pub use dynamic::DynamicEntity;
pub use entity::{
    ChildCollection, Entity, EntityRef, ParentRef, WeakEntityRef, borrow_as, borrow_mut_as,
    field_value, same_entity, shared,
};
pub use error::{Error, Result};
pub use field::{ColumnDefinition, SpecialColumn};
pub use identifiers::{quote_ident, quote_literal, quote_qualified, validate_placeholder_name};
pub use registry::{ChildRelation, EntityFactory, EntityMeta, Registry, RegistryBuilder};
pub use relationship::{ParentRelationDefinition, RelationColumn};
pub use row::Row;
pub use statement::{PLACEHOLDER_PREFIX, Statement, placeholder};
pub use table::{IndexDefinition, TableDefinition};
pub use value::{FromValue, Value};
