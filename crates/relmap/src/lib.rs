//! relmap: definition-driven object-relational mapping.
//!
//! Entity types are described at runtime with [`TableDefinition`]s and
//! registered in a [`Registry`]. From those definitions relmap generates DDL
//! and DML, plans joined SELECTs across parent and child relations, turns the
//! joined rows back into linked object graphs, and cascades saves and deletes
//! through child collections.
//!
//! # Crates
//!
//! - `relmap-core`: definitions, [`Entity`], [`Value`], [`Connection`], errors
//! - `relmap-query`: DML builders, [`SelectQuery`], [`JoinPlanner`]
//! - `relmap-schema`: idempotent DDL
//! - `relmap-session`: [`Session`], the materializer and statement logging
//! - `relmap-sqlite` (feature `sqlite`): a `rusqlite` driver
//!
//! # Example
//!
//! ```ignore
//! use relmap::prelude::*;
//!
//! let blog = TableDefinition::new("Blog", "blogs")
//!     .column(ColumnDefinition::new("blog_id", "integer").primary_key().auto_number())
//!     .column(ColumnDefinition::new("url", "text"))
//!     .children("posts");
//! let post = TableDefinition::new("Post", "posts")
//!     .column(ColumnDefinition::new("post_id", "integer").primary_key().auto_number())
//!     .column(ColumnDefinition::new("title", "text"))
//!     .parent(ParentRelationDefinition::new(
//!         "blog",
//!         "Blog",
//!         RelationColumn::new("blog_id", "integer", "blog_id"),
//!     ));
//! let registry = Registry::builder()
//!     .register_dynamic(blog, &[("posts", "Post")])?
//!     .register_dynamic(post, &[])?
//!     .build()?;
//!
//! let session = Session::new(&connection, &registry);
//! session.create_table_or_default("Blog")?;
//! session.create_table_or_default("Post")?;
//! session.save(&my_blog)?;
//! let blogs = session.load("Blog", None)?;
//! ```

pub use relmap_core::{
    BufferedCursor, ChildCollection, ChildRelation, ColumnDefinition, Connection, Dialect,
    DynamicEntity, Entity, EntityFactory, EntityMeta, EntityRef, Error, FromValue,
    IndexDefinition, MapperConfig, ParentRef, ParentRelationDefinition, Registry,
    RegistryBuilder, RelationColumn, Result, Row, RowCursor, SpecialColumn, Statement,
    TableDefinition, Value, WeakEntityRef, borrow_as, borrow_mut_as, field_value, same_entity,
    shared,
};
pub use relmap_query::{
    CascadeReadRule, DeleteBuilder, InsertBuilder, JoinKind, JoinPlanner, SelectPlan,
    SelectQuery, TypeLink, TypeMap, UpdateBuilder,
};
pub use relmap_schema::{DdlGenerator, create_statements, create_table, generator_for};
pub use relmap_session::{
    InstanceCache, ObjectKey, QueryExecutor, RowMaterializer, Session, materialize,
};

#[cfg(feature = "sqlite")]
pub use relmap_sqlite::SqliteConnection;

/// Sub-crates, for items the facade does not re-export.
pub mod core {
    pub use relmap_core::*;
}

pub mod query {
    pub use relmap_query::*;
}

pub mod schema {
    pub use relmap_schema::*;
}

/// The types most applications need.
pub mod prelude {
    pub use crate::{
        CascadeReadRule, ChildCollection, ColumnDefinition, Connection, DynamicEntity, Entity,
        EntityRef, Error, IndexDefinition, MapperConfig, ParentRef, ParentRelationDefinition,
        Registry, RelationColumn, Result, Session, SpecialColumn, TableDefinition, Value, shared,
    };
}
