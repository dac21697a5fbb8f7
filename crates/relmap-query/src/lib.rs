//! Definition-driven statement generation for relmap.
//!
//! `relmap-query` turns definitions and entity instances into SQL:
//!
//! - [`InsertBuilder`], [`UpdateBuilder`], [`DeleteBuilder`] build DML for one
//!   instance, computing special columns and constraining by key columns.
//! - [`SelectQuery`] is a small SELECT builder with aliases, joins and named
//!   parameters.
//! - [`JoinPlanner`] walks relations under a [`CascadeReadRule`] and returns a
//!   [`SelectPlan`]: one joined SELECT plus the [`TypeMap`]s needed to
//!   materialize its rows.
//!
//! Nothing here talks to a database; execution lives in `relmap-session`.

pub mod builder;
pub mod planner;
pub mod rule;
pub mod select;

pub use builder::{
    DeleteBuilder, INITIAL_VERSION, InsertBuilder, InsertStatement, UpdateBuilder,
    UpdateStatement, key_columns,
};
pub use planner::{ColumnMap, JoinPlanner, SelectPlan, TypeLink, TypeMap};
pub use rule::{CascadeReadRule, edge_allowed};
pub use select::{Join, JoinCondition, JoinKind, SelectColumn, SelectQuery};
