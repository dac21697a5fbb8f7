//! Parent relation metadata.
//!
//! A relation is declared on the child's definition and points outward to the
//! owning parent type. Parents keep no back-pointer: parent-to-child discovery
//! goes through the parent's child identifiers and the element type of the
//! corresponding collection.

use serde::{Deserialize, Serialize};

/// One foreign-key column of a parent relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationColumn {
    /// Foreign-key column name on the child table.
    pub column_name: String,
    /// Physical type of the foreign-key column.
    pub column_type: String,
    /// Identifier of the parent's key field this column references.
    pub parent_identifier: String,
    pub is_nullable: bool,
}

impl RelationColumn {
    pub fn new(
        column_name: impl Into<String>,
        column_type: impl Into<String>,
        parent_identifier: impl Into<String>,
    ) -> Self {
        Self {
            column_name: column_name.into(),
            column_type: column_type.into(),
            parent_identifier: parent_identifier.into(),
            is_nullable: false,
        }
    }

    pub fn nullable(mut self, value: bool) -> Self {
        self.is_nullable = value;
        self
    }
}

/// Edge from a child table to its owning parent type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentRelationDefinition {
    /// Field on the child that holds the parent reference.
    pub identifier: String,
    /// Entity type name of the parent.
    pub parent_type: String,
    /// Foreign-key columns, in parent key order.
    pub columns: Vec<RelationColumn>,
    pub comment: Option<String>,
}

impl ParentRelationDefinition {
    /// A relation with a single foreign-key column.
    pub fn new(
        identifier: impl Into<String>,
        parent_type: impl Into<String>,
        column: RelationColumn,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            parent_type: parent_type.into(),
            columns: vec![column],
            comment: None,
        }
    }

    /// Add another foreign-key column (composite parent keys).
    pub fn column(mut self, column: RelationColumn) -> Self {
        self.columns.push(column);
        self
    }

    pub fn comment(mut self, text: impl Into<String>) -> Self {
        self.comment = Some(text.into());
        self
    }

    /// True when every foreign-key column is required.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.columns.iter().all(|c| !c.is_nullable)
    }

    /// Placeholder identifier used when binding `column` in DML.
    #[must_use]
    pub fn parameter_identifier(&self, column: &RelationColumn) -> String {
        format!("{}_{}", self.identifier, column.parent_identifier)
    }
}
