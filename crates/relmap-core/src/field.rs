//! Column definitions.

use serde::{Deserialize, Serialize};

/// Columns whose value the mapping engine computes instead of reading it
/// from the instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpecialColumn {
    /// Regular column.
    #[default]
    None,
    /// Set to the generation-time clock on INSERT.
    CreateTimestamp,
    /// Set to the generation-time clock on INSERT and every UPDATE.
    UpdateTimestamp,
    /// Optimistic-lock counter: starts at 1, guarded and incremented on UPDATE.
    VersionNumber,
}

impl SpecialColumn {
    /// Whether the generator supplies this column's value on INSERT.
    #[must_use]
    pub const fn is_generated(&self) -> bool {
        !matches!(self, SpecialColumn::None)
    }
}

/// Metadata about one mapped scalar field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Logical field name on the entity.
    pub identifier: String,
    /// Database column name.
    pub column_name: String,
    /// Physical column type, rendered verbatim in DDL (e.g. `bigint`, `text`).
    pub column_type: String,
    /// Whether the column accepts NULL. Always false for primary keys.
    pub is_nullable: bool,
    pub is_primary_key: bool,
    /// Whether the column carries an inline UNIQUE constraint.
    pub is_unique_key: bool,
    /// Whether the database generates this column's value on INSERT.
    pub is_auto_number: bool,
    /// Default value expression (SQL).
    pub default_value: Option<String>,
    pub special_column: SpecialColumn,
    /// Column comment, rendered by dialects that support comments.
    pub comment: Option<String>,
}

impl ColumnDefinition {
    /// Create a column whose name equals its identifier.
    pub fn new(identifier: impl Into<String>, column_type: impl Into<String>) -> Self {
        let identifier = identifier.into();
        Self {
            column_name: identifier.clone(),
            identifier,
            column_type: column_type.into(),
            is_nullable: false,
            is_primary_key: false,
            is_unique_key: false,
            is_auto_number: false,
            default_value: None,
            special_column: SpecialColumn::None,
            comment: None,
        }
    }

    /// Set the database column name.
    pub fn column_name(mut self, name: impl Into<String>) -> Self {
        self.column_name = name.into();
        self
    }

    /// Set nullability. Ignored for primary-key columns.
    pub fn nullable(mut self, value: bool) -> Self {
        self.is_nullable = value && !self.is_primary_key;
        self
    }

    /// Mark as primary key. Primary keys are never nullable.
    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self.is_nullable = false;
        self
    }

    /// Mark as carrying a UNIQUE constraint.
    pub fn unique_key(mut self) -> Self {
        self.is_unique_key = true;
        self
    }

    /// Mark as database-generated surrogate key.
    pub fn auto_number(mut self) -> Self {
        self.is_auto_number = true;
        self
    }

    /// Set the default value expression.
    pub fn default_value(mut self, expr: impl Into<String>) -> Self {
        self.default_value = Some(expr.into());
        self
    }

    /// Mark as a special column.
    pub fn special(mut self, special: SpecialColumn) -> Self {
        self.special_column = special;
        self
    }

    /// Set the column comment.
    pub fn comment(mut self, text: impl Into<String>) -> Self {
        self.comment = Some(text.into());
        self
    }
}
