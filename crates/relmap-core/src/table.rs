//! Table definitions and their derived views.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::field::{ColumnDefinition, SpecialColumn};
use crate::identifiers::quote_qualified;
use crate::relationship::ParentRelationDefinition;

/// An ordered set of column identifiers, optionally unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub identifiers: Vec<String>,
    pub is_unique: bool,
}

impl IndexDefinition {
    pub fn new<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            identifiers: identifiers.into_iter().map(Into::into).collect(),
            is_unique: false,
        }
    }

    pub fn unique<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            is_unique: true,
            ..Self::new(identifiers)
        }
    }
}

/// Immutable description of how one entity type maps to a table.
///
/// Pure data: nothing here is validated on construction. Operations that need
/// a missing piece (an auto-number column for `save`, a usable key for
/// `fetch`) fail with [`Error::Configuration`] when they are attempted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub schema_name: Option<String>,
    pub table_name: String,
    /// Host entity type name this table maps.
    pub entity_type: String,
    pub comment: Option<String>,
    pub columns: Vec<ColumnDefinition>,
    pub indexes: Vec<IndexDefinition>,
    pub parent_relations: Vec<ParentRelationDefinition>,
    /// Names of collection fields holding dependent rows.
    pub child_identifiers: Vec<String>,
}

impl TableDefinition {
    pub fn new(entity_type: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            schema_name: None,
            table_name: table_name.into(),
            entity_type: entity_type.into(),
            comment: None,
            columns: Vec::new(),
            indexes: Vec::new(),
            parent_relations: Vec::new(),
            child_identifiers: Vec::new(),
        }
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema_name = Some(schema.into());
        self
    }

    pub fn comment(mut self, text: impl Into<String>) -> Self {
        self.comment = Some(text.into());
        self
    }

    pub fn column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }

    pub fn index(mut self, index: IndexDefinition) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn parent(mut self, relation: ParentRelationDefinition) -> Self {
        self.parent_relations.push(relation);
        self
    }

    pub fn children(mut self, identifier: impl Into<String>) -> Self {
        self.child_identifiers.push(identifier.into());
        self
    }

    /// `schema.table`, or `table` when no schema is set.
    #[must_use]
    pub fn full_name(&self) -> String {
        match self.schema_name.as_deref() {
            Some(schema) if !schema.is_empty() => format!("{schema}.{}", self.table_name),
            _ => self.table_name.clone(),
        }
    }

    /// Quoted, optionally schema-qualified name for SQL text.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        quote_qualified(self.schema_name.as_deref(), &self.table_name)
    }

    #[must_use]
    pub fn column_def(&self, identifier: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.identifier == identifier)
    }

    #[must_use]
    pub fn primary_keys(&self) -> Vec<&ColumnDefinition> {
        self.columns.iter().filter(|c| c.is_primary_key).collect()
    }

    /// The auto-number column, if any. Only the first is considered.
    #[must_use]
    pub fn auto_number(&self) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.is_auto_number)
    }

    #[must_use]
    pub fn version_column(&self) -> Option<&ColumnDefinition> {
        self.columns
            .iter()
            .find(|c| c.special_column == SpecialColumn::VersionNumber)
    }

    #[must_use]
    pub fn unique_indexes(&self) -> Vec<&IndexDefinition> {
        self.indexes.iter().filter(|i| i.is_unique).collect()
    }

    /// The one unique index usable as an alternate lookup key.
    ///
    /// Zero or several unique indexes is a configuration error.
    pub fn single_unique_index(&self) -> Result<&IndexDefinition> {
        let unique = self.unique_indexes();
        match unique.as_slice() {
            [one] => Ok(one),
            [] => Err(Error::configuration(format!(
                "{} has no unique index",
                self.entity_type
            ))),
            many => Err(Error::configuration(format!(
                "{} has {} unique indexes, expected exactly one",
                self.entity_type,
                many.len()
            ))),
        }
    }

    /// Column definitions of an index, in index order.
    pub fn index_columns(&self, index: &IndexDefinition) -> Result<Vec<&ColumnDefinition>> {
        index
            .identifiers
            .iter()
            .map(|id| {
                self.column_def(id).ok_or_else(|| {
                    Error::configuration(format!(
                        "index on {} references unknown field `{id}`",
                        self.entity_type
                    ))
                })
            })
            .collect()
    }

    /// The relation pointing at `parent_type`, if any.
    #[must_use]
    pub fn relation_to(&self, parent_type: &str) -> Option<&ParentRelationDefinition> {
        self.parent_relations
            .iter()
            .find(|r| r.parent_type == parent_type)
    }

    #[must_use]
    pub fn relation(&self, identifier: &str) -> Option<&ParentRelationDefinition> {
        self.parent_relations
            .iter()
            .find(|r| r.identifier == identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relationship::RelationColumn;
    use pretty_assertions::assert_eq;

    fn blog() -> TableDefinition {
        TableDefinition::new("Blog", "blogs")
            .column(
                ColumnDefinition::new("blog_id", "integer")
                    .primary_key()
                    .auto_number(),
            )
            .column(ColumnDefinition::new("url", "text"))
            .column(ColumnDefinition::new("version", "integer").special(SpecialColumn::VersionNumber))
            .index(IndexDefinition::unique(["url"]))
            .children("posts")
    }

    #[test]
    fn test_full_name() {
        let def = blog();
        assert_eq!(def.full_name(), "blogs");
        assert_eq!(def.qualified_name(), "\"blogs\"");

        let def = blog().schema("app");
        assert_eq!(def.full_name(), "app.blogs");
        assert_eq!(def.qualified_name(), "\"app\".\"blogs\"");
    }

    #[test]
    fn test_derived_views() {
        let def = blog();
        assert_eq!(def.primary_keys().len(), 1);
        assert_eq!(def.auto_number().map(|c| c.identifier.as_str()), Some("blog_id"));
        assert_eq!(
            def.version_column().map(|c| c.identifier.as_str()),
            Some("version")
        );
        let idx = def.single_unique_index().unwrap();
        assert_eq!(idx.identifiers, vec!["url".to_string()]);
        assert_eq!(def.index_columns(idx).unwrap()[0].column_name, "url");
    }

    #[test]
    fn test_single_unique_index_errors() {
        let none = TableDefinition::new("Tag", "tags");
        assert!(none.single_unique_index().unwrap_err().is_configuration());

        let two = blog().index(IndexDefinition::unique(["version"]));
        let err = two.single_unique_index().unwrap_err();
        assert!(err.to_string().contains("2 unique indexes"));
    }

    #[test]
    fn test_index_with_unknown_field() {
        let def = blog().index(IndexDefinition::new(["missing"]));
        assert!(def.index_columns(&def.indexes[1]).is_err());
    }

    #[test]
    fn test_relation_lookup() {
        let def = TableDefinition::new("Post", "posts").parent(ParentRelationDefinition::new(
            "blog",
            "Blog",
            RelationColumn::new("blog_id", "integer", "blog_id"),
        ));
        assert_eq!(def.relation_to("Blog").unwrap().identifier, "blog");
        assert!(def.relation("blog").is_some());
        assert!(def.relation_to("Comment").is_none());
    }
}
