//! Dynamic entities for definitions not known at compile time.
//!
//! Provides `DynamicEntity`, a map-backed [`Entity`] whose fields, parent
//! relations and child collections are declared at runtime, typically straight
//! from a [`TableDefinition`].

use std::any::Any;
use std::collections::BTreeMap;

use crate::entity::{ChildCollection, Entity, EntityRef, ParentRef};
use crate::error::{Error, Result};
use crate::table::TableDefinition;
use crate::value::Value;

/// A dynamically-defined entity.
///
/// Unlike hand-written entity structs, `DynamicEntity` stores field values,
/// parent references and child collections in maps, trading type safety for
/// flexibility.
///
/// # Example
///
/// ```
/// use relmap_core::dynamic::DynamicEntity;
/// use relmap_core::entity::Entity;
/// use relmap_core::value::Value;
///
/// let mut tag = DynamicEntity::new("Tag");
/// tag.declare_field("tag_id");
/// tag.declare_field("label");
///
/// tag.set("label", Value::Text("rust".to_string())).unwrap();
///
/// assert_eq!(tag.get("label").unwrap().as_str(), Some("rust"));
/// assert_eq!(tag.get("tag_id"), Some(Value::Null));
/// assert!(tag.get("missing").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct DynamicEntity {
    entity_type: String,
    values: BTreeMap<String, Value>,
    parents: BTreeMap<String, Option<ParentRef>>,
    children: BTreeMap<String, ChildCollection>,
}

impl DynamicEntity {
    /// Create an entity with no declared fields.
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            values: BTreeMap::new(),
            parents: BTreeMap::new(),
            children: BTreeMap::new(),
        }
    }

    /// Create an entity declaring every column and parent relation of `def`.
    ///
    /// Child collections need an element type, so they are declared
    /// separately with [`with_children`](Self::with_children).
    pub fn from_definition(def: &TableDefinition) -> Self {
        let mut entity = Self::new(def.entity_type.clone());
        for column in &def.columns {
            entity.declare_field(column.identifier.clone());
        }
        for relation in &def.parent_relations {
            entity.declare_relation(relation.identifier.clone());
        }
        entity
    }

    /// Declare a scalar field, initialized to NULL.
    pub fn declare_field(&mut self, identifier: impl Into<String>) {
        self.values.entry(identifier.into()).or_insert(Value::Null);
    }

    /// Declare an unbound parent reference.
    pub fn declare_relation(&mut self, identifier: impl Into<String>) {
        self.parents.entry(identifier.into()).or_insert(None);
    }

    /// Declare an empty child collection holding `element_type` instances.
    pub fn with_children(
        mut self,
        identifier: impl Into<String>,
        element_type: impl Into<String>,
    ) -> Self {
        self.children
            .insert(identifier.into(), ChildCollection::new(element_type));
        self
    }

    /// Set a field while building, ignoring unknown identifiers.
    pub fn with_value(mut self, identifier: &str, value: impl Into<Value>) -> Self {
        if let Some(slot) = self.values.get_mut(identifier) {
            *slot = value.into();
        }
        self
    }

    /// Declared field values in identifier order.
    pub fn values(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn unknown(&self, field: &str, kind: &str) -> Error {
        Error::FieldAccess {
            entity: self.entity_type.clone(),
            field: field.to_string(),
            reason: format!("no such {kind}"),
        }
    }
}

impl Entity for DynamicEntity {
    fn entity_type(&self) -> &str {
        &self.entity_type
    }

    fn get(&self, field: &str) -> Option<Value> {
        self.values.get(field).cloned()
    }

    fn set(&mut self, field: &str, value: Value) -> Result<()> {
        match self.values.get_mut(field) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(self.unknown(field, "field")),
        }
    }

    fn parent(&self, relation: &str) -> Option<EntityRef> {
        self.parents
            .get(relation)
            .and_then(|slot| slot.as_ref())
            .and_then(ParentRef::get)
    }

    fn set_parent(&mut self, relation: &str, parent: ParentRef) -> Result<()> {
        match self.parents.get_mut(relation) {
            Some(slot) => {
                *slot = Some(parent);
                Ok(())
            }
            None => Err(self.unknown(relation, "relation")),
        }
    }

    fn children(&self, field: &str) -> Option<&ChildCollection> {
        self.children.get(field)
    }

    fn children_mut(&mut self, field: &str) -> Option<&mut ChildCollection> {
        self.children.get_mut(field)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::shared;
    use pretty_assertions::assert_eq;
    use crate::field::ColumnDefinition;
    use crate::relationship::{ParentRelationDefinition, RelationColumn};

    fn note_def() -> TableDefinition {
        TableDefinition::new("Note", "notes")
            .column(ColumnDefinition::new("note_id", "integer").primary_key().auto_number())
            .column(ColumnDefinition::new("body", "text"))
            .parent(ParentRelationDefinition::new(
                "folder",
                "Folder",
                RelationColumn::new("folder_id", "integer", "folder_id"),
            ))
    }

    #[test]
    fn test_from_definition_declares_fields() {
        let note = DynamicEntity::from_definition(&note_def());
        assert_eq!(note.entity_type(), "Note");
        assert_eq!(note.get("note_id"), Some(Value::Null));
        assert_eq!(note.get("body"), Some(Value::Null));
        assert!(note.get("folder_id").is_none());
        assert!(note.parent("folder").is_none());
    }

    #[test]
    fn test_set_unknown_field_fails() {
        let mut note = DynamicEntity::from_definition(&note_def());
        note.set("body", Value::Text("hi".into())).unwrap();
        assert_eq!(note.get("body"), Some(Value::Text("hi".into())));
        let err = note.set("title", Value::Null).unwrap_err();
        assert!(err.to_string().contains("no such field"));
    }

    #[test]
    fn test_parent_and_children() {
        let folder = shared(DynamicEntity::new("Folder").with_children("notes", "Note"));
        let mut note = DynamicEntity::from_definition(&note_def());
        note.set_parent("folder", ParentRef::owner(&folder)).unwrap();
        assert!(note.parent("folder").is_some());
        assert!(note.set_parent("owner", ParentRef::owner(&folder)).is_err());

        let folder = folder.borrow();
        let notes = folder.children("notes").unwrap();
        assert_eq!(notes.element_type(), "Note");
        assert!(notes.is_empty());
    }

    #[test]
    fn test_owner_parent_is_not_kept_alive() {
        let folder = shared(DynamicEntity::new("Folder").with_children("notes", "Note"));
        let note = shared(DynamicEntity::from_definition(&note_def()));
        note.borrow_mut()
            .set_parent("folder", ParentRef::owner(&folder))
            .unwrap();
        folder
            .borrow_mut()
            .children_mut("notes")
            .unwrap()
            .push(note.clone());

        let weak = std::rc::Rc::downgrade(&folder);
        drop(folder);
        assert!(weak.upgrade().is_none());
        assert!(note.borrow().parent("folder").is_none());
    }

    #[test]
    fn test_with_value_ignores_unknown() {
        let note = DynamicEntity::from_definition(&note_def())
            .with_value("body", "text")
            .with_value("missing", 1_i64);
        let values: Vec<_> = note.values().map(|(k, _)| k).collect();
        assert_eq!(values, vec!["body", "note_id"]);
    }
}
