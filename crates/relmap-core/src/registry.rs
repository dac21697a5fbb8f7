//! Type registry: entity type name → definition, factory and child shapes.
//!
//! Built once at startup through [`RegistryBuilder`] and read-only afterwards.
//! It can be passed around explicitly or installed as the process-wide
//! registry.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::dynamic::DynamicEntity;
use crate::entity::{Entity, EntityRef, shared};
use crate::error::{Error, Result};
use crate::table::TableDefinition;

/// Creates a fresh, empty instance of one entity type.
pub type EntityFactory = Box<dyn Fn() -> EntityRef + Send + Sync>;

/// A child collection field and the entity type it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildRelation {
    pub identifier: String,
    pub element_type: String,
}

/// Everything the engine knows about one registered type.
pub struct EntityMeta {
    definition: TableDefinition,
    factory: EntityFactory,
    children: Vec<ChildRelation>,
}

impl EntityMeta {
    #[must_use]
    pub fn definition(&self) -> &TableDefinition {
        &self.definition
    }

    /// Instantiate a new, empty instance.
    #[must_use]
    pub fn create(&self) -> EntityRef {
        (self.factory)()
    }

    /// Child collections with their resolved element types, in declaration order.
    #[must_use]
    pub fn children(&self) -> &[ChildRelation] {
        &self.children
    }

    #[must_use]
    pub fn child(&self, identifier: &str) -> Option<&ChildRelation> {
        self.children.iter().find(|c| c.identifier == identifier)
    }
}

impl std::fmt::Debug for EntityMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityMeta")
            .field("entity_type", &self.definition.entity_type)
            .field("table", &self.definition.full_name())
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

/// Collects registrations and validates them into a [`Registry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: HashMap<String, EntityMeta>,
}

impl RegistryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a host type constructed through `Default`.
    pub fn register<T: Entity + Default>(self, definition: TableDefinition) -> Result<Self> {
        self.register_with(definition, || shared(T::default()))
    }

    /// Register a map-backed type whose child collections are given as
    /// `(identifier, element_type)` pairs.
    pub fn register_dynamic(
        self,
        definition: TableDefinition,
        children: &[(&str, &str)],
    ) -> Result<Self> {
        let prototype_def = definition.clone();
        let children: Vec<(String, String)> = children
            .iter()
            .map(|(id, ty)| ((*id).to_string(), (*ty).to_string()))
            .collect();
        self.register_with(definition, move || {
            let mut entity = DynamicEntity::from_definition(&prototype_def);
            for (identifier, element_type) in &children {
                entity = entity.with_children(identifier.clone(), element_type.clone());
            }
            shared(entity)
        })
    }

    /// Register a type with an explicit factory.
    ///
    /// A prototype instance is built to check that it exposes every mapped
    /// field and that every child identifier names a collection.
    pub fn register_with<F>(mut self, definition: TableDefinition, factory: F) -> Result<Self>
    where
        F: Fn() -> EntityRef + Send + Sync + 'static,
    {
        let entity_type = definition.entity_type.clone();
        if self.entries.contains_key(&entity_type) {
            return Err(Error::configuration(format!(
                "entity type {entity_type} is registered twice"
            )));
        }

        let instance = factory();
        let prototype = instance.borrow();
        if prototype.entity_type() != entity_type {
            return Err(Error::configuration(format!(
                "factory for {entity_type} produced a {} instance",
                prototype.entity_type()
            )));
        }

        for column in &definition.columns {
            if prototype.get(&column.identifier).is_none() {
                return Err(Error::FieldAccess {
                    entity: entity_type.clone(),
                    field: column.identifier.clone(),
                    reason: "mapped field is not exposed by the entity".to_string(),
                });
            }
        }

        let mut children = Vec::with_capacity(definition.child_identifiers.len());
        for identifier in &definition.child_identifiers {
            let collection =
                prototype
                    .children(identifier)
                    .ok_or_else(|| Error::RelationShape {
                        entity: entity_type.clone(),
                        field: identifier.clone(),
                        reason: "field is not a child collection".to_string(),
                    })?;
            children.push(ChildRelation {
                identifier: identifier.clone(),
                element_type: collection.element_type().to_string(),
            });
        }
        drop(prototype);

        tracing::debug!(
            entity = %entity_type,
            table = %definition.full_name(),
            children = children.len(),
            "Registered entity type"
        );

        self.entries.insert(
            entity_type,
            EntityMeta {
                definition,
                factory: Box::new(factory),
                children,
            },
        );
        Ok(self)
    }

    /// Finish registration.
    ///
    /// Fails when a child collection holds a type that was never registered.
    pub fn build(self) -> Result<Registry> {
        for meta in self.entries.values() {
            for child in &meta.children {
                if !self.entries.contains_key(&child.element_type) {
                    return Err(Error::RelationShape {
                        entity: meta.definition.entity_type.clone(),
                        field: child.identifier.clone(),
                        reason: format!("element type {} is not registered", child.element_type),
                    });
                }
            }
        }
        Ok(Registry {
            entries: self.entries,
        })
    }
}

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// Immutable map of registered entity types.
#[derive(Debug)]
pub struct Registry {
    entries: HashMap<String, EntityMeta>,
}

impl Registry {
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn get(&self, entity_type: &str) -> Result<&EntityMeta> {
        self.entries.get(entity_type).ok_or_else(|| {
            Error::configuration(format!("entity type {entity_type} is not registered"))
        })
    }

    pub fn definition(&self, entity_type: &str) -> Result<&TableDefinition> {
        self.get(entity_type).map(EntityMeta::definition)
    }

    /// Instantiate a new instance of a registered type.
    pub fn create(&self, entity_type: &str) -> Result<EntityRef> {
        self.get(entity_type).map(EntityMeta::create)
    }

    #[must_use]
    pub fn contains(&self, entity_type: &str) -> bool {
        self.entries.contains_key(entity_type)
    }

    /// Registered type names, sorted.
    #[must_use]
    pub fn entity_types(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Install as the process-wide registry. Only the first call succeeds.
    pub fn install(self) -> Result<&'static Registry> {
        GLOBAL
            .set(self)
            .map_err(|_| Error::configuration("a global registry is already installed"))?;
        Self::global()
    }

    /// The process-wide registry installed with [`install`](Self::install).
    pub fn global() -> Result<&'static Registry> {
        GLOBAL
            .get()
            .ok_or_else(|| Error::configuration("no global registry installed"))
    }
}
