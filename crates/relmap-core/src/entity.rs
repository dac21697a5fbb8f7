//! The field-access capability every mapped host object provides.
//!
//! The engine never knows concrete entity types. It reads and writes named
//! fields, parent references and child collections through [`Entity`], and
//! shares live instances as [`EntityRef`] handles so one row can be linked
//! from several places of an object graph.

use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::{Error, Result};
use crate::value::Value;

/// Shared handle to a live entity instance.
pub type EntityRef = Rc<RefCell<dyn Entity>>;

/// Non-owning handle to an entity instance.
pub type WeakEntityRef = Weak<RefCell<dyn Entity>>;

/// A child's reference to its parent.
///
/// Child collections own their members, so a parent that lists the child is
/// referenced weakly ([`ParentRef::Owner`]) and the pair never forms a cycle.
/// A parent reached only through the child is held strongly
/// ([`ParentRef::Shared`]).
#[derive(Clone)]
pub enum ParentRef {
    Owner(WeakEntityRef),
    Shared(EntityRef),
}

impl ParentRef {
    /// Back-reference to a parent whose collection holds the child.
    #[must_use]
    pub fn owner(parent: &EntityRef) -> Self {
        ParentRef::Owner(Rc::downgrade(parent))
    }

    /// Owning reference to a parent that does not hold the child.
    #[must_use]
    pub fn shared(parent: &EntityRef) -> Self {
        ParentRef::Shared(Rc::clone(parent))
    }

    /// The parent, unless it has already been dropped.
    #[must_use]
    pub fn get(&self) -> Option<EntityRef> {
        match self {
            ParentRef::Owner(weak) => weak.upgrade(),
            ParentRef::Shared(parent) => Some(Rc::clone(parent)),
        }
    }
}

// Printing the parent would walk back into its collections.
impl fmt::Debug for ParentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            ParentRef::Owner(_) => "Owner",
            ParentRef::Shared(_) => "Shared",
        };
        let Some(parent) = self.get() else {
            return write!(f, "{kind}(<dropped>)");
        };
        let result = match parent.try_borrow() {
            Ok(entity) => write!(f, "{kind}({})", entity.entity_type()),
            Err(_) => write!(f, "{kind}(<borrowed>)"),
        };
        result
    }
}

/// Field-level access to a mapped host object.
pub trait Entity: Any + fmt::Debug {
    /// Name of the registered entity type.
    fn entity_type(&self) -> &str;

    /// Current value of a scalar field. `None` means the field is unknown.
    fn get(&self, field: &str) -> Option<Value>;

    /// Overwrite a scalar field.
    fn set(&mut self, field: &str, value: Value) -> Result<()>;

    /// The parent referenced by `relation`, if bound.
    fn parent(&self, relation: &str) -> Option<EntityRef> {
        let _ = relation;
        None
    }

    /// Bind the parent reference `relation`.
    fn set_parent(&mut self, relation: &str, parent: ParentRef) -> Result<()> {
        let _ = parent;
        Err(Error::FieldAccess {
            entity: self.entity_type().to_string(),
            field: relation.to_string(),
            reason: "entity has no parent relations".to_string(),
        })
    }

    /// The child collection stored in `field`.
    fn children(&self, field: &str) -> Option<&ChildCollection> {
        let _ = field;
        None
    }

    fn children_mut(&mut self, field: &str) -> Option<&mut ChildCollection> {
        let _ = field;
        None
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Wrap an entity into a shared handle.
pub fn shared<T: Entity>(value: T) -> EntityRef {
    Rc::new(RefCell::new(value))
}

/// Borrow a handle as its concrete type.
///
/// Returns `None` when the instance is of another type.
///
/// # Panics
///
/// Panics if the instance is currently mutably borrowed.
pub fn borrow_as<T: Entity>(entity: &EntityRef) -> Option<Ref<'_, T>> {
    Ref::filter_map(entity.borrow(), |e| e.as_any().downcast_ref::<T>()).ok()
}

/// Mutably borrow a handle as its concrete type.
///
/// # Panics
///
/// Panics if the instance is currently borrowed.
pub fn borrow_mut_as<T: Entity>(entity: &EntityRef) -> Option<RefMut<'_, T>> {
    RefMut::filter_map(entity.borrow_mut(), |e| e.as_any_mut().downcast_mut::<T>()).ok()
}

/// Whether two handles point at the same instance.
#[must_use]
pub fn same_entity(a: &EntityRef, b: &EntityRef) -> bool {
    Rc::ptr_eq(a, b)
}

/// Read a declared field, turning an unknown field into an error.
pub fn field_value(entity: &dyn Entity, field: &str) -> Result<Value> {
    entity.get(field).ok_or_else(|| Error::FieldAccess {
        entity: entity.entity_type().to_string(),
        field: field.to_string(),
        reason: "unknown field".to_string(),
    })
}

/// A collection of dependent rows.
///
/// Besides the live members it remembers members removed since the last
/// save, so an update can delete their rows.
#[derive(Clone)]
pub struct ChildCollection {
    element_type: String,
    items: Vec<EntityRef>,
    removed: Vec<EntityRef>,
}

impl ChildCollection {
    pub fn new(element_type: impl Into<String>) -> Self {
        Self {
            element_type: element_type.into(),
            items: Vec::new(),
            removed: Vec::new(),
        }
    }

    #[must_use]
    pub fn element_type(&self) -> &str {
        &self.element_type
    }

    pub fn push(&mut self, item: EntityRef) {
        self.items.push(item);
    }

    /// Append unless the same instance is already a member.
    pub fn push_unique(&mut self, item: EntityRef) -> bool {
        if self.contains(&item) {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Remove the member at `index` and mark it for deletion.
    pub fn remove(&mut self, index: usize) -> Option<EntityRef> {
        if index >= self.items.len() {
            return None;
        }
        let item = self.items.remove(index);
        self.removed.push(Rc::clone(&item));
        Some(item)
    }

    /// Remove `item` and mark it for deletion.
    pub fn remove_item(&mut self, item: &EntityRef) -> bool {
        match self.items.iter().position(|i| same_entity(i, item)) {
            Some(index) => self.remove(index).is_some(),
            None => false,
        }
    }

    #[must_use]
    pub fn items(&self) -> &[EntityRef] {
        &self.items
    }

    #[must_use]
    pub fn removed(&self) -> &[EntityRef] {
        &self.removed
    }

    pub fn clear_removed(&mut self) {
        self.removed.clear();
    }

    /// Drop every live member without marking any for deletion.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    #[must_use]
    pub fn contains(&self, item: &EntityRef) -> bool {
        self.items.iter().any(|i| same_entity(i, item))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityRef> {
        self.items.iter()
    }
}

// Members link back to their parent, so printing them would not terminate.
impl fmt::Debug for ChildCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildCollection")
            .field("element_type", &self.element_type)
            .field("items", &self.items.len())
            .field("removed", &self.removed.len())
            .finish()
    }
}
