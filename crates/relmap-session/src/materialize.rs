//! Row materialization with a per-load identity cache.
//!
//! A [`RowMaterializer`] consumes the flat rows of one joined SELECT against
//! its type maps. Within one load every `(type, key)` resolves to exactly one
//! instance: rows sharing a parent reuse it, and the parent's child
//! collections collect each child once. A parent reached from a child row is
//! only referenced, not filled in. The cache lives only as long as the
//! materializer; nothing is shared across loads.

use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use relmap_core::{EntityRef, Error, ParentRef, Registry, Result, Row, RowCursor, Value};
use relmap_query::{TypeLink, TypeMap};

// ============================================================================
// Object Key
// ============================================================================

/// Identity of a materialized instance: entity type plus key values.
#[derive(Debug, Clone)]
pub struct ObjectKey {
    entity_type: String,
    values: Vec<Value>,
}

impl ObjectKey {
    pub fn new(entity_type: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            entity_type: entity_type.into(),
            values,
        }
    }

    #[must_use]
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

// Floats compare by bit pattern so that keys are a proper equivalence.
impl PartialEq for ObjectKey {
    fn eq(&self, other: &Self) -> bool {
        self.entity_type == other.entity_type
            && self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(&other.values)
                .all(|(a, b)| match (a, b) {
                    (Value::Double(x), Value::Double(y)) => x.to_bits() == y.to_bits(),
                    _ => a == b,
                })
    }
}

impl Eq for ObjectKey {}

impl Hash for ObjectKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entity_type.hash(state);
        for value in &self.values {
            hash_value(value, state);
        }
    }
}

fn hash_value<H: Hasher>(value: &Value, state: &mut H) {
    match value {
        Value::Null => 0u8.hash(state),
        Value::Bool(b) => {
            1u8.hash(state);
            b.hash(state);
        }
        Value::BigInt(i) => {
            2u8.hash(state);
            i.hash(state);
        }
        Value::Double(f) => {
            3u8.hash(state);
            f.to_bits().hash(state);
        }
        Value::Text(s) => {
            4u8.hash(state);
            s.hash(state);
        }
        Value::Bytes(b) => {
            5u8.hash(state);
            b.hash(state);
        }
        Value::Timestamp(ts) => {
            6u8.hash(state);
            ts.hash(state);
        }
        Value::Json(j) => {
            7u8.hash(state);
            j.to_string().hash(state);
        }
    }
}

// ============================================================================
// Instance Cache
// ============================================================================

/// `(type, key) → instance` map scoped to one load.
#[derive(Debug, Default)]
pub struct InstanceCache {
    objects: HashMap<ObjectKey, EntityRef>,
}

impl InstanceCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &ObjectKey) -> Option<EntityRef> {
        self.objects.get(key).cloned()
    }

    pub fn insert(&mut self, key: ObjectKey, entity: EntityRef) {
        self.objects.insert(key, entity);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

// ============================================================================
// Materializer
// ============================================================================

/// Turns joined rows into a linked graph of distinct instances.
pub struct RowMaterializer<'a> {
    registry: &'a Registry,
    type_maps: &'a [TypeMap],
    cache: InstanceCache,
    roots: Vec<EntityRef>,
    seen_roots: HashSet<ObjectKey>,
}

impl<'a> RowMaterializer<'a> {
    pub fn new(registry: &'a Registry, type_maps: &'a [TypeMap]) -> Self {
        Self {
            registry,
            type_maps,
            cache: InstanceCache::new(),
            roots: Vec::new(),
            seen_roots: HashSet::new(),
        }
    }

    /// Resolve every type map against `row`, then link the instances.
    pub fn consume(&mut self, row: &Row) -> Result<()> {
        let mut resolved: Vec<Option<EntityRef>> = Vec::with_capacity(self.type_maps.len());
        let mut root_key = None;

        for (position, map) in self.type_maps.iter().enumerate() {
            let key = row_key(map, row)?;
            // An absent outer-joined row yields nothing.
            if key.values.iter().all(Value::is_null) {
                resolved.push(None);
                continue;
            }
            if position == 0 {
                root_key = Some(key.clone());
            }

            if let Some(existing) = self.cache.get(&key) {
                resolved.push(Some(existing));
                continue;
            }

            let instance = self.registry.create(&map.entity_type)?;
            {
                let mut entity = instance.borrow_mut();
                for column in &map.columns {
                    let value = column_value(map, row, &column.column_alias)?;
                    entity.set(&column.identifier, value)?;
                }
            }
            tracing::trace!(entity = %map.entity_type, key = ?key.values, "Materialized instance");
            self.cache.insert(key, Rc::clone(&instance));
            resolved.push(Some(instance));
        }

        self.link(&resolved)?;

        if let (Some(key), Some(Some(root))) = (root_key, resolved.first()) {
            if self.seen_roots.insert(key) {
                self.roots.push(Rc::clone(root));
            }
        }
        Ok(())
    }

    fn link(&self, resolved: &[Option<EntityRef>]) -> Result<()> {
        for (map, instance) in self.type_maps.iter().zip(resolved) {
            let (Some(instance), Some(link)) = (instance, &map.link) else {
                continue;
            };
            match link {
                TypeLink::Parent { source, relation } => {
                    let Some(Some(child)) = resolved.get(*source) else {
                        continue;
                    };
                    child
                        .borrow_mut()
                        .set_parent(relation, ParentRef::shared(instance))?;
                }
                TypeLink::Child {
                    source,
                    collection,
                    relation,
                } => {
                    let Some(Some(parent)) = resolved.get(*source) else {
                        continue;
                    };
                    instance
                        .borrow_mut()
                        .set_parent(relation, ParentRef::owner(parent))?;
                    let mut parent = parent.borrow_mut();
                    let entity_type = parent.entity_type().to_string();
                    parent
                        .children_mut(collection)
                        .ok_or_else(|| not_a_collection(&entity_type, collection))?
                        .push_unique(Rc::clone(instance));
                }
            }
        }
        Ok(())
    }

    /// Drain `cursor` completely.
    pub fn consume_all(&mut self, cursor: &mut dyn RowCursor) -> Result<()> {
        let mut count = 0usize;
        while let Some(row) = cursor.next_row()? {
            self.consume(&row)?;
            count += 1;
        }
        tracing::debug!(
            rows = count,
            instances = self.cache.len(),
            roots = self.roots.len(),
            "Materialized result set"
        );
        Ok(())
    }

    /// Distinct root instances in first-seen order.
    #[must_use]
    pub fn finish(self) -> Vec<EntityRef> {
        self.roots
    }
}

/// Materialize a whole result set.
pub fn materialize(
    registry: &Registry,
    type_maps: &[TypeMap],
    cursor: &mut dyn RowCursor,
) -> Result<Vec<EntityRef>> {
    let mut materializer = RowMaterializer::new(registry, type_maps);
    materializer.consume_all(cursor)?;
    Ok(materializer.finish())
}

fn column_value(map: &TypeMap, row: &Row, alias: &str) -> Result<Value> {
    row.get(alias).cloned().ok_or_else(|| {
        Error::configuration(format!(
            "result set has no column {alias} for {}",
            map.entity_type
        ))
    })
}

fn row_key(map: &TypeMap, row: &Row) -> Result<ObjectKey> {
    let values = map
        .key
        .iter()
        .map(|identifier| {
            let column = map.column(identifier).ok_or_else(|| {
                Error::configuration(format!(
                    "key field {identifier} of {} is not selected",
                    map.entity_type
                ))
            })?;
            column_value(map, row, &column.column_alias)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(ObjectKey::new(map.entity_type.clone(), values))
}

fn not_a_collection(entity_type: &str, field: &str) -> Error {
    Error::RelationShape {
        entity: entity_type.to_string(),
        field: field.to_string(),
        reason: "field is not a child collection".to_string(),
    }
}
