//! Loading and cascading persistence for relmap.
//!
//! The [`Session`] is the orchestrator. It borrows a connection and a type
//! registry, generates statements through `relmap-query`/`relmap-schema`,
//! hands them to the driver, and turns result rows into linked object graphs.
//!
//! # Design Philosophy
//!
//! - **Synchronous**: every generate → execute → materialize sequence runs to
//!   completion on the calling thread
//! - **No ambient identity map**: instance identity is guaranteed within one
//!   load only; independent loads return independent graphs
//! - **Caller-owned transactions**: statements run in whatever transaction is
//!   active on the connection; a failed cascade leaves earlier statements
//!   applied
//!
//! # Example
//!
//! ```ignore
//! let session = Session::new(&connection, &registry);
//! session.create_table_or_default("Blog")?;
//!
//! // Inserts the blog, then every post in its `posts` collection.
//! session.save(&blog)?;
//!
//! // Reload by key: a new, fully linked instance.
//! let copy = session.fetch(&blog, None)?;
//! ```

pub mod executor;
pub mod materialize;

pub use executor::QueryExecutor;
pub use materialize::{InstanceCache, ObjectKey, RowMaterializer, materialize};

use std::rc::Rc;

use relmap_core::{
    ColumnDefinition, Connection, EntityRef, Error, MapperConfig, ParentRef, Registry, Result,
    Statement, TableDefinition, Value, field_value,
};
use relmap_query::{
    CascadeReadRule, DeleteBuilder, InsertBuilder, JoinPlanner, SelectQuery, UpdateBuilder,
};
use relmap_schema::create_statements;

// ============================================================================
// Session
// ============================================================================

/// Cascade persistence orchestrator bound to one connection.
#[derive(Debug)]
pub struct Session<'a, C: Connection + ?Sized> {
    connection: &'a C,
    registry: &'a Registry,
    config: MapperConfig,
}

impl<'a, C: Connection + ?Sized> Session<'a, C> {
    /// Create a session with the default configuration.
    pub fn new(connection: &'a C, registry: &'a Registry) -> Self {
        Self {
            connection,
            registry,
            config: MapperConfig::default(),
        }
    }

    /// Create a session over the process-wide registry.
    pub fn with_global_registry(connection: &'a C) -> Result<Self> {
        Ok(Self::new(connection, Registry::global()?))
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: MapperConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    fn executor(&self) -> QueryExecutor<'_, C> {
        QueryExecutor::new(self.connection, &self.config)
    }

    // ========================================================================
    // Schema
    // ========================================================================

    /// Create the table, its indexes and (dialect permitting) comments.
    ///
    /// Every statement is `IF NOT EXISTS`, so repeating this is harmless.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn create_table_or_default(&self, entity_type: &str) -> Result<()> {
        let def = self.registry.definition(entity_type)?;
        let executor = self.executor();
        for sql in create_statements(def, self.config.dialect)? {
            executor.execute(&Statement::new(sql), "create_table_or_default")?;
        }
        Ok(())
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Load every `entity_type` row with the relations `rule` allows.
    ///
    /// Returns one instance per distinct root, in first-seen order.
    #[tracing::instrument(level = "debug", skip(self, rule))]
    pub fn load(
        &self,
        entity_type: &str,
        rule: Option<&CascadeReadRule>,
    ) -> Result<Vec<EntityRef>> {
        self.load_with(entity_type, rule, |_| {})
    }

    /// Like [`load`](Self::load), letting `injector` add conditions, ordering
    /// or a limit to the planned query. The root table's alias is
    /// [`SelectQuery::root_alias`].
    #[tracing::instrument(level = "debug", skip(self, rule, injector))]
    pub fn load_with<F>(
        &self,
        entity_type: &str,
        rule: Option<&CascadeReadRule>,
        injector: F,
    ) -> Result<Vec<EntityRef>>
    where
        F: FnOnce(&mut SelectQuery),
    {
        let mut plan = JoinPlanner::new(self.registry)
            .with_rule(rule)
            .plan(entity_type)?;
        injector(&mut plan.query);
        let statement = plan.query.to_statement();

        let mut cursor = self.executor().query(&statement, "load")?;
        materialize(self.registry, &plan.type_maps, cursor.as_mut())
            .map_err(|e| e.with_sql(statement.sql()))
    }

    /// Reload `entity` by its primary key, or its single unique index when the
    /// primary key is unset. Returns a new instance.
    #[tracing::instrument(level = "debug", skip(self, entity, rule))]
    pub fn fetch(&self, entity: &EntityRef, rule: Option<&CascadeReadRule>) -> Result<EntityRef> {
        let entity_type = entity.borrow().entity_type().to_string();
        let def = self.registry.definition(&entity_type)?;
        let conditions = fetch_conditions(def, entity)?;

        let results = self.load_with(&entity_type, rule, |query| {
            let alias = query.root_alias().to_string();
            for (column, value) in &conditions {
                query.where_eq(&alias, &column.column_name, value.clone());
            }
        })?;

        match results.len() {
            1 => Ok(Rc::clone(&results[0])),
            0 => Err(Error::NotFound {
                entity: entity_type,
                conditions: conditions
                    .into_iter()
                    .map(|(column, value)| (column.identifier.clone(), value))
                    .collect(),
            }),
            count => Err(Error::Ambiguous {
                entity: entity_type,
                count,
            }),
        }
    }

    /// Load the rows of `entity`'s child collection `collection` and append
    /// them to it. Returns the fetched children.
    #[tracing::instrument(level = "debug", skip(self, entity))]
    pub fn fetch_children(&self, entity: &EntityRef, collection: &str) -> Result<Vec<EntityRef>> {
        let parent_type = entity.borrow().entity_type().to_string();
        let child = self
            .registry
            .get(&parent_type)?
            .child(collection)
            .ok_or_else(|| Error::RelationShape {
                entity: parent_type.clone(),
                field: collection.to_string(),
                reason: "no such child collection".to_string(),
            })?;
        let child_def = self.registry.definition(&child.element_type)?;
        let relation = child_def.relation_to(&parent_type).ok_or_else(|| {
            Error::configuration(format!(
                "{} has no parent relation back to {parent_type}",
                child.element_type
            ))
        })?;

        let mut conditions = Vec::with_capacity(relation.columns.len());
        {
            let parent = entity.borrow();
            for column in &relation.columns {
                conditions.push((
                    column.column_name.clone(),
                    field_value(&*parent, &column.parent_identifier)?,
                ));
            }
        }

        let rule = CascadeReadRule::except([(child.element_type.as_str(), parent_type.as_str())]);
        let children = self.load_with(&child.element_type, Some(&rule), |query| {
            let alias = query.root_alias().to_string();
            for (column, value) in &conditions {
                query.where_eq(&alias, column, value.clone());
            }
        })?;

        for item in &children {
            item.borrow_mut()
                .set_parent(&relation.identifier, ParentRef::owner(entity))?;
            let mut parent = entity.borrow_mut();
            parent
                .children_mut(collection)
                .ok_or_else(|| Error::RelationShape {
                    entity: parent_type.clone(),
                    field: collection.to_string(),
                    reason: "field is not a child collection".to_string(),
                })?
                .push_unique(Rc::clone(item));
        }
        tracing::debug!(
            entity = %parent_type,
            collection,
            count = children.len(),
            "Fetched children"
        );
        Ok(children)
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Insert when the auto-number column is unset, update otherwise.
    #[tracing::instrument(level = "debug", skip(self, entity))]
    pub fn save(&self, entity: &EntityRef) -> Result<()> {
        let entity_type = entity.borrow().entity_type().to_string();
        let def = self.registry.definition(&entity_type)?;
        let auto_number = def.auto_number().ok_or_else(|| {
            Error::configuration(format!(
                "{entity_type} has no auto-number column; cannot tell new from existing"
            ))
        })?;
        let current = field_value(&*entity.borrow(), &auto_number.identifier)?;
        if current.is_unset() {
            self.insert(entity)
        } else {
            self.update(entity)
        }
    }

    /// Insert `entity`, write back generated values, then insert every child.
    #[tracing::instrument(level = "debug", skip(self, entity))]
    pub fn insert(&self, entity: &EntityRef) -> Result<()> {
        let entity_type = entity.borrow().entity_type().to_string();
        let meta = self.registry.get(&entity_type)?;
        let (statement, generated) = {
            let instance = entity.borrow();
            let insert = InsertBuilder::new(meta.definition(), &*instance).build()?;
            (insert.statement, insert.generated)
        };
        let executor = self.executor();

        match meta.definition().auto_number() {
            Some(column) => {
                let id = executor.query_scalar(&statement, "insert")?;
                let id = id.filter(|v| !v.is_null()).ok_or_else(|| Error::Database {
                    message: format!("INSERT returned no {} value", column.column_name),
                    sql: Some(statement.sql().to_string()),
                })?;
                entity.borrow_mut().set(&column.identifier, id)?;
            }
            None => {
                executor.execute(&statement, "insert")?;
            }
        }
        write_back(entity, generated)?;

        for child in meta.children() {
            for item in self.bound_children(entity, &child.identifier, &child.element_type)? {
                self.insert(&item)?;
            }
        }
        Ok(())
    }

    /// Update `entity`, then save live children and delete removed ones.
    ///
    /// A version-guarded update that affects no row fails with
    /// [`Error::ConcurrencyConflict`]; an unguarded one is logged and skipped.
    #[tracing::instrument(level = "debug", skip(self, entity))]
    pub fn update(&self, entity: &EntityRef) -> Result<()> {
        let entity_type = entity.borrow().entity_type().to_string();
        let meta = self.registry.get(&entity_type)?;
        let update = UpdateBuilder::new(meta.definition(), &*entity.borrow()).build()?;

        let rows = self.executor().execute(&update.statement, "update")?;
        if rows == 0 {
            if update.versioned {
                return Err(Error::ConcurrencyConflict {
                    entity: entity_type,
                    conditions: update.conditions,
                });
            }
            tracing::warn!(
                entity = %entity_type,
                conditions = ?update.conditions,
                "UPDATE affected no rows"
            );
        } else {
            write_back(entity, update.generated)?;
        }

        for child in meta.children() {
            for item in self.bound_children(entity, &child.identifier, &child.element_type)? {
                self.save(&item)?;
            }
            for removed in removed_children(entity, &child.identifier)? {
                self.delete(&removed)?;
            }
            clear_removed(entity, &child.identifier);
        }
        Ok(())
    }

    /// Delete every child (live and removed), then `entity` itself.
    #[tracing::instrument(level = "debug", skip(self, entity))]
    pub fn delete(&self, entity: &EntityRef) -> Result<()> {
        let entity_type = entity.borrow().entity_type().to_string();
        let meta = self.registry.get(&entity_type)?;

        for child in meta.children() {
            for item in live_children(entity, &child.identifier)? {
                self.delete(&item)?;
            }
            for removed in removed_children(entity, &child.identifier)? {
                self.delete(&removed)?;
            }
            clear_removed(entity, &child.identifier);
        }

        let statement = DeleteBuilder::new(meta.definition(), &*entity.borrow()).build()?;
        self.executor().execute(&statement, "delete")?;
        Ok(())
    }

    /// Delete every instance in order.
    pub fn delete_all(&self, entities: &[EntityRef]) -> Result<()> {
        for entity in entities {
            self.delete(entity)?;
        }
        Ok(())
    }

    /// Live members of a child collection with their parent reference bound
    /// to `entity`.
    fn bound_children(
        &self,
        entity: &EntityRef,
        collection: &str,
        element_type: &str,
    ) -> Result<Vec<EntityRef>> {
        let items = live_children(entity, collection)?;
        if items.is_empty() {
            return Ok(items);
        }
        let parent_type = entity.borrow().entity_type().to_string();
        let child_def = self.registry.definition(element_type)?;
        let relation = child_def.relation_to(&parent_type).ok_or_else(|| {
            Error::configuration(format!(
                "{element_type} has no parent relation back to {parent_type}"
            ))
        })?;
        for item in &items {
            let mut child = item.borrow_mut();
            if child.entity_type() != element_type {
                return Err(Error::RelationShape {
                    entity: parent_type,
                    field: collection.to_string(),
                    reason: format!(
                        "holds a {} instance, expected {element_type}",
                        child.entity_type()
                    ),
                });
            }
            child.set_parent(&relation.identifier, ParentRef::owner(entity))?;
        }
        Ok(items)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Key conditions for a single-instance fetch: the primary key when every
/// field is set, else the single unique index when every field is set.
/// An auto-number field counts as unset under the same rule `save` uses.
fn fetch_conditions<'d>(
    def: &'d TableDefinition,
    entity: &EntityRef,
) -> Result<Vec<(&'d ColumnDefinition, Value)>> {
    let instance = entity.borrow();
    let read = |columns: Vec<&'d ColumnDefinition>| -> Result<Option<Vec<(&'d ColumnDefinition, Value)>>> {
        if columns.is_empty() {
            return Ok(None);
        }
        let mut conditions = Vec::with_capacity(columns.len());
        for column in columns {
            let value = field_value(&*instance, &column.identifier)?;
            let unset = if column.is_auto_number {
                value.is_unset()
            } else {
                value.is_null()
            };
            if unset {
                return Ok(None);
            }
            conditions.push((column, value));
        }
        Ok(Some(conditions))
    };

    if let Some(conditions) = read(def.primary_keys())? {
        return Ok(conditions);
    }
    if let Ok(index) = def.single_unique_index() {
        if let Some(conditions) = read(def.index_columns(index)?)? {
            return Ok(conditions);
        }
    }
    Err(Error::configuration(format!(
        "no usable condition to fetch {}: key fields are unset",
        def.entity_type
    )))
}

fn write_back(entity: &EntityRef, values: Vec<(String, Value)>) -> Result<()> {
    let mut instance = entity.borrow_mut();
    for (identifier, value) in values {
        instance.set(&identifier, value)?;
    }
    Ok(())
}

fn collection_error(entity: &EntityRef, collection: &str) -> Error {
    Error::RelationShape {
        entity: entity.borrow().entity_type().to_string(),
        field: collection.to_string(),
        reason: "field is not a child collection".to_string(),
    }
}

fn live_children(entity: &EntityRef, collection: &str) -> Result<Vec<EntityRef>> {
    let items = entity
        .borrow()
        .children(collection)
        .map(|c| c.items().to_vec());
    items.ok_or_else(|| collection_error(entity, collection))
}

fn removed_children(entity: &EntityRef, collection: &str) -> Result<Vec<EntityRef>> {
    let items = entity
        .borrow()
        .children(collection)
        .map(|c| c.removed().to_vec());
    items.ok_or_else(|| collection_error(entity, collection))
}

fn clear_removed(entity: &EntityRef, collection: &str) {
    if let Some(children) = entity.borrow_mut().children_mut(collection) {
        children.clear_removed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relmap_core::{
        BufferedCursor, ColumnDefinition, DynamicEntity, ParentRelationDefinition,
        RelationColumn, Row, RowCursor, SpecialColumn, shared,
    };
    use pretty_assertions::assert_eq;
    use std::cell::{Cell, RefCell};
    use std::time::Duration;

    /// Records every statement and answers from a script.
    #[derive(Default)]
    struct ScriptedConnection {
        log: RefCell<Vec<String>>,
        affected: Cell<u64>,
        next_id: Cell<i64>,
        rows: RefCell<Vec<Row>>,
    }

    impl ScriptedConnection {
        fn new() -> Self {
            let conn = Self::default();
            conn.affected.set(1);
            conn.next_id.set(100);
            conn
        }

        fn log(&self) -> Vec<String> {
            self.log.borrow().clone()
        }
    }

    impl Connection for ScriptedConnection {
        fn execute(&self, statement: &Statement, _: Option<Duration>) -> Result<u64> {
            self.log.borrow_mut().push(statement.sql().to_string());
            Ok(self.affected.get())
        }

        fn query_scalar(&self, statement: &Statement, _: Option<Duration>) -> Result<Option<Value>> {
            self.log.borrow_mut().push(statement.sql().to_string());
            let id = self.next_id.get();
            self.next_id.set(id + 1);
            Ok(Some(Value::BigInt(id)))
        }

        fn query<'a>(
            &'a self,
            statement: &Statement,
            _: Option<Duration>,
        ) -> Result<Box<dyn RowCursor + 'a>> {
            self.log.borrow_mut().push(statement.sql().to_string());
            Ok(Box::new(BufferedCursor::new(self.rows.take())))
        }
    }

    fn registry() -> Registry {
        let folder = TableDefinition::new("Folder", "folders")
            .column(ColumnDefinition::new("folder_id", "integer").primary_key().auto_number())
            .column(ColumnDefinition::new("name", "text"))
            .column(ColumnDefinition::new("version", "integer").special(SpecialColumn::VersionNumber))
            .children("notes");
        let note = TableDefinition::new("Note", "notes")
            .column(ColumnDefinition::new("note_id", "integer").primary_key().auto_number())
            .column(ColumnDefinition::new("body", "text"))
            .parent(ParentRelationDefinition::new(
                "folder",
                "Folder",
                RelationColumn::new("folder_id", "integer", "folder_id"),
            ));
        let tag = TableDefinition::new("Tag", "tags")
            .column(ColumnDefinition::new("label", "text").primary_key());
        Registry::builder()
            .register_dynamic(folder, &[("notes", "Note")])
            .unwrap()
            .register_dynamic(note, &[])
            .unwrap()
            .register_dynamic(tag, &[])
            .unwrap()
            .build()
            .unwrap()
    }

    fn folder_with_notes(registry: &Registry, count: usize) -> EntityRef {
        let folder = registry.create("Folder").unwrap();
        folder.borrow_mut().set("name", "inbox".into()).unwrap();
        for i in 0..count {
            let note = registry.create("Note").unwrap();
            note.borrow_mut().set("body", format!("note {i}").into()).unwrap();
            folder.borrow_mut().children_mut("notes").unwrap().push(note);
        }
        folder
    }

    #[test]
    fn test_insert_cascades_with_generated_ids() {
        let registry = registry();
        let conn = ScriptedConnection::new();
        let session = Session::new(&conn, &registry);
        let folder = folder_with_notes(&registry, 2);

        session.save(&folder).unwrap();

        let log = conn.log();
        assert_eq!(log.len(), 3);
        assert!(log[0].starts_with("INSERT INTO \"folders\""));
        assert!(log[1].starts_with("INSERT INTO \"notes\""));
        assert_eq!(folder.borrow().get("folder_id"), Some(Value::BigInt(100)));
        assert_eq!(folder.borrow().get("version"), Some(Value::BigInt(1)));

        let folder_ref = folder.borrow();
        let notes = folder_ref.children("notes").unwrap();
        assert_eq!(notes.items()[1].borrow().get("note_id"), Some(Value::BigInt(102)));
        let parent = notes.items()[0].borrow().parent("folder").unwrap();
        assert!(Rc::ptr_eq(&parent, &folder));
    }

    #[test]
    fn test_saved_graph_is_freed_with_its_root() {
        let registry = registry();
        let conn = ScriptedConnection::new();
        let session = Session::new(&conn, &registry);
        let folder = folder_with_notes(&registry, 2);
        session.save(&folder).unwrap();

        let note = Rc::downgrade(&folder.borrow().children("notes").unwrap().items()[0]);
        let weak = Rc::downgrade(&folder);
        drop(folder);
        assert!(weak.upgrade().is_none());
        assert!(note.upgrade().is_none());
    }

    #[test]
    fn test_fetch_treats_zero_auto_number_as_unset() {
        let registry = registry();
        let conn = ScriptedConnection::new();
        let session = Session::new(&conn, &registry);
        let note = registry.create("Note").unwrap();
        note.borrow_mut().set("note_id", Value::BigInt(0)).unwrap();
        let err = session.fetch(&note, None).unwrap_err();
        assert!(err.to_string().contains("no usable condition"));
        assert!(conn.log().is_empty());
    }

    #[test]
    fn test_update_saves_children_and_deletes_removed() {
        let registry = registry();
        let conn = ScriptedConnection::new();
        let session = Session::new(&conn, &registry);
        let folder = folder_with_notes(&registry, 2);
        {
            let mut f = folder.borrow_mut();
            f.set("folder_id", Value::BigInt(1)).unwrap();
            f.set("version", Value::BigInt(3)).unwrap();
            let notes = f.children_mut("notes").unwrap();
            notes.items()[0]
                .borrow_mut()
                .set("note_id", Value::BigInt(7))
                .unwrap();
            notes.remove(1);
        }

        session.save(&folder).unwrap();

        let log = conn.log();
        assert_eq!(log.len(), 3);
        assert!(log[0].starts_with("UPDATE \"folders\""));
        assert!(log[1].starts_with("UPDATE \"notes\""));
        assert!(log[2].starts_with("DELETE FROM \"notes\""));
        assert_eq!(folder.borrow().get("version"), Some(Value::BigInt(4)));
        assert!(folder.borrow().children("notes").unwrap().removed().is_empty());
    }

    #[test]
    fn test_versioned_update_conflict() {
        let registry = registry();
        let conn = ScriptedConnection::new();
        conn.affected.set(0);
        let session = Session::new(&conn, &registry);
        let folder = folder_with_notes(&registry, 0);
        folder.borrow_mut().set("folder_id", Value::BigInt(1)).unwrap();
        folder.borrow_mut().set("version", Value::BigInt(2)).unwrap();

        let err = session.update(&folder).unwrap_err();
        assert!(err.is_concurrency_conflict());
        assert!(err.to_string().contains("version=2"));
        // Nothing is written back after a conflict.
        assert_eq!(folder.borrow().get("version"), Some(Value::BigInt(2)));
    }

    #[test]
    fn test_unversioned_zero_row_update_is_not_an_error() {
        let registry = registry();
        let conn = ScriptedConnection::new();
        conn.affected.set(0);
        let session = Session::new(&conn, &registry);
        let note = registry.create("Note").unwrap();
        note.borrow_mut().set("note_id", Value::BigInt(5)).unwrap();
        session.update(&note).unwrap();
    }

    #[test]
    fn test_delete_children_before_parent() {
        let registry = registry();
        let conn = ScriptedConnection::new();
        let session = Session::new(&conn, &registry);
        let folder = folder_with_notes(&registry, 2);
        folder.borrow_mut().set("folder_id", Value::BigInt(1)).unwrap();

        session.delete(&folder).unwrap();

        let log = conn.log();
        assert_eq!(
            log,
            vec![
                "DELETE FROM \"notes\" WHERE \"note_id\" = :note_id".to_string(),
                "DELETE FROM \"notes\" WHERE \"note_id\" = :note_id".to_string(),
                "DELETE FROM \"folders\" WHERE \"folder_id\" = :folder_id".to_string(),
            ]
        );
    }

    #[test]
    fn test_save_without_auto_number() {
        let registry = registry();
        let conn = ScriptedConnection::new();
        let session = Session::new(&conn, &registry);
        let tag = registry.create("Tag").unwrap();
        assert!(session.save(&tag).unwrap_err().is_configuration());
        assert!(conn.log().is_empty());
    }

    #[test]
    fn test_fetch_without_usable_condition() {
        let registry = registry();
        let conn = ScriptedConnection::new();
        let session = Session::new(&conn, &registry);
        let note = registry.create("Note").unwrap();
        let err = session.fetch(&note, None).unwrap_err();
        assert!(err.to_string().contains("no usable condition"));
    }

    #[test]
    fn test_fetch_not_found_and_ambiguous() {
        let registry = registry();
        let conn = ScriptedConnection::new();
        let session = Session::new(&conn, &registry);
        let tag = shared(DynamicEntity::from_definition(registry.definition("Tag").unwrap()));
        tag.borrow_mut().set("label", "rust".into()).unwrap();

        let err = session.fetch(&tag, None).unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("label=rust"));
        assert!(conn.log()[0].ends_with("WHERE \"t0\".\"label\" = :key0"));

        // Keyed on every column, two distinct rows come back as two roots.
        conn.rows.replace(vec![
            Row::from_pairs([("t0_label", Value::Text("rust".into()))]),
            Row::from_pairs([("t0_label", Value::Text("Rust".into()))]),
        ]);
        let err = session.fetch(&tag, None).unwrap_err();
        assert!(matches!(err, Error::Ambiguous { count: 2, .. }));
    }

    #[test]
    fn test_fetch_children_appends_to_collection() {
        let registry = registry();
        let conn = ScriptedConnection::new();
        let session = Session::new(&conn, &registry);
        let folder = folder_with_notes(&registry, 0);
        folder.borrow_mut().set("folder_id", Value::BigInt(4)).unwrap();
        conn.rows.replace(vec![
            Row::from_pairs([
                ("t0_note_id", Value::BigInt(1)),
                ("t0_body", Value::Text("a".into())),
            ]),
            Row::from_pairs([
                ("t0_note_id", Value::BigInt(2)),
                ("t0_body", Value::Text("b".into())),
            ]),
        ]);

        let notes = session.fetch_children(&folder, "notes").unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(
            conn.log()[0],
            "SELECT \"t0\".\"note_id\" AS \"t0_note_id\", \"t0\".\"body\" AS \"t0_body\" \
             FROM \"notes\" AS \"t0\" WHERE \"t0\".\"folder_id\" = :key0"
        );
        assert_eq!(folder.borrow().children("notes").unwrap().len(), 2);
        let parent = notes[1].borrow().parent("folder").unwrap();
        assert!(Rc::ptr_eq(&parent, &folder));

        assert!(matches!(
            session.fetch_children(&folder, "tags").unwrap_err(),
            Error::RelationShape { .. }
        ));
    }

    #[test]
    fn test_create_table_or_default_runs_every_statement() {
        let registry = registry();
        let conn = ScriptedConnection::new();
        let session = Session::new(&conn, &registry);
        session.create_table_or_default("Folder").unwrap();
        session.create_table_or_default("Folder").unwrap();
        let log = conn.log();
        assert_eq!(log.len(), 2);
        assert!(log.iter().all(|s| s.starts_with("CREATE TABLE IF NOT EXISTS")));
    }

    #[test]
    fn test_children_of_wrong_type_are_rejected() {
        let registry = registry();
        let conn = ScriptedConnection::new();
        let session = Session::new(&conn, &registry);
        let folder = folder_with_notes(&registry, 0);
        let tag = registry.create("Tag").unwrap();
        folder.borrow_mut().children_mut("notes").unwrap().push(tag);
        let err = session.insert(&folder).unwrap_err();
        assert!(matches!(err, Error::RelationShape { .. }));
    }
}
