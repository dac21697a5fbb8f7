//! Shared fixtures for the SQLite integration tests.
#![allow(dead_code)]

use std::any::Any;
use std::cell::RefCell;
use std::sync::Once;
use std::time::Duration;

use relmap::prelude::*;
use relmap::{RowCursor, Statement};
use relmap_sqlite::SqliteConnection;

static TRACING: Once = Once::new();

/// Install a test subscriber once, honouring `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn unknown(entity: &str, field: &str) -> Error {
    Error::FieldAccess {
        entity: entity.to_string(),
        field: field.to_string(),
        reason: "unknown field".to_string(),
    }
}

// ============================================================================
// Typed entities
// ============================================================================

#[derive(Debug)]
pub struct Blog {
    pub blog_id: Option<i64>,
    pub url: String,
    pub posts: ChildCollection,
}

impl Default for Blog {
    fn default() -> Self {
        Self {
            blog_id: None,
            url: String::new(),
            posts: ChildCollection::new("Post"),
        }
    }
}

impl Entity for Blog {
    fn entity_type(&self) -> &str {
        "Blog"
    }

    fn get(&self, field: &str) -> Option<Value> {
        match field {
            "blog_id" => Some(self.blog_id.into()),
            "url" => Some(self.url.clone().into()),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: Value) -> Result<()> {
        match field {
            "blog_id" => self.blog_id = value.decode("Blog", field)?,
            "url" => self.url = value.decode("Blog", field)?,
            _ => return Err(unknown("Blog", field)),
        }
        Ok(())
    }

    fn children(&self, field: &str) -> Option<&ChildCollection> {
        (field == "posts").then_some(&self.posts)
    }

    fn children_mut(&mut self, field: &str) -> Option<&mut ChildCollection> {
        (field == "posts").then_some(&mut self.posts)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct Post {
    pub post_id: Option<i64>,
    pub title: String,
    pub blog: Option<ParentRef>,
    pub comments: ChildCollection,
}

impl Default for Post {
    fn default() -> Self {
        Self {
            post_id: None,
            title: String::new(),
            blog: None,
            comments: ChildCollection::new("Comment"),
        }
    }
}

impl Entity for Post {
    fn entity_type(&self) -> &str {
        "Post"
    }

    fn get(&self, field: &str) -> Option<Value> {
        match field {
            "post_id" => Some(self.post_id.into()),
            "title" => Some(self.title.clone().into()),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: Value) -> Result<()> {
        match field {
            "post_id" => self.post_id = value.decode("Post", field)?,
            "title" => self.title = value.decode("Post", field)?,
            _ => return Err(unknown("Post", field)),
        }
        Ok(())
    }

    fn parent(&self, relation: &str) -> Option<EntityRef> {
        if relation == "blog" {
            self.blog.as_ref().and_then(ParentRef::get)
        } else {
            None
        }
    }

    fn set_parent(&mut self, relation: &str, parent: ParentRef) -> Result<()> {
        if relation != "blog" {
            return Err(unknown("Post", relation));
        }
        self.blog = Some(parent);
        Ok(())
    }

    fn children(&self, field: &str) -> Option<&ChildCollection> {
        (field == "comments").then_some(&self.comments)
    }

    fn children_mut(&mut self, field: &str) -> Option<&mut ChildCollection> {
        (field == "comments").then_some(&mut self.comments)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Debug, Default)]
pub struct Comment {
    pub comment_id: Option<i64>,
    pub body: String,
    pub post: Option<ParentRef>,
}

impl Entity for Comment {
    fn entity_type(&self) -> &str {
        "Comment"
    }

    fn get(&self, field: &str) -> Option<Value> {
        match field {
            "comment_id" => Some(self.comment_id.into()),
            "body" => Some(self.body.clone().into()),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: Value) -> Result<()> {
        match field {
            "comment_id" => self.comment_id = value.decode("Comment", field)?,
            "body" => self.body = value.decode("Comment", field)?,
            _ => return Err(unknown("Comment", field)),
        }
        Ok(())
    }

    fn parent(&self, relation: &str) -> Option<EntityRef> {
        if relation == "post" {
            self.post.as_ref().and_then(ParentRef::get)
        } else {
            None
        }
    }

    fn set_parent(&mut self, relation: &str, parent: ParentRef) -> Result<()> {
        if relation != "post" {
            return Err(unknown("Comment", relation));
        }
        self.post = Some(parent);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ============================================================================
// Definitions
// ============================================================================

pub fn blog_definition() -> TableDefinition {
    TableDefinition::new("Blog", "blogs")
        .column(
            ColumnDefinition::new("blog_id", "integer")
                .primary_key()
                .auto_number(),
        )
        .column(ColumnDefinition::new("url", "text"))
        .index(IndexDefinition::unique(["url"]))
        .children("posts")
}

pub fn post_definition() -> TableDefinition {
    TableDefinition::new("Post", "posts")
        .column(
            ColumnDefinition::new("post_id", "integer")
                .primary_key()
                .auto_number(),
        )
        .column(ColumnDefinition::new("title", "text"))
        .parent(ParentRelationDefinition::new(
            "blog",
            "Blog",
            RelationColumn::new("blog_id", "integer", "blog_id"),
        ))
        .children("comments")
}

pub fn comment_definition() -> TableDefinition {
    TableDefinition::new("Comment", "comments")
        .column(
            ColumnDefinition::new("comment_id", "integer")
                .primary_key()
                .auto_number(),
        )
        .column(ColumnDefinition::new("body", "text"))
        .parent(ParentRelationDefinition::new(
            "post",
            "Post",
            RelationColumn::new("post_id", "integer", "post_id"),
        ))
}

/// A map-backed type carrying every kind of generated column.
pub fn document_definition() -> TableDefinition {
    TableDefinition::new("Document", "documents")
        .column(
            ColumnDefinition::new("doc_id", "integer")
                .primary_key()
                .auto_number(),
        )
        .column(ColumnDefinition::new("title", "text"))
        .column(
            ColumnDefinition::new("created_at", "text").special(SpecialColumn::CreateTimestamp),
        )
        .column(
            ColumnDefinition::new("updated_at", "text").special(SpecialColumn::UpdateTimestamp),
        )
        .column(ColumnDefinition::new("version", "integer").special(SpecialColumn::VersionNumber))
}

/// A keyless table identified by its single unique index.
pub fn country_definition() -> TableDefinition {
    TableDefinition::new("Country", "countries")
        .column(ColumnDefinition::new("code", "text"))
        .column(ColumnDefinition::new("name", "text"))
        .index(IndexDefinition::unique(["code"]))
}

pub fn registry() -> Registry {
    Registry::builder()
        .register::<Blog>(blog_definition())
        .and_then(|b| b.register::<Post>(post_definition()))
        .and_then(|b| b.register::<Comment>(comment_definition()))
        .and_then(|b| b.register_dynamic(document_definition(), &[]))
        .and_then(|b| b.register_dynamic(country_definition(), &[]))
        .and_then(|b| b.build())
        .expect("build registry")
}

/// An in-memory database with every fixture table provisioned.
pub fn provisioned(registry: &Registry) -> SqliteConnection {
    init_tracing();
    let connection = SqliteConnection::open_memory().expect("open sqlite memory db");
    let session = Session::new(&connection, registry);
    for entity_type in ["Blog", "Post", "Comment", "Document", "Country"] {
        session
            .create_table_or_default(entity_type)
            .expect("create table");
    }
    connection
}

// ============================================================================
// Graph helpers
// ============================================================================

pub fn new_blog(url: &str) -> EntityRef {
    shared(Blog {
        url: url.to_string(),
        ..Blog::default()
    })
}

pub fn new_post(title: &str) -> EntityRef {
    shared(Post {
        title: title.to_string(),
        ..Post::default()
    })
}

pub fn new_comment(body: &str) -> EntityRef {
    shared(Comment {
        body: body.to_string(),
        ..Comment::default()
    })
}

pub fn add_child(parent: &EntityRef, collection: &str, child: EntityRef) {
    parent
        .borrow_mut()
        .children_mut(collection)
        .expect("child collection")
        .push(child);
}

pub fn children(entity: &EntityRef, collection: &str) -> Vec<EntityRef> {
    entity
        .borrow()
        .children(collection)
        .expect("child collection")
        .items()
        .to_vec()
}

pub fn field(entity: &EntityRef, name: &str) -> Value {
    entity.borrow().get(name).expect("known field")
}

pub fn count_rows(connection: &SqliteConnection, table: &str) -> i64 {
    connection
        .inner()
        .query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| {
            row.get(0)
        })
        .expect("count rows")
}

// ============================================================================
// Recording connection
// ============================================================================

/// Forwards to SQLite and keeps the text of every statement it ran.
pub struct RecordingConnection<'a> {
    pub inner: &'a SqliteConnection,
    pub log: RefCell<Vec<String>>,
}

impl<'a> RecordingConnection<'a> {
    pub fn new(inner: &'a SqliteConnection) -> Self {
        Self {
            inner,
            log: RefCell::new(Vec::new()),
        }
    }

    pub fn statements(&self) -> Vec<String> {
        self.log.borrow().clone()
    }
}

impl Connection for RecordingConnection<'_> {
    fn execute(&self, statement: &Statement, timeout: Option<Duration>) -> Result<u64> {
        self.log.borrow_mut().push(statement.sql().to_string());
        self.inner.execute(statement, timeout)
    }

    fn query_scalar(&self, statement: &Statement, timeout: Option<Duration>) -> Result<Option<Value>> {
        self.log.borrow_mut().push(statement.sql().to_string());
        self.inner.query_scalar(statement, timeout)
    }

    fn query<'c>(
        &'c self,
        statement: &Statement,
        timeout: Option<Duration>,
    ) -> Result<Box<dyn RowCursor + 'c>> {
        self.log.borrow_mut().push(statement.sql().to_string());
        self.inner.query(statement, timeout)
    }
}
