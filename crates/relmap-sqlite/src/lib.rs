//! SQLite driver for relmap, built on `rusqlite`.
//!
//! [`SqliteConnection`] implements [`relmap_core::Connection`]: statements are
//! prepared through the connection's statement cache, `:name` parameters bind
//! by name, and query results are read into memory before the cursor is
//! returned.
//!
//! ```ignore
//! let connection = SqliteConnection::open_memory()?;
//! let session = Session::new(&connection, &registry);
//! session.create_table_or_default("Blog")?;
//! ```

mod value;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use relmap_core::{BufferedCursor, Connection, Error, Result, Row, RowCursor, Statement, Value};
use rusqlite::types::ToSql;

use crate::value::{Param, from_sql};

fn driver_error(err: rusqlite::Error) -> Error {
    Error::database(err.to_string())
}

/// A relmap connection over one `rusqlite` connection.
#[derive(Debug)]
pub struct SqliteConnection {
    inner: rusqlite::Connection,
}

impl SqliteConnection {
    /// Open a private in-memory database.
    pub fn open_memory() -> Result<Self> {
        rusqlite::Connection::open_in_memory()
            .map(Self::from_connection)
            .map_err(driver_error)
    }

    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "Opening SQLite database");
        rusqlite::Connection::open(path)
            .map(Self::from_connection)
            .map_err(driver_error)
    }

    /// Wrap an already configured `rusqlite` connection.
    pub fn from_connection(inner: rusqlite::Connection) -> Self {
        Self { inner }
    }

    /// The underlying connection, for transactions and pragmas.
    pub fn inner(&self) -> &rusqlite::Connection {
        &self.inner
    }

    pub fn into_inner(self) -> rusqlite::Connection {
        self.inner
    }

    fn apply_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        if let Some(timeout) = timeout {
            self.inner.busy_timeout(timeout).map_err(driver_error)?;
        }
        Ok(())
    }

    fn prepare(&self, statement: &Statement) -> Result<rusqlite::CachedStatement<'_>> {
        tracing::trace!(sql = %statement.sql(), "Preparing SQLite statement");
        self.inner.prepare_cached(statement.sql()).map_err(driver_error)
    }
}

/// Named parameters in the shape `rusqlite` binds.
fn bind_params(statement: &Statement) -> Vec<(&str, Param<'_>)> {
    statement
        .params()
        .iter()
        .map(|(name, value)| (name.as_str(), Param(value)))
        .collect()
}

fn as_named<'p>(params: &'p [(&'p str, Param<'p>)]) -> Vec<(&'p str, &'p dyn ToSql)> {
    params
        .iter()
        .map(|(name, value)| (*name, value as &dyn ToSql))
        .collect()
}

impl Connection for SqliteConnection {
    fn execute(&self, statement: &Statement, timeout: Option<Duration>) -> Result<u64> {
        self.apply_timeout(timeout)?;
        let mut prepared = self.prepare(statement)?;
        let params = bind_params(statement);
        let count = prepared
            .execute(as_named(&params).as_slice())
            .map_err(driver_error)?;
        Ok(count as u64)
    }

    fn query_scalar(
        &self,
        statement: &Statement,
        timeout: Option<Duration>,
    ) -> Result<Option<Value>> {
        self.apply_timeout(timeout)?;
        let mut prepared = self.prepare(statement)?;
        let params = bind_params(statement);
        let mut rows = prepared
            .query(as_named(&params).as_slice())
            .map_err(driver_error)?;
        match rows.next().map_err(driver_error)? {
            Some(row) => from_sql(row.get_ref(0).map_err(driver_error)?).map(Some),
            None => Ok(None),
        }
    }

    fn query<'a>(
        &'a self,
        statement: &Statement,
        timeout: Option<Duration>,
    ) -> Result<Box<dyn RowCursor + 'a>> {
        self.apply_timeout(timeout)?;
        let mut prepared = self.prepare(statement)?;
        let columns: Arc<[String]> = prepared
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let params = bind_params(statement);
        let mut rows = prepared
            .query(as_named(&params).as_slice())
            .map_err(driver_error)?;

        let mut buffered = Vec::new();
        while let Some(row) = rows.next().map_err(driver_error)? {
            let values = (0..columns.len())
                .map(|i| from_sql(row.get_ref(i).map_err(driver_error)?))
                .collect::<Result<Vec<_>>>()?;
            buffered.push(Row::new(Arc::clone(&columns), values));
        }
        tracing::debug!(rows = buffered.len(), "SQLite query buffered");
        Ok(Box::new(BufferedCursor::new(buffered)))
    }
}
