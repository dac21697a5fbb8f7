//! The driver boundary.
//!
//! relmap never speaks a wire protocol. A driver only has to execute
//! parameterized text, return a scalar, and hand back a forward-only cursor
//! of rows keyed by column alias.

use std::time::Duration;

use crate::error::Result;
use crate::row::Row;
use crate::statement::Statement;
use crate::value::Value;

/// A database connection capable of running relmap statements.
///
/// Transactions are the caller's business: statements run in whatever
/// transaction is active on the connection.
pub trait Connection {
    /// Execute a statement and return the number of affected rows.
    fn execute(&self, statement: &Statement, timeout: Option<Duration>) -> Result<u64>;

    /// Execute a statement and return the first column of the first row.
    fn query_scalar(&self, statement: &Statement, timeout: Option<Duration>)
    -> Result<Option<Value>>;

    /// Execute a query and return a forward-only cursor over its rows.
    fn query<'a>(
        &'a self,
        statement: &Statement,
        timeout: Option<Duration>,
    ) -> Result<Box<dyn RowCursor + 'a>>;
}

impl<C: Connection + ?Sized> Connection for &C {
    fn execute(&self, statement: &Statement, timeout: Option<Duration>) -> Result<u64> {
        (**self).execute(statement, timeout)
    }

    fn query_scalar(
        &self,
        statement: &Statement,
        timeout: Option<Duration>,
    ) -> Result<Option<Value>> {
        (**self).query_scalar(statement, timeout)
    }

    fn query<'a>(
        &'a self,
        statement: &Statement,
        timeout: Option<Duration>,
    ) -> Result<Box<dyn RowCursor + 'a>> {
        (**self).query(statement, timeout)
    }
}

/// Forward-only row cursor.
pub trait RowCursor {
    /// Advance to the next row; `None` once the result set is drained.
    fn next_row(&mut self) -> Result<Option<Row>>;
}

/// A cursor over rows already fetched into memory.
#[derive(Debug, Default)]
pub struct BufferedCursor {
    rows: std::vec::IntoIter<Row>,
}

impl BufferedCursor {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: rows.into_iter(),
        }
    }
}

impl RowCursor for BufferedCursor {
    fn next_row(&mut self) -> Result<Option<Row>> {
        Ok(self.rows.next())
    }
}
