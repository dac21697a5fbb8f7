//! Statement execution with logging and timeout forwarding.

use relmap_core::{Connection, MapperConfig, Result, RowCursor, Statement, Value};

/// Hands statements to the driver on behalf of a named caller.
///
/// Every statement is logged at `info` with the caller name and SQL text,
/// plus the rendered parameters when [`MapperConfig::log_parameters`] is on.
/// Driver failures get the statement's SQL attached.
#[derive(Debug)]
pub struct QueryExecutor<'a, C: Connection + ?Sized> {
    connection: &'a C,
    config: &'a MapperConfig,
}

impl<'a, C: Connection + ?Sized> QueryExecutor<'a, C> {
    pub fn new(connection: &'a C, config: &'a MapperConfig) -> Self {
        Self { connection, config }
    }

    fn log_statement(&self, statement: &Statement, caller: &str) {
        if self.config.log_parameters && !statement.params().is_empty() {
            tracing::info!(
                caller,
                sql = %statement.sql(),
                params = %statement.render_params(),
                "Executing statement"
            );
        } else {
            tracing::info!(caller, sql = %statement.sql(), "Executing statement");
        }
    }

    /// Execute and return the affected row count.
    pub fn execute(&self, statement: &Statement, caller: &str) -> Result<u64> {
        self.log_statement(statement, caller);
        let count = self
            .connection
            .execute(statement, self.config.timeout)
            .map_err(|e| e.with_sql(statement.sql()))?;
        tracing::info!(caller, rows = count, "Statement completed");
        Ok(count)
    }

    /// Execute and return the first column of the first row.
    pub fn query_scalar(&self, statement: &Statement, caller: &str) -> Result<Option<Value>> {
        self.log_statement(statement, caller);
        let value = self
            .connection
            .query_scalar(statement, self.config.timeout)
            .map_err(|e| e.with_sql(statement.sql()))?;
        match &value {
            Some(v) if !v.is_null() => tracing::info!(caller, value = %v, "Scalar returned"),
            _ => tracing::info!(caller, "Scalar returned NULL"),
        }
        Ok(value)
    }

    /// Execute and open a cursor over the result rows.
    pub fn query(&self, statement: &Statement, caller: &str) -> Result<Box<dyn RowCursor + 'a>> {
        self.log_statement(statement, caller);
        let cursor = self
            .connection
            .query(statement, self.config.timeout)
            .map_err(|e| e.with_sql(statement.sql()))?;
        tracing::debug!(caller, "Cursor opened");
        Ok(cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use relmap_core::{BufferedCursor, Error};
    use std::time::Duration;

    struct FailingConnection;

    impl Connection for FailingConnection {
        fn execute(&self, _: &Statement, timeout: Option<Duration>) -> Result<u64> {
            assert_eq!(timeout, Some(Duration::from_secs(3)));
            Err(Error::database("constraint failed"))
        }

        fn query_scalar(&self, _: &Statement, _: Option<Duration>) -> Result<Option<Value>> {
            Ok(Some(Value::BigInt(1)))
        }

        fn query<'a>(
            &'a self,
            _: &Statement,
            _: Option<Duration>,
        ) -> Result<Box<dyn RowCursor + 'a>> {
            Ok(Box::new(BufferedCursor::default()))
        }
    }

    #[test]
    fn test_execute_attaches_sql_and_forwards_timeout() {
        let config = MapperConfig::new().with_timeout(Duration::from_secs(3));
        let executor = QueryExecutor::new(&FailingConnection, &config);
        let err = executor
            .execute(&Statement::new("DELETE FROM \"blogs\""), "delete")
            .unwrap_err();
        assert_eq!(err.sql(), Some("DELETE FROM \"blogs\""));
    }

    #[test]
    fn test_scalar_and_query_pass_through() {
        let config = MapperConfig::new().with_log_parameters(true);
        let executor = QueryExecutor::new(&FailingConnection, &config);
        let mut stmt = Statement::new("INSERT INTO t (a) VALUES (:a) RETURNING id");
        stmt.bind(":a", Value::Null);
        assert_eq!(
            executor.query_scalar(&stmt, "insert").unwrap(),
            Some(Value::BigInt(1))
        );
        let mut cursor = executor.query(&Statement::new("SELECT 1"), "load").unwrap();
        assert!(cursor.next_row().unwrap().is_none());
    }
}
