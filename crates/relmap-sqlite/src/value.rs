//! Conversions between relmap values and SQLite storage classes.
//!
//! SQLite has no boolean, timestamp or JSON type. Booleans bind as integers,
//! timestamps as RFC 3339 text and JSON as its serialized text; typed entity
//! fields decode them back through [`relmap_core::FromValue`].

use relmap_core::{Error, Result, Value};
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};

/// A relmap value bound as a SQLite parameter.
#[derive(Debug)]
pub(crate) struct Param<'a>(pub(crate) &'a Value);

impl ToSql for Param<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self.0 {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Bool(v) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*v))),
            Value::BigInt(v) => ToSqlOutput::Owned(SqlValue::Integer(*v)),
            Value::Double(v) => ToSqlOutput::Owned(SqlValue::Real(*v)),
            Value::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            Value::Bytes(v) => ToSqlOutput::Borrowed(ValueRef::Blob(&v[..])),
            Value::Timestamp(v) => ToSqlOutput::Owned(SqlValue::Text(v.to_rfc3339())),
            Value::Json(v) => ToSqlOutput::Owned(SqlValue::Text(v.to_string())),
        })
    }
}

/// Convert a column value read from a SQLite row.
pub(crate) fn from_sql(value: ValueRef<'_>) -> Result<Value> {
    Ok(match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::BigInt(v),
        ValueRef::Real(v) => Value::Double(v),
        ValueRef::Text(bytes) => Value::Text(
            std::str::from_utf8(bytes)
                .map_err(|e| Error::database(format!("invalid UTF-8 in text column: {e}")))?
                .to_string(),
        ),
        ValueRef::Blob(bytes) => Value::Bytes(bytes.to_vec()),
    })
}
