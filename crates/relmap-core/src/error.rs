//! Error types shared by every relmap crate.

use crate::value::Value;

/// Result alias used across relmap.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised by definition lookup, statement generation, materialization
/// and the driver boundary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A definition lacks something the requested operation needs.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A key-scoped fetch returned no rows.
    #[error("no records found for {entity} ({})", format_conditions(.conditions))]
    NotFound {
        entity: String,
        conditions: Vec<(String, Value)>,
    },

    /// A version-guarded UPDATE affected zero rows.
    #[error("concurrency conflict on {entity} ({}): row was changed or removed", format_conditions(.conditions))]
    ConcurrencyConflict {
        entity: String,
        conditions: Vec<(String, Value)>,
    },

    /// A declared child/parent field does not have the expected collection shape.
    #[error("relation shape error on {entity}.{field}: {reason}")]
    RelationShape {
        entity: String,
        field: String,
        reason: String,
    },

    /// A single-row fetch resolved more than one distinct instance.
    #[error("expected one {entity}, found {count}")]
    Ambiguous { entity: String, count: usize },

    /// An entity rejected a field read or write.
    #[error("field access error on {entity}.{field}: {reason}")]
    FieldAccess {
        entity: String,
        field: String,
        reason: String,
    },

    /// A statement failed inside the driver.
    #[error("database error: {message}{}", .sql.as_deref().map(|s| format!(" [sql: {s}]")).unwrap_or_default())]
    Database {
        message: String,
        sql: Option<String>,
    },
}

impl Error {
    /// Build a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }

    /// Build a driver error without statement context.
    pub fn database(message: impl Into<String>) -> Self {
        Error::Database {
            message: message.into(),
            sql: None,
        }
    }

    /// Attach the failing SQL to a driver error that does not carry one yet.
    #[must_use]
    pub fn with_sql(self, statement_sql: &str) -> Self {
        match self {
            Error::Database { message, sql: None } => Error::Database {
                message,
                sql: Some(statement_sql.to_string()),
            },
            other => other,
        }
    }

    /// The SQL text of the failing statement, if this is a driver error.
    #[must_use]
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Database { sql, .. } => sql.as_deref(),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    #[must_use]
    pub const fn is_concurrency_conflict(&self) -> bool {
        matches!(self, Error::ConcurrencyConflict { .. })
    }

    /// Only concurrency conflicts are worth retrying after a reload.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.is_concurrency_conflict()
    }
}

fn format_conditions(conditions: &[(String, Value)]) -> String {
    conditions
        .iter()
        .map(|(field, value)| format!("{field}={value}"))
        .collect::<Vec<_>>()
        .join(", ")
}
