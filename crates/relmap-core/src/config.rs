//! Mapper configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// SQL dialect. Only comment DDL differs between dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Sqlite,
    Postgres,
}

impl Dialect {
    /// Whether `COMMENT ON TABLE/COLUMN` is supported.
    #[must_use]
    pub const fn supports_comments(&self) -> bool {
        matches!(self, Dialect::Postgres)
    }
}

/// Settings shared by every statement a session issues.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Forwarded to the driver with every statement.
    pub timeout: Option<Duration>,
    /// Render bound parameters in statement logs.
    pub log_parameters: bool,
    pub dialect: Dialect,
}

impl MapperConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_log_parameters(mut self, enabled: bool) -> Self {
        self.log_parameters = enabled;
        self
    }

    #[must_use]
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }
}
