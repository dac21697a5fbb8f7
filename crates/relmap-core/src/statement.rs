//! Parameterized SQL statements.

use crate::value::Value;

/// Prefix of every named placeholder generated by relmap.
///
/// A field identifier `url` is bound as `:url`.
pub const PLACEHOLDER_PREFIX: &str = ":";

/// Placeholder name for a field identifier.
#[must_use]
pub fn placeholder(identifier: &str) -> String {
    format!("{PLACEHOLDER_PREFIX}{identifier}")
}

/// SQL text plus named parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statement {
    sql: String,
    params: Vec<(String, Value)>,
}

impl Statement {
    /// A statement with no parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// A statement with the given parameters. Names include the prefix.
    pub fn with_params(sql: impl Into<String>, params: Vec<(String, Value)>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Bind a value under `name` (prefix included). A second bind of the same
    /// name replaces the first.
    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if let Some(slot) = self.params.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.params.push((name, value));
        }
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn params(&self) -> &[(String, Value)] {
        &self.params
    }

    /// Look up a bound parameter by its full placeholder name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Render bound parameters as a SQL comment block for logs.
    #[must_use]
    pub fn render_params(&self) -> String {
        if self.params.is_empty() {
            return String::new();
        }
        let mut out = String::from("/*\n");
        for (name, value) in &self.params {
            if value.is_null() {
                out.push_str(&format!("  {name} is NULL\n"));
            } else {
                out.push_str(&format!("  {name} = {}\n", value.to_log_literal()));
            }
        }
        out.push_str("*/");
        out
    }
}
