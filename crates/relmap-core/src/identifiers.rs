//! SQL identifier quoting and placeholder-name validation.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

static PLACEHOLDER_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("placeholder pattern is valid"));

/// Quote an identifier with double quotes, doubling embedded quotes.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote an optionally schema-qualified name (`schema.table`).
#[must_use]
pub fn quote_qualified(schema: Option<&str>, name: &str) -> String {
    match schema {
        Some(schema) if !schema.is_empty() => {
            format!("{}.{}", quote_ident(schema), quote_ident(name))
        }
        _ => quote_ident(name),
    }
}

/// Quote a string literal with single quotes.
#[must_use]
pub fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Check that a field identifier can be used as a named placeholder.
pub fn validate_placeholder_name(identifier: &str) -> Result<()> {
    if PLACEHOLDER_NAME.is_match(identifier) {
        Ok(())
    } else {
        Err(Error::configuration(format!(
            "identifier `{identifier}` cannot be used as a parameter name"
        )))
    }
}
