//! CLI Commands

pub mod emit;
pub mod run;

use serde_json::Value;

/// Parses a payload argument: JSON when it parses, a plain string otherwise.
pub fn parse_payload(raw: Option<&str>) -> Value {
    match raw {
        None => Value::Null,
        Some(text) => serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())),
    }
}
