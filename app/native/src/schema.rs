//! JSON Schema for the configuration file.
//!
//! Editors pick this up through a `$schema` key to offer completion and
//! validation for `config.jsonc`.

use schemars::schema_for;

use crate::config::EngineSettings;

/// Builds the schema for [`EngineSettings`] as a JSON value.
#[must_use]
pub fn generate_schema() -> serde_json::Value {
    let schema = schema_for!(EngineSettings);
    serde_json::to_value(&schema).unwrap_or_default()
}

/// Pretty-printed schema, ready to write to disk.
#[must_use]
pub fn print_schema() -> String {
    serde_json::to_string_pretty(&generate_schema()).unwrap_or_default()
}
