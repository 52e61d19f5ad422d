//! JSON Schema of the configuration file.

use crate::config::SysbarsConfig;

/// Generates a JSON Schema for the sysbars configuration.
#[must_use]
pub fn generate_schema() -> schemars::Schema {
    let mut schema = schemars::schema_for!(SysbarsConfig);

    // Add $id for proper schema identification
    if let Some(obj) = schema.as_object_mut() {
        obj.insert(
            "$id".to_string(),
            serde_json::json!("https://raw.githubusercontent.com/sysbars/sysbars/main/sysbars.schema.json"),
        );
    }

    schema
}

/// Pretty-printed JSON Schema for the sysbars configuration.
#[must_use]
pub fn print_schema() -> String {
    serde_json::to_string_pretty(&generate_schema()).unwrap_or_default()
}
