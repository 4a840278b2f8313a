//! JSON Schema for the surface-portal configuration file.

use crate::config::PortalConfig;

/// Location the published schema is served from.
pub const SCHEMA_ID: &str =
    "https://raw.githubusercontent.com/surface-portal/surface-portal/main/surface-portal.schema.json";

/// Generates a JSON Schema for [`PortalConfig`].
///
/// The schema includes every option with its type, description and default.
#[must_use]
pub fn generate_schema() -> schemars::Schema {
    let mut schema = schemars::schema_for!(PortalConfig);

    if let Some(obj) = schema.as_object_mut() {
        obj.insert("$id".to_string(), serde_json::json!(SCHEMA_ID));
    }

    schema
}

/// Generates the schema as a pretty-printed JSON string.
#[must_use]
pub fn generate_schema_json() -> String {
    let schema = generate_schema();
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}
