//! Utility functions for value normalization and conversion

use std::collections::HashMap;

use nimbus_core::resource::Value;
use serde_json::{Value as JsonValue, json};

/// Normalize a location (e.g., "West Europe" -> "westeurope")
pub fn normalize_location(s: &str) -> String {
    s.replace(' ', "").to_lowercase()
}

/// Normalizer for `location` attributes
pub fn location_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::string(normalize_location(s)),
        other => other.clone(),
    }
}

/// Build the API `tags` object from the `tags` attribute
pub fn expand_tags(tags: Option<&Value>) -> JsonValue {
    let mut out = serde_json::Map::new();
    if let Some(Value::Map(tags)) = tags {
        for (key, value) in tags {
            if let Value::String(v) = value {
                out.insert(key.clone(), json!(v));
            }
        }
    }
    JsonValue::Object(out)
}

/// Parse the API `tags` object into the `tags` attribute
pub fn flatten_tags(tags: Option<&JsonValue>) -> Value {
    let mut out = HashMap::new();
    if let Some(JsonValue::Object(tags)) = tags {
        for (key, value) in tags {
            if let Some(v) = value.as_str() {
                out.insert(key.clone(), Value::string(v));
            }
        }
    }
    Value::Map(out)
}

/// Random lowercase name usable as a cluster domain
pub fn generate_random_domain_name() -> String {
    let simple = uuid::Uuid::new_v4().simple().to_string();
    // Must start with a letter
    format!("a{}", &simple[..7])
}

/// String attribute of a block, empty when unset
pub fn block_str<'a>(block: &'a HashMap<String, Value>, key: &str) -> &'a str {
    block.get(key).and_then(Value::as_str).unwrap_or_default()
}

pub fn block_bool(block: &HashMap<String, Value>, key: &str) -> bool {
    block.get(key).and_then(Value::as_bool).unwrap_or(false)
}

pub fn block_int(block: &HashMap<String, Value>, key: &str) -> Option<i64> {
    block.get(key).and_then(Value::as_int)
}

/// String field of an API object, empty when absent or null
pub fn json_str(value: &JsonValue, key: &str) -> String {
    value
        .get(key)
        .and_then(JsonValue::as_str)
        .unwrap_or_default()
        .to_string()
}

/// List of strings in an attribute
pub fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_list)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Attribute list from a JSON array of strings
pub fn flatten_string_list(value: Option<&JsonValue>) -> Value {
    Value::List(
        value
            .and_then(JsonValue::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(Value::string))
                    .collect()
            })
            .unwrap_or_default(),
    )
}
