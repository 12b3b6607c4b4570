//! Required-key checks on raw JSON request bodies.

use serde_json::{Map, Value};

use crate::error::GatewayError;

pub const YIELD_FIELDS: &[&str] = &["soil_data", "weather_data", "crop_type"];
pub const RECOMMEND_FIELDS: &[&str] = &["soil_data", "location_data"];
pub const PEST_FIELDS: &[&str] = &["image_data"];
pub const SOIL_FIELDS: &[&str] = &["nitrogen", "phosphorus", "potassium", "ph"];
pub const WEATHER_FIELDS: &[&str] = &["temperature", "rainfall"];

/// Shortest `image_data` string accepted as an encoded image.
pub const MIN_IMAGE_DATA_LEN: usize = 100;

/// Keys of `required` that are absent or `null` in `data`, in order.
///
/// A non-object value is missing every key.
pub fn missing_fields<'a>(data: &Value, required: &[&'a str]) -> Vec<&'a str> {
    match data {
        Value::Object(map) => missing_keys(map, required),
        _ => required.to_vec(),
    }
}

fn missing_keys<'a>(map: &Map<String, Value>, required: &[&'a str]) -> Vec<&'a str> {
    required
        .iter()
        .copied()
        .filter(|field| map.get(*field).map_or(true, Value::is_null))
        .collect()
}

fn missing_message(missing: &[&str]) -> String {
    format!("Missing required fields: {}", missing.join(", "))
}

pub fn validate_required_fields(data: &Value, required: &[&str]) -> Result<(), String> {
    let missing = missing_fields(data, required);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(missing_message(&missing))
    }
}

/// Validates the sub-mapping stored under `key`, prefixing failures with `label`.
pub fn validate_nested(
    data: &Map<String, Value>,
    key: &str,
    required: &[&str],
    label: &str,
) -> Result<(), GatewayError> {
    let checked = match data.get(key) {
        Some(nested) => validate_required_fields(nested, required),
        None => Err(missing_message(required)),
    };
    checked.map_err(|e| GatewayError::InvalidInput(format!("{} - {}", label, e)))
}

/// Top-level body check: must be a non-empty object holding `required`.
pub fn require_body(body: Value, required: &[&str]) -> Result<Map<String, Value>, GatewayError> {
    let data = match body {
        Value::Object(map) if !map.is_empty() => map,
        _ => return Err(GatewayError::InvalidInput("No JSON data provided".to_string())),
    };

    let missing = missing_keys(&data, required);
    if !missing.is_empty() {
        return Err(GatewayError::InvalidInput(missing_message(&missing)));
    }

    Ok(data)
}

pub fn validate_image_data(data: &Map<String, Value>) -> Result<(), GatewayError> {
    match data.get("image_data").and_then(Value::as_str) {
        Some(image) if image.chars().count() >= MIN_IMAGE_DATA_LEN => Ok(()),
        _ => Err(GatewayError::InvalidInput(
            "Invalid or empty image_data".to_string(),
        )),
    }
}
