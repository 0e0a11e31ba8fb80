//! Configuration Store: `config.json`.
//!
//! [`load`] never fails. A missing or unparsable file is replaced with the
//! built-in defaults, which are written back so a valid file exists after
//! every load. A parsable file is normalized field by field: out-of-range
//! volume is clamped, a malformed hour mask is replaced wholesale, and any
//! other mistyped field falls back to its default.

use std::fs;
use std::io::ErrorKind;

use serde_json::{Map, Value};

use crate::atomic::write_json;
use crate::error::StoreError;
use crate::paths::Layout;
use crate::types::{ActiveHours, Config, Volume};

/// Built-in defaults for `layout`.
pub fn default_config(layout: &Layout) -> Config {
    Config::with_bell(layout.default_bell_path())
}

/// Load and normalize the configuration, self-healing the file on disk.
pub fn load(layout: &Layout) -> Config {
    let path = layout.config_path();
    let parsed = match fs::read_to_string(&path) {
        Ok(contents) => match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Object(fields)) => Some(fields),
            Ok(other) => {
                tracing::warn!(
                    path = %path.display(),
                    kind = json_kind(&other),
                    "config is not a JSON object"
                );
                None
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "config is not valid JSON");
                None
            }
        },
        Err(err) if err.kind() == ErrorKind::NotFound => None,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "failed to read config");
            None
        }
    };

    match parsed {
        Some(fields) => normalize(layout, &fields),
        None => {
            let config = default_config(layout);
            match save(layout, &config) {
                Ok(()) => tracing::info!(path = %path.display(), "wrote default config"),
                Err(err) => tracing::warn!(error = %err, "failed to write default config"),
            }
            config
        }
    }
}

/// Persist `config` atomically.
pub fn save(layout: &Layout, config: &Config) -> Result<(), StoreError> {
    write_json(&layout.config_path(), config)
}

fn normalize(layout: &Layout, fields: &Map<String, Value>) -> Config {
    let defaults = default_config(layout);

    let enabled = match fields.get("enabled") {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        _ => defaults.enabled,
    };

    let volume = fields
        .get("volume")
        .and_then(coerce_int)
        .map(Volume::clamped)
        .unwrap_or(defaults.volume);

    let active_hours = fields
        .get("active_hours")
        .and_then(|raw| serde_json::from_value::<ActiveHours>(raw.clone()).ok())
        .unwrap_or(defaults.active_hours);

    let bell_sound = match fields.get("bell_sound") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.into(),
        _ => defaults.bell_sound,
    };

    Config {
        enabled,
        volume,
        active_hours,
        bell_sound,
    }
}

/// Integer coercion: numbers truncate toward zero, booleans map to 0/1,
/// strings must hold an integer literal.
fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
