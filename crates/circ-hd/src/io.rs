//! Loading circuit documents and writing canonical JSON.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use circ_core::{CircuitError, ErrorInfo};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

fn serde_error(code: &str, err: impl ToString) -> CircuitError {
    CircuitError::Serde(ErrorInfo::new(code, err.to_string()))
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let ordered = map
                .into_iter()
                .map(|(key, value)| (key, sort_keys(value)))
                .collect::<BTreeMap<_, _>>();
            Value::Object(Map::from_iter(ordered))
        }
        Value::Array(values) => Value::Array(values.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Serializes a value into JSON bytes with sorted object keys.
pub fn to_canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, CircuitError> {
    let value = serde_json::to_value(value).map_err(|err| serde_error("json-serialize", err))?;
    let mut bytes = Vec::new();
    serde_json::to_writer_pretty(&mut bytes, &sort_keys(value))
        .map_err(|err| serde_error("json-write", err))?;
    Ok(bytes)
}

/// Reads a YAML or JSON document; `.json` files are parsed as JSON, any
/// other extension as YAML.
pub fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T, CircuitError> {
    let bytes = fs::read(path).map_err(|err| {
        serde_error("read", err).with_context("path", path.display().to_string())
    })?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let parsed = if is_json {
        serde_json::from_slice(&bytes).map_err(|err| serde_error("json-deserialize", err))
    } else {
        serde_yaml::from_slice(&bytes).map_err(|err| serde_error("yaml-deserialize", err))
    };
    parsed.map_err(|err| err.with_context("path", path.display().to_string()))
}
