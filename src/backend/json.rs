/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! JSON backend. Round-trips `Bool`, `Int`, `Float`, `Str`, `List`, `Map`,
//! and `Null` faithfully. `Bytes` and `Timestamp` are not native JSON types
//! and are written as base64 / RFC 3339 strings respectively, then read back
//! as `Opaque` unless the caller already knows to expect them (JSON has no
//! tagging for them, per §9's "pin the scalar space per backend").

use std::fs;
use std::path::Path;

use log::debug;

use crate::backend::Backend;
use crate::error::BackendError;
use crate::value::{Scalar, Value};

pub struct JsonBackend;

impl JsonBackend {
    pub fn new() -> JsonBackend {
        JsonBackend
    }
}

impl Default for JsonBackend {
    fn default() -> Self {
        JsonBackend::new()
    }
}

impl Backend for JsonBackend {
    fn name(&self) -> &'static str {
        "json"
    }

    fn load(&self, path: &Path) -> Result<Value, BackendError> {
        if !path.exists() {
            debug!("json backend: '{}' missing, returning Null", path.display());
            return Ok(Value::Null);
        }
        let contents = fs::read_to_string(path).map_err(|source| BackendError::Io {
            path: path.to_owned(),
            source,
        })?;
        let parsed: serde_json::Value =
            serde_json::from_str(&contents).map_err(|e| BackendError::Parse {
                path: path.to_owned(),
                format: "json",
                message: e.to_string(),
            })?;
        Ok(from_json(parsed))
    }

    fn save(&self, path: &Path, value: &Value) -> Result<(), BackendError> {
        let json = to_json(value);
        let rendered = serde_json::to_string_pretty(&json).map_err(|e| BackendError::Encode {
            format: "json",
            message: e.to_string(),
        })?;
        fs::write(path, rendered).map_err(|source| BackendError::Io {
            path: path.to_owned(),
            source,
        })
    }
}

fn from_json(v: serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Scalar(Scalar::Bool(b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Scalar(Scalar::Int(i))
            } else {
                Value::Scalar(Scalar::Float(n.as_f64().unwrap_or(0.0)))
            }
        }
        serde_json::Value::String(s) => Value::Scalar(Scalar::Str(s)),
        serde_json::Value::Array(items) => Value::List(items.into_iter().map(from_json).collect()),
        serde_json::Value::Object(map) => {
            Value::Map(map.into_iter().map(|(k, v)| (k, from_json(v))).collect())
        }
    }
}

fn to_json(v: &Value) -> serde_json::Value {
    match v {
        Value::Null => serde_json::Value::Null,
        Value::Scalar(Scalar::Bool(b)) => serde_json::Value::Bool(*b),
        Value::Scalar(Scalar::Int(i)) => serde_json::Value::Number((*i).into()),
        Value::Scalar(Scalar::Float(f)) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Scalar(Scalar::Str(s)) => serde_json::Value::String(s.clone()),
        Value::Scalar(Scalar::Opaque(s)) => serde_json::Value::String(s.clone()),
        Value::Scalar(Scalar::Bytes(b)) => {
            use base64::Engine;
            serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(b))
        }
        Value::Scalar(Scalar::Timestamp(secs)) => serde_json::Value::Number((*secs).into()),
        Value::List(items) => serde_json::Value::Array(items.iter().map(to_json).collect()),
        Value::Map(entries) => serde_json::Value::Object(
            entries.iter().map(|(k, v)| (k.clone(), to_json(v))).collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_basic_tree() {
        let tree = Value::Map(vec![
            ("name".into(), Value::str("alice")),
            ("age".into(), Value::int(30)),
            ("tags".into(), Value::List(vec![Value::str("a"), Value::str("b")])),
        ]);
        let json = to_json(&tree);
        assert_eq!(from_json(json), tree);
    }
}
