/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! YAML backend. Round-trips `Bool`, `Int`, `Float`, `Str`, `Null`, `List`,
//! `Map` faithfully; `Bytes` is written as base64 text, `Timestamp` as a
//! plain integer (seconds), matching the JSON backend's choices so demo
//! stores behave the same under either format.

use std::fs;
use std::path::Path;

use log::debug;

use crate::backend::Backend;
use crate::error::BackendError;
use crate::value::{Scalar, Value};

pub struct YamlBackend;

impl YamlBackend {
    pub fn new() -> YamlBackend {
        YamlBackend
    }
}

impl Default for YamlBackend {
    fn default() -> Self {
        YamlBackend::new()
    }
}

impl Backend for YamlBackend {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn load(&self, path: &Path) -> Result<Value, BackendError> {
        if !path.exists() {
            debug!("yaml backend: '{}' missing, returning Null", path.display());
            return Ok(Value::Null);
        }
        let contents = fs::read_to_string(path).map_err(|source| BackendError::Io {
            path: path.to_owned(),
            source,
        })?;
        if contents.trim().is_empty() {
            return Ok(Value::Null);
        }
        let parsed: serde_yaml::Value =
            serde_yaml::from_str(&contents).map_err(|e| BackendError::Parse {
                path: path.to_owned(),
                format: "yaml",
                message: e.to_string(),
            })?;
        Ok(from_yaml(parsed))
    }

    fn save(&self, path: &Path, value: &Value) -> Result<(), BackendError> {
        let yaml = to_yaml(value);
        let rendered = serde_yaml::to_string(&yaml).map_err(|e| BackendError::Encode {
            format: "yaml",
            message: e.to_string(),
        })?;
        fs::write(path, rendered).map_err(|source| BackendError::Io {
            path: path.to_owned(),
            source,
        })
    }
}

fn from_yaml(v: serde_yaml::Value) -> Value {
    match v {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Scalar(Scalar::Bool(b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Scalar(Scalar::Int(i))
            } else {
                Value::Scalar(Scalar::Float(n.as_f64().unwrap_or(0.0)))
            }
        }
        serde_yaml::Value::String(s) => Value::Scalar(Scalar::Str(s)),
        serde_yaml::Value::Sequence(items) => Value::List(items.into_iter().map(from_yaml).collect()),
        serde_yaml::Value::Mapping(map) => Value::Map(
            map.into_iter()
                .filter_map(|(k, v)| k.as_str().map(|k| (k.to_owned(), from_yaml(v))))
                .collect(),
        ),
        serde_yaml::Value::Tagged(tagged) => from_yaml(tagged.value),
    }
}

fn to_yaml(v: &Value) -> serde_yaml::Value {
    match v {
        Value::Null => serde_yaml::Value::Null,
        Value::Scalar(Scalar::Bool(b)) => serde_yaml::Value::Bool(*b),
        Value::Scalar(Scalar::Int(i)) => serde_yaml::Value::Number((*i).into()),
        Value::Scalar(Scalar::Float(f)) => serde_yaml::Value::Number((*f).into()),
        Value::Scalar(Scalar::Str(s)) => serde_yaml::Value::String(s.clone()),
        Value::Scalar(Scalar::Opaque(s)) => serde_yaml::Value::String(s.clone()),
        Value::Scalar(Scalar::Bytes(b)) => {
            use base64::Engine;
            serde_yaml::Value::String(base64::engine::general_purpose::STANDARD.encode(b))
        }
        Value::Scalar(Scalar::Timestamp(secs)) => serde_yaml::Value::Number((*secs).into()),
        Value::List(items) => serde_yaml::Value::Sequence(items.iter().map(to_yaml).collect()),
        Value::Map(entries) => {
            let mut map = serde_yaml::Mapping::new();
            for (k, v) in entries {
                map.insert(serde_yaml::Value::String(k.clone()), to_yaml(v));
            }
            serde_yaml::Value::Mapping(map)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_basic_tree() {
        let tree = Value::Map(vec![
            ("name".into(), Value::str("alice")),
            ("active".into(), Value::bool(true)),
            ("scores".into(), Value::List(vec![Value::int(1), Value::int(2)])),
        ]);
        let yaml = to_yaml(&tree);
        assert_eq!(from_yaml(yaml), tree);
    }
}
