/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! TOML backend. TOML has no native null. `Value::Null` map entries are
//! dropped on save rather than written out; a key absent from the saved
//! document loads back as absent, which is observably identical to `Null`
//! from the core's point of view. `Value::Null` *list* entries cannot be
//! dropped the same way without shifting every later index, so they are
//! instead written out as an empty table, preserving position and length
//! across a save/reload round trip (it reloads as an empty `Map`, not
//! `Null`, but array indices stay stable). `Bytes` is written as base64 text.

use std::fs;
use std::path::Path;

use log::debug;

use crate::backend::Backend;
use crate::error::BackendError;
use crate::value::{Scalar, Value};

pub struct TomlBackend;

impl TomlBackend {
    pub fn new() -> TomlBackend {
        TomlBackend
    }
}

impl Default for TomlBackend {
    fn default() -> Self {
        TomlBackend::new()
    }
}

impl Backend for TomlBackend {
    fn name(&self) -> &'static str {
        "toml"
    }

    fn load(&self, path: &Path) -> Result<Value, BackendError> {
        if !path.exists() {
            debug!("toml backend: '{}' missing, returning Null", path.display());
            return Ok(Value::Null);
        }
        let contents = fs::read_to_string(path).map_err(|source| BackendError::Io {
            path: path.to_owned(),
            source,
        })?;
        let parsed: toml::Value = toml::from_str(&contents).map_err(|e| BackendError::Parse {
            path: path.to_owned(),
            format: "toml",
            message: e.to_string(),
        })?;
        Ok(from_toml(parsed))
    }

    fn save(&self, path: &Path, value: &Value) -> Result<(), BackendError> {
        let toml_value = to_toml(value);
        let rendered = toml::to_string_pretty(&toml_value).map_err(|e| BackendError::Encode {
            format: "toml",
            message: e.to_string(),
        })?;
        fs::write(path, rendered).map_err(|source| BackendError::Io {
            path: path.to_owned(),
            source,
        })
    }
}

fn from_toml(v: toml::Value) -> Value {
    match v {
        toml::Value::String(s) => Value::Scalar(Scalar::Str(s)),
        toml::Value::Integer(i) => Value::Scalar(Scalar::Int(i)),
        toml::Value::Float(f) => Value::Scalar(Scalar::Float(f)),
        toml::Value::Boolean(b) => Value::Scalar(Scalar::Bool(b)),
        toml::Value::Datetime(dt) => Value::Scalar(Scalar::Opaque(dt.to_string())),
        toml::Value::Array(items) => Value::List(items.into_iter().map(from_toml).collect()),
        toml::Value::Table(table) => {
            Value::Map(table.into_iter().map(|(k, v)| (k, from_toml(v))).collect())
        }
    }
}

/// Drops `Null` map entries (TOML cannot represent them, and a key can
/// simply be absent); `Null` list entries are kept as empty tables instead,
/// since dropping them would shift every later index.
fn to_toml(v: &Value) -> toml::Value {
    match v {
        Value::Scalar(Scalar::Bool(b)) => toml::Value::Boolean(*b),
        Value::Scalar(Scalar::Int(i)) => toml::Value::Integer(*i),
        Value::Scalar(Scalar::Float(f)) => toml::Value::Float(*f),
        Value::Scalar(Scalar::Str(s)) => toml::Value::String(s.clone()),
        Value::Scalar(Scalar::Opaque(s)) => toml::Value::String(s.clone()),
        Value::Scalar(Scalar::Bytes(b)) => {
            use base64::Engine;
            toml::Value::String(base64::engine::general_purpose::STANDARD.encode(b))
        }
        Value::Scalar(Scalar::Timestamp(secs)) => toml::Value::Integer(*secs),
        Value::List(items) => toml::Value::Array(items.iter().map(to_toml).collect()),
        Value::Map(entries) => {
            let mut table = toml::map::Map::new();
            for (k, v) in entries {
                if *v == Value::Null {
                    continue;
                }
                table.insert(k.clone(), to_toml(v));
            }
            toml::Value::Table(table)
        }
        Value::Null => toml::Value::Table(toml::map::Map::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_map_entries_are_dropped_on_save() {
        let tree = Value::Map(vec![
            ("present".into(), Value::int(1)),
            ("absent".into(), Value::Null),
        ]);
        let rendered = to_toml(&tree);
        match rendered {
            toml::Value::Table(t) => {
                assert!(t.contains_key("present"));
                assert!(!t.contains_key("absent"));
            }
            _ => panic!("expected table"),
        }
    }

    #[test]
    fn null_list_entries_keep_their_position() {
        let tree = Value::List(vec![Value::int(1), Value::Null, Value::int(3)]);
        let rendered = to_toml(&tree);
        match rendered {
            toml::Value::Array(items) => {
                assert_eq!(items.len(), 3);
                assert_eq!(items[0], toml::Value::Integer(1));
                assert_eq!(items[1], toml::Value::Table(toml::map::Map::new()));
                assert_eq!(items[2], toml::Value::Integer(3));
            }
            _ => panic!("expected array"),
        }
    }
}
