/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The tree value: the language-neutral interchange form passed across the
//! Backend boundary and produced/consumed by `Node::toTree`/`Node::fromTree`.
//!
//! The scalar space is whatever a given backend can round-trip (see §3 and
//! §9's "pin the scalar space per backend" note); `Opaque` is the escape
//! hatch for anything a backend parsed but cannot classify further while
//! still being able to write it back out unchanged.

/// One primitive value held by a `Value::Scalar`.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    /// Unix-epoch seconds.
    Timestamp(i64),
    /// Backend-preserved opaque value (e.g. a TOML datetime variant we don't
    /// otherwise model); round-tripped verbatim by the backend that produced it.
    Opaque(String),
}

/// A plain, unshared tree value: `Map | List | Scalar | Null`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Map(Vec<(String, Value)>),
    List(Vec<Value>),
    Scalar(Scalar),
    Null,
}

impl Value {
    pub fn empty_map() -> Value {
        Value::Map(Vec::new())
    }

    pub fn str(s: impl Into<String>) -> Value {
        Value::Scalar(Scalar::Str(s.into()))
    }

    pub fn int(v: i64) -> Value {
        Value::Scalar(Scalar::Int(v))
    }

    pub fn bool(v: bool) -> Value {
        Value::Scalar(Scalar::Bool(v))
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Scalar(Scalar::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Scalar(Scalar::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn map_get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}
