// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Loosely-typed attribute values supplied by callers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An attribute bag: string keys to dynamically-typed values
pub type Attributes = BTreeMap<String, AttrValue>;

/// A dynamically-typed attribute value.
///
/// Deserializes from plain JSON/YAML scalars and collections. Integers are
/// tried before floats so `80` stays an integer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<AttrValue>),
    Map(Attributes),
}

impl AttrValue {
    /// Short name of the value's shape, used in validation messages
    pub fn shape(&self) -> &'static str {
        match self {
            AttrValue::Boolean(_) => "boolean",
            AttrValue::Integer(_) => "integer",
            AttrValue::Float(_) => "float",
            AttrValue::String(_) => "string",
            AttrValue::List(_) => "list",
            AttrValue::Map(_) => "map",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Attributes> {
        match self {
            AttrValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[AttrValue]> {
        match self {
            AttrValue::List(l) => Some(l),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::String(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::String(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Integer(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        AttrValue::Integer(i64::from(value))
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Boolean(value)
    }
}

impl From<Vec<AttrValue>> for AttrValue {
    fn from(value: Vec<AttrValue>) -> Self {
        AttrValue::List(value)
    }
}

impl From<Attributes> for AttrValue {
    fn from(value: Attributes) -> Self {
        AttrValue::Map(value)
    }
}
