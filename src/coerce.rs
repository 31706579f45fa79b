// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Total conversions from loosely-typed attribute values into the canonical
//! forms the typed API objects need.
//!
//! Attribute bags degrade gracefully: entries whose shape cannot be rendered
//! (lists and maps where a scalar is expected) are dropped, never reported.
//! Ports are the exception since they have no sensible default, so
//! [`to_port`] returns an error the caller turns into a validation failure.

use crate::types::{AttrValue, Attributes};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::trace;

/// Render a scalar as text. Lists and maps have no scalar form.
pub fn scalar_to_string(value: &AttrValue) -> Option<String> {
    match value {
        AttrValue::String(s) => Some(s.clone()),
        AttrValue::Integer(i) => Some(i.to_string()),
        AttrValue::Float(f) => Some(f.to_string()),
        AttrValue::Boolean(b) => Some(b.to_string()),
        AttrValue::List(_) | AttrValue::Map(_) => None,
    }
}

/// Coerce an attribute bag into a string map.
///
/// `None` stays `None` and an empty bag stays empty, so callers can tell
/// "not given" from "given as empty".
pub fn to_string_map(bag: Option<&Attributes>) -> Option<BTreeMap<String, String>> {
    let bag = bag?;
    Some(
        bag.iter()
            .filter_map(|(key, value)| match scalar_to_string(value) {
                Some(text) => Some((key.clone(), text)),
                None => {
                    trace!("Dropping attribute '{}' with {} value", key, value.shape());
                    None
                }
            })
            .collect(),
    )
}

/// Keep the string elements of a list, in order.
pub fn to_string_list(list: Option<&[AttrValue]>) -> Option<Vec<String>> {
    let list = list?;
    Some(
        list.iter()
            .filter_map(|value| match value {
                AttrValue::String(s) => Some(s.clone()),
                other => {
                    trace!("Dropping {} list element", other.shape());
                    None
                }
            })
            .collect(),
    )
}

/// Coerce an attribute bag into `(name, value)` pairs for container env.
///
/// Pairs come out in key order.
pub fn to_env_pairs(bag: Option<&Attributes>) -> Vec<(String, String)> {
    to_string_map(bag)
        .map(|map| map.into_iter().collect())
        .unwrap_or_default()
}

/// Names referenced from a list; anything that isn't a string is dropped.
pub fn to_reference_list(list: Option<&[AttrValue]>) -> Vec<String> {
    to_string_list(list)
        .unwrap_or_default()
        .into_iter()
        .filter(|name| !name.is_empty())
        .collect()
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PortError {
    #[error("expected a port number, got a {0} value")]
    UnsupportedShape(&'static str),

    #[error("'{0}' is not a port number")]
    NotNumeric(String),

    #[error("{0} is outside the port range 1-65535")]
    OutOfRange(i64),
}

/// Coerce a port from an integer, a float (truncated) or a numeric string.
pub fn to_port(value: &AttrValue) -> Result<i32, PortError> {
    let number = match value {
        AttrValue::Integer(i) => *i,
        AttrValue::Float(f) => f.trunc() as i64,
        AttrValue::String(s) => parse_number(s).ok_or_else(|| PortError::NotNumeric(s.clone()))?,
        other => return Err(PortError::UnsupportedShape(other.shape())),
    };

    if (1..=65535).contains(&number) {
        Ok(number as i32)
    } else {
        Err(PortError::OutOfRange(number))
    }
}

/// Coerce a target port, which may also be a named container port.
pub fn to_int_or_string(value: &AttrValue) -> Result<IntOrString, PortError> {
    match value {
        AttrValue::String(s) if parse_number(s).is_none() && !s.trim().is_empty() => {
            Ok(IntOrString::String(s.trim().to_string()))
        }
        other => to_port(other).map(IntOrString::Int),
    }
}

/// Whole number from an integer, a float (truncated) or a numeric string.
pub fn to_int(value: &AttrValue) -> Option<i64> {
    match value {
        AttrValue::Integer(i) => Some(*i),
        AttrValue::Float(f) if f.is_finite() => Some(f.trunc() as i64),
        AttrValue::String(s) => parse_number(s),
        _ => None,
    }
}

pub fn to_bool(value: &AttrValue) -> Option<bool> {
    match value {
        AttrValue::Boolean(b) => Some(*b),
        AttrValue::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        AttrValue::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

fn parse_number(s: &str) -> Option<i64> {
    let s = s.trim();
    s.parse::<i64>().ok().or_else(|| {
        s.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f.trunc() as i64)
    })
}
