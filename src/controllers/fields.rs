// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Field helpers shared by the per-kind rules: metadata, enumerations,
//! ports and the two update merge disciplines.

use crate::coerce::{self, to_string_map};
use crate::constants::attrs;
use crate::error::{KubegripError, ResourceRef, Result};
use crate::types::{AttrValue, Attributes, ResourceSpec};
use kube::api::ObjectMeta;
use std::collections::BTreeMap;

pub const PROTOCOLS: &[&str] = &["TCP", "UDP", "SCTP"];

/// Object metadata with coerced labels and annotations
pub fn build_metadata(spec: &ResourceSpec) -> ObjectMeta {
    ObjectMeta {
        name: Some(spec.name.clone()),
        namespace: Some(spec.namespace.clone()),
        labels: to_string_map(spec.attr_map(attrs::LABELS)).filter(|m| !m.is_empty()),
        annotations: to_string_map(spec.attr_map(attrs::ANNOTATIONS)).filter(|m| !m.is_empty()),
        ..Default::default()
    }
}

/// Merge labels and annotations key by key, keeping keys the change leaves out
pub fn merge_metadata(meta: &mut ObjectMeta, changes: &ResourceSpec) {
    merge_string_map(&mut meta.labels, to_string_map(changes.attr_map(attrs::LABELS)));
    merge_string_map(
        &mut meta.annotations,
        to_string_map(changes.attr_map(attrs::ANNOTATIONS)),
    );
}

/// Key-wise merge for map-valued fields. Absent changes leave `existing` alone.
pub fn merge_string_map(
    existing: &mut Option<BTreeMap<String, String>>,
    changes: Option<BTreeMap<String, String>>,
) {
    let Some(changes) = changes else {
        return;
    };
    existing.get_or_insert_with(BTreeMap::new).extend(changes);
}

/// Resolve an enumeration token, accepting any letter case.
///
/// Returns the canonical spelling; unknown tokens name the field and value.
pub fn parse_enum(
    target: &ResourceRef,
    field: &str,
    value: &AttrValue,
    allowed: &[&'static str],
) -> Result<&'static str> {
    let Some(token) = value.as_str() else {
        return Err(KubegripError::validation(
            target,
            format!("{} must be one of {}, got a {} value", field, allowed.join(", "), value.shape()),
        ));
    };
    allowed
        .iter()
        .find(|candidate| candidate.eq_ignore_ascii_case(token.trim()))
        .copied()
        .ok_or_else(|| {
            KubegripError::validation(
                target,
                format!(
                    "invalid {} '{}': expected one of {}",
                    field,
                    token,
                    allowed.join(", ")
                ),
            )
        })
}

/// Optional enumeration attribute
pub fn optional_enum(
    target: &ResourceRef,
    source: &Attributes,
    field: &str,
    allowed: &[&'static str],
) -> Result<Option<&'static str>> {
    source
        .get(field)
        .map(|value| parse_enum(target, field, value, allowed))
        .transpose()
}

/// Coerce a port, reporting failures as validation errors on `field`
pub fn port(target: &ResourceRef, field: &str, value: &AttrValue) -> Result<i32> {
    coerce::to_port(value)
        .map_err(|e| KubegripError::validation(target, format!("{}: {}", field, e)))
}

/// Non-empty string attribute; `None` when absent
pub fn optional_string(target: &ResourceRef, source: &Attributes, field: &str) -> Result<Option<String>> {
    match source.get(field) {
        None => Ok(None),
        Some(AttrValue::String(s)) if !s.trim().is_empty() => Ok(Some(s.trim().to_string())),
        Some(AttrValue::String(_)) => Err(KubegripError::validation(
            target,
            format!("{} must not be empty", field),
        )),
        Some(other) => Err(KubegripError::validation(
            target,
            format!("{} must be a string, got a {} value", field, other.shape()),
        )),
    }
}

pub fn required_string(target: &ResourceRef, source: &Attributes, field: &str) -> Result<String> {
    optional_string(target, source, field)?
        .ok_or_else(|| KubegripError::validation(target, format!("{} is required", field)))
}

/// Map-valued attribute; any other shape is a validation error
pub fn optional_map<'a>(
    target: &ResourceRef,
    source: &'a Attributes,
    field: &str,
) -> Result<Option<&'a Attributes>> {
    match source.get(field) {
        None => Ok(None),
        Some(AttrValue::Map(map)) => Ok(Some(map)),
        Some(other) => Err(KubegripError::validation(
            target,
            format!("{} must be a map, got a {} value", field, other.shape()),
        )),
    }
}

pub fn optional_list<'a>(
    target: &ResourceRef,
    source: &'a Attributes,
    field: &str,
) -> Result<Option<&'a [AttrValue]>> {
    match source.get(field) {
        None => Ok(None),
        Some(AttrValue::List(list)) => Ok(Some(list.as_slice())),
        Some(other) => Err(KubegripError::validation(
            target,
            format!("{} must be a list, got a {} value", field, other.shape()),
        )),
    }
}

/// Map-valued fields every kind accepts
pub fn check_metadata(target: &ResourceRef, source: &Attributes) -> Result<()> {
    optional_map(target, source, attrs::LABELS)?;
    optional_map(target, source, attrs::ANNOTATIONS)?;
    Ok(())
}

/// A list attribute whose elements must all be maps, e.g. `ports` entries
pub fn map_entries<'a>(
    target: &ResourceRef,
    field: &str,
    value: &'a AttrValue,
) -> Result<Vec<&'a Attributes>> {
    let Some(list) = value.as_list() else {
        return Err(KubegripError::validation(
            target,
            format!("{} must be a list, got a {} value", field, value.shape()),
        ));
    };
    list.iter()
        .enumerate()
        .map(|(i, entry)| {
            entry.as_map().ok_or_else(|| {
                KubegripError::validation(
                    target,
                    format!("{}[{}] must be a map, got a {} value", field, i, entry.shape()),
                )
            })
        })
        .collect()
}

/// Render a map as `k=v,k=v` for summaries
pub fn render_map(map: Option<&BTreeMap<String, String>>) -> Option<String> {
    let map = map.filter(|m| !m.is_empty())?;
    Some(
        map.iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(","),
    )
}

/// `(key, value)` detail row
pub fn detail(key: &str, value: impl ToString) -> (String, String) {
    (key.to_string(), value.to_string())
}
