// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Secret rules. Values are taken as plain text and stored as bytes; they
//! never appear in summaries or logs.

use super::configmap::immutable;
use super::fields::{self, detail};
use super::KindRules;
use crate::coerce::to_string_map;
use crate::constants::attrs;
use crate::error::{KubegripError, ResourceRef, Result};
use crate::types::{Attributes, ResourceKind, ResourceSpec};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use std::collections::BTreeMap;

const DEFAULT_SECRET_TYPE: &str = "Opaque";

pub struct Secrets;

impl KindRules for Secrets {
    type Object = Secret;

    const KIND: ResourceKind = ResourceKind::Secret;

    fn validate(spec: &ResourceSpec) -> Result<()> {
        check_fields(&spec.target(), &spec.attributes)
    }

    fn validate_changes(changes: &ResourceSpec) -> Result<()> {
        check_fields(&changes.target(), &changes.attributes)
    }

    fn build(spec: &ResourceSpec) -> Result<Secret> {
        let target = spec.target();
        Ok(Secret {
            metadata: fields::build_metadata(spec),
            type_: Some(
                fields::optional_string(&target, &spec.attributes, attrs::TYPE)?
                    .unwrap_or_else(|| DEFAULT_SECRET_TYPE.to_string()),
            ),
            data: secret_data(spec),
            immutable: immutable(&target, &spec.attributes)?,
            ..Default::default()
        })
    }

    fn apply_update(existing: &mut Secret, changes: &ResourceSpec) -> Result<()> {
        let target = changes.target();
        if let Some(requested) = fields::optional_string(&target, &changes.attributes, attrs::TYPE)? {
            let current = existing.type_.as_deref().unwrap_or(DEFAULT_SECRET_TYPE);
            if requested != current {
                return Err(KubegripError::conflict(
                    &target,
                    format!("secret type cannot change from {} to {}", current, requested),
                ));
            }
        }
        if existing.immutable == Some(true) && changes.attr(attrs::DATA).is_some() {
            return Err(KubegripError::conflict(&target, "data of an immutable Secret cannot change"));
        }

        fields::merge_metadata(&mut existing.metadata, changes);
        if let Some(data) = secret_data(changes) {
            existing.data.get_or_insert_with(BTreeMap::new).extend(data);
        }
        if let Some(flag) = immutable(&target, &changes.attributes)? {
            existing.immutable = Some(flag);
        }
        Ok(())
    }

    fn summarize(secret: &Secret) -> Vec<(String, String)> {
        let keys: Vec<&str> = secret
            .data
            .iter()
            .flat_map(|d| d.keys())
            .map(String::as_str)
            .collect();
        vec![
            detail("type", secret.type_.as_deref().unwrap_or(DEFAULT_SECRET_TYPE)),
            detail("keys", keys.join(",")),
        ]
    }
}

fn check_fields(target: &ResourceRef, attributes: &Attributes) -> Result<()> {
    fields::check_metadata(target, attributes)?;
    fields::optional_map(target, attributes, attrs::DATA)?;
    fields::optional_string(target, attributes, attrs::TYPE)?;
    immutable(target, attributes)?;
    Ok(())
}

fn secret_data(spec: &ResourceSpec) -> Option<BTreeMap<String, ByteString>> {
    to_string_map(spec.attr_map(attrs::DATA)).map(|data| {
        data.into_iter()
            .map(|(key, value)| (key, ByteString(value.into_bytes())))
            .collect()
    })
}
