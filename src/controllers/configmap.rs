// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

use super::fields::{self, detail};
use super::KindRules;
use crate::coerce::{self, to_string_map};
use crate::constants::attrs;
use crate::error::{KubegripError, ResourceRef, Result};
use crate::types::{Attributes, ResourceKind, ResourceSpec};
use k8s_openapi::api::core::v1::ConfigMap;

pub struct ConfigMaps;

impl KindRules for ConfigMaps {
    type Object = ConfigMap;

    const KIND: ResourceKind = ResourceKind::ConfigMap;

    fn validate(spec: &ResourceSpec) -> Result<()> {
        check_fields(&spec.target(), &spec.attributes)
    }

    fn validate_changes(changes: &ResourceSpec) -> Result<()> {
        check_fields(&changes.target(), &changes.attributes)
    }

    fn build(spec: &ResourceSpec) -> Result<ConfigMap> {
        Ok(ConfigMap {
            metadata: fields::build_metadata(spec),
            data: to_string_map(spec.attr_map(attrs::DATA)),
            immutable: immutable(&spec.target(), &spec.attributes)?,
            ..Default::default()
        })
    }

    fn apply_update(existing: &mut ConfigMap, changes: &ResourceSpec) -> Result<()> {
        let target = changes.target();
        if existing.immutable == Some(true) && changes.attr(attrs::DATA).is_some() {
            return Err(KubegripError::conflict(&target, "data of an immutable ConfigMap cannot change"));
        }
        fields::merge_metadata(&mut existing.metadata, changes);
        fields::merge_string_map(&mut existing.data, to_string_map(changes.attr_map(attrs::DATA)));
        if let Some(flag) = immutable(&target, &changes.attributes)? {
            existing.immutable = Some(flag);
        }
        Ok(())
    }

    fn summarize(config_map: &ConfigMap) -> Vec<(String, String)> {
        let keys: Vec<&str> = config_map
            .data
            .iter()
            .flat_map(|d| d.keys())
            .chain(config_map.binary_data.iter().flat_map(|d| d.keys()))
            .map(String::as_str)
            .collect();
        let mut details = vec![detail("keys", keys.join(","))];
        if config_map.immutable == Some(true) {
            details.push(detail("immutable", true));
        }
        details
    }
}

fn check_fields(target: &ResourceRef, attributes: &Attributes) -> Result<()> {
    fields::check_metadata(target, attributes)?;
    fields::optional_map(target, attributes, attrs::DATA)?;
    immutable(target, attributes)?;
    Ok(())
}

/// `immutable` flag, shared with Secrets
pub fn immutable(target: &ResourceRef, attributes: &Attributes) -> Result<Option<bool>> {
    let Some(value) = attributes.get(attrs::IMMUTABLE) else {
        return Ok(None);
    };
    coerce::to_bool(value).map(Some).ok_or_else(|| {
        KubegripError::validation(
            target,
            format!("immutable must be true or false, got a {} value", value.shape()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttrValue;

    fn data(entries: &[(&str, AttrValue)]) -> AttrValue {
        AttrValue::Map(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn test_build_coerces_data_values() {
        let spec = ResourceSpec::new(ResourceKind::ConfigMap, "settings", "shop").with_attr(
            attrs::DATA,
            data(&[
                ("workers", AttrValue::from(4)),
                ("debug", AttrValue::from(true)),
                ("nested", data(&[])),
            ]),
        );

        let config_map = ConfigMaps::build(&spec).unwrap();
        let values = config_map.data.unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values["workers"], "4");
        assert_eq!(values["debug"], "true");
    }

    #[test]
    fn test_validate_rejects_scalar_data() {
        let spec = ResourceSpec::new(ResourceKind::ConfigMap, "settings", "shop")
            .with_attr(attrs::DATA, "key=value");
        assert!(ConfigMaps::validate(&spec).unwrap_err().is_validation());
    }

    #[test]
    fn test_apply_update_merges_data() {
        let mut config_map = ConfigMaps::build(
            &ResourceSpec::new(ResourceKind::ConfigMap, "settings", "shop")
                .with_attr(attrs::DATA, data(&[("a", AttrValue::from("1"))])),
        )
        .unwrap();

        let changes = ResourceSpec::new(ResourceKind::ConfigMap, "settings", "shop")
            .with_attr(attrs::DATA, data(&[("b", AttrValue::from("2"))]));
        ConfigMaps::apply_update(&mut config_map, &changes).unwrap();

        let values = config_map.data.clone().unwrap();
        assert_eq!(values["a"], "1");
        assert_eq!(values["b"], "2");
        assert_eq!(ConfigMaps::summarize(&config_map), vec![detail("keys", "a,b")]);
    }

    #[test]
    fn test_apply_update_refuses_immutable_data() {
        let mut config_map = ConfigMaps::build(
            &ResourceSpec::new(ResourceKind::ConfigMap, "settings", "shop")
                .with_attr(attrs::IMMUTABLE, true),
        )
        .unwrap();

        let changes = ResourceSpec::new(ResourceKind::ConfigMap, "settings", "shop")
            .with_attr(attrs::DATA, data(&[("b", AttrValue::from("2"))]));
        assert!(ConfigMaps::apply_update(&mut config_map, &changes)
            .unwrap_err()
            .is_conflict());
    }
}
