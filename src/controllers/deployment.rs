// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Deployment rules: a single-container workload.

use super::fields::{self, detail, PROTOCOLS};
use super::KindRules;
use crate::coerce::{self, to_env_pairs, to_reference_list, to_string_list, to_string_map};
use crate::constants::attrs;
use crate::error::{KubegripError, ResourceRef, Result};
use crate::types::{AttrValue, Attributes, ResourceKind, ResourceSpec};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, LocalObjectReference, PodSpec, PodTemplateSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;

pub const PULL_POLICIES: &[&str] = &["Always", "IfNotPresent", "Never"];

const DEFAULT_REPLICAS: i32 = 1;

pub struct Deployments;

impl KindRules for Deployments {
    type Object = Deployment;

    const KIND: ResourceKind = ResourceKind::Deployment;

    fn validate(spec: &ResourceSpec) -> Result<()> {
        let target = spec.target();
        fields::required_string(&target, &spec.attributes, attrs::IMAGE)?;
        check_fields(&target, &spec.attributes)
    }

    fn validate_changes(changes: &ResourceSpec) -> Result<()> {
        let target = changes.target();
        fields::optional_string(&target, &changes.attributes, attrs::IMAGE)?;
        check_fields(&target, &changes.attributes)
    }

    fn build(spec: &ResourceSpec) -> Result<Deployment> {
        let target = spec.target();
        let attributes = &spec.attributes;
        let image = fields::required_string(&target, attributes, attrs::IMAGE)?;

        let labels = to_string_map(spec.attr_map(attrs::LABELS)).unwrap_or_default();
        let selector = selector_labels(spec, &labels);
        let mut template_labels = labels;
        template_labels.extend(selector.clone());

        let container_name = fields::optional_string(&target, attributes, attrs::CONTAINER_NAME)?
            .unwrap_or_else(|| spec.name.clone());

        let container = Container {
            name: container_name,
            image: Some(image),
            image_pull_policy: fields::optional_enum(&target, attributes, attrs::IMAGE_PULL_POLICY, PULL_POLICIES)?
                .map(str::to_string),
            env: env_vars(spec.attr_map(attrs::ENV)),
            ports: container_ports(&target, attributes)?,
            command: to_string_list(spec.attr_list(attrs::COMMAND)),
            args: to_string_list(spec.attr_list(attrs::ARGS)),
            ..Default::default()
        };

        Ok(Deployment {
            metadata: fields::build_metadata(spec),
            spec: Some(DeploymentSpec {
                replicas: Some(replicas(&target, attributes)?.unwrap_or(DEFAULT_REPLICAS)),
                selector: LabelSelector {
                    match_labels: Some(selector),
                    ..Default::default()
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(template_labels),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        containers: vec![container],
                        image_pull_secrets: pull_secrets(spec.attr_list(attrs::IMAGE_PULL_SECRETS)),
                        service_account_name: fields::optional_string(
                            &target,
                            attributes,
                            attrs::SERVICE_ACCOUNT,
                        )?,
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    fn apply_update(existing: &mut Deployment, changes: &ResourceSpec) -> Result<()> {
        let target = changes.target();
        let attributes = &changes.attributes;
        fields::merge_metadata(&mut existing.metadata, changes);

        let spec = existing.spec.get_or_insert_with(Default::default);
        if let Some(replicas) = replicas(&target, attributes)? {
            spec.replicas = Some(replicas);
        }

        let selector_changes = to_string_map(changes.attr_map(attrs::SELECTOR));
        fields::merge_string_map(&mut spec.selector.match_labels, selector_changes.clone());
        let template_meta = spec.template.metadata.get_or_insert_with(Default::default);
        fields::merge_string_map(&mut template_meta.labels, selector_changes);

        let pod = spec.template.spec.get_or_insert_with(Default::default);
        if let Some(secrets) = changes.attr_list(attrs::IMAGE_PULL_SECRETS) {
            pod.image_pull_secrets = pull_secrets(Some(secrets));
        }
        if let Some(account) = fields::optional_string(&target, attributes, attrs::SERVICE_ACCOUNT)? {
            pod.service_account_name = Some(account);
        }

        if pod.containers.is_empty() {
            return Err(KubegripError::conflict(
                &target,
                "existing deployment has no containers to update",
            ));
        }
        let container = &mut pod.containers[0];
        if let Some(image) = fields::optional_string(&target, attributes, attrs::IMAGE)? {
            container.image = Some(image);
        }
        if let Some(policy) =
            fields::optional_enum(&target, attributes, attrs::IMAGE_PULL_POLICY, PULL_POLICIES)?
        {
            container.image_pull_policy = Some(policy.to_string());
        }
        // env, ports, command and args are lists: replaced, never merged
        if changes.attr(attrs::ENV).is_some() {
            container.env = env_vars(changes.attr_map(attrs::ENV));
        }
        if changes.attr(attrs::PORTS).is_some() {
            container.ports = container_ports(&target, attributes)?;
        }
        if let Some(command) = to_string_list(changes.attr_list(attrs::COMMAND)) {
            container.command = Some(command);
        }
        if let Some(args) = to_string_list(changes.attr_list(attrs::ARGS)) {
            container.args = Some(args);
        }
        Ok(())
    }

    fn summarize(deployment: &Deployment) -> Vec<(String, String)> {
        let mut details = Vec::new();
        let spec = deployment.spec.as_ref();

        if let Some(image) = spec
            .and_then(|s| s.template.spec.as_ref())
            .and_then(|p| p.containers.first())
            .and_then(|c| c.image.as_ref())
        {
            details.push(detail("image", image));
        }
        let desired = spec.and_then(|s| s.replicas).unwrap_or(DEFAULT_REPLICAS);
        details.push(detail("replicas", desired));
        if let Some(status) = &deployment.status {
            details.push(detail(
                "ready",
                format!("{}/{}", status.ready_replicas.unwrap_or(0), desired),
            ));
        }
        if let Some(selector) = fields::render_map(spec.and_then(|s| s.selector.match_labels.as_ref())) {
            details.push(detail("selector", selector));
        }
        details
    }
}

fn check_fields(target: &ResourceRef, attributes: &Attributes) -> Result<()> {
    fields::check_metadata(target, attributes)?;
    fields::optional_map(target, attributes, attrs::SELECTOR)?;
    fields::optional_map(target, attributes, attrs::ENV)?;
    fields::optional_list(target, attributes, attrs::COMMAND)?;
    fields::optional_list(target, attributes, attrs::ARGS)?;
    fields::optional_list(target, attributes, attrs::IMAGE_PULL_SECRETS)?;
    replicas(target, attributes)?;
    fields::optional_enum(target, attributes, attrs::IMAGE_PULL_POLICY, PULL_POLICIES)?;
    fields::optional_string(target, attributes, attrs::CONTAINER_NAME)?;
    fields::optional_string(target, attributes, attrs::SERVICE_ACCOUNT)?;
    container_ports(target, attributes)?;
    Ok(())
}

fn replicas(target: &ResourceRef, attributes: &Attributes) -> Result<Option<i32>> {
    let Some(value) = attributes.get(attrs::REPLICAS) else {
        return Ok(None);
    };
    match coerce::to_int(value) {
        Some(n) if (0..=i64::from(i32::MAX)).contains(&n) => Ok(Some(n as i32)),
        Some(n) => Err(KubegripError::validation(
            target,
            format!("replicas must be zero or more, got {}", n),
        )),
        None => Err(KubegripError::validation(
            target,
            format!("replicas must be a number, got a {} value", value.shape()),
        )),
    }
}

/// Explicit selector, else the labels, else `app=<name>`
fn selector_labels(spec: &ResourceSpec, labels: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    to_string_map(spec.attr_map(attrs::SELECTOR))
        .filter(|s| !s.is_empty())
        .or_else(|| (!labels.is_empty()).then(|| labels.clone()))
        .unwrap_or_else(|| BTreeMap::from([("app".to_string(), spec.name.clone())]))
}

fn env_vars(bag: Option<&Attributes>) -> Option<Vec<EnvVar>> {
    bag?;
    Some(
        to_env_pairs(bag)
            .into_iter()
            .map(|(name, value)| EnvVar {
                name,
                value: Some(value),
                ..Default::default()
            })
            .collect(),
    )
}

fn pull_secrets(list: Option<&[AttrValue]>) -> Option<Vec<LocalObjectReference>> {
    list?;
    Some(
        to_reference_list(list)
            .into_iter()
            .map(|name| LocalObjectReference { name })
            .collect(),
    )
}

/// Container ports from a list of numbers or `{containerPort|port, name, protocol}` maps
fn container_ports(target: &ResourceRef, attributes: &Attributes) -> Result<Option<Vec<ContainerPort>>> {
    let Some(value) = attributes.get(attrs::PORTS) else {
        return Ok(None);
    };
    let Some(entries) = value.as_list() else {
        return Err(KubegripError::validation(
            target,
            format!("ports must be a list, got a {} value", value.shape()),
        ));
    };

    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| -> Result<ContainerPort> {
            let field = format!("ports[{}]", i);
            match entry {
                AttrValue::Map(port) => {
                    let number = port
                        .get(attrs::CONTAINER_PORT)
                        .or_else(|| port.get(attrs::PORT))
                        .ok_or_else(|| {
                            KubegripError::validation(target, format!("{}.containerPort is required", field))
                        })?;
                    Ok(ContainerPort {
                        container_port: fields::port(target, &format!("{}.containerPort", field), number)?,
                        name: fields::optional_string(target, port, attrs::NAME)?,
                        protocol: fields::optional_enum(target, port, attrs::PROTOCOL, PROTOCOLS)?
                            .map(str::to_string),
                        ..Default::default()
                    })
                }
                scalar => Ok(ContainerPort {
                    container_port: fields::port(target, &field, scalar)?,
                    ..Default::default()
                }),
            }
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}
