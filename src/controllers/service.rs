// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

use super::fields::{self, detail, PROTOCOLS};
use super::KindRules;
use crate::coerce::{self, to_string_map};
use crate::constants::attrs;
use crate::error::{KubegripError, ResourceRef, Result};
use crate::types::{AttrValue, Attributes, ResourceKind, ResourceSpec};
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;

pub const SERVICE_TYPES: &[&str] = &["ClusterIP", "NodePort", "LoadBalancer", "ExternalName"];

const CLUSTER_IP: &str = "ClusterIP";
const EXTERNAL_NAME: &str = "ExternalName";

pub struct Services;

/// Fields parsed out of an attribute bag, all optional
struct Parsed {
    service_type: Option<&'static str>,
    external_name: Option<String>,
    ports: Option<Vec<ServicePort>>,
}

impl Parsed {
    fn from_attributes(target: &ResourceRef, attributes: &Attributes) -> Result<Self> {
        fields::check_metadata(target, attributes)?;
        fields::optional_map(target, attributes, attrs::SELECTOR)?;
        Ok(Self {
            service_type: fields::optional_enum(target, attributes, attrs::TYPE, SERVICE_TYPES)?,
            external_name: fields::optional_string(target, attributes, attrs::EXTERNAL_NAME)?,
            ports: service_ports(target, attributes)?,
        })
    }
}

impl KindRules for Services {
    type Object = Service;

    const KIND: ResourceKind = ResourceKind::Service;

    fn validate(spec: &ResourceSpec) -> Result<()> {
        let target = spec.target();
        let parsed = Parsed::from_attributes(&target, &spec.attributes)?;
        check_consistency(
            &target,
            parsed.service_type.unwrap_or(CLUSTER_IP),
            parsed.external_name.as_deref(),
            parsed.ports.as_deref(),
        )
    }

    fn validate_changes(changes: &ResourceSpec) -> Result<()> {
        let target = changes.target();
        let parsed = Parsed::from_attributes(&target, &changes.attributes)?;
        // Only conflicts visible within the change itself; the rest is
        // checked against the merged object
        if let (Some(service_type), Some(ports)) = (parsed.service_type, parsed.ports.as_deref()) {
            check_node_ports(&target, service_type, ports)?;
        }
        if let (Some(service_type), Some(_)) = (parsed.service_type, &parsed.external_name) {
            check_external_name(&target, service_type, true)?;
        }
        Ok(())
    }

    fn build(spec: &ResourceSpec) -> Result<Service> {
        let target = spec.target();
        let parsed = Parsed::from_attributes(&target, &spec.attributes)?;
        let service_type = parsed.service_type.unwrap_or(CLUSTER_IP);

        let selector = to_string_map(spec.attr_map(attrs::SELECTOR))
            .filter(|s| !s.is_empty())
            .or_else(|| {
                (service_type != EXTERNAL_NAME)
                    .then(|| BTreeMap::from([("app".to_string(), spec.name.clone())]))
            });

        Ok(Service {
            metadata: fields::build_metadata(spec),
            spec: Some(ServiceSpec {
                type_: Some(service_type.to_string()),
                selector,
                ports: parsed.ports.filter(|p| !p.is_empty()),
                external_name: parsed.external_name,
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    fn apply_update(existing: &mut Service, changes: &ResourceSpec) -> Result<()> {
        let target = changes.target();
        let parsed = Parsed::from_attributes(&target, &changes.attributes)?;
        fields::merge_metadata(&mut existing.metadata, changes);

        let spec = existing.spec.get_or_insert_with(Default::default);
        fields::merge_string_map(&mut spec.selector, to_string_map(changes.attr_map(attrs::SELECTOR)));

        if let Some(service_type) = parsed.service_type {
            let previous = spec.type_.replace(service_type.to_string());
            if previous.as_deref() != Some(service_type) {
                retype(spec, service_type, parsed.ports.is_some(), parsed.external_name.is_some());
            }
        }
        if let Some(external_name) = parsed.external_name {
            spec.external_name = Some(external_name);
        }
        if let Some(ports) = parsed.ports {
            spec.ports = Some(ports);
        }

        check_consistency(
            &target,
            spec.type_.as_deref().unwrap_or(CLUSTER_IP),
            spec.external_name.as_deref(),
            spec.ports.as_deref(),
        )
    }

    fn summarize(service: &Service) -> Vec<(String, String)> {
        let mut details = Vec::new();
        let Some(spec) = &service.spec else {
            return details;
        };

        details.push(detail("type", spec.type_.as_deref().unwrap_or(CLUSTER_IP)));
        if let Some(ip) = spec.cluster_ip.as_deref().filter(|ip| !ip.is_empty()) {
            details.push(detail("clusterIP", ip));
        }
        if let Some(name) = &spec.external_name {
            details.push(detail("externalName", name));
        }
        if let Some(selector) = fields::render_map(spec.selector.as_ref()) {
            details.push(detail("selector", selector));
        }
        for port in spec.ports.iter().flatten() {
            details.push(detail("port", describe_port(port)));
        }
        details
    }
}

/// `80`, `53/UDP`, `80 → 8080`, `80 → NodePort 30080`
pub fn describe_port(port: &ServicePort) -> String {
    let mut text = port.port.to_string();
    if let Some(protocol) = port.protocol.as_deref().filter(|p| *p != "TCP") {
        text.push('/');
        text.push_str(protocol);
    }
    match &port.target_port {
        Some(IntOrString::Int(target)) if *target != port.port => {
            text.push_str(&format!(" → {}", target));
        }
        Some(IntOrString::String(name)) => text.push_str(&format!(" → {}", name)),
        _ => {}
    }
    if let Some(node_port) = port.node_port {
        text.push_str(&format!(" → NodePort {}", node_port));
    }
    text
}

/// Drop fields the new type cannot carry, unless the same change sets them
fn retype(spec: &mut ServiceSpec, service_type: &str, ports_given: bool, external_name_given: bool) {
    if !ports_given && matches!(service_type, CLUSTER_IP | EXTERNAL_NAME) {
        for port in spec.ports.iter_mut().flatten() {
            port.node_port = None;
        }
    }
    if !external_name_given && service_type != EXTERNAL_NAME {
        spec.external_name = None;
    }
    if service_type == EXTERNAL_NAME {
        spec.cluster_ip = None;
        spec.cluster_ips = None;
    }
}

fn check_consistency(
    target: &ResourceRef,
    service_type: &str,
    external_name: Option<&str>,
    ports: Option<&[ServicePort]>,
) -> Result<()> {
    check_external_name(target, service_type, external_name.is_some())?;
    if service_type == EXTERNAL_NAME {
        if external_name.is_none() {
            return Err(KubegripError::validation(
                target,
                "externalName is required for type ExternalName",
            ));
        }
    } else if ports.map_or(true, <[ServicePort]>::is_empty) {
        return Err(KubegripError::validation(target, "at least one port is required"));
    }
    check_node_ports(target, service_type, ports.unwrap_or_default())
}

fn check_external_name(target: &ResourceRef, service_type: &str, has_external_name: bool) -> Result<()> {
    if has_external_name && service_type != EXTERNAL_NAME {
        return Err(KubegripError::conflict(
            target,
            format!("externalName cannot be set on a {} service", service_type),
        ));
    }
    Ok(())
}

fn check_node_ports(target: &ResourceRef, service_type: &str, ports: &[ServicePort]) -> Result<()> {
    if !matches!(service_type, CLUSTER_IP | EXTERNAL_NAME) {
        return Ok(());
    }
    match ports.iter().find(|p| p.node_port.is_some()) {
        Some(port) => Err(KubegripError::conflict(
            target,
            format!(
                "nodePort on port {} cannot be used with a {} service",
                port.port, service_type
            ),
        )),
        None => Ok(()),
    }
}

/// Service ports from a list of numbers or
/// `{port, targetPort, nodePort, protocol, name}` maps.
///
/// Multi-port services need named ports, so unnamed entries get
/// `<protocol>-<port>` when there is more than one.
fn service_ports(target: &ResourceRef, attributes: &Attributes) -> Result<Option<Vec<ServicePort>>> {
    let Some(entries) = fields::optional_list(target, attributes, attrs::PORTS)? else {
        return Ok(None);
    };

    let mut ports = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| -> Result<ServicePort> {
            let field = format!("ports[{}]", i);
            let AttrValue::Map(entry) = entry else {
                let number = fields::port(target, &field, entry)?;
                return Ok(ServicePort {
                    port: number,
                    target_port: Some(IntOrString::Int(number)),
                    ..Default::default()
                });
            };

            let number = entry.get(attrs::PORT).ok_or_else(|| {
                KubegripError::validation(target, format!("{}.port is required", field))
            })?;
            let target_port = entry
                .get(attrs::TARGET_PORT)
                .map(|value| {
                    coerce::to_int_or_string(value).map_err(|e| {
                        KubegripError::validation(target, format!("{}.targetPort: {}", field, e))
                    })
                })
                .transpose()?;
            let node_port = entry
                .get(attrs::NODE_PORT)
                .map(|value| fields::port(target, &format!("{}.nodePort", field), value))
                .transpose()?;

            Ok(ServicePort {
                port: fields::port(target, &format!("{}.port", field), number)?,
                target_port,
                node_port,
                protocol: fields::optional_enum(target, entry, attrs::PROTOCOL, PROTOCOLS)?
                    .map(str::to_string),
                name: fields::optional_string(target, entry, attrs::NAME)?,
                ..Default::default()
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if ports.len() > 1 {
        for port in ports.iter_mut().filter(|p| p.name.is_none()) {
            let protocol = port.protocol.as_deref().unwrap_or("TCP").to_ascii_lowercase();
            port.name = Some(format!("{}-{}", protocol, port.port));
        }
    }
    Ok(Some(ports))
}
