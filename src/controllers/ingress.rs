// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Ingress rules.
//!
//! Routing is given either as a `rules` list of `{host, paths}` maps or, for
//! the single-route case, as top-level `host`/`path`/`service`/`port`
//! shorthand. A rule without `paths` is itself one path.

use super::fields::{self, detail};
use super::KindRules;
use crate::coerce::{self, to_reference_list};
use crate::constants::attrs;
use crate::error::{KubegripError, ResourceRef, Result};
use crate::types::{Attributes, ResourceKind, ResourceSpec};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, IngressTLS, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

pub const PATH_TYPES: &[&str] = &["Exact", "Prefix", "ImplementationSpecific"];

const DEFAULT_PATH: &str = "/";
const DEFAULT_PATH_TYPE: &str = "Prefix";

pub struct Ingresses;

impl KindRules for Ingresses {
    type Object = Ingress;

    const KIND: ResourceKind = ResourceKind::Ingress;

    fn validate(spec: &ResourceSpec) -> Result<()> {
        let target = spec.target();
        check_fields(&target, &spec.attributes)?;
        match ingress_rules(&target, &spec.attributes)? {
            Some(rules) if !rules.is_empty() => Ok(()),
            _ => Err(KubegripError::validation(
                &target,
                "at least one rule is required (rules, or host/path/service/port)",
            )),
        }
    }

    fn validate_changes(changes: &ResourceSpec) -> Result<()> {
        let target = changes.target();
        check_fields(&target, &changes.attributes)?;
        if let Some(rules) = ingress_rules(&target, &changes.attributes)? {
            if rules.is_empty() {
                return Err(KubegripError::validation(&target, "rules must not be empty"));
            }
        }
        Ok(())
    }

    fn build(spec: &ResourceSpec) -> Result<Ingress> {
        let target = spec.target();
        let attributes = &spec.attributes;
        Ok(Ingress {
            metadata: fields::build_metadata(spec),
            spec: Some(IngressSpec {
                ingress_class_name: fields::optional_string(&target, attributes, attrs::INGRESS_CLASS)?,
                rules: ingress_rules(&target, attributes)?,
                tls: ingress_tls(&target, attributes)?,
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    fn apply_update(existing: &mut Ingress, changes: &ResourceSpec) -> Result<()> {
        let target = changes.target();
        let attributes = &changes.attributes;
        fields::merge_metadata(&mut existing.metadata, changes);

        let spec = existing.spec.get_or_insert_with(Default::default);
        if let Some(class) = fields::optional_string(&target, attributes, attrs::INGRESS_CLASS)? {
            spec.ingress_class_name = Some(class);
        }
        if let Some(rules) = ingress_rules(&target, attributes)? {
            spec.rules = Some(rules);
        }
        if let Some(tls) = ingress_tls(&target, attributes)? {
            spec.tls = Some(tls);
        }
        Ok(())
    }

    fn summarize(ingress: &Ingress) -> Vec<(String, String)> {
        let mut details = Vec::new();
        let Some(spec) = &ingress.spec else {
            return details;
        };

        if let Some(class) = &spec.ingress_class_name {
            details.push(detail("class", class));
        }
        let rules = spec.rules.as_deref().unwrap_or_default();
        let hosts: Vec<&str> = rules
            .iter()
            .map(|r| r.host.as_deref().unwrap_or("*"))
            .collect();
        if !hosts.is_empty() {
            details.push(detail("hosts", hosts.join(",")));
        }
        for rule in rules {
            let host = rule.host.as_deref().unwrap_or("*");
            for path in rule.http.iter().flat_map(|h| h.paths.iter()) {
                details.push(detail("route", describe_route(host, path)));
            }
        }
        details.push(detail("tls", spec.tls.as_ref().map_or(0, Vec::len)));
        details
    }
}

/// `shop.example.com/api (Prefix) → api:8080`
fn describe_route(host: &str, path: &HTTPIngressPath) -> String {
    let backend = match &path.backend.service {
        Some(service) => {
            let port = service.port.as_ref().and_then(|p| {
                p.number
                    .map(|n| n.to_string())
                    .or_else(|| p.name.clone())
            });
            match port {
                Some(port) => format!("{}:{}", service.name, port),
                None => service.name.clone(),
            }
        }
        None => "-".to_string(),
    };
    format!(
        "{}{} ({}) → {}",
        host,
        path.path.as_deref().unwrap_or(DEFAULT_PATH),
        path.path_type,
        backend
    )
}

fn check_fields(target: &ResourceRef, attributes: &Attributes) -> Result<()> {
    fields::check_metadata(target, attributes)?;
    fields::optional_string(target, attributes, attrs::INGRESS_CLASS)?;
    ingress_tls(target, attributes)?;

    if has_shorthand(attributes) && attributes.contains_key(attrs::RULES) {
        return Err(KubegripError::conflict(
            target,
            "use either rules or the host/path/service/port shorthand, not both",
        ));
    }
    Ok(())
}

fn has_shorthand(attributes: &Attributes) -> bool {
    [attrs::HOST, attrs::PATH, attrs::SERVICE, attrs::PORT]
        .iter()
        .any(|key| attributes.contains_key(*key))
}

/// `None` when neither `rules` nor the shorthand is present
fn ingress_rules(target: &ResourceRef, attributes: &Attributes) -> Result<Option<Vec<IngressRule>>> {
    if let Some(value) = attributes.get(attrs::RULES) {
        let rules = fields::map_entries(target, attrs::RULES, value)?
            .into_iter()
            .enumerate()
            .map(|(i, rule)| ingress_rule(target, &format!("rules[{}]", i), rule))
            .collect::<Result<Vec<_>>>()?;
        return Ok(Some(rules));
    }
    if has_shorthand(attributes) {
        return ingress_rule(target, "ingress", attributes).map(|rule| Some(vec![rule]));
    }
    Ok(None)
}

fn ingress_rule(target: &ResourceRef, field: &str, rule: &Attributes) -> Result<IngressRule> {
    let paths = match rule.get(attrs::PATHS) {
        Some(value) => {
            let entries = fields::map_entries(target, &format!("{}.paths", field), value)?;
            if entries.is_empty() {
                return Err(KubegripError::validation(
                    target,
                    format!("{}.paths must not be empty", field),
                ));
            }
            entries
                .into_iter()
                .enumerate()
                .map(|(i, entry)| ingress_path(target, &format!("{}.paths[{}]", field, i), entry))
                .collect::<Result<Vec<_>>>()?
        }
        None => vec![ingress_path(target, field, rule)?],
    };

    Ok(IngressRule {
        host: fields::optional_string(target, rule, attrs::HOST)?,
        http: Some(HTTPIngressRuleValue { paths }),
    })
}

fn ingress_path(target: &ResourceRef, field: &str, entry: &Attributes) -> Result<HTTPIngressPath> {
    let service = fields::optional_string(target, entry, attrs::SERVICE)?
        .ok_or_else(|| KubegripError::validation(target, format!("{}.service is required", field)))?;
    let port = entry
        .get(attrs::PORT)
        .ok_or_else(|| KubegripError::validation(target, format!("{}.port is required", field)))?;
    let port = match coerce::to_int_or_string(port) {
        Ok(IntOrString::Int(number)) => ServiceBackendPort {
            number: Some(number),
            ..Default::default()
        },
        Ok(IntOrString::String(name)) => ServiceBackendPort {
            name: Some(name),
            ..Default::default()
        },
        Err(e) => {
            return Err(KubegripError::validation(
                target,
                format!("{}.port: {}", field, e),
            ))
        }
    };

    Ok(HTTPIngressPath {
        path: Some(
            fields::optional_string(target, entry, attrs::PATH)?
                .unwrap_or_else(|| DEFAULT_PATH.to_string()),
        ),
        path_type: fields::optional_enum(target, entry, attrs::PATH_TYPE, PATH_TYPES)?
            .unwrap_or(DEFAULT_PATH_TYPE)
            .to_string(),
        backend: IngressBackend {
            service: Some(IngressServiceBackend {
                name: service,
                port: Some(port),
            }),
            ..Default::default()
        },
    })
}

fn ingress_tls(target: &ResourceRef, attributes: &Attributes) -> Result<Option<Vec<IngressTLS>>> {
    let Some(value) = attributes.get(attrs::TLS) else {
        return Ok(None);
    };
    fields::map_entries(target, attrs::TLS, value)?
        .into_iter()
        .map(|entry| -> Result<IngressTLS> {
            let hosts = fields::optional_list(target, entry, attrs::HOSTS)?;
            Ok(IngressTLS {
                hosts: hosts.map(|h| to_reference_list(Some(h))),
                secret_name: fields::optional_string(target, entry, attrs::SECRET_NAME)?,
            })
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}
