// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Resource kinds managed by kubegrip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ResourceKind {
    Deployment,
    Service,
    Ingress,
    ConfigMap,
    Secret,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Deployment,
        ResourceKind::Service,
        ResourceKind::Ingress,
        ResourceKind::ConfigMap,
        ResourceKind::Secret,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Deployment => "Deployment",
            ResourceKind::Service => "Service",
            ResourceKind::Ingress => "Ingress",
            ResourceKind::ConfigMap => "ConfigMap",
            ResourceKind::Secret => "Secret",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "deployment" | "deployments" | "deploy" => Ok(ResourceKind::Deployment),
            "service" | "services" | "svc" => Ok(ResourceKind::Service),
            "ingress" | "ingresses" | "ing" => Ok(ResourceKind::Ingress),
            "configmap" | "configmaps" | "cm" => Ok(ResourceKind::ConfigMap),
            "secret" | "secrets" => Ok(ResourceKind::Secret),
            other => Err(format!(
                "unknown resource kind '{}', expected one of {}",
                other,
                ResourceKind::ALL.map(|k| k.as_str()).join(", ")
            )),
        }
    }
}

impl TryFrom<String> for ResourceKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ResourceKind> for String {
    fn from(kind: ResourceKind) -> Self {
        kind.as_str().to_string()
    }
}
