// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Serialized operation requests and their dispatch to the per-kind
//! controllers. Results come back as JSON.

use crate::controllers::{
    ConfigMaps, ControllerSettings, Deployments, Ingresses, KindRules, ResourceController, Secrets,
    Services,
};
use crate::error::Result;
use crate::registry::ClusterRegistry;
use crate::types::{Attributes, ListScope, ResourceKind, ResourceSpec};
use kube::ResourceExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Get,
    List,
    Update,
    Delete,
}

/// One operation against one resource kind, e.g.
///
/// ```yaml
/// operation: create
/// kind: Service
/// name: web
/// attributes:
///   type: NodePort
///   ports:
///     - port: 80
///       nodePort: 30080
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub operation: Operation,
    pub kind: ResourceKind,
    #[serde(default)]
    pub name: Option<String>,
    /// Defaults to the registry's current namespace
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub attributes: Attributes,
    /// Label selector for `list`, and for `delete` without a name
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub all_namespaces: bool,
    #[serde(default)]
    pub force: bool,
}

/// Run a request against the registry's current context
#[instrument(skip(registry, settings, request), fields(operation = ?request.operation, kind = %request.kind))]
pub async fn execute(
    registry: Arc<ClusterRegistry>,
    settings: &ControllerSettings,
    request: &Request,
) -> Result<Value> {
    let namespace = match &request.namespace {
        Some(namespace) => namespace.clone(),
        None => registry.current_namespace().await,
    };
    debug!("Resolved namespace {}", namespace);

    match request.kind {
        ResourceKind::Deployment => run::<Deployments>(registry, settings, request, &namespace).await,
        ResourceKind::Service => run::<Services>(registry, settings, request, &namespace).await,
        ResourceKind::Ingress => run::<Ingresses>(registry, settings, request, &namespace).await,
        ResourceKind::ConfigMap => run::<ConfigMaps>(registry, settings, request, &namespace).await,
        ResourceKind::Secret => run::<Secrets>(registry, settings, request, &namespace).await,
    }
}

async fn run<K: KindRules>(
    registry: Arc<ClusterRegistry>,
    settings: &ControllerSettings,
    request: &Request,
    namespace: &str,
) -> Result<Value> {
    let controller = ResourceController::<K>::new(registry, settings.clone());
    let name = request.name.as_deref().unwrap_or_default();
    let selector = request.selector.as_deref();

    match request.operation {
        Operation::Create | Operation::Update => {
            let spec = ResourceSpec::new(request.kind, name, namespace)
                .with_attributes(request.attributes.clone());
            let result = if request.operation == Operation::Create {
                controller.create(&spec).await?
            } else {
                controller.update(&spec).await?
            };
            Ok(serde_json::to_value(result)?)
        }
        Operation::Get => {
            let object = controller.get(name, namespace).await?;
            Ok(json!({
                "kind": K::KIND,
                "name": object.name_any(),
                "namespace": namespace,
                "details": K::summarize(&object),
                "object": manifest::<K>(&object)?,
            }))
        }
        Operation::List => {
            let scope = if request.all_namespaces {
                ListScope::AllNamespaces
            } else {
                ListScope::Namespace(namespace.to_string())
            };
            let outcome = controller.list(&scope, selector).await?;
            let message = outcome.empty_message(K::KIND);
            let items: Vec<Value> = outcome
                .items()
                .iter()
                .map(|object| {
                    json!({
                        "name": object.name_any(),
                        "namespace": object.namespace(),
                        "details": K::summarize(object),
                    })
                })
                .collect();
            Ok(json!({ "kind": K::KIND, "items": items, "message": message }))
        }
        Operation::Delete => match selector.filter(|_| name.is_empty()) {
            Some(selector) => {
                let summary = controller
                    .delete_by_selector(namespace, selector, request.force)
                    .await?;
                Ok(serde_json::to_value(summary)?)
            }
            None => {
                let result = controller.delete(name, namespace, request.force).await?;
                Ok(serde_json::to_value(result)?)
            }
        },
    }
}

/// The object as JSON, minus secret payloads
fn manifest<K: KindRules>(object: &K::Object) -> Result<Value> {
    let mut value = serde_json::to_value(object)?;
    if K::KIND == ResourceKind::Secret {
        if let Some(fields) = value.as_object_mut() {
            fields.remove("data");
            fields.remove("stringData");
        }
    }
    Ok(value)
}
