// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The CRUD operation template shared by every resource kind.
//!
//! Every operation moves through validating, resolving the client,
//! (verifying the namespace,) building the typed object and calling the API,
//! retrying reads on transient failures. Kind-specific behaviour lives behind
//! [`KindRules`].

pub mod configmap;
pub mod deployment;
pub mod fields;
pub mod ingress;
pub mod secret;
pub mod service;


use crate::config::Config;
use crate::constants::BULK_DELETE_CONCURRENCY;
use crate::error::{is_not_found, KubegripError, ResourceRef, Result};
use crate::kubernetes::namespace_exists;
use crate::registry::ClusterRegistry;
use crate::retry::{retry_with_backoff, RetryConfig, RetryError};
use crate::types::{
    Action, BulkDeleteSummary, ListOutcome, ListScope, OperationResult, ResourceKind, ResourceSpec,
};
use futures::{stream, StreamExt};
use k8s_openapi::NamespaceResourceScope;
use kube::api::{DeleteParams, ListParams, PostParams};
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

pub use configmap::ConfigMaps;
pub use deployment::Deployments;
pub use ingress::Ingresses;
pub use secret::Secrets;
pub use service::Services;

/// Per-kind validation, construction and update rules
pub trait KindRules {
    type Object: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static;

    const KIND: ResourceKind;

    /// Kind-specific checks on a full spec: mandatory fields, enumerations,
    /// ports and conflicting combinations. Runs before any API call.
    fn validate(spec: &ResourceSpec) -> Result<()>;

    /// Checks for a partial spec: only what is present is validated
    fn validate_changes(changes: &ResourceSpec) -> Result<()>;

    /// Build the typed object from a spec that passed [`KindRules::validate`]
    fn build(spec: &ResourceSpec) -> Result<Self::Object>;

    /// Apply a validated partial spec to a fetched object. Map-valued fields
    /// merge key by key; list-valued fields are replaced when present.
    fn apply_update(existing: &mut Self::Object, changes: &ResourceSpec) -> Result<()>;

    /// Salient derived fields for an [`OperationResult`]
    fn summarize(object: &Self::Object) -> Vec<(String, String)>;
}

/// Deadlines and retry policy applied to every API call
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSettings {
    /// Deadline for each read/list attempt
    pub read_timeout: Duration,
    /// Deadline for a create, replace or delete call
    pub write_timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ControllerSettings {
    fn from(config: &Config) -> Self {
        Self {
            read_timeout: config.read_timeout,
            write_timeout: config.write_timeout,
            retry: config.retry.clone(),
        }
    }
}

/// Failure of a single read attempt
#[derive(Debug, Error)]
enum ReadFailure {
    #[error("{0}")]
    Api(kube::Error),
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

impl ReadFailure {
    fn is_retryable(&self) -> bool {
        match self {
            ReadFailure::Api(e) => !is_not_found(e),
            ReadFailure::TimedOut(_) => true,
        }
    }
}

/// CRUD operations for one resource kind against the registry's current context
pub struct ResourceController<K: KindRules> {
    registry: Arc<ClusterRegistry>,
    settings: ControllerSettings,
    _kind: PhantomData<fn() -> K>,
}

pub type DeploymentController = ResourceController<Deployments>;
pub type ServiceController = ResourceController<Services>;
pub type IngressController = ResourceController<Ingresses>;
pub type ConfigMapController = ResourceController<ConfigMaps>;
pub type SecretController = ResourceController<Secrets>;

impl<K: KindRules> ResourceController<K> {
    pub fn new(registry: Arc<ClusterRegistry>, settings: ControllerSettings) -> Self {
        Self {
            registry,
            settings,
            _kind: PhantomData,
        }
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    #[instrument(skip(self, spec), fields(kind = %K::KIND, name = %spec.name, namespace = %spec.namespace))]
    pub async fn create(&self, spec: &ResourceSpec) -> Result<OperationResult> {
        let target = spec.target();

        debug!(phase = "validating");
        check_kind::<K>(spec)?;
        check_identity(&target)?;
        K::validate(spec)?;

        debug!(phase = "resolving-client");
        let client = self.registry.current_client().await?;

        debug!(phase = "verifying-namespace");
        self.verify_namespace(&client, &target, &spec.namespace).await?;

        debug!(phase = "building-typed-object");
        let object = K::build(spec)?;

        debug!(phase = "calling-api");
        let api: Api<K::Object> = Api::namespaced(client, &spec.namespace);
        let created = self
            .write(&target, "create", api.create(&PostParams::default(), &object))
            .await?;

        info!("Created {}", target);
        Ok(
            OperationResult::new(K::KIND, &spec.name, &spec.namespace, Action::Created)
                .with_details(K::summarize(&created)),
        )
    }

    #[instrument(skip(self), fields(kind = %K::KIND))]
    pub async fn get(&self, name: &str, namespace: &str) -> Result<K::Object> {
        let target = ResourceRef::new(K::KIND, name, namespace);
        check_identity(&target)?;

        let client = self.registry.current_client().await?;
        let api: Api<K::Object> = Api::namespaced(client, namespace);
        self.fetch(&api, &target)
            .await
            .map_err(|e| e.exhausted_as_not_found(&target))
    }

    #[instrument(skip(self), fields(kind = %K::KIND))]
    pub async fn list(
        &self,
        scope: &ListScope,
        selector: Option<&str>,
    ) -> Result<ListOutcome<K::Object>> {
        let namespace = match scope {
            ListScope::Namespace(ns) => Some(ns.as_str()),
            ListScope::AllNamespaces => None,
        };
        let target = ResourceRef::collection(K::KIND, namespace);
        if namespace.is_some_and(str::is_empty) {
            return Err(KubegripError::validation(&target, "namespace is required"));
        }

        let client = self.registry.current_client().await?;
        let api: Api<K::Object> = match namespace {
            Some(ns) => Api::namespaced(client, ns),
            None => Api::all(client),
        };

        let selector = selector.map(str::trim).filter(|s| !s.is_empty());
        let mut params = ListParams::default();
        if let Some(selector) = selector {
            params = params.labels(selector);
        }

        let list = self.read(&target, "list", || api.list(&params)).await?;
        debug!("Listed {} {} resource(s)", list.items.len(), K::KIND);
        Ok(ListOutcome::from_items(list.items, scope, selector))
    }

    /// Apply a partial spec to an existing object and replace it
    #[instrument(skip(self, changes), fields(kind = %K::KIND, name = %changes.name, namespace = %changes.namespace))]
    pub async fn update(&self, changes: &ResourceSpec) -> Result<OperationResult> {
        let target = changes.target();

        debug!(phase = "validating");
        check_kind::<K>(changes)?;
        check_identity(&target)?;
        K::validate_changes(changes)?;

        debug!(phase = "resolving-client");
        let client = self.registry.current_client().await?;
        let api: Api<K::Object> = Api::namespaced(client, &changes.namespace);

        let mut object = self.fetch(&api, &target).await?;

        debug!(phase = "building-typed-object");
        K::apply_update(&mut object, changes)?;

        debug!(phase = "calling-api");
        let updated = self
            .write(
                &target,
                "update",
                api.replace(&changes.name, &PostParams::default(), &object),
            )
            .await?;

        info!("Updated {}", target);
        Ok(
            OperationResult::new(K::KIND, &changes.name, &changes.namespace, Action::Updated)
                .with_details(K::summarize(&updated)),
        )
    }

    /// Delete one object. Deleting something that is already gone is NotFound.
    #[instrument(skip(self), fields(kind = %K::KIND))]
    pub async fn delete(&self, name: &str, namespace: &str, force: bool) -> Result<OperationResult> {
        let target = ResourceRef::new(K::KIND, name, namespace);
        check_identity(&target)?;

        let client = self.registry.current_client().await?;
        let api: Api<K::Object> = Api::namespaced(client, namespace);

        self.fetch(&api, &target).await?;

        debug!(phase = "calling-api");
        self.write(&target, "delete", api.delete(name, &delete_params(force)))
            .await?;

        info!("Deleted {}", target);
        let mut details = vec![fields::detail("propagation", "Background")];
        if force {
            details.push(fields::detail("gracePeriodSeconds", 0));
        }
        Ok(OperationResult::new(K::KIND, name, namespace, Action::Deleted).with_details(details))
    }

    /// Delete every object matching `selector`, continuing past individual
    /// failures. Fails only when nothing matched or nothing could be deleted.
    #[instrument(skip(self), fields(kind = %K::KIND))]
    pub async fn delete_by_selector(
        &self,
        namespace: &str,
        selector: &str,
        force: bool,
    ) -> Result<BulkDeleteSummary> {
        let target = ResourceRef::collection(K::KIND, Some(namespace));
        if namespace.is_empty() {
            return Err(KubegripError::validation(&target, "namespace is required"));
        }
        let selector = selector.trim();
        if selector.is_empty() {
            return Err(KubegripError::validation(&target, "label selector is required"));
        }

        let client = self.registry.current_client().await?;
        let api: Api<K::Object> = Api::namespaced(client, namespace);
        let params = ListParams::default().labels(selector);

        let matches = self.read(&target, "list", || api.list(&params)).await?;
        if matches.items.is_empty() {
            return Err(KubegripError::NotFound {
                target,
                what: format!("{} resources matching '{}'", K::KIND, selector),
                attempts: 1,
                cause: None,
            });
        }

        let delete_params = delete_params(force);
        let (api, delete_params) = (&api, &delete_params);
        let mut outcomes: Vec<(String, Result<()>)> = stream::iter(matches.items.iter().map(|o| o.name_any()))
            .map(|name| async move {
                let item = ResourceRef::new(K::KIND, &name, namespace);
                let outcome = self
                    .write(&item, "delete", api.delete(&name, delete_params))
                    .await
                    .map(|_| ());
                (name, outcome)
            })
            .buffer_unordered(BULK_DELETE_CONCURRENCY)
            .collect()
            .await;
        outcomes.sort_by(|a, b| a.0.cmp(&b.0));

        let mut deleted = Vec::new();
        let mut failed = Vec::new();
        for (name, outcome) in outcomes {
            match outcome {
                Ok(()) => deleted.push(name),
                Err(e) => {
                    warn!("Failed to delete {} {}/{}: {}", K::KIND, namespace, name, e);
                    failed.push((name, e.to_string()));
                }
            }
        }

        if deleted.is_empty() {
            return Err(KubegripError::BulkDelete {
                target,
                selector: selector.to_string(),
                failures: failed,
            });
        }

        info!(
            "Deleted {} of {} {} resource(s) matching '{}'",
            deleted.len(),
            deleted.len() + failed.len(),
            K::KIND,
            selector
        );
        Ok(BulkDeleteSummary {
            kind: K::KIND,
            namespace: namespace.to_string(),
            selector: selector.to_string(),
            deleted,
            failed,
        })
    }

    /// Existence check for the target namespace, retried like any read
    async fn verify_namespace(&self, client: &Client, target: &ResourceRef, namespace: &str) -> Result<()> {
        let exists = self
            .read(target, "namespace check", || namespace_exists(client, namespace))
            .await?;
        if exists {
            Ok(())
        } else {
            Err(KubegripError::namespace_not_found(target, namespace))
        }
    }

    async fn fetch(&self, api: &Api<K::Object>, target: &ResourceRef) -> Result<K::Object> {
        self.read(target, "get", || api.get(&target.name)).await
    }

    /// Bounded-timeout read through the retry policy. Not-found is never retried.
    async fn read<T, F, Fut>(&self, target: &ResourceRef, operation: &'static str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = kube::Result<T>>,
    {
        let timeout = self.settings.read_timeout;
        let outcome = retry_with_backoff(
            &self.settings.retry,
            operation,
            ReadFailure::is_retryable,
            || {
                let attempt = call();
                async move {
                    match tokio::time::timeout(timeout, attempt).await {
                        Ok(Ok(value)) => Ok(value),
                        Ok(Err(e)) => Err(ReadFailure::Api(e)),
                        Err(_) => Err(ReadFailure::TimedOut(timeout)),
                    }
                }
            },
        )
        .await;

        match outcome {
            Ok(value) => Ok(value),
            Err(RetryError {
                error: ReadFailure::Api(e),
                ..
            }) if is_not_found(&e) => Err(KubegripError::not_found(target)),
            Err(RetryError {
                error: ReadFailure::Api(e),
                attempts,
                ..
            }) => Err(KubegripError::Transient {
                target: target.clone(),
                attempts,
                source: e,
            }),
            Err(RetryError {
                error: ReadFailure::TimedOut(after),
                attempts,
                ..
            }) => Err(KubegripError::Timeout {
                target: target.clone(),
                operation,
                after,
                attempts,
            }),
        }
    }

    /// Single bounded-timeout write. Writes are never retried.
    async fn write<T>(
        &self,
        target: &ResourceRef,
        operation: &'static str,
        call: impl Future<Output = kube::Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.settings.write_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) if is_not_found(&e) => Err(KubegripError::not_found(target)),
            Ok(Err(e)) => Err(KubegripError::Api {
                target: target.clone(),
                source: e,
            }),
            Err(_) => Err(KubegripError::Timeout {
                target: target.clone(),
                operation,
                after: self.settings.write_timeout,
                attempts: 1,
            }),
        }
    }
}

/// Background cascade; `force` drops the grace period to zero
pub fn delete_params(force: bool) -> DeleteParams {
    let params = DeleteParams::background();
    if force {
        params.grace_period(0)
    } else {
        params
    }
}

fn check_kind<K: KindRules>(spec: &ResourceSpec) -> Result<()> {
    if spec.kind == K::KIND {
        Ok(())
    } else {
        Err(KubegripError::validation(
            &spec.target(),
            format!("expected a {} spec, got {}", K::KIND, spec.kind),
        ))
    }
}

/// Name and namespace must be non-empty
fn check_identity(target: &ResourceRef) -> Result<()> {
    if target.name.trim().is_empty() {
        return Err(KubegripError::validation(target, "name is required"));
    }
    if target.namespace.as_deref().map_or(true, |ns| ns.trim().is_empty()) {
        return Err(KubegripError::validation(target, "namespace is required"));
    }
    Ok(())
}
