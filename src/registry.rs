// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Named cluster contexts and the "current" pointer controllers resolve
//! their client from.

use crate::constants::DEFAULT_NAMESPACE;
use crate::error::{KubegripError, Result};
use kube::Client;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// A cluster client together with the namespace operations default to
#[derive(Clone)]
pub struct ClusterContext {
    pub name: String,
    pub client: Client,
    pub namespace: String,
}

#[derive(Default)]
struct RegistryState {
    contexts: HashMap<String, ClusterContext>,
    current: Option<String>,
}

impl RegistryState {
    fn current(&self) -> Result<&ClusterContext> {
        let name = self.current.as_deref().ok_or_else(|| {
            KubegripError::NotConfigured("no current context selected".to_string())
        })?;
        self.contexts.get(name).ok_or_else(|| {
            KubegripError::NotConfigured(format!("current context '{}' is not registered", name))
        })
    }
}

/// Thread-safe map of named cluster contexts.
///
/// Reads share a read lock; switching context or namespace takes the write
/// lock and so never interleaves with an in-progress read.
#[derive(Default)]
pub struct ClusterRegistry {
    state: RwLock<RegistryState>,
}

impl ClusterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a context. An empty namespace means `default`.
    pub async fn register(&self, name: &str, client: Client, namespace: &str) {
        let namespace = if namespace.is_empty() {
            DEFAULT_NAMESPACE
        } else {
            namespace
        };
        let mut state = self.state.write().await;
        debug!("Registering context {} (namespace {})", name, namespace);
        state.contexts.insert(
            name.to_string(),
            ClusterContext {
                name: name.to_string(),
                client,
                namespace: namespace.to_string(),
            },
        );
    }

    pub async fn set_current(&self, name: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.contexts.contains_key(name) {
            return Err(KubegripError::NotConfigured(format!(
                "unknown context '{}'",
                name
            )));
        }
        state.current = Some(name.to_string());
        info!("Switched to context {}", name);
        Ok(())
    }

    /// Change the namespace of the current context
    pub async fn set_namespace(&self, namespace: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let name = state.current()?.name.clone();
        if let Some(ctx) = state.contexts.get_mut(&name) {
            ctx.namespace = if namespace.is_empty() {
                DEFAULT_NAMESPACE.to_string()
            } else {
                namespace.to_string()
            };
            info!("Context {} now defaults to namespace {}", name, ctx.namespace);
        }
        Ok(())
    }

    pub async fn current_client(&self) -> Result<Client> {
        let state = self.state.read().await;
        state.current().map(|ctx| ctx.client.clone())
    }

    /// Namespace of the current context, `default` when none is selected
    pub async fn current_namespace(&self) -> String {
        let state = self.state.read().await;
        state
            .current()
            .map(|ctx| ctx.namespace.clone())
            .unwrap_or_else(|_| DEFAULT_NAMESPACE.to_string())
    }

    pub async fn current_context(&self) -> Option<String> {
        self.state.read().await.current.clone()
    }

    /// Client and namespace of the current context, read under one lock
    pub async fn resolve(&self) -> Result<(Client, String)> {
        let state = self.state.read().await;
        state
            .current()
            .map(|ctx| (ctx.client.clone(), ctx.namespace.clone()))
    }

    /// Registered context names, sorted
    pub async fn contexts(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut names: Vec<String> = state.contexts.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockService;
    use std::sync::Arc;

    fn client() -> Client {
        MockService::new().into_client()
    }

    #[tokio::test]
    async fn test_empty_registry_is_not_configured() {
        let registry = ClusterRegistry::new();

        let err = registry.current_client().await.err().unwrap();
        assert!(matches!(err, KubegripError::NotConfigured(_)));
        assert_eq!(registry.current_namespace().await, "default");
        assert!(registry.current_context().await.is_none());
    }

    #[tokio::test]
    async fn test_registering_does_not_select_a_context() {
        let registry = ClusterRegistry::new();
        registry.register("prod", client(), "shop").await;

        assert!(registry.current_client().await.is_err());
    }

    #[tokio::test]
    async fn test_set_current_unknown_context() {
        let registry = ClusterRegistry::new();
        registry.register("prod", client(), "shop").await;

        let err = registry.set_current("staging").await.unwrap_err();
        assert!(err.to_string().contains("staging"));
        assert!(registry.current_context().await.is_none());
    }

    #[tokio::test]
    async fn test_switching_contexts() {
        let registry = ClusterRegistry::new();
        registry.register("prod", client(), "shop").await;
        registry.register("dev", client(), "").await;

        registry.set_current("prod").await.unwrap();
        assert_eq!(registry.current_namespace().await, "shop");

        registry.set_current("dev").await.unwrap();
        assert_eq!(registry.current_namespace().await, "default");
        assert_eq!(registry.current_context().await.as_deref(), Some("dev"));
        assert!(registry.current_client().await.is_ok());
        assert_eq!(registry.contexts().await, vec!["dev", "prod"]);
    }

    #[tokio::test]
    async fn test_set_namespace_requires_current_context() {
        let registry = ClusterRegistry::new();
        assert!(registry.set_namespace("shop").await.is_err());

        registry.register("prod", client(), "default").await;
        registry.set_current("prod").await.unwrap();
        registry.set_namespace("shop").await.unwrap();

        let (_, namespace) = registry.resolve().await.unwrap();
        assert_eq!(namespace, "shop");
    }

    #[tokio::test]
    async fn test_concurrent_reads_during_switches() {
        let registry = Arc::new(ClusterRegistry::new());
        registry.register("a", client(), "ns-a").await;
        registry.register("b", client(), "ns-b").await;
        registry.set_current("a").await.unwrap();

        let mut tasks = Vec::new();
        for i in 0..16 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                if i % 4 == 0 {
                    let target = if i % 8 == 0 { "a" } else { "b" };
                    registry.set_current(target).await.unwrap();
                }
                let (_, namespace) = registry.resolve().await.unwrap();
                assert!(namespace == "ns-a" || namespace == "ns-b");
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
    }
}
