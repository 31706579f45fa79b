// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cluster client creation from kubeconfig contexts

use crate::config::Config;
use crate::constants::{DEFAULT_NAMESPACE, IN_CLUSTER_CONTEXT};
use crate::error::{KubegripError, Result};
use crate::registry::ClusterRegistry;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config as KConfig};
use tracing::{info, instrument, warn};

/// Build a registry holding one client per kubeconfig context.
///
/// Falls back to the inferred (in-cluster) configuration when no kubeconfig
/// can be read.
#[instrument(skip(config))]
pub async fn load_registry(config: &Config) -> Result<ClusterRegistry> {
    match Kubeconfig::read() {
        Ok(kubeconfig) => registry_from_kubeconfig(kubeconfig, config).await,
        Err(e) => {
            warn!("No readable kubeconfig ({}), trying in-cluster configuration", e);
            in_cluster_registry(config).await
        }
    }
}

/// Build a registry from an already parsed kubeconfig
pub async fn registry_from_kubeconfig(
    kubeconfig: Kubeconfig,
    config: &Config,
) -> Result<ClusterRegistry> {
    let registry = ClusterRegistry::new();

    for (name, namespace) in context_namespaces(&kubeconfig) {
        let client = create_client_from_kubeconfig(&kubeconfig, &name).await?;
        registry.register(&name, client, &namespace).await;
    }

    let Some(current) = initial_context(&kubeconfig, config) else {
        return Err(KubegripError::Kubeconfig(
            "kubeconfig has no current-context and KUBEGRIP_CONTEXT is not set".to_string(),
        ));
    };
    registry.set_current(&current).await?;

    if let Some(namespace) = &config.namespace {
        registry.set_namespace(namespace).await?;
    }

    info!(
        "Loaded {} context(s), current context {} in namespace {}",
        registry.contexts().await.len(),
        current,
        registry.current_namespace().await
    );
    Ok(registry)
}

async fn in_cluster_registry(config: &Config) -> Result<ClusterRegistry> {
    let kconfig = KConfig::infer()
        .await
        .map_err(|e| KubegripError::Kubeconfig(format!("Failed to infer config: {}", e)))?;
    let namespace = config
        .namespace
        .clone()
        .unwrap_or_else(|| kconfig.default_namespace.clone());

    let client = Client::try_from(kconfig)
        .map_err(|e| KubegripError::Kubeconfig(format!("Failed to create client: {}", e)))?;

    let registry = ClusterRegistry::new();
    registry.register(IN_CLUSTER_CONTEXT, client, &namespace).await;
    registry.set_current(IN_CLUSTER_CONTEXT).await?;
    Ok(registry)
}

/// Context names with the namespace each one defaults to
pub fn context_namespaces(kubeconfig: &Kubeconfig) -> Vec<(String, String)> {
    kubeconfig
        .contexts
        .iter()
        .map(|named| {
            let namespace = named
                .context
                .as_ref()
                .and_then(|c| c.namespace.clone())
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
            (named.name.clone(), namespace)
        })
        .collect()
}

/// The context to start in: the configured one, else the kubeconfig's current-context
pub fn initial_context(kubeconfig: &Kubeconfig, config: &Config) -> Option<String> {
    config
        .context
        .clone()
        .or_else(|| kubeconfig.current_context.clone())
}

/// Create a Kubernetes client for one context of a kubeconfig
async fn create_client_from_kubeconfig(kubeconfig: &Kubeconfig, context: &str) -> Result<Client> {
    let options = KubeConfigOptions {
        context: Some(context.to_string()),
        ..Default::default()
    };

    let client_config = KConfig::from_custom_kubeconfig(kubeconfig.clone(), &options)
        .await
        .map_err(|e| {
            KubegripError::Kubeconfig(format!(
                "Failed to create config for context {}: {}",
                context, e
            ))
        })?;

    Client::try_from(client_config).map_err(|e| {
        KubegripError::Kubeconfig(format!(
            "Failed to create client for context {}: {}",
            context, e
        ))
    })
}
