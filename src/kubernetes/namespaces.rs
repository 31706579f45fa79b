// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Namespace existence checks

use crate::error::is_not_found;
use k8s_openapi::api::core::v1::Namespace;
use kube::{Api, Client};
use tracing::{debug, instrument};

/// Check whether a namespace exists. Only a not-found answer yields `false`;
/// any other failure is returned to the caller.
#[instrument(skip(client))]
pub async fn namespace_exists(client: &Client, namespace: &str) -> kube::Result<bool> {
    let namespaces: Api<Namespace> = Api::all(client.clone());

    match namespaces.get(namespace).await {
        Ok(_) => {
            debug!("Namespace {} exists", namespace);
            Ok(true)
        }
        Err(e) if is_not_found(&e) => {
            debug!("Namespace {} does not exist", namespace);
            Ok(false)
        }
        Err(e) => Err(e),
    }
}
