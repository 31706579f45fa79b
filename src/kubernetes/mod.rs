// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for client creation and namespace checks.

pub mod client;
pub mod namespaces;

pub use client::{load_registry, registry_from_kubeconfig};
pub use namespaces::namespace_exists;
