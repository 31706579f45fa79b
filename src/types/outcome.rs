// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Values handed back to callers once an operation finishes.

use super::kind::ResourceKind;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Created,
    Updated,
    Deleted,
}

/// Success descriptor for a mutating operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationResult {
    pub kind: ResourceKind,
    pub name: String,
    pub namespace: String,
    pub action: Action,
    /// Salient derived fields in display order, e.g. `("type", "NodePort")`
    pub details: Vec<(String, String)>,
}

impl OperationResult {
    pub fn new(
        kind: ResourceKind,
        name: impl Into<String>,
        namespace: impl Into<String>,
        action: Action,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            namespace: namespace.into(),
            action,
            details: Vec::new(),
        }
    }

    pub fn with_details(mut self, details: Vec<(String, String)>) -> Self {
        self.details = details;
        self
    }

    /// First value recorded for `key`
    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value recorded for `key`, in order
    pub fn details_for<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.details
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Where a list call looks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListScope {
    Namespace(String),
    AllNamespaces,
}

/// Result of a list call.
///
/// The three empty variants are distinct outcomes and are reported with
/// distinct messages.
#[derive(Debug, Clone, PartialEq)]
pub enum ListOutcome<T> {
    Items(Vec<T>),
    NoMatchesForSelector { selector: String },
    NoneClusterWide,
    NoneInNamespace { namespace: String },
}

impl<T> ListOutcome<T> {
    /// Classify a list response, picking the right empty outcome
    pub fn from_items(items: Vec<T>, scope: &ListScope, selector: Option<&str>) -> Self {
        if !items.is_empty() {
            return ListOutcome::Items(items);
        }
        match (selector.filter(|s| !s.is_empty()), scope) {
            (Some(selector), _) => ListOutcome::NoMatchesForSelector {
                selector: selector.to_string(),
            },
            (None, ListScope::AllNamespaces) => ListOutcome::NoneClusterWide,
            (None, ListScope::Namespace(ns)) => ListOutcome::NoneInNamespace {
                namespace: ns.clone(),
            },
        }
    }

    pub fn items(&self) -> &[T] {
        match self {
            ListOutcome::Items(items) => items,
            _ => &[],
        }
    }

    /// Message for the empty outcomes, `None` when items were found
    pub fn empty_message(&self, kind: ResourceKind) -> Option<String> {
        match self {
            ListOutcome::Items(_) => None,
            ListOutcome::NoMatchesForSelector { selector } => Some(format!(
                "no {} resources match selector '{}'",
                kind, selector
            )),
            ListOutcome::NoneClusterWide => {
                Some(format!("no {} resources found in any namespace", kind))
            }
            ListOutcome::NoneInNamespace { namespace } => Some(format!(
                "no {} resources found in namespace '{}'",
                kind, namespace
            )),
        }
    }
}

/// Outcome of deleting everything that matches a label selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkDeleteSummary {
    pub kind: ResourceKind,
    pub namespace: String,
    pub selector: String,
    pub deleted: Vec<String>,
    /// `(name, reason)` for every object that could not be deleted
    pub failed: Vec<(String, String)>,
}

impl BulkDeleteSummary {
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }
}
