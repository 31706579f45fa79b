// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::types::ResourceKind;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Identifies the resource an operation was acting on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub name: String,
    pub namespace: Option<String>,
}

impl ResourceRef {
    pub fn new(kind: ResourceKind, name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            namespace: Some(namespace.into()),
        }
    }

    /// A reference to a collection rather than a single named object
    pub fn collection(kind: ResourceKind, namespace: Option<&str>) -> Self {
        Self {
            kind,
            name: String::new(),
            namespace: namespace.map(str::to_string),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.name.is_empty() { "*" } else { &self.name };
        match &self.namespace {
            Some(ns) if !ns.is_empty() => write!(f, "{} {}/{}", self.kind, ns, name),
            Some(_) => write!(f, "{} {}", self.kind, name),
            None => write!(f, "{} {} (all namespaces)", self.kind, name),
        }
    }
}

#[derive(Error, Debug)]
pub enum KubegripError {
    #[error("validation failed for {target}: {message}")]
    Validation { target: ResourceRef, message: String },

    #[error("{what} not found ({target}){}", exhaustion(.cause))]
    NotFound {
        target: ResourceRef,
        what: String,
        /// Reads made before giving up
        attempts: u32,
        /// Last failure when the read ran out of attempts rather than seeing a 404
        #[source]
        cause: Option<Box<KubegripError>>,
    },

    #[error("{target}: still failing after {attempts} attempt(s): {source}")]
    Transient {
        target: ResourceRef,
        attempts: u32,
        #[source]
        source: kube::Error,
    },

    #[error("conflicting fields for {target}: {message}")]
    Conflict { target: ResourceRef, message: String },

    #[error("{operation} of {target} timed out after {after:?} ({attempts} attempt(s))")]
    Timeout {
        target: ResourceRef,
        operation: &'static str,
        after: Duration,
        attempts: u32,
    },

    #[error("Kubernetes API rejected request for {target}: {source}")]
    Api {
        target: ResourceRef,
        #[source]
        source: kube::Error,
    },

    #[error("none of the {} resource(s) matching '{selector}' could be deleted ({target})", .failures.len())]
    BulkDelete {
        target: ResourceRef,
        selector: String,
        failures: Vec<(String, String)>,
    },

    #[error("no cluster context configured: {0}")]
    NotConfigured(String),

    #[error("Failed to load kubeconfig: {0}")]
    Kubeconfig(String),

    #[error("Failed to serialize result: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl KubegripError {
    pub fn validation(target: &ResourceRef, message: impl Into<String>) -> Self {
        Self::Validation {
            target: target.clone(),
            message: message.into(),
        }
    }

    pub fn conflict(target: &ResourceRef, message: impl Into<String>) -> Self {
        Self::Conflict {
            target: target.clone(),
            message: message.into(),
        }
    }

    pub fn not_found(target: &ResourceRef) -> Self {
        Self::NotFound {
            target: target.clone(),
            what: format!("{} '{}'", target.kind, target.name),
            attempts: 1,
            cause: None,
        }
    }

    pub fn namespace_not_found(target: &ResourceRef, namespace: &str) -> Self {
        Self::NotFound {
            target: target.clone(),
            what: format!("namespace '{}'", namespace),
            attempts: 1,
            cause: None,
        }
    }

    /// Report a read that ran out of attempts as the target being absent,
    /// keeping the attempt count and the last failure. Other errors pass
    /// through unchanged.
    pub fn exhausted_as_not_found(self, target: &ResourceRef) -> Self {
        let attempts = match &self {
            Self::Transient { attempts, .. } | Self::Timeout { attempts, .. } => *attempts,
            _ => return self,
        };
        Self::NotFound {
            target: target.clone(),
            what: format!("{} '{}'", target.kind, target.name),
            attempts,
            cause: Some(Box::new(self)),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// The resource the failure is about, when there is one
    pub fn target(&self) -> Option<&ResourceRef> {
        match self {
            Self::Validation { target, .. }
            | Self::NotFound { target, .. }
            | Self::Transient { target, .. }
            | Self::Conflict { target, .. }
            | Self::Timeout { target, .. }
            | Self::Api { target, .. }
            | Self::BulkDelete { target, .. } => Some(target),
            Self::NotConfigured(_) | Self::Kubeconfig(_) | Self::Serialization(_) => None,
        }
    }
}

fn exhaustion(cause: &Option<Box<KubegripError>>) -> String {
    match cause.as_deref() {
        Some(KubegripError::Transient { attempts, source, .. }) => {
            format!(" after {} attempt(s): {}", attempts, source)
        }
        Some(KubegripError::Timeout { attempts, after, .. }) => {
            format!(" after {} attempt(s): timed out after {:?}", attempts, after)
        }
        Some(other) => format!(": {}", other),
        None => String::new(),
    }
}

/// Whether a Kubernetes error is the terminal "not found" signal.
///
/// Decided on the response content, not the error type: a 404 status code or a
/// `NotFound` reason both qualify.
pub fn is_not_found(err: &kube::Error) -> bool {
    match err {
        kube::Error::Api(resp) => resp.code == 404 || resp.reason == "NotFound",
        _ => false,
    }
}

pub type Result<T> = std::result::Result<T, KubegripError>;

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: "boom".to_string(),
            reason: reason.to_string(),
            code,
        })
    }

    #[test]
    fn test_is_not_found_by_code() {
        assert!(is_not_found(&api_error(404, "")));
    }

    #[test]
    fn test_is_not_found_by_reason() {
        assert!(is_not_found(&api_error(410, "NotFound")));
    }

    #[test]
    fn test_server_error_is_not_not_found() {
        assert!(!is_not_found(&api_error(500, "InternalError")));
    }

    #[test]
    fn test_errors_name_their_target() {
        let target = ResourceRef::new(ResourceKind::Service, "web", "shop");
        let err = KubegripError::not_found(&target);
        assert_eq!(err.to_string(), "Service 'web' not found (Service shop/web)");

        let err = KubegripError::namespace_not_found(&target, "shop");
        assert!(err.to_string().contains("namespace 'shop'"));
        assert_eq!(err.target(), Some(&target));
    }

    #[test]
    fn test_exhausted_read_is_not_found_with_cause() {
        let target = ResourceRef::new(ResourceKind::ConfigMap, "settings", "shop");
        let transient = KubegripError::Transient {
            target: target.clone(),
            attempts: 3,
            source: api_error(500, "InternalError"),
        };

        let err = transient.exhausted_as_not_found(&target);

        match &err {
            KubegripError::NotFound { attempts, cause, .. } => {
                assert_eq!(*attempts, 3);
                assert!(matches!(cause.as_deref(), Some(KubegripError::Transient { .. })));
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
        assert!(err.to_string().contains("after 3 attempt(s)"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_exhausted_leaves_other_errors_alone() {
        let target = ResourceRef::new(ResourceKind::ConfigMap, "settings", "shop");
        let err = KubegripError::conflict(&target, "nope").exhausted_as_not_found(&target);
        assert!(err.is_conflict());
    }

    #[test]
    fn test_collection_ref_display() {
        let all = ResourceRef::collection(ResourceKind::ConfigMap, None);
        assert_eq!(all.to_string(), "ConfigMap * (all namespaces)");

        let scoped = ResourceRef::collection(ResourceKind::ConfigMap, Some("dev"));
        assert_eq!(scoped.to_string(), "ConfigMap dev/*");
    }

    #[test]
    fn test_not_configured_has_no_target() {
        let err = KubegripError::NotConfigured("no current context".to_string());
        assert!(err.target().is_none());
    }
}
