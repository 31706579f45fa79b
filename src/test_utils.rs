// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities for mocking Kubernetes API responses.
//!
//! [`MockService`] answers scripted responses first and otherwise behaves like
//! a tiny API server backed by an in-memory object store, so controllers can
//! be driven end to end. Every request is recorded for call-count assertions.

use http::{Method, Request, Response};
use http_body_util::BodyExt;
use kube::client::Body;
use kube::Client;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tower::Service;

/// A request the mock received
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub body: Option<Value>,
}

struct Scripted {
    status: u16,
    body: String,
    /// Remaining uses; `None` answers forever
    remaining: Option<usize>,
    /// Held back this long before answering
    delay: Option<Duration>,
}

/// What the mock sends back for one request
struct Reply {
    status: u16,
    body: String,
    delay: Option<Duration>,
}

impl From<(u16, String)> for Reply {
    fn from((status, body): (u16, String)) -> Self {
        Self {
            status,
            body,
            delay: None,
        }
    }
}

/// Objects keyed by (api base + plural, namespace) and then by name
type Store = BTreeMap<(String, Option<String>), BTreeMap<String, Value>>;

#[derive(Default)]
struct MockState {
    scripted: HashMap<(String, String), Vec<Scripted>>,
    objects: Store,
    requests: Vec<RecordedRequest>,
    next_id: u64,
}

/// A mock HTTP service that returns predefined responses based on request paths.
#[derive(Clone)]
pub struct MockService {
    state: Arc<Mutex<MockState>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Always answer `method` on exactly `path` with this response
    pub fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.script(method, path, status, body, None, None)
    }

    /// Answer the next `times` matching requests, then fall through
    pub fn on_times(self, method: &str, path: &str, status: u16, body: &str, times: usize) -> Self {
        self.script(method, path, status, body, Some(times), None)
    }

    /// Hold every `method` request on `path` for `delay` before answering.
    /// The request is recorded when it arrives.
    pub fn on_delayed(self, method: &str, path: &str, delay: Duration) -> Self {
        let body = status_json(504, "Timeout", "the server was too slow");
        self.script(method, path, 504, &body, None, Some(delay))
    }

    /// Add a response for GET requests matching the exact path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    fn script(
        self,
        method: &str,
        path: &str,
        status: u16,
        body: &str,
        remaining: Option<usize>,
        delay: Option<Duration>,
    ) -> Self {
        self.state
            .lock()
            .unwrap()
            .scripted
            .entry((method.to_string(), path.to_string()))
            .or_default()
            .push(Scripted {
                status,
                body: body.to_string(),
                remaining,
                delay,
            });
        self
    }

    /// Seed a namespace into the object store
    pub fn with_namespace(self, name: &str) -> Self {
        self.with_object(serde_json::from_str(&namespace_json(name)).unwrap())
    }

    /// Seed any manifest of a supported kind into the object store
    pub fn with_object(self, manifest: Value) -> Self {
        let kind = manifest["kind"].as_str().unwrap_or_default().to_string();
        let (base, plural, namespaced) =
            api_location(&kind).unwrap_or_else(|| panic!("unsupported kind {}", kind));
        let name = manifest["metadata"]["name"].as_str().unwrap().to_string();
        let namespace = namespaced.then(|| {
            manifest["metadata"]["namespace"]
                .as_str()
                .unwrap_or("default")
                .to_string()
        });
        self.state
            .lock()
            .unwrap()
            .objects
            .entry((format!("{}/{}", base, plural), namespace))
            .or_default()
            .insert(name, manifest);
        self
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Number of requests made with `method`
    pub fn count(&self, method: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .filter(|r| r.method == method)
            .count()
    }

    /// Number of requests made with `method` on exactly `path`
    pub fn count_path(&self, method: &str, path: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    /// Stored object, if the mock holds one
    pub fn object(&self, api_base_plural: &str, namespace: Option<&str>, name: &str) -> Option<Value> {
        self.state
            .lock()
            .unwrap()
            .objects
            .get(&(api_base_plural.to_string(), namespace.map(str::to_string)))
            .and_then(|objects| objects.get(name))
            .cloned()
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

/// Parsed resource URL: collection key plus optional object name
struct ResourcePath {
    collection: String,
    namespace: Option<String>,
    name: Option<String>,
}

fn parse_path(path: &str) -> Option<ResourcePath> {
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    let (base, rest) = match segments.as_slice() {
        ["api", version, rest @ ..] => (format!("/api/{}", version), rest),
        ["apis", group, version, rest @ ..] => (format!("/apis/{}/{}", group, version), rest),
        _ => return None,
    };

    let (namespace, plural, name) = match rest {
        ["namespaces", ns, plural] => (Some(ns.to_string()), *plural, None),
        ["namespaces", ns, plural, name] => (Some(ns.to_string()), *plural, Some(name.to_string())),
        [plural] => (None, *plural, None),
        [plural, name] => (None, *plural, Some(name.to_string())),
        _ => return None,
    };

    Some(ResourcePath {
        collection: format!("{}/{}", base, plural),
        namespace,
        name,
    })
}

fn api_location(kind: &str) -> Option<(&'static str, &'static str, bool)> {
    match kind {
        "Namespace" => Some(("/api/v1", "namespaces", false)),
        "Service" => Some(("/api/v1", "services", true)),
        "ConfigMap" => Some(("/api/v1", "configmaps", true)),
        "Secret" => Some(("/api/v1", "secrets", true)),
        "Deployment" => Some(("/apis/apps/v1", "deployments", true)),
        "Ingress" => Some(("/apis/networking.k8s.io/v1", "ingresses", true)),
        _ => None,
    }
}

impl MockState {
    fn handle(&mut self, method: &Method, path: &str, query: Option<&str>, body: &[u8]) -> Reply {
        let parsed_body: Option<Value> = serde_json::from_slice(body).ok();
        self.requests.push(RecordedRequest {
            method: method.to_string(),
            path: path.to_string(),
            query: query.map(str::to_string),
            body: parsed_body.clone(),
        });

        if let Some(response) = self.take_scripted(method.as_str(), path) {
            return response;
        }

        let Some(target) = parse_path(path) else {
            return (404, not_found_json("path", path)).into();
        };

        let response = match (method.as_str(), target.name.clone()) {
            ("GET", Some(name)) => self.get(&target, &name),
            ("GET", None) => self.list(&target, query),
            ("POST", None) => self.create(&target, parsed_body),
            ("PUT", Some(name)) => self.replace(&target, &name, parsed_body),
            ("DELETE", Some(name)) => self.delete(&target, &name),
            _ => (405, status_json(405, "MethodNotAllowed", "method not allowed")),
        };
        response.into()
    }

    fn take_scripted(&mut self, method: &str, path: &str) -> Option<Reply> {
        let queue = self.scripted.get_mut(&(method.to_string(), path.to_string()))?;
        let index = queue.iter().position(|s| s.remaining != Some(0))?;
        let entry = &mut queue[index];
        if let Some(remaining) = entry.remaining.as_mut() {
            *remaining -= 1;
        }
        Some(Reply {
            status: entry.status,
            body: entry.body.clone(),
            delay: entry.delay,
        })
    }

    fn get(&self, target: &ResourcePath, name: &str) -> (u16, String) {
        match self
            .objects
            .get(&(target.collection.clone(), target.namespace.clone()))
            .and_then(|objects| objects.get(name))
        {
            Some(object) => (200, object.to_string()),
            None => (404, not_found_json(&target.collection, name)),
        }
    }

    fn list(&self, target: &ResourcePath, query: Option<&str>) -> (u16, String) {
        let selector = query.and_then(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .find(|(key, _)| key == "labelSelector")
                .map(|(_, value)| value.into_owned())
        });

        let items: Vec<Value> = self
            .objects
            .iter()
            .filter(|((collection, namespace), _)| {
                *collection == target.collection
                    && (target.namespace.is_none() || *namespace == target.namespace)
            })
            .flat_map(|(_, objects)| objects.values())
            .filter(|object| selector.as_deref().map_or(true, |s| matches_selector(object, s)))
            .cloned()
            .collect();

        let list = json!({
            "apiVersion": "v1",
            "kind": "List",
            "metadata": { "resourceVersion": "1" },
            "items": items,
        });
        (200, list.to_string())
    }

    fn create(&mut self, target: &ResourcePath, body: Option<Value>) -> (u16, String) {
        let Some(mut object) = body else {
            return (400, status_json(400, "BadRequest", "missing body"));
        };
        let Some(name) = object["metadata"]["name"].as_str().map(str::to_string) else {
            return (422, status_json(422, "Invalid", "metadata.name is required"));
        };

        let key = (target.collection.clone(), target.namespace.clone());
        if self.objects.get(&key).is_some_and(|objects| objects.contains_key(&name)) {
            return (
                409,
                status_json(409, "AlreadyExists", &format!("\"{}\" already exists", name)),
            );
        }

        self.next_id += 1;
        object["metadata"]["uid"] = json!(format!("uid-{}", self.next_id));
        object["metadata"]["resourceVersion"] = json!("1");
        if let Some(ns) = &target.namespace {
            object["metadata"]["namespace"] = json!(ns);
        }
        if target.collection.ends_with("/services") {
            assign_cluster_ip(&mut object, self.next_id);
        }

        self.objects.entry(key).or_default().insert(name, object.clone());
        (201, object.to_string())
    }

    fn replace(&mut self, target: &ResourcePath, name: &str, body: Option<Value>) -> (u16, String) {
        let Some(mut object) = body else {
            return (400, status_json(400, "BadRequest", "missing body"));
        };
        let key = (target.collection.clone(), target.namespace.clone());
        let Some(existing) = self.objects.get_mut(&key).and_then(|objects| objects.get_mut(name)) else {
            return (404, not_found_json(&target.collection, name));
        };

        let version = existing["metadata"]["resourceVersion"]
            .as_str()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(1);
        object["metadata"]["resourceVersion"] = json!((version + 1).to_string());
        *existing = object.clone();
        (200, object.to_string())
    }

    fn delete(&mut self, target: &ResourcePath, name: &str) -> (u16, String) {
        let key = (target.collection.clone(), target.namespace.clone());
        match self.objects.get_mut(&key).and_then(|objects| objects.remove(name)) {
            Some(_) => (
                200,
                json!({
                    "kind": "Status",
                    "apiVersion": "v1",
                    "status": "Success",
                    "code": 200,
                    "details": { "name": name },
                })
                .to_string(),
            ),
            None => (404, not_found_json(&target.collection, name)),
        }
    }
}

fn assign_cluster_ip(object: &mut Value, id: u64) {
    let is_external = object["spec"]["type"].as_str() == Some("ExternalName");
    if !is_external && object["spec"]["clusterIP"].is_null() {
        object["spec"]["clusterIP"] = json!(format!("10.96.0.{}", id % 250 + 1));
    }
}

/// Equality-based label selector matching (`a=b`, `a==b`, `a!=b`, `a`, `!a`)
fn matches_selector(object: &Value, selector: &str) -> bool {
    let labels = &object["metadata"]["labels"];
    selector
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .all(|term| {
            if let Some((key, value)) = term.split_once("!=") {
                labels[key.trim()].as_str() != Some(value.trim())
            } else if let Some((key, value)) = term.split_once('=') {
                let value = value.trim_start_matches('=');
                labels[key.trim()].as_str() == Some(value.trim())
            } else if let Some(key) = term.strip_prefix('!') {
                labels[key.trim()].is_null()
            } else {
                !labels[term].is_null()
            }
        })
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let state = self.state.clone();

        Box::pin(async move {
            let (parts, body) = req.into_parts();
            let bytes = body
                .collect()
                .await
                .map_err(Into::<tower::BoxError>::into)?
                .to_bytes();

            let reply = state.lock().unwrap().handle(
                &parts.method,
                parts.uri.path(),
                parts.uri.query(),
                &bytes,
            );
            if let Some(delay) = reply.delay {
                tokio::time::sleep(delay).await;
            }

            Ok(Response::builder()
                .status(reply.status)
                .header("content-type", "application/json")
                .body(Body::from(reply.body.into_bytes()))
                .unwrap())
        })
    }
}

/// Create a mock namespace JSON response
pub fn namespace_json(name: &str) -> String {
    json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {
            "name": name,
            "uid": "test-uid"
        }
    })
    .to_string()
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": format!("{} \"{}\" not found", resource, name),
        "reason": "NotFound",
        "code": 404
    })
    .to_string()
}

/// Create a failure Status body
pub fn status_json(code: u16, reason: &str, message: &str) -> String {
    json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": message,
        "reason": reason,
        "code": code
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_namespaced_item_path() {
        let parsed = parse_path("/apis/apps/v1/namespaces/shop/deployments/web").unwrap();
        assert_eq!(parsed.collection, "/apis/apps/v1/deployments");
        assert_eq!(parsed.namespace.as_deref(), Some("shop"));
        assert_eq!(parsed.name.as_deref(), Some("web"));
    }

    #[test]
    fn test_parse_cluster_scoped_paths() {
        let ns = parse_path("/api/v1/namespaces/shop").unwrap();
        assert_eq!(ns.collection, "/api/v1/namespaces");
        assert_eq!(ns.name.as_deref(), Some("shop"));

        let all = parse_path("/api/v1/services").unwrap();
        assert!(all.namespace.is_none() && all.name.is_none());
    }

    #[test]
    fn test_matches_selector() {
        let object = json!({"metadata": {"labels": {"app": "web", "tier": "front"}}});
        assert!(matches_selector(&object, "app=web"));
        assert!(matches_selector(&object, "app==web,tier"));
        assert!(matches_selector(&object, "env!=prod,!env"));
        assert!(!matches_selector(&object, "app=api"));
        assert!(!matches_selector(&object, "env"));
    }
}
