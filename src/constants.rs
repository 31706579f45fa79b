// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Namespace used when a context does not name one
pub const DEFAULT_NAMESPACE: &str = "default";

/// Context name given to the inferred in-cluster configuration
pub const IN_CLUSTER_CONTEXT: &str = "in-cluster";

/// Deadlines for calls to the Kubernetes API
pub mod timeouts {
    /// Per-attempt deadline for reads and lists, in seconds
    pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 10;
    /// Single deadline for creates, updates and deletes, in seconds
    pub const DEFAULT_WRITE_TIMEOUT_SECS: u64 = 30;
}

/// Read retry configuration
pub mod retry {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
    pub const DEFAULT_INITIAL_DELAY_MS: u64 = 200;
    pub const DEFAULT_MAX_DELAY_MS: u64 = 2000;
    pub const BACKOFF_MULTIPLIER: f64 = 2.0;
}

/// Concurrent deletions when deleting by label selector
pub const BULK_DELETE_CONCURRENCY: usize = 4;

/// Attribute keys understood in resource specs
pub mod attrs {
    pub const LABELS: &str = "labels";
    pub const ANNOTATIONS: &str = "annotations";
    pub const SELECTOR: &str = "selector";

    pub const IMAGE: &str = "image";
    pub const REPLICAS: &str = "replicas";
    pub const CONTAINER_NAME: &str = "containerName";
    pub const ENV: &str = "env";
    pub const COMMAND: &str = "command";
    pub const ARGS: &str = "args";
    pub const IMAGE_PULL_POLICY: &str = "imagePullPolicy";
    pub const IMAGE_PULL_SECRETS: &str = "imagePullSecrets";
    pub const SERVICE_ACCOUNT: &str = "serviceAccount";

    pub const PORTS: &str = "ports";
    pub const PORT: &str = "port";
    pub const CONTAINER_PORT: &str = "containerPort";
    pub const TARGET_PORT: &str = "targetPort";
    pub const NODE_PORT: &str = "nodePort";
    pub const PROTOCOL: &str = "protocol";
    pub const NAME: &str = "name";
    pub const TYPE: &str = "type";
    pub const EXTERNAL_NAME: &str = "externalName";

    pub const RULES: &str = "rules";
    pub const HOST: &str = "host";
    pub const PATHS: &str = "paths";
    pub const PATH: &str = "path";
    pub const PATH_TYPE: &str = "pathType";
    pub const SERVICE: &str = "service";
    pub const TLS: &str = "tls";
    pub const HOSTS: &str = "hosts";
    pub const SECRET_NAME: &str = "secretName";
    pub const INGRESS_CLASS: &str = "ingressClassName";

    pub const DATA: &str = "data";
    pub const IMMUTABLE: &str = "immutable";
}
