//! Registry key layout shared by every component that touches the registry.
//!
//! Nodes are cluster-scoped (`/registry/nodes/{name}`); pods, claims and
//! auth records are keyed by `namespace/name` or user under their prefix.

/// Prefix under which node records are stored
pub const NODES_PREFIX: &str = "/registry/nodes/";

/// Prefix under which pod records are stored
pub const PODS_PREFIX: &str = "/registry/pods/";

/// Prefix under which scheduling-attempt claims are stored
pub const CLAIMS_PREFIX: &str = "/registry/claims/";

/// Prefix under which authorization tokens are stored
pub const AUTH_PREFIX: &str = "/registry/auth/";

/// Registry key for a node record
pub fn node_key(name: &str) -> String {
    format!("{}{}", NODES_PREFIX, name)
}

/// Registry key for a pod record
pub fn pod_key(namespace: &str, name: &str) -> String {
    format!("{}{}/{}", PODS_PREFIX, namespace, name)
}

/// Registry key for a scheduling-attempt claim
pub fn claim_key(namespace: &str, name: &str) -> String {
    format!("{}{}/{}", CLAIMS_PREFIX, namespace, name)
}

/// Registry key for a user's authorization token
pub fn auth_key(user: &str) -> String {
    format!("{}{}", AUTH_PREFIX, user)
}
