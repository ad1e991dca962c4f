//! Altair Core - Fundamental types for the Altair cluster scheduler
//!
//! This crate provides:
//! - Workload and node data model (k8s-openapi re-exports)
//! - Pipeline payloads exchanged between scheduling stages
//! - Registry key layout
//! - Resource quantity parsing
//! - Error types with miette diagnostics

pub mod error;
pub mod keys;
pub mod pipeline;
pub mod resources;

// Re-export commonly used types
pub use error::{CoreError, Result};
pub use pipeline::{AttemptId, CandidateSet, Claim, RankedSet, ScoredNode};
pub use resources::ResourceQuantities;

// Re-export k8s-openapi types for convenience
pub use k8s_openapi;
pub use k8s_openapi::api::core::v1::{Node, Pod};
pub use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// Serialize a resource to JSON
pub fn to_json<T: serde::Serialize>(resource: &T) -> Result<String> {
    serde_json::to_string(resource).map_err(|e| {
        CoreError::serialization_error(
            format!("Failed to serialize to JSON: {}", e),
            Some(Box::new(e)),
        )
    })
}

/// Deserialize a resource from JSON
pub fn from_json<T: for<'de> serde::Deserialize<'de>>(data: &str) -> Result<T> {
    serde_json::from_str(data).map_err(|e| {
        CoreError::serialization_error(
            format!("Failed to deserialize from JSON: {}", e),
            Some(Box::new(e)),
        )
    })
}
