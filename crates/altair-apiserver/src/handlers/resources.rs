//! Resource CRUD over the registry.
//!
//! The payload is a closed tagged variant over the supported resource
//! kinds; every combination of action and kind is matched exhaustively.

use crate::error::{ApiError, Result};
use crate::AppState;
use altair_core::keys::{node_key, pod_key};
use altair_core::{to_json, Node, Pod};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

/// Supported actions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Delete,
}

/// Supported resource kinds, tagged by `kind` with the record in `object`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "object")]
pub enum ResourceObject {
    Pod(Box<Pod>),
    Node(Box<Node>),
}

/// Body of the resource endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestPayload {
    pub action: Action,
    #[serde(flatten)]
    pub resource: ResourceObject,
}

fn pod_registry_key(pod: &Pod) -> Result<String> {
    let name = pod
        .metadata
        .name
        .as_deref()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing required field: name".to_string()))?;
    let namespace = pod
        .metadata
        .namespace
        .as_deref()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing required field: namespace".to_string()))?;
    Ok(pod_key(namespace, name))
}

fn node_registry_key(node: &Node) -> Result<String> {
    let name = node
        .metadata
        .name
        .as_deref()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing required field: name".to_string()))?;
    Ok(node_key(name))
}

/// POST /resources
pub async fn handle_resource(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RequestPayload>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    match (payload.action, payload.resource) {
        (Action::Create, ResourceObject::Pod(pod)) => {
            let key = pod_registry_key(&pod)?;
            let data = to_json(pod.as_ref())
                .map_err(|e| ApiError::Internal(format!("Failed to serialize pod: {}", e)))?;
            state
                .registry
                .put(&key, &data)
                .await
                .map_err(|e| ApiError::Internal(format!("Failed to store pod: {}", e)))?;

            info!("Created pod record at {}", key);
            Ok((StatusCode::CREATED, Json(json!({ "created": key }))))
        }
        (Action::Create, ResourceObject::Node(node)) => {
            let key = node_registry_key(&node)?;
            let data = to_json(node.as_ref())
                .map_err(|e| ApiError::Internal(format!("Failed to serialize node: {}", e)))?;
            state
                .registry
                .put(&key, &data)
                .await
                .map_err(|e| ApiError::Internal(format!("Failed to store node: {}", e)))?;

            info!("Created node record at {}", key);
            Ok((StatusCode::CREATED, Json(json!({ "created": key }))))
        }
        (Action::Delete, ResourceObject::Pod(pod)) => {
            let key = pod_registry_key(&pod)?;
            state
                .registry
                .delete(&key)
                .await
                .map_err(|e| ApiError::Internal(format!("Failed to delete pod: {}", e)))?;

            info!("Deleted pod record at {}", key);
            Ok((StatusCode::OK, Json(json!({ "deleted": key }))))
        }
        (Action::Delete, ResourceObject::Node(node)) => {
            let key = node_registry_key(&node)?;
            state
                .registry
                .delete(&key)
                .await
                .map_err(|e| ApiError::Internal(format!("Failed to delete node: {}", e)))?;

            info!("Deleted node record at {}", key);
            Ok((StatusCode::OK, Json(json!({ "deleted": key }))))
        }
    }
}
