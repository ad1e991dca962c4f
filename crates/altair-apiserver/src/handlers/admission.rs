//! Admission webhook: always allows, then notifies the reconciler.
//!
//! The review types are defined here; k8s-openapi does not ship the
//! admission.k8s.io review kinds.

use crate::AppState;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

/// Reference to the resource kind under review
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KindRef {
    #[serde(default)]
    pub kind: String,
}

/// Incoming admission request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionRequest {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub kind: Option<KindRef>,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub name: String,
}

/// Outgoing admission response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionResponse {
    pub uid: String,
    pub allowed: bool,
}

/// AdmissionReview envelope, both directions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionReview {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<AdmissionRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<AdmissionResponse>,
}

/// Notification forwarded to the reconciler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerNotification {
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

/// POST /validate
///
/// Replies to the cluster API immediately; the reconciler notification goes
/// out on a separate task and its failure only produces a log line.
pub async fn validate(
    State(state): State<Arc<AppState>>,
    Json(review): Json<AdmissionReview>,
) -> Json<AdmissionReview> {
    let request = review.request.unwrap_or_default();

    let response = AdmissionReview {
        api_version: Some("admission.k8s.io/v1".to_string()),
        kind: Some("AdmissionReview".to_string()),
        request: None,
        response: Some(AdmissionResponse {
            uid: request.uid.clone(),
            allowed: true,
        }),
    };

    let reconciler_url = state
        .webhook
        .as_ref()
        .and_then(|w| w.reconciler_url.clone());

    if let Some(url) = reconciler_url {
        let notification = ReconcilerNotification {
            kind: request
                .kind
                .as_ref()
                .map(|k| k.kind.to_lowercase())
                .unwrap_or_else(|| "pod".to_string()),
            namespace: request.namespace,
            name: request.name,
        };

        let http = state.http.clone();
        tokio::spawn(async move {
            match http.post(&url).json(&notification).send().await {
                Ok(resp) => {
                    info!(
                        "Notified reconciler at {} for {}/{}, status {}",
                        url,
                        notification.namespace,
                        notification.name,
                        resp.status()
                    );
                }
                Err(e) => {
                    error!("Failed to notify reconciler at {}: {}", url, e);
                }
            }
        });
    }

    Json(response)
}
