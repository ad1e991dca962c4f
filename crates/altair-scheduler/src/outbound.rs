//! Outbound JSON pushes to the next pipeline stage and the node agent.

use crate::error::{Result, SchedulerError};
use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Default timeout for a pipeline push
pub const PUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Thin HTTP client used to hand payloads to downstream services.
/// Pushes are synchronous and bounded; the caller only logs the response.
pub struct PipelineClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl PipelineClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            timeout,
        }
    }

    /// POST a JSON payload; returns the response status
    pub async fn post_json<T: Serialize>(&self, url: &str, payload: &T) -> Result<StatusCode> {
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| SchedulerError::push_failed(url, e.to_string()))?;

        Ok(resp.status())
    }
}

impl Default for PipelineClient {
    fn default() -> Self {
        Self::new(PUSH_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::Router;

    #[tokio::test]
    async fn test_post_json_returns_status() {
        let app = Router::new().route("/sink", post(|| async {}));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = PipelineClient::default();
        let status = client
            .post_json(&format!("http://{}/sink", addr), &serde_json::json!({"ok": true}))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_post_json_unreachable_is_error() {
        let client = PipelineClient::new(Duration::from_millis(300));
        let err = client
            .post_json("http://127.0.0.1:1/sink", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::PushFailed { .. }));
    }
}
