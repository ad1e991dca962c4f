use crate::error::{RegistryError, Result};
use crate::wire::{
    DeleteRangeRequest, PutRequest, RangeRequest, RangeResponse, StatusResponse,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Registry client configuration
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Gateway endpoints; the first one also serves the liveness probe
    pub endpoints: Vec<String>,
    /// Timeout applied to every get/put/delete call
    pub op_timeout: Duration,
    /// Timeout for the liveness probe
    pub probe_timeout: Duration,
    /// Interval between background liveness checks
    pub probe_interval: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            endpoints: vec!["http://127.0.0.1:2379".to_string()],
            op_timeout: Duration::from_secs(5),
            probe_timeout: Duration::from_secs(2),
            probe_interval: Duration::from_secs(10),
        }
    }
}

/// Typed client for the cluster registry.
///
/// One instance is shared across every pipeline stage in a process. Reads run
/// concurrently; `reconnect` takes the write half of the lock and therefore
/// excludes in-flight calls while the connection pool is rebuilt.
pub struct RegistryClient {
    config: RegistryConfig,
    http: RwLock<reqwest::Client>,
}

impl RegistryClient {
    /// Create a new client; does not touch the network
    pub fn new(config: RegistryConfig) -> Result<Self> {
        let http = build_http_client()?;
        Ok(Self {
            config,
            http: RwLock::new(http),
        })
    }

    /// The client configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn endpoint(&self) -> &str {
        self.config
            .endpoints
            .first()
            .map(String::as_str)
            .unwrap_or("http://127.0.0.1:2379")
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req, timeout: Duration) -> Result<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let url = format!("{}{}", self.endpoint().trim_end_matches('/'), path);
        debug!("POST {}", url);

        let http = self.http.read().await;
        let resp = http
            .post(&url)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                RegistryError::unreachable(
                    format!("request to {} failed: {}", url, e),
                    Some(Box::new(e)),
                )
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RegistryError::gateway_status(status.as_u16(), body));
        }

        resp.json::<Resp>().await.map_err(|e| {
            RegistryError::decode_error(
                format!("invalid response from {}: {}", url, e),
                Some(Box::new(e)),
            )
        })
    }

    /// Fetch every key under a prefix. A missing prefix yields an empty map,
    /// not an error.
    pub async fn get_prefix(&self, prefix: &str) -> Result<BTreeMap<String, String>> {
        let resp: RangeResponse = self
            .post("/v3/kv/range", &RangeRequest::prefix(prefix), self.config.op_timeout)
            .await?;

        let mut result = BTreeMap::new();
        for kv in &resp.kvs {
            let (key, value) = kv.decode_pair()?;
            result.insert(key, value);
        }
        Ok(result)
    }

    /// Fetch a single key; `None` if absent
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let resp: RangeResponse = self
            .post("/v3/kv/range", &RangeRequest::single(key), self.config.op_timeout)
            .await?;

        match resp.kvs.first() {
            Some(kv) => Ok(Some(kv.decode_pair()?.1)),
            None => Ok(None),
        }
    }

    /// Store a key-value pair
    pub async fn put(&self, key: &str, value: &str) -> Result<()> {
        let _: serde_json::Value = self
            .post("/v3/kv/put", &PutRequest::new(key, value), self.config.op_timeout)
            .await?;
        Ok(())
    }

    /// Delete a key
    pub async fn delete(&self, key: &str) -> Result<()> {
        let _: serde_json::Value = self
            .post(
                "/v3/kv/deleterange",
                &DeleteRangeRequest::single(key),
                self.config.op_timeout,
            )
            .await?;
        Ok(())
    }

    /// Probe the first endpoint for liveness
    pub async fn is_connected(&self) -> bool {
        let result: Result<StatusResponse> = self
            .post(
                "/v3/maintenance/status",
                &serde_json::json!({}),
                self.config.probe_timeout,
            )
            .await;

        match result {
            Ok(_) => true,
            Err(e) => {
                debug!("Registry liveness probe failed: {}", e);
                false
            }
        }
    }

    /// Tear down and rebuild the underlying connection pool.
    ///
    /// Holds the write half of the lock, so no read can overlap the swap.
    pub async fn reconnect(&self) -> Result<()> {
        let mut http = self.http.write().await;
        match build_http_client() {
            Ok(client) => {
                *http = client;
                Ok(())
            }
            Err(e) => {
                warn!("Failed to rebuild registry connection: {}", e);
                Err(e)
            }
        }
    }
}

fn build_http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .pool_idle_timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| {
            RegistryError::client_error(format!("reqwest build failed: {}", e), Some(Box::new(e)))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire;
    use axum::extract::State;
    use axum::routing::post;
    use axum::{Json, Router};
    use std::collections::BTreeMap;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    type Store = Arc<Mutex<BTreeMap<String, String>>>;

    async fn stub_range(
        State(store): State<Store>,
        Json(req): Json<RangeRequest>,
    ) -> Json<serde_json::Value> {
        let start = wire::decode(&req.key).unwrap();
        let store = store.lock().unwrap();

        let kvs: Vec<serde_json::Value> = match req.range_end {
            Some(_) => store
                .iter()
                .filter(|(k, _)| k.starts_with(&start))
                .map(|(k, v)| {
                    serde_json::json!({"key": wire::encode(k), "value": wire::encode(v)})
                })
                .collect(),
            None => store
                .get(&start)
                .map(|v| {
                    vec![serde_json::json!({
                        "key": wire::encode(&start),
                        "value": wire::encode(v)
                    })]
                })
                .unwrap_or_default(),
        };

        Json(serde_json::json!({ "kvs": kvs, "count": kvs.len().to_string() }))
    }

    async fn stub_put(
        State(store): State<Store>,
        Json(req): Json<PutRequest>,
    ) -> Json<serde_json::Value> {
        let key = wire::decode(&req.key).unwrap();
        let value = wire::decode(&req.value).unwrap();
        store.lock().unwrap().insert(key, value);
        Json(serde_json::json!({}))
    }

    async fn stub_delete(
        State(store): State<Store>,
        Json(req): Json<DeleteRangeRequest>,
    ) -> Json<serde_json::Value> {
        let key = wire::decode(&req.key).unwrap();
        let removed = store.lock().unwrap().remove(&key).map(|_| 1).unwrap_or(0);
        Json(serde_json::json!({ "deleted": removed.to_string() }))
    }

    async fn stub_status() -> Json<serde_json::Value> {
        Json(serde_json::json!({ "version": "3.5.0" }))
    }

    async fn start_stub_gateway() -> (SocketAddr, Store) {
        let store: Store = Arc::new(Mutex::new(BTreeMap::new()));
        let app = Router::new()
            .route("/v3/kv/range", post(stub_range))
            .route("/v3/kv/put", post(stub_put))
            .route("/v3/kv/deleterange", post(stub_delete))
            .route("/v3/maintenance/status", post(stub_status))
            .with_state(store.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (addr, store)
    }

    fn client_for(addr: SocketAddr) -> RegistryClient {
        RegistryClient::new(RegistryConfig {
            endpoints: vec![format!("http://{}", addr)],
            op_timeout: Duration::from_secs(2),
            probe_timeout: Duration::from_secs(1),
            probe_interval: Duration::from_secs(10),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_put_get_delete_round_trip() {
        let (addr, _store) = start_stub_gateway().await;
        let client = client_for(addr);

        client.put("/registry/nodes/node-1", "{}").await.unwrap();

        let value = client.get("/registry/nodes/node-1").await.unwrap();
        assert_eq!(value, Some("{}".to_string()));

        client.delete("/registry/nodes/node-1").await.unwrap();
        let value = client.get("/registry/nodes/node-1").await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_get_prefix_returns_only_matching_keys() {
        let (addr, _store) = start_stub_gateway().await;
        let client = client_for(addr);

        client.put("/registry/nodes/a", "node-a").await.unwrap();
        client.put("/registry/nodes/b", "node-b").await.unwrap();
        client.put("/registry/pods/default/p", "pod").await.unwrap();

        let nodes = client.get_prefix("/registry/nodes/").await.unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes.get("/registry/nodes/a"), Some(&"node-a".to_string()));
        assert!(!nodes.contains_key("/registry/pods/default/p"));
    }

    #[tokio::test]
    async fn test_empty_prefix_is_empty_map_not_error() {
        let (addr, _store) = start_stub_gateway().await;
        let client = client_for(addr);

        let result = client.get_prefix("/registry/nodes/").await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_surfaces_error() {
        // Port 1 is never listening
        let client = RegistryClient::new(RegistryConfig {
            endpoints: vec!["http://127.0.0.1:1".to_string()],
            op_timeout: Duration::from_millis(300),
            probe_timeout: Duration::from_millis(300),
            probe_interval: Duration::from_secs(10),
        })
        .unwrap();

        let err = client.get_prefix("/registry/nodes/").await.unwrap_err();
        assert!(matches!(err, RegistryError::Unreachable { .. }));
        assert!(!client.is_connected().await);
    }

    #[tokio::test]
    async fn test_is_connected_and_reconnect() {
        let (addr, _store) = start_stub_gateway().await;
        let client = client_for(addr);

        assert!(client.is_connected().await);
        client.reconnect().await.unwrap();
        assert!(client.is_connected().await);
    }
}
