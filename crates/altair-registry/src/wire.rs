//! Wire types for the etcd v3 JSON gRPC-gateway.
//!
//! The gateway transports keys and values base64-encoded inside JSON bodies.
//! Prefix reads use etcd's range convention: `range_end` is the prefix with
//! its last byte incremented.

use crate::error::{RegistryError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Base64-encode a key or value for the gateway
pub fn encode(data: &str) -> String {
    STANDARD.encode(data.as_bytes())
}

/// Decode a base64 key or value from the gateway
pub fn decode(data: &str) -> Result<String> {
    let bytes = STANDARD
        .decode(data)
        .map_err(|e| RegistryError::decode_error("invalid base64 in response", Some(Box::new(e))))?;
    String::from_utf8(bytes)
        .map_err(|e| RegistryError::decode_error("non-UTF-8 key or value", Some(Box::new(e))))
}

/// Compute the exclusive range end covering every key under `prefix`.
/// A prefix of all 0xff bytes ranges to "\0" (the whole keyspace after it).
pub fn prefix_range_end(prefix: &str) -> Vec<u8> {
    let mut end = prefix.as_bytes().to_vec();
    while let Some(last) = end.last_mut() {
        if *last < 0xff {
            *last += 1;
            return end;
        }
        end.pop();
    }
    vec![0]
}

/// Body of `POST /v3/kv/range`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeRequest {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range_end: Option<String>,
}

impl RangeRequest {
    /// Request a single key
    pub fn single(key: &str) -> Self {
        Self {
            key: encode(key),
            range_end: None,
        }
    }

    /// Request every key under a prefix
    pub fn prefix(prefix: &str) -> Self {
        Self {
            key: encode(prefix),
            range_end: Some(STANDARD.encode(prefix_range_end(prefix))),
        }
    }
}

/// One key-value pair in a range response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    /// Decode the base64 pair into plain strings
    pub fn decode_pair(&self) -> Result<(String, String)> {
        Ok((decode(&self.key)?, decode(&self.value)?))
    }
}

/// Body of a range response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RangeResponse {
    #[serde(default)]
    pub kvs: Vec<KeyValue>,
}

/// Body of `POST /v3/kv/put`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PutRequest {
    pub key: String,
    pub value: String,
}

impl PutRequest {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: encode(key),
            value: encode(value),
        }
    }
}

/// Body of `POST /v3/kv/deleterange`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteRangeRequest {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range_end: Option<String>,
}

impl DeleteRangeRequest {
    /// Delete a single key
    pub fn single(key: &str) -> Self {
        Self {
            key: encode(key),
            range_end: None,
        }
    }
}

/// Body of `POST /v3/maintenance/status` responses; only presence matters
/// for the liveness probe, the fields are informational
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub version: Option<String>,
}
