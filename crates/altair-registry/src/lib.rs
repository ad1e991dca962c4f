//! Altair Registry - typed client for the replicated cluster registry
//!
//! This crate provides:
//! - A façade over an etcd-v3-JSON-gateway-compatible key-value service
//! - Prefix reads, puts, deletes with per-call timeouts
//! - Liveness probing and reconnect-under-lock
//! - A background connection monitor

pub mod client;
pub mod error;
pub mod monitor;
pub mod wire;

// Re-export commonly used types
pub use client::{RegistryClient, RegistryConfig};
pub use error::{RegistryError, Result};
pub use monitor::monitor_connection;
