//! Altair API Server - HTTP surfaces for the scheduling pipeline
//!
//! This crate provides:
//! - Axum-based HTTP server, assembled per stage role
//! - Fire-and-forget pipeline intakes (filter, score, bind)
//! - Collaborator handlers: admission webhook, resource CRUD, authorization

pub mod error;
pub mod handlers;
pub mod server;
pub mod state;

// Re-export commonly used types
pub use error::{ApiError, Result};
pub use server::{Config, PipelineServer};
pub use state::{AppState, WebhookConfig};
