//! Altair Scheduler - the filter / score / bind pipeline
//!
//! This crate provides:
//! - Filter predicates (schedulability, node affinity, taints, resources)
//! - Scoring functions (resource fit, utilization, affinity, stability)
//! - The per-stage services that load cluster state, run the algorithms and
//!   push results to the next stage
//! - The bounded work queue behind each stage's HTTP intake

pub mod dispatch;
pub mod error;
pub mod filter;
pub mod outbound;
pub mod score;
pub mod service;
pub mod types;

// Re-export commonly used types
pub use dispatch::{DispatchConfig, WorkQueue};
pub use error::{Result, SchedulerError};
pub use service::{BindService, FilterJob, FilterService, ScoreService};
pub use types::{AttemptState, FilterResult, SchedulingContext};
