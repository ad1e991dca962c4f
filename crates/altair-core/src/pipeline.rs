//! Payloads exchanged between the scheduling pipeline stages.
//!
//! Each stage accepts one of these over HTTP, replies immediately, and pushes
//! the next payload downstream. They live only for the duration of a single
//! scheduling attempt and are never persisted.

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::{Node, Pod};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of one scheduling attempt, carried through every stage.
///
/// A payload arriving without one (e.g. from an external trigger) is stamped
/// with a fresh token at intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttemptId(Uuid);

impl AttemptId {
    /// Generate a fresh attempt token
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AttemptId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Claim record written to the registry before filtering begins.
///
/// The binder re-reads this before committing; a claim carrying a different
/// attempt token means a newer attempt superseded this one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    /// Attempt that holds the claim
    pub attempt: AttemptId,
    /// When the claim was taken
    pub claimed_at: DateTime<Utc>,
}

impl Claim {
    /// Create a claim for the given attempt, stamped now
    pub fn new(attempt: AttemptId) -> Self {
        Self {
            attempt,
            claimed_at: Utc::now(),
        }
    }
}

/// A pod plus the nodes that passed filtering, in input order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSet {
    pub pod: Pod,
    pub filtered_nodes: Vec<Node>,
    #[serde(default)]
    pub attempt: AttemptId,
}

/// A node paired with its composite score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredNode {
    pub node: Node,
    pub score: f64,
}

/// A pod plus its scored candidates, sorted by score descending
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedSet {
    pub pod: Pod,
    pub scored_nodes: Vec<ScoredNode>,
    #[serde(default)]
    pub attempt: AttemptId,
}

impl RankedSet {
    /// Sort candidates by score, descending. The sort is stable: candidates
    /// with equal scores keep their input order.
    pub fn sort_by_score(&mut self) {
        self.scored_nodes
            .sort_by(|a, b| b.score.total_cmp(&a.score));
    }
}
