//! Pipeline stage intakes.
//!
//! Every intake replies `200 OK` with an empty body as soon as the payload
//! decodes, then hands the work to the stage's queue. The caller never
//! learns the attempt's outcome; failures surface in logs only.

use crate::AppState;
use altair_core::{AttemptId, CandidateSet, Pod, RankedSet};
use altair_scheduler::FilterJob;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Body of the filter intake
#[derive(Debug, Clone, Deserialize)]
pub struct FilterIntake {
    pub pod: Pod,
}

/// POST /scheduler/filter
pub async fn filter_intake(
    State(state): State<Arc<AppState>>,
    Json(intake): Json<FilterIntake>,
) -> StatusCode {
    let pod = intake.pod;
    let pod_name = pod.metadata.name.as_deref().unwrap_or("unknown");

    let assigned = pod
        .spec
        .as_ref()
        .and_then(|s| s.node_name.as_deref())
        .is_some_and(|n| !n.is_empty());

    if assigned {
        info!(
            "Pod {} is already assigned, ignoring trigger",
            pod_name
        );
        return StatusCode::OK;
    }

    let Some(queue) = &state.filter_queue else {
        warn!("Filter intake hit but the stage is not enabled here");
        return StatusCode::OK;
    };

    let attempt = AttemptId::new();
    info!(pod = %pod_name, attempt = %attempt, "Accepted unassigned pod");
    queue.try_submit(FilterJob { pod, attempt });

    StatusCode::OK
}

/// POST /scheduler/score
pub async fn score_intake(
    State(state): State<Arc<AppState>>,
    Json(candidates): Json<CandidateSet>,
) -> StatusCode {
    if candidates.filtered_nodes.is_empty() {
        info!("Received empty candidate set, nothing to score");
        return StatusCode::OK;
    }

    let Some(queue) = &state.score_queue else {
        warn!("Score intake hit but the stage is not enabled here");
        return StatusCode::OK;
    };

    info!(
        "Accepted candidate set with {} nodes",
        candidates.filtered_nodes.len()
    );
    queue.try_submit(candidates);

    StatusCode::OK
}

/// POST /scheduler/bind
pub async fn bind_intake(
    State(state): State<Arc<AppState>>,
    Json(ranked): Json<RankedSet>,
) -> StatusCode {
    if ranked.scored_nodes.is_empty() {
        // The scorer never pushes an empty set; this is a caller error
        warn!("Received empty ranked set, refusing to bind");
        return StatusCode::OK;
    }

    let Some(queue) = &state.bind_queue else {
        warn!("Bind intake hit but the stage is not enabled here");
        return StatusCode::OK;
    };

    info!(
        "Accepted ranked set with {} nodes",
        ranked.scored_nodes.len()
    );
    queue.try_submit(ranked);

    StatusCode::OK
}
