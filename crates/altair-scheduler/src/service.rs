use crate::dispatch::{DispatchConfig, WorkQueue};
use crate::error::{Result, SchedulerError};
use crate::filter::{default_predicates, filter_nodes, FilterPredicate};
use crate::outbound::PipelineClient;
use crate::score::{default_scorers, score_candidates, ScoreFunction};
use crate::types::{AttemptState, SchedulingContext};
use altair_core::keys::{claim_key, pod_key, NODES_PREFIX};
use altair_core::{
    from_json, to_json, AttemptId, CandidateSet, Claim, Node, Pod, RankedSet,
};
use altair_registry::RegistryClient;
use std::sync::Arc;
use tracing::{error, info, warn};

/// One trigger for the filter stage
#[derive(Debug, Clone)]
pub struct FilterJob {
    pub pod: Pod,
    pub attempt: AttemptId,
}

fn pod_identity(pod: &Pod) -> Result<(String, String)> {
    let name = pod
        .metadata
        .name
        .clone()
        .ok_or_else(|| SchedulerError::internal_error("pod has no name"))?;
    let namespace = pod
        .metadata
        .namespace
        .clone()
        .unwrap_or_else(|| "default".to_string());
    Ok((namespace, name))
}

/// Filter stage: load the node set, apply predicates, push survivors to the
/// scorer
pub struct FilterService {
    registry: Arc<RegistryClient>,
    outbound: PipelineClient,
    predicates: Vec<Box<dyn FilterPredicate>>,
    score_url: String,
}

impl FilterService {
    pub fn new(registry: Arc<RegistryClient>, score_url: impl Into<String>) -> Self {
        Self {
            registry,
            outbound: PipelineClient::default(),
            predicates: default_predicates(),
            score_url: score_url.into(),
        }
    }

    /// Run one filter pass for an unassigned pod
    pub async fn filter_pod(&self, job: FilterJob) -> Result<()> {
        let FilterJob { pod, attempt } = job;
        let (namespace, name) = pod_identity(&pod)?;

        info!(
            pod = %name,
            attempt = %attempt,
            state = %AttemptState::Filtering,
            "Filtering nodes"
        );

        // Claim the attempt before touching cluster state; the binder
        // re-checks this claim before committing
        let claim = Claim::new(attempt);
        self.registry
            .put(&claim_key(&namespace, &name), &to_json(&claim)?)
            .await?;

        let records = self.registry.get_prefix(NODES_PREFIX).await?;

        let mut nodes: Vec<Node> = Vec::new();
        for (key, data) in &records {
            match serde_json::from_str::<Node>(data) {
                Ok(node) => nodes.push(node),
                Err(e) => {
                    warn!("Skipping unparseable node record {}: {}", key, e);
                }
            }
        }

        info!("Loaded {} nodes from registry", nodes.len());

        let context = SchedulingContext::new(pod.clone());
        let filtered = filter_nodes(&context, &nodes, &self.predicates);

        if filtered.is_empty() {
            return Err(SchedulerError::no_feasible_nodes(name));
        }

        info!(
            pod = %name,
            state = %AttemptState::Filtered,
            "{} of {} nodes feasible",
            filtered.len(),
            nodes.len()
        );

        let candidates = CandidateSet {
            pod,
            filtered_nodes: filtered,
            attempt,
        };

        let status = self.outbound.post_json(&self.score_url, &candidates).await?;
        info!("Pushed candidate set to scorer, response status {}", status);

        Ok(())
    }

    /// Wrap this service in a work queue; errors terminate the attempt
    /// with a log line
    pub fn into_queue(self, config: DispatchConfig) -> WorkQueue<FilterJob> {
        let service = Arc::new(self);
        WorkQueue::spawn("filter", config, move |job: FilterJob| {
            let service = service.clone();
            async move {
                let attempt = job.attempt;
                if let Err(e) = service.filter_pod(job).await {
                    error!(
                        attempt = %attempt,
                        state = %AttemptState::FilterFailed,
                        "Filter stage failed: {}",
                        e
                    );
                }
            }
        })
    }
}

/// Score stage: rank the candidate set and push it to the binder
pub struct ScoreService {
    outbound: PipelineClient,
    scorers: Vec<Box<dyn ScoreFunction>>,
    bind_url: String,
}

impl ScoreService {
    pub fn new(bind_url: impl Into<String>) -> Self {
        Self {
            outbound: PipelineClient::default(),
            scorers: default_scorers(),
            bind_url: bind_url.into(),
        }
    }

    /// Score and rank one candidate set
    pub async fn score_nodes(&self, candidates: CandidateSet) -> Result<()> {
        let CandidateSet {
            pod,
            filtered_nodes,
            attempt,
        } = candidates;
        let (_, name) = pod_identity(&pod)?;

        // Nothing to bind; no downstream call
        if filtered_nodes.is_empty() {
            info!(pod = %name, "Empty candidate set, nothing to score");
            return Ok(());
        }

        info!(
            pod = %name,
            attempt = %attempt,
            state = %AttemptState::Scoring,
            "Scoring {} candidates",
            filtered_nodes.len()
        );

        let context = SchedulingContext::new(pod.clone());
        let scored = score_candidates(&self.scorers, &context, filtered_nodes);

        let mut ranked = RankedSet {
            pod,
            scored_nodes: scored,
            attempt,
        };
        ranked.sort_by_score();

        info!(
            pod = %name,
            state = %AttemptState::Scored,
            "Top candidate {} with score {:.3}",
            ranked.scored_nodes[0]
                .node
                .metadata
                .name
                .as_deref()
                .unwrap_or("unknown"),
            ranked.scored_nodes[0].score
        );

        let status = self.outbound.post_json(&self.bind_url, &ranked).await?;
        info!("Pushed ranked set to binder, response status {}", status);

        Ok(())
    }

    /// Wrap this service in a work queue
    pub fn into_queue(self, config: DispatchConfig) -> WorkQueue<CandidateSet> {
        let service = Arc::new(self);
        WorkQueue::spawn("score", config, move |candidates: CandidateSet| {
            let service = service.clone();
            async move {
                if let Err(e) = service.score_nodes(candidates).await {
                    error!("Score stage failed: {}", e);
                }
            }
        })
    }
}

/// Resolve a node's first internal address
pub fn internal_address(node: &Node) -> Option<String> {
    node.status
        .as_ref()?
        .addresses
        .as_ref()?
        .iter()
        .find(|a| a.type_ == "InternalIP")
        .map(|a| a.address.clone())
}

/// Bind stage: commit the top-ranked assignment and hand the pod to the
/// chosen node's execution agent
pub struct BindService {
    registry: Arc<RegistryClient>,
    outbound: PipelineClient,
    agent_port: u16,
}

impl BindService {
    pub fn new(registry: Arc<RegistryClient>, agent_port: u16) -> Self {
        Self {
            registry,
            outbound: PipelineClient::default(),
            agent_port,
        }
    }

    /// Bind one pod to the highest-scored node; returns the node name
    pub async fn bind_pod(&self, ranked: RankedSet) -> Result<String> {
        let RankedSet {
            pod: mut bound_pod,
            scored_nodes,
            attempt,
        } = ranked;

        let best = scored_nodes
            .first()
            .ok_or_else(|| SchedulerError::internal_error("ranked set is empty"))?;

        let node_name = best
            .node
            .metadata
            .name
            .clone()
            .ok_or_else(|| SchedulerError::internal_error("selected node has no name"))?;

        let (namespace, name) = pod_identity(&bound_pod)?;

        info!(
            pod = %name,
            node = %node_name,
            attempt = %attempt,
            state = %AttemptState::Binding,
            "Binding pod"
        );

        // A newer attempt may have claimed this pod since filtering
        if let Some(data) = self.registry.get(&claim_key(&namespace, &name)).await? {
            if let Ok(claim) = from_json::<Claim>(&data) {
                if claim.attempt != attempt {
                    warn!(
                        pod = %name,
                        ours = %attempt,
                        theirs = %claim.attempt,
                        "Claim superseded, abandoning attempt"
                    );
                    return Err(SchedulerError::attempt_superseded(name));
                }
            }
        }

        let spec = bound_pod
            .spec
            .as_mut()
            .ok_or_else(|| SchedulerError::internal_error("pod has no spec"))?;
        spec.node_name = Some(node_name.clone());

        let data = to_json(&bound_pod)?;
        self.registry
            .put(&pod_key(&namespace, &name), &data)
            .await?;

        info!(pod = %name, node = %node_name, "Assignment committed to registry");

        // The assignment above stays committed even if the handoff fails
        let address = internal_address(&best.node)
            .ok_or_else(|| SchedulerError::no_agent_address(&name, &node_name))?;

        let agent_url = format!("http://{}:{}/pods", address, self.agent_port);
        match self.outbound.post_json(&agent_url, &bound_pod).await {
            Ok(status) => {
                info!(
                    pod = %name,
                    state = %AttemptState::Bound,
                    "Delivered pod to agent at {}, response status {}",
                    agent_url,
                    status
                );
            }
            Err(e) => {
                warn!(
                    pod = %name,
                    "Agent delivery to {} failed, assignment remains committed: {}",
                    agent_url,
                    e
                );
            }
        }

        // Release the claim; a failure here only leaves a stale record
        if let Err(e) = self.registry.delete(&claim_key(&namespace, &name)).await {
            warn!(pod = %name, "Failed to release claim: {}", e);
        }

        Ok(node_name)
    }

    /// Wrap this service in a work queue
    pub fn into_queue(self, config: DispatchConfig) -> WorkQueue<RankedSet> {
        let service = Arc::new(self);
        WorkQueue::spawn("bind", config, move |ranked: RankedSet| {
            let service = service.clone();
            async move {
                if let Err(e) = service.bind_pod(ranked).await {
                    error!(state = %AttemptState::BindFailed, "Bind stage failed: {}", e);
                }
            }
        })
    }
}
