use altair_core::{CandidateSet, RankedSet};
use altair_registry::RegistryClient;
use altair_scheduler::{FilterJob, WorkQueue};
use std::sync::Arc;

/// Webhook collaborator configuration
#[derive(Debug, Clone, Default)]
pub struct WebhookConfig {
    /// Where admission notifications are forwarded; `None` disables the
    /// forward while still allowing every review
    pub reconciler_url: Option<String>,
}

/// Shared application state.
///
/// Which queues are present decides which routes the server mounts, so one
/// process can host a single stage or all of them.
pub struct AppState {
    /// Registry client shared by every handler in this process
    pub registry: Arc<RegistryClient>,

    /// Filter stage intake queue
    pub filter_queue: Option<WorkQueue<FilterJob>>,

    /// Score stage intake queue
    pub score_queue: Option<WorkQueue<CandidateSet>>,

    /// Bind stage intake queue
    pub bind_queue: Option<WorkQueue<RankedSet>>,

    /// Webhook collaborator surface (admission, CRUD, authorization)
    pub webhook: Option<WebhookConfig>,

    /// Client for out-of-band notifications
    pub http: reqwest::Client,
}

impl AppState {
    /// Create state with no roles enabled
    pub fn new(registry: Arc<RegistryClient>) -> Self {
        Self {
            registry,
            filter_queue: None,
            score_queue: None,
            bind_queue: None,
            webhook: None,
            http: reqwest::Client::new(),
        }
    }

    /// Enable the filter intake
    pub fn with_filter(mut self, queue: WorkQueue<FilterJob>) -> Self {
        self.filter_queue = Some(queue);
        self
    }

    /// Enable the score intake
    pub fn with_score(mut self, queue: WorkQueue<CandidateSet>) -> Self {
        self.score_queue = Some(queue);
        self
    }

    /// Enable the bind intake
    pub fn with_bind(mut self, queue: WorkQueue<RankedSet>) -> Self {
        self.bind_queue = Some(queue);
        self
    }

    /// Enable the webhook surface
    pub fn with_webhook(mut self, config: WebhookConfig) -> Self {
        self.webhook = Some(config);
        self
    }
}
