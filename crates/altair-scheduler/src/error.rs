// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Scheduler error type
#[derive(Error, Debug, Diagnostic)]
pub enum SchedulerError {
    /// Every node was filtered out
    #[error("No feasible nodes for pod {pod_name}")]
    #[diagnostic(
        code(scheduler::no_feasible_nodes),
        help("Check node schedulability, taints, affinity rules and allocatable resources; a new trigger is required once the cluster changes")
    )]
    NoFeasibleNodes {
        pod_name: String,
    },

    /// The chosen node exposes no internal address
    #[error("Node {node_name} has no internal address to deliver pod {pod_name} to")]
    #[diagnostic(
        code(scheduler::no_agent_address),
        help("The node record must carry an InternalIP address for the execution agent handoff")
    )]
    NoAgentAddress {
        pod_name: String,
        node_name: String,
    },

    /// A newer scheduling attempt claimed this pod
    #[error("Scheduling attempt for pod {pod_name} was superseded by a newer claim")]
    #[diagnostic(
        code(scheduler::attempt_superseded),
        help("Another trigger re-entered the pipeline for this pod; this attempt is abandoned")
    )]
    AttemptSuperseded {
        pod_name: String,
    },

    /// A push to the next pipeline stage failed
    #[error("Failed to push to {url}: {message}")]
    #[diagnostic(
        code(scheduler::push_failed),
        help("Check that the downstream stage is running and reachable")
    )]
    PushFailed {
        url: String,
        message: String,
    },

    /// Registry error
    #[error("Registry error: {0}")]
    #[diagnostic(
        code(scheduler::registry_error),
        help("Check the registry connection; the background monitor handles reconnection")
    )]
    RegistryError(#[from] altair_registry::RegistryError),

    /// Core error
    #[error("Core error: {0}")]
    #[diagnostic(
        code(scheduler::core_error),
        help("This is an internal error")
    )]
    CoreError(#[from] altair_core::CoreError),

    /// Internal error
    #[error("Internal error: {message}")]
    #[diagnostic(
        code(scheduler::internal_error),
        help("This is likely a bug. Please report it")
    )]
    InternalError {
        message: String,
    },
}

/// Result type for scheduler operations
pub type Result<T> = std::result::Result<T, SchedulerError>;

impl SchedulerError {
    /// Create a NoFeasibleNodes error
    pub fn no_feasible_nodes(pod_name: impl Into<String>) -> Self {
        Self::NoFeasibleNodes {
            pod_name: pod_name.into(),
        }
    }

    /// Create a NoAgentAddress error
    pub fn no_agent_address(pod_name: impl Into<String>, node_name: impl Into<String>) -> Self {
        Self::NoAgentAddress {
            pod_name: pod_name.into(),
            node_name: node_name.into(),
        }
    }

    /// Create an AttemptSuperseded error
    pub fn attempt_superseded(pod_name: impl Into<String>) -> Self {
        Self::AttemptSuperseded {
            pod_name: pod_name.into(),
        }
    }

    /// Create a PushFailed error
    pub fn push_failed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PushFailed {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create an InternalError
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }
}
