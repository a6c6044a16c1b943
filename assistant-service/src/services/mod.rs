//! Core components of the assistant, plus collaborator adapters.

pub mod guard;
pub mod normalizer;
pub mod orchestrator;
pub mod providers;
pub mod router;
pub mod schema;
pub mod session_store;
pub mod status;
pub mod summarizer;
pub mod warehouse;

pub use guard::AnalyticsQueryGuard;
pub use orchestrator::DialogueOrchestrator;
pub use router::IntentRouter;
pub use session_store::SessionStore;
pub use summarizer::ResponseSummarizer;

use providers::ProviderError;
use status::StatusError;
use thiserror::Error;
use warehouse::WarehouseError;

/// Typed failure surfaced by the core components. The orchestrator is the
/// single place that converts these into response envelopes.
#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("missing required information: {}", missing.join(", "))]
    MissingInfo { missing: Vec<&'static str> },

    #[error("unsupported analytics query")]
    UnsupportedQuery,

    #[error("query failed schema validation: {0}")]
    SchemaMismatch(String),

    #[error("{message}")]
    NotFound {
        message: String,
        suggestion: &'static str,
    },

    #[error("upstream call timed out")]
    Timeout,

    #[error("upstream failure: {0}")]
    Upstream(String),

    #[error("could not classify the query")]
    UnknownIntent,
}

impl From<ProviderError> for AssistantError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Timeout => AssistantError::Timeout,
            other => AssistantError::Upstream(other.to_string()),
        }
    }
}

impl From<StatusError> for AssistantError {
    fn from(err: StatusError) -> Self {
        match err {
            StatusError::Timeout => AssistantError::Timeout,
            other => AssistantError::Upstream(other.to_string()),
        }
    }
}

impl From<WarehouseError> for AssistantError {
    fn from(err: WarehouseError) -> Self {
        match err {
            WarehouseError::Timeout => AssistantError::Timeout,
            other => AssistantError::Upstream(other.to_string()),
        }
    }
}
