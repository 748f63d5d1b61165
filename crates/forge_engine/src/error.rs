//! Error types for the synthesis engine.

use std::fmt;

use forge_core::{ExtractionError, StoreError};
use thiserror::Error;

/// Result type alias for model gateway calls.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Failures of the model gateway.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("LLM not configured: {0}")]
    NotConfigured(String),

    #[error("Invalid LLM configuration: {0}")]
    InvalidConfig(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("LLM request timed out after {0}s")]
    Timeout(u64),

    #[error("{provider} API error {status}: {body}")]
    Api {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("Malformed {provider} response: {message}")]
    MalformedResponse { provider: String, message: String },

    #[error("Empty response from {0}")]
    EmptyResponse(String),

    #[error("Model unavailable: {0}")]
    Unavailable(String),
}

impl GatewayError {
    /// Whether an opt-in retry may help
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// The step of the engine a model call belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Schema,
    Components,
    Pages,
    Iteration,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Schema => "schema",
            Self::Components => "components",
            Self::Pages => "pages",
            Self::Iteration => "iteration",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by the orchestrator and the iteration engine.
///
/// Nothing is recovered locally; every variant reaches the caller.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Model invocation failed during {phase}: {source}")]
    ModelInvocation {
        phase: Phase,
        #[source]
        source: GatewayError,
    },

    #[error("Could not extract {phase} output: {source}")]
    JsonExtraction {
        phase: Phase,
        #[source]
        source: ExtractionError,
    },

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Persistence error: {0}")]
    Persistence(StoreError),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ProjectNotFound(id) => Self::ProjectNotFound(id),
            other => Self::Persistence(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_project_maps_to_not_found() {
        let err: EngineError = StoreError::ProjectNotFound("p1".to_string()).into();
        assert!(matches!(err, EngineError::ProjectNotFound(id) if id == "p1"));

        let err: EngineError = StoreError::Rejected("disk full".to_string()).into();
        assert!(matches!(err, EngineError::Persistence(_)));
    }

    #[test]
    fn test_transient_classification() {
        let rate_limited = GatewayError::Api {
            provider: "OpenAI".to_string(),
            status: 429,
            body: String::new(),
        };
        let bad_request = GatewayError::Api {
            provider: "OpenAI".to_string(),
            status: 400,
            body: String::new(),
        };

        assert!(rate_limited.is_transient());
        assert!(!bad_request.is_transient());
        assert!(GatewayError::Timeout(30).is_transient());
        assert!(!GatewayError::EmptyResponse("OpenAI".to_string()).is_transient());
    }
}
