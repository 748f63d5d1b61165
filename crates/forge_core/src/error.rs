//! Error types for the core module.

use std::fmt;

use thiserror::Error;

/// Result type alias for artifact store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by an artifact store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Store rejected write: {0}")]
    Rejected(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Extraction tier of the response normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// The whole text parsed as-is
    Direct,
    /// Interior of a ```json fenced block
    Fenced,
    /// Span between the first opening and last closing delimiter
    Span,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Fenced => "fenced",
            Self::Span => "span",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a single tier did not produce a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierFailure {
    pub tier: Tier,
    pub reason: String,
}

/// Every extraction tier failed on a model response.
///
/// The raw text is kept so the caller can log it for inspection.
#[derive(Error, Debug, Clone)]
#[error("Failed to extract structured data from model output ({})", summarize(.attempts))]
pub struct ExtractionError {
    /// The unmodified model output
    pub raw: String,
    /// One entry per tier, in the order they were tried
    pub attempts: Vec<TierFailure>,
}

fn summarize(attempts: &[TierFailure]) -> String {
    attempts
        .iter()
        .map(|a| format!("{}: {}", a.tier, a.reason))
        .collect::<Vec<_>>()
        .join("; ")
}
