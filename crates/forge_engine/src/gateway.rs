//! Model gateway boundary.
//!
//! The gateway is the only place that talks to a language model. It returns
//! raw text; all structure recovery happens in the normalizer.

use async_trait::async_trait;
use forge_core::normalizer;
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::error::{EngineError, EngineResult, GatewayError, GatewayResult, Phase};

/// Sends a compiled prompt to a language model and returns its raw reply.
///
/// Failures are returned as-is. Implementations decide whether to retry;
/// the engine never does.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelGateway: Send + Sync {
    async fn invoke(&self, prompt: &str) -> GatewayResult<String>;
}

/// Invoke the gateway and decode its reply into `T`.
///
/// A blank reply is a model invocation failure whatever gateway produced it.
///
/// Extraction failures are logged with the full raw reply before being
/// returned.
pub(crate) async fn request_structured<T: DeserializeOwned>(
    gateway: &dyn ModelGateway,
    phase: Phase,
    prompt: &str,
) -> EngineResult<T> {
    debug!("Invoking model for {} ({} prompt chars)", phase, prompt.len());

    let raw = gateway
        .invoke(prompt)
        .await
        .map_err(|source| EngineError::ModelInvocation { phase, source })?;

    if raw.trim().is_empty() {
        return Err(EngineError::ModelInvocation {
            phase,
            source: GatewayError::EmptyResponse("model gateway".to_string()),
        });
    }

    normalizer::extract(&raw).map_err(|source| {
        error!(
            phase = phase.as_str(),
            raw = %source.raw,
            "Failed to extract structured output: {}",
            source
        );
        EngineError::JsonExtraction { phase, source }
    })
}
