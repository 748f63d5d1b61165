//! Scripted model gateway.
//!
//! Replays a queue of canned replies and failures in order and records
//! every prompt it receives. Used by tests and by offline replay runs.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::ModelGateway;

/// One scripted gateway outcome
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Text(String),
    Failure(String),
}

/// Model gateway that returns predefined replies.
///
/// Clones share the same script and prompt log.
#[derive(Clone, Default)]
pub struct ScriptedGateway {
    replies: Arc<Mutex<VecDeque<ScriptedReply>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a gateway from a JSON array of reply strings
    pub fn from_json(content: &str) -> GatewayResult<Self> {
        let replies: Vec<String> = serde_json::from_str(content)
            .map_err(|e| GatewayError::InvalidConfig(format!("replay script: {}", e)))?;
        Ok(replies
            .into_iter()
            .fold(Self::new(), |gateway, reply| gateway.with_reply(reply)))
    }

    /// Queue a reply
    pub fn with_reply(self, text: impl Into<String>) -> Self {
        self.push(ScriptedReply::Text(text.into()));
        self
    }

    /// Queue a failure
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.push(ScriptedReply::Failure(message.into()));
        self
    }

    pub fn push(&self, reply: ScriptedReply) {
        self.replies.lock().push_back(reply);
    }

    /// Prompts received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    /// Number of queued replies not yet consumed
    pub fn remaining(&self) -> usize {
        self.replies.lock().len()
    }
}

#[async_trait]
impl ModelGateway for ScriptedGateway {
    async fn invoke(&self, prompt: &str) -> GatewayResult<String> {
        self.prompts.lock().push(prompt.to_string());

        match self.replies.lock().pop_front() {
            Some(ScriptedReply::Text(text)) => Ok(text),
            Some(ScriptedReply::Failure(message)) => Err(GatewayError::Unavailable(message)),
            None => Err(GatewayError::Unavailable("no scripted reply left".to_string())),
        }
    }
}
