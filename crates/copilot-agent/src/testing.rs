//! A scripted model client for exercising the agent loop without a network.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::provider::{ModelClient, ModelRequest, ModelResponse, ProviderError};
use crate::types::Message;

/// Replays canned responses in order and records every transcript it was sent.
pub struct ScriptedModel {
    script: Mutex<VecDeque<Result<ModelResponse, ProviderError>>>,
    seen: Mutex<Vec<Vec<Message>>>,
    delay: Duration,
}

impl ScriptedModel {
    pub fn new(script: Vec<Result<ModelResponse, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            seen: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Transcript length observed on each call.
    pub fn transcript_lengths(&self) -> Vec<usize> {
        self.seen
            .lock()
            .map(|s| s.iter().map(Vec::len).collect())
            .unwrap_or_default()
    }

    pub fn last_transcript(&self) -> Vec<Message> {
        self.seen
            .lock()
            .ok()
            .and_then(|s| s.last().cloned())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn complete(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ProviderError> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(request.messages.to_vec());
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        next.unwrap_or_else(|| Err(ProviderError::Decode("script exhausted".to_string())))
    }
}
