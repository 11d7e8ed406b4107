//! Chat-provider doubles.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use valet_protocol::{ChatError, ChatProvider, ChatReply, ChatRequest};

/// Chat provider that always answers with the same text.
#[derive(Debug, Clone)]
pub struct FixedChat {
    response: String,
}

impl FixedChat {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

#[async_trait]
impl ChatProvider for FixedChat {
    async fn chat(&self, _request: ChatRequest) -> Result<ChatReply, ChatError> {
        Ok(ChatReply::text(self.response.clone()))
    }
}

/// Chat provider that pops scripted replies in order and records every
/// request it receives.
pub struct ScriptedChat {
    replies: Mutex<VecDeque<ChatReply>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl ScriptedChat {
    pub fn new(replies: Vec<ChatReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every request seen so far, in call order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().clone()
    }

    /// Number of round-trips made so far.
    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl ChatProvider for ScriptedChat {
    async fn chat(&self, request: ChatRequest) -> Result<ChatReply, ChatError> {
        self.requests.lock().push(request);
        self.replies
            .lock()
            .pop_front()
            .ok_or_else(|| ChatError::Service("scripted chat exhausted".to_string()))
    }
}

/// Chat provider that fails every call.
#[derive(Debug, Clone)]
pub struct FailingChat {
    message: String,
}

impl FailingChat {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl ChatProvider for FailingChat {
    async fn chat(&self, _request: ChatRequest) -> Result<ChatReply, ChatError> {
        Err(ChatError::Transport(self.message.clone()))
    }
}
