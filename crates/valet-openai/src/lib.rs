//! OpenAI-compatible chat-completion client.
//!
//! Implements [`ChatProvider`] over the conventional `/chat/completions`
//! HTTP contract: JSON bodies, bearer auth, a `tools` array of function
//! schemas, and `tool_calls` in the assistant reply.

mod wire;

use async_trait::async_trait;
use log::debug;
use valet_config::ChatConfig;
use valet_protocol::{ChatError, ChatProvider, ChatReply, ChatRequest};
use wire::{WireRequest, WireResponse};

/// Chat provider speaking the OpenAI-style HTTP contract.
#[derive(Debug, Clone)]
pub struct OpenAiChat {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiChat {
    /// Build a client from the chat section of the engine config.
    pub fn new(config: &ChatConfig) -> Self {
        Self::with_parts(&config.base_url, config.api_key.clone(), &config.model)
    }

    /// Build a client from explicit parts.
    pub fn with_parts(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
            model: model.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatProvider for OpenAiChat {
    async fn chat(&self, request: ChatRequest) -> Result<ChatReply, ChatError> {
        let body = WireRequest::from_request(&self.model, &request);
        debug!(
            "sending chat completion (model={}, messages={}, tools={})",
            self.model,
            request.messages.len(),
            request.tools.len()
        );

        let mut http = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.api_key {
            http = http.bearer_auth(key);
        }
        let response = http
            .send()
            .await
            .map_err(|err| ChatError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ChatError::Service(format!("status {status}: {detail}")));
        }

        let decoded: WireResponse = response
            .json()
            .await
            .map_err(|err| ChatError::Malformed(err.to_string()))?;
        decoded.into_reply()
    }
}
