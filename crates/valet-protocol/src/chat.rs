//! Chat-completion collaborator contract.
//!
//! The engine never speaks a model wire protocol itself; it hands a
//! [`ChatRequest`] to whatever [`ChatProvider`] it was constructed with and
//! interprets the [`ChatReply`] — plain text or requested tool invocations.

use crate::tool::ToolSchema;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Speaker role for a transcript message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// System-authored instruction.
    System,
    /// User-authored message.
    User,
    /// Assistant-authored message.
    Assistant,
    /// Result of a tool invocation.
    Tool,
}

impl ChatRole {
    /// Return the role as its lowercase wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
            ChatRole::Tool => "tool",
        }
    }

    /// Parse a role from its lowercase wire string, defaulting to user.
    pub fn parse(value: &str) -> Self {
        match value {
            "system" => ChatRole::System,
            "assistant" => ChatRole::Assistant,
            "tool" => ChatRole::Tool,
            _ => ChatRole::User,
        }
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCallRequest {
    /// Provider-issued call id; tool-role replies echo it back.
    pub id: String,
    /// Call type tag, `"function"` in the conventional contract.
    pub kind: String,
    /// Name of the function the model wants executed.
    pub function: String,
    /// Raw JSON-shaped argument payload.
    pub arguments: String,
}

impl ToolCallRequest {
    /// Build a function-typed call request.
    pub fn function(
        id: impl Into<String>,
        function: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: "function".to_string(),
            function: function.into(),
            arguments: arguments.into(),
        }
    }
}

/// One entry of the ordered message list sent to the chat service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// Role that produced the message.
    pub role: ChatRole,
    /// Optional speaker name (function name on tool replies).
    pub name: Option<String>,
    /// Message content.
    pub content: String,
    /// Id of the tool call this message answers, on tool-role replies.
    pub tool_call_id: Option<String>,
    /// Tool calls this message requested, on assistant messages.
    pub tool_calls: Vec<ToolCallRequest>,
}

impl ChatMessage {
    /// Build a message with a role and content only.
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self::bare(role, content)
    }

    /// Build a system-role message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::bare(ChatRole::System, content)
    }

    /// Build a user-role message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::bare(ChatRole::User, content)
    }

    /// Build an assistant-role message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::bare(ChatRole::Assistant, content)
    }

    /// Build a tool-role reply bound to the call it answers.
    pub fn tool(
        function: impl Into<String>,
        content: impl Into<String>,
        call_id: impl Into<String>,
    ) -> Self {
        Self {
            role: ChatRole::Tool,
            name: Some(function.into()),
            content: content.into(),
            tool_call_id: Some(call_id.into()),
            tool_calls: Vec::new(),
        }
    }

    fn bare(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            name: None,
            content: content.into(),
            tool_call_id: None,
            tool_calls: Vec::new(),
        }
    }
}

/// A full chat-completion request: transcript, tool schemas, temperature.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Ordered transcript to complete.
    pub messages: Vec<ChatMessage>,
    /// Schemas of every tool the model may request.
    pub tools: Vec<ToolSchema>,
    /// Sampling temperature.
    pub temperature: f32,
}

/// The chat service's answer to one request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    /// Assistant message text; may be empty when tools are requested.
    pub content: String,
    /// Tool invocations the model wants executed before it can answer.
    pub tool_calls: Vec<ToolCallRequest>,
}

impl ChatReply {
    /// Build a plain-text reply.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// Build a reply carrying tool-call requests.
    pub fn with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            content: content.into(),
            tool_calls,
        }
    }

    /// True when the model requested at least one tool invocation.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Errors surfaced by chat providers.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The service could not be reached.
    #[error("chat transport error: {0}")]
    Transport(String),
    /// The service answered with an error status or payload.
    #[error("chat service error: {0}")]
    Service(String),
    /// The reply could not be decoded into the expected shape.
    #[error("malformed chat reply: {0}")]
    Malformed(String),
}

/// Interface to the external language-model chat service.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Complete the transcript, returning text or tool-call requests.
    async fn chat(&self, request: ChatRequest) -> Result<ChatReply, ChatError>;
}

#[cfg(test)]
mod tests {
    use super::{ChatMessage, ChatReply, ChatRole, ToolCallRequest};
    use pretty_assertions::assert_eq;

    #[test]
    fn role_parses_and_formats() {
        assert_eq!(ChatRole::parse("system"), ChatRole::System);
        assert_eq!(ChatRole::parse("tool"), ChatRole::Tool);
        assert_eq!(ChatRole::parse("anything-else"), ChatRole::User);
        assert_eq!(ChatRole::Tool.as_str(), "tool");
    }

    #[test]
    fn tool_reply_links_to_its_call() {
        let message = ChatMessage::tool("vault_get", "{}", "call-1");
        assert_eq!(message.role, ChatRole::Tool);
        assert_eq!(message.name.as_deref(), Some("vault_get"));
        assert_eq!(message.tool_call_id.as_deref(), Some("call-1"));
    }

    #[test]
    fn reply_reports_tool_calls() {
        let reply = ChatReply::text("hello");
        assert!(!reply.has_tool_calls());

        let reply = ChatReply::with_tool_calls(
            "",
            vec![ToolCallRequest::function("call-1", "set_city", "{}")],
        );
        assert!(reply.has_tool_calls());
        assert_eq!(reply.tool_calls[0].kind, "function");
    }
}
