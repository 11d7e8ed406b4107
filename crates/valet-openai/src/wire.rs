//! Wire types for the chat-completion HTTP contract.

use serde::{Deserialize, Serialize};
use valet_protocol::{ChatError, ChatReply, ChatRequest, ToolCallRequest, ToolSchema};

#[derive(Debug, Serialize)]
pub(crate) struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    temperature: f32,
}

impl WireRequest {
    pub(crate) fn from_request(model: &str, request: &ChatRequest) -> Self {
        Self {
            model: model.to_string(),
            messages: request
                .messages
                .iter()
                .map(|message| WireMessage {
                    role: message.role.as_str().to_string(),
                    name: message.name.clone(),
                    content: message.content.clone(),
                    tool_call_id: message.tool_call_id.clone(),
                    tool_calls: message.tool_calls.iter().map(WireToolCall::from).collect(),
                })
                .collect(),
            tools: request
                .tools
                .iter()
                .map(|schema| WireTool {
                    kind: "function".to_string(),
                    function: schema.clone(),
                })
                .collect(),
            temperature: request.temperature,
        }
    }
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: String,
    function: ToolSchema,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    function: WireFunction,
}

impl From<&ToolCallRequest> for WireToolCall {
    fn from(call: &ToolCallRequest) -> Self {
        Self {
            id: call.id.clone(),
            kind: call.kind.clone(),
            function: WireFunction {
                name: call.function.clone(),
                arguments: call.arguments.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireResponse {
    choices: Vec<WireChoice>,
}

impl WireResponse {
    /// Pull the first choice into the engine's reply shape.
    pub(crate) fn into_reply(self) -> Result<ChatReply, ChatError> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ChatError::Malformed("reply carried no choices".to_string()))?;
        Ok(ChatReply {
            content: choice.message.content.unwrap_or_default(),
            tool_calls: choice
                .message
                .tool_calls
                .into_iter()
                .map(|call| ToolCallRequest {
                    id: call.id,
                    kind: call.kind,
                    function: call.function.name,
                    arguments: call.function.arguments,
                })
                .collect(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireIncoming,
}

#[derive(Debug, Deserialize)]
struct WireIncoming {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}
