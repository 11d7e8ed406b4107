//! One named transcript and its model-request mirror.
//!
//! The persisted message rows and the in-flight request buffer are kept in
//! lockstep: every append lands in both, and call truncation edits both, so
//! the model never sees a pending call the engine already discarded.

use chrono::Utc;
use uuid::Uuid;
use valet_protocol::{ChatMessage, ChatRole, ToolCallRequest};
use valet_storage::{ConversationRecord, ConversationSnapshot, MessageRecord, MessageSnapshot, ToolCallRecord};

/// A named, ordered transcript belonging to one bot.
#[derive(Debug, Clone)]
pub struct Conversation {
    record: ConversationRecord,
    messages: Vec<MessageSnapshot>,
    request: Vec<ChatMessage>,
}

impl Conversation {
    /// Build a fresh, empty conversation for a bot.
    pub(crate) fn new(bot_id: Uuid, key: &str) -> Self {
        Self {
            record: ConversationRecord {
                id: Uuid::new_v4(),
                bot_id,
                name: key.to_string(),
                created_at: Utc::now(),
            },
            messages: Vec::new(),
            request: Vec::new(),
        }
    }

    /// Rebuild a conversation, request mirror included, from its persisted
    /// snapshot.
    pub(crate) fn from_snapshot(snapshot: ConversationSnapshot) -> Self {
        let request = snapshot.messages.iter().map(chat_message_of).collect();
        Self {
            record: snapshot.conversation,
            messages: snapshot.messages,
            request,
        }
    }

    pub(crate) fn record(&self) -> &ConversationRecord {
        &self.record
    }

    pub(crate) fn id(&self) -> Uuid {
        self.record.id
    }

    /// The conversation key.
    pub fn name(&self) -> &str {
        &self.record.name
    }

    /// Build the persisted rows for a message about to be appended. The
    /// index is the current transcript length, which keeps ordering strictly
    /// increasing and append-only.
    pub(crate) fn stage(&self, message: &ChatMessage) -> MessageSnapshot {
        let id = Uuid::new_v4();
        MessageSnapshot {
            message: MessageRecord {
                id,
                conversation_id: self.record.id,
                idx: self.messages.len() as u32,
                role: message.role.as_str().to_string(),
                name: message.name.clone(),
                content: message.content.clone(),
                tool_call_id: message.tool_call_id.clone(),
                created_at: Utc::now(),
            },
            tool_calls: message
                .tool_calls
                .iter()
                .map(|call| ToolCallRecord {
                    id: call.id.clone(),
                    message_id: id,
                    kind: call.kind.clone(),
                    function: call.function.clone(),
                    arguments: call.arguments.clone(),
                })
                .collect(),
        }
    }

    /// Append a staged message to the transcript and the request mirror.
    pub(crate) fn push(&mut self, message: ChatMessage, staged: MessageSnapshot) {
        self.messages.push(staged);
        self.request.push(message);
    }

    /// Drop every tool call on the last message except the one kept, in the
    /// transcript and the request mirror alike. Returns the message id when
    /// something was truncated so the store can mirror the edit.
    pub(crate) fn truncate_calls(&mut self, keep_call_id: &str) -> Option<Uuid> {
        let staged = self.messages.last_mut()?;
        if !staged.tool_calls.iter().any(|call| call.id == keep_call_id) {
            return None;
        }
        staged.tool_calls.retain(|call| call.id == keep_call_id);

        if let Some(last) = self.request.last_mut() {
            last.tool_calls.retain(|call| call.id == keep_call_id);
        }
        Some(staged.message.id)
    }

    /// The model-request buffer in transcript order.
    pub(crate) fn request(&self) -> &[ChatMessage] {
        &self.request
    }

    /// The persisted transcript rows.
    pub fn messages(&self) -> &[MessageSnapshot] {
        &self.messages
    }
}

fn chat_message_of(snapshot: &MessageSnapshot) -> ChatMessage {
    ChatMessage {
        role: ChatRole::parse(&snapshot.message.role),
        name: snapshot.message.name.clone(),
        content: snapshot.message.content.clone(),
        tool_call_id: snapshot.message.tool_call_id.clone(),
        tool_calls: snapshot
            .tool_calls
            .iter()
            .map(|call| ToolCallRequest {
                id: call.id.clone(),
                kind: call.kind.clone(),
                function: call.function.clone(),
                arguments: call.arguments.clone(),
            })
            .collect(),
    }
}
