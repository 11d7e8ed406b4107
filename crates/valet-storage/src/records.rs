//! Persisted record types and the eager-load snapshot graph.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted bot identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BotRecord {
    /// Bot identifier.
    pub id: Uuid,
    /// Unique bot name, the process-start lookup key.
    pub name: String,
    /// Raw permission bits.
    pub permissions: u8,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Persisted per-bot memory profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryRecord {
    /// Memory identifier.
    pub id: Uuid,
    /// Owning bot.
    pub bot_id: Uuid,
    /// IANA timezone name.
    pub timezone: String,
    /// Preferred city.
    pub city: String,
    /// Preferred temperature unit.
    pub temperature_unit: String,
}

impl MemoryRecord {
    /// Build an empty profile for a bot.
    pub fn empty(bot_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            bot_id,
            timezone: String::new(),
            city: String::new(),
            temperature_unit: String::new(),
        }
    }
}

/// Persisted conversation row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationRecord {
    /// Conversation identifier.
    pub id: Uuid,
    /// Owning bot.
    pub bot_id: Uuid,
    /// Unique key within the bot.
    pub name: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Persisted message row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageRecord {
    /// Message identifier.
    pub id: Uuid,
    /// Owning conversation.
    pub conversation_id: Uuid,
    /// Position in the transcript; strictly increasing, append-only.
    pub idx: u32,
    /// Speaker role as its wire string.
    pub role: String,
    /// Optional speaker name.
    pub name: Option<String>,
    /// Message content.
    pub content: String,
    /// Id of the tool call this message answers, on tool-role rows.
    pub tool_call_id: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Persisted tool-call row, owned by an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRecord {
    /// Provider-issued call id.
    pub id: String,
    /// Owning message.
    pub message_id: Uuid,
    /// Call type tag.
    pub kind: String,
    /// Invoked function name.
    pub function: String,
    /// Raw argument payload.
    pub arguments: String,
}

/// A message with the tool calls it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageSnapshot {
    pub message: MessageRecord,
    pub tool_calls: Vec<ToolCallRecord>,
}

/// A conversation with its full transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationSnapshot {
    pub conversation: ConversationRecord,
    pub messages: Vec<MessageSnapshot>,
}

/// One bot with every owned record populated, as returned by the
/// process-start eager load.
#[derive(Debug, Clone, PartialEq)]
pub struct BotSnapshot {
    pub bot: BotRecord,
    pub memory: MemoryRecord,
    pub conversations: Vec<ConversationSnapshot>,
}
