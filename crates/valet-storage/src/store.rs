//! Persistence collaborator contract.

use crate::records::{
    BotRecord, BotSnapshot, ConversationRecord, MemoryRecord, MessageRecord, ToolCallRecord,
};
use thiserror::Error;
use uuid::Uuid;

/// Errors returned by the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem error while opening the database.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Underlying database error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored value could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),
    /// A bot with the same name already exists.
    #[error("bot already exists: {0}")]
    BotExists(String),
    /// A bot row has no live memory row.
    #[error("memory missing for bot: {0}")]
    MissingMemory(Uuid),
}

/// Durable storage used by the engine.
///
/// Implementations must be safe to share across conversations; the engine
/// calls them from concurrently running turns.
pub trait AssistantStore: Send + Sync {
    /// Persist a new bot together with its memory profile.
    fn create_bot(&self, bot: &BotRecord, memory: &MemoryRecord) -> Result<(), StoreError>;

    /// Save an updated memory profile.
    fn save_memory(&self, memory: &MemoryRecord) -> Result<(), StoreError>;

    /// Persist a new conversation.
    fn create_conversation(&self, conversation: &ConversationRecord) -> Result<(), StoreError>;

    /// Soft-delete a conversation, its messages, and their tool calls.
    fn delete_conversation(&self, conversation_id: Uuid) -> Result<(), StoreError>;

    /// Append one message and the tool calls it carries.
    fn append_message(
        &self,
        message: &MessageRecord,
        tool_calls: &[ToolCallRecord],
    ) -> Result<(), StoreError>;

    /// Soft-delete every tool call of a message except the one kept.
    fn truncate_tool_calls(&self, message_id: Uuid, keep_call_id: &str) -> Result<(), StoreError>;

    /// Load every live bot with memory, conversations, messages, and tool
    /// calls populated. Used at process start to resume a bot by name.
    fn load_bots(&self) -> Result<Vec<BotSnapshot>, StoreError>;
}
