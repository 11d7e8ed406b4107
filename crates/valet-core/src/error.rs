//! Error types for the core engine crate.

use thiserror::Error;
use valet_protocol::ChatError;
use valet_storage::StoreError;

/// Errors returned by bot operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Conversation keys must be non-empty.
    #[error("conversation key cannot be empty")]
    EmptyConversationKey,
    /// A conversation with the same key already exists on this bot.
    #[error("conversation already exists: {0}")]
    DuplicateConversation(String),
    /// Conversation key is unknown to this bot.
    #[error("unknown conversation: {0}")]
    UnknownConversation(String),
    /// The bot's permissions do not include chat access.
    #[error("chat capability is not enabled")]
    ChatDisabled,
    /// A pending step names a module that is not registered.
    #[error("unknown module: {0}")]
    UnknownModule(String),
    /// The model sent tool arguments that could not be decoded.
    #[error("malformed tool arguments for {function}: {message}")]
    BadToolArguments { function: String, message: String },
    /// Chat collaborator failure; aborts the turn unchanged.
    #[error(transparent)]
    Chat(#[from] ChatError),
    /// Persistence failure; aborts the turn unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),
}
