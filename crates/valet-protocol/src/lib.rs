//! Shared contract types for the valet dialogue engine.
//!
//! This crate owns the chat-completion collaborator contract, the turn-level
//! I/O types exchanged with front-ends and capability modules, and the
//! permission bitmask checked on every turn.

pub mod chat;
pub mod io;
pub mod permissions;
pub mod tool;

pub use chat::{ChatError, ChatMessage, ChatProvider, ChatReply, ChatRequest, ChatRole, ToolCallRequest};
pub use io::{Input, Output, Payload};
pub use permissions::Permissions;
pub use tool::ToolSchema;
