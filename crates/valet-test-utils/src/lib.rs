//! Shared doubles for valet crate tests: scriptable chat providers and a
//! store that fails on demand.

mod chat;
mod store;

pub use chat::{FailingChat, FixedChat, ScriptedChat};
pub use store::FailingStore;
