//! Store double that fails on demand.

use uuid::Uuid;
use valet_storage::{
    AssistantStore, BotRecord, BotSnapshot, ConversationRecord, MemoryRecord, MessageRecord,
    StoreError, ToolCallRecord,
};

/// Store whose every operation fails, for exercising abort paths.
#[derive(Debug, Default)]
pub struct FailingStore;

impl FailingStore {
    fn fail<T>(&self) -> Result<T, StoreError> {
        Err(StoreError::Corrupt("injected store failure".to_string()))
    }
}

impl AssistantStore for FailingStore {
    fn create_bot(&self, _bot: &BotRecord, _memory: &MemoryRecord) -> Result<(), StoreError> {
        self.fail()
    }

    fn save_memory(&self, _memory: &MemoryRecord) -> Result<(), StoreError> {
        self.fail()
    }

    fn create_conversation(&self, _conversation: &ConversationRecord) -> Result<(), StoreError> {
        self.fail()
    }

    fn delete_conversation(&self, _conversation_id: Uuid) -> Result<(), StoreError> {
        self.fail()
    }

    fn append_message(
        &self,
        _message: &MessageRecord,
        _tool_calls: &[ToolCallRecord],
    ) -> Result<(), StoreError> {
        self.fail()
    }

    fn truncate_tool_calls(
        &self,
        _message_id: Uuid,
        _keep_call_id: &str,
    ) -> Result<(), StoreError> {
        self.fail()
    }

    fn load_bots(&self) -> Result<Vec<BotSnapshot>, StoreError> {
        self.fail()
    }
}
