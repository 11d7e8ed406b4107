//! The bot: per-assistant state and the turn orchestrator.

use crate::continuation::{ContinuationQueue, VariableBag};
use crate::conversation::Conversation;
use crate::dispatch::{DispatchOutcome, ToolDispatcher, dedupe_calls};
use crate::error::CoreError;
use crate::intent;
use crate::module::{CapabilityModule, ModuleContext, ModuleRegistry};
use chrono::Utc;
use log::{debug, info};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex as TurnMutex;
use uuid::Uuid;
use valet_config::ValetConfig;
use valet_protocol::{
    ChatMessage, ChatProvider, ChatReply, ChatRequest, ChatRole, Input, Output, Permissions,
};
use valet_storage::{AssistantStore, BotRecord, BotSnapshot, MemoryRecord};

/// Fixed reply when a stop intent clears the continuation queue.
const STOPPED_MESSAGE: &str = "Operation stopped";

/// Synthetic tool result persisted after a direct short-circuit so the
/// transcript stays consistent for future model turns.
const TOOL_COMPLETED: &str = r#"{"message": "Operation successfully completed"}"#;

/// One logical assistant: identity, permissions, memory, conversations, and
/// the process-local session state (modules, continuation queue, variables).
pub struct Bot {
    id: Uuid,
    name: String,
    permissions: Permissions,
    config: Arc<ValetConfig>,
    chat: Arc<dyn ChatProvider>,
    store: Arc<dyn AssistantStore>,
    memory: Arc<RwLock<MemoryRecord>>,
    conversations: RwLock<HashMap<String, Conversation>>,
    registry: ModuleRegistry,
    queue: ContinuationQueue,
    variables: VariableBag,
    settings: Arc<HashMap<String, String>>,
    /// One turn lock per conversation key; a whole `send_message` call runs
    /// under it so turns on one conversation serialize while other
    /// conversations proceed in parallel.
    turn_locks: Mutex<HashMap<String, Arc<TurnMutex<()>>>>,
}

impl Bot {
    /// Create a brand-new bot and persist it with an empty memory profile.
    pub fn create(
        name: impl Into<String>,
        permissions: Permissions,
        config: Arc<ValetConfig>,
        chat: Arc<dyn ChatProvider>,
        store: Arc<dyn AssistantStore>,
    ) -> Result<Self, CoreError> {
        let record = BotRecord {
            id: Uuid::new_v4(),
            name: name.into(),
            permissions: permissions.bits(),
            created_at: Utc::now(),
        };
        let memory = MemoryRecord::empty(record.id);
        info!("creating bot (bot_id={}, name={})", record.id, record.name);
        store.create_bot(&record, &memory)?;
        Ok(Self::assemble(record, memory, Vec::new(), config, chat, store))
    }

    /// Rebuild a bot from its persisted snapshot.
    pub fn from_snapshot(
        snapshot: BotSnapshot,
        config: Arc<ValetConfig>,
        chat: Arc<dyn ChatProvider>,
        store: Arc<dyn AssistantStore>,
    ) -> Self {
        Self::assemble(
            snapshot.bot,
            snapshot.memory,
            snapshot
                .conversations
                .into_iter()
                .map(Conversation::from_snapshot)
                .collect(),
            config,
            chat,
            store,
        )
    }

    /// Resume a persisted bot by name, or `None` when no such bot exists.
    pub fn load_by_name(
        name: &str,
        config: Arc<ValetConfig>,
        chat: Arc<dyn ChatProvider>,
        store: Arc<dyn AssistantStore>,
    ) -> Result<Option<Self>, CoreError> {
        let snapshot = store
            .load_bots()?
            .into_iter()
            .find(|snapshot| snapshot.bot.name == name);
        Ok(snapshot.map(|snapshot| Self::from_snapshot(snapshot, config, chat, store)))
    }

    fn assemble(
        record: BotRecord,
        memory: MemoryRecord,
        conversations: Vec<Conversation>,
        config: Arc<ValetConfig>,
        chat: Arc<dyn ChatProvider>,
        store: Arc<dyn AssistantStore>,
    ) -> Self {
        let settings = Arc::new(config.modules.settings.clone());
        Self {
            id: record.id,
            name: record.name,
            permissions: Permissions::from_bits(record.permissions),
            config,
            chat,
            store,
            memory: Arc::new(RwLock::new(memory)),
            conversations: RwLock::new(
                conversations
                    .into_iter()
                    .map(|conversation| (conversation.name().to_string(), conversation))
                    .collect(),
            ),
            registry: ModuleRegistry::new(),
            queue: ContinuationQueue::default(),
            variables: VariableBag::default(),
            settings,
            turn_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Bot identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Bot name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The bot's own permission mask.
    pub fn permissions(&self) -> Permissions {
        self.permissions
    }

    /// Snapshot the memory profile.
    pub fn memory(&self) -> MemoryRecord {
        self.memory.read().clone()
    }

    /// Register a capability module: its handler joins the dispatch probe
    /// order and its schemas join every future model request.
    pub fn register_module(&self, module: Arc<dyn CapabilityModule>) {
        self.registry.register(module);
    }

    /// Write a session variable.
    pub fn set_variable(&self, key: impl Into<String>, value: Value) {
        self.variables.set(key, value);
    }

    /// Read a session variable.
    pub fn variable(&self, key: &str) -> Option<Value> {
        self.variables.get(key)
    }

    /// Add a new conversation under a unique key, seeded with the synthetic
    /// system prompt.
    pub fn add_conversation(&self, key: &str) -> Result<(), CoreError> {
        if key.is_empty() {
            return Err(CoreError::EmptyConversationKey);
        }
        let mut conversations = self.conversations.write();
        if conversations.contains_key(key) {
            return Err(CoreError::DuplicateConversation(key.to_string()));
        }

        let mut conversation = Conversation::new(self.id, key);
        self.store.create_conversation(conversation.record())?;

        let system = ChatMessage::system(&self.config.chat.system_prompt);
        let staged = conversation.stage(&system);
        self.store.append_message(&staged.message, &staged.tool_calls)?;
        conversation.push(system, staged);

        conversations.insert(key.to_string(), conversation);
        Ok(())
    }

    /// Soft-delete a conversation and its messages.
    pub fn delete_conversation(&self, key: &str) -> Result<(), CoreError> {
        let conversation = self
            .conversations
            .write()
            .remove(key)
            .ok_or_else(|| CoreError::UnknownConversation(key.to_string()))?;
        self.turn_locks.lock().remove(key);
        self.store.delete_conversation(conversation.id())?;
        Ok(())
    }

    /// True when the conversation exists.
    pub fn is_conversation(&self, key: &str) -> bool {
        self.conversations.read().contains_key(key)
    }

    /// Inject a message into a conversation without contacting the model.
    /// Front-ends use this to record outreach-style notes in the transcript.
    pub fn add_message(
        &self,
        key: &str,
        role: ChatRole,
        name: Option<&str>,
        content: &str,
    ) -> Result<(), CoreError> {
        let mut message = ChatMessage::new(role, content);
        message.name = name.map(str::to_string);
        self.append_chat_message(key, message)
    }

    /// Consume one user message in a conversation and produce one response.
    ///
    /// This is the turn state machine: continuation check, model
    /// round-trip, tool dispatch, and the optional summary round-trip.
    pub async fn send_message(&self, key: &str, mut input: Input) -> Result<Output, CoreError> {
        input.permissions = input.permissions.mask(self.permissions);
        if !self.permissions.contains(Permissions::CHAT) {
            return Err(CoreError::ChatDisabled);
        }
        if !self.is_conversation(key) {
            return Err(CoreError::UnknownConversation(key.to_string()));
        }

        let turn_lock = self.turn_lock(key);
        let _turn = turn_lock.lock().await;
        info!(
            "starting turn (bot={}, conversation={}, message_len={})",
            self.name,
            key,
            input.message.len()
        );

        if let Some(step) = self.queue.pop() {
            if intent::is_stop(&input.message) {
                debug!("stop intent clears continuation queue (bot={})", self.name);
                self.queue.clear();
                return Ok(Output::text(STOPPED_MESSAGE));
            }
            let module = self
                .registry
                .get(&step.module)
                .ok_or_else(|| CoreError::UnknownModule(step.module.clone()))?;
            debug!(
                "resuming pending step (module={}, step={})",
                step.module, step.step
            );
            let output = module.resume(&step.step, &self.module_context(), &input).await;
            self.save_memory()?;
            return Ok(output);
        }

        self.append_chat_message(key, ChatMessage::user(&input.message))?;
        let reply = self.chat.chat(self.chat_request(key)).await?;

        if !reply.has_tool_calls() {
            self.append_chat_message(key, ChatMessage::assistant(&reply.content))?;
            self.save_memory()?;
            return Ok(Output::text(reply.content));
        }

        self.handle_tool_calls(key, reply, &mut input).await
    }

    /// Dispatch one model reply's tool calls and finish the turn.
    async fn handle_tool_calls(
        &self,
        key: &str,
        reply: ChatReply,
        input: &mut Input,
    ) -> Result<Output, CoreError> {
        let calls = dedupe_calls(&reply.tool_calls);
        debug!(
            "dispatching tool calls (requested={}, unique={})",
            reply.tool_calls.len(),
            calls.len()
        );

        let mut assistant = ChatMessage::assistant(&reply.content);
        assistant.tool_calls = calls.clone();
        self.append_chat_message(key, assistant)?;

        let dispatcher = ToolDispatcher::new(self.registry.clone());
        match dispatcher
            .dispatch(&calls, &self.module_context(), input)
            .await?
        {
            DispatchOutcome::Direct {
                call_id,
                function,
                output,
            } => {
                self.truncate_calls(key, &call_id)?;
                self.append_chat_message(
                    key,
                    ChatMessage::tool(function, TOOL_COMPLETED, call_id),
                )?;
                self.save_memory()?;
                Ok(output)
            }
            DispatchOutcome::Replies(replies) => {
                for tool_reply in replies {
                    self.append_chat_message(
                        key,
                        ChatMessage::tool(tool_reply.function, tool_reply.content, tool_reply.call_id),
                    )?;
                }
                let summary = self.chat.chat(self.chat_request(key)).await?;
                self.append_chat_message(key, ChatMessage::assistant(&summary.content))?;
                self.save_memory()?;
                Ok(Output::text(summary.content))
            }
        }
    }

    fn module_context(&self) -> ModuleContext {
        ModuleContext::new(
            self.memory.clone(),
            self.variables.clone(),
            self.queue.clone(),
            self.settings.clone(),
        )
    }

    fn turn_lock(&self, key: &str) -> Arc<TurnMutex<()>> {
        self.turn_locks
            .lock()
            .entry(key.to_string())
            .or_default()
            .clone()
    }

    /// Persist a message and mirror it into the conversation buffers.
    fn append_chat_message(&self, key: &str, message: ChatMessage) -> Result<(), CoreError> {
        let mut conversations = self.conversations.write();
        let conversation = conversations
            .get_mut(key)
            .ok_or_else(|| CoreError::UnknownConversation(key.to_string()))?;
        let staged = conversation.stage(&message);
        self.store.append_message(&staged.message, &staged.tool_calls)?;
        conversation.push(message, staged);
        Ok(())
    }

    fn truncate_calls(&self, key: &str, keep_call_id: &str) -> Result<(), CoreError> {
        let mut conversations = self.conversations.write();
        let conversation = conversations
            .get_mut(key)
            .ok_or_else(|| CoreError::UnknownConversation(key.to_string()))?;
        if let Some(message_id) = conversation.truncate_calls(keep_call_id) {
            self.store.truncate_tool_calls(message_id, keep_call_id)?;
        }
        Ok(())
    }

    fn chat_request(&self, key: &str) -> ChatRequest {
        let conversations = self.conversations.read();
        let messages = conversations
            .get(key)
            .map(|conversation| conversation.request().to_vec())
            .unwrap_or_default();
        ChatRequest {
            messages,
            tools: self.registry.schemas(),
            temperature: self.config.chat.temperature,
        }
    }

    fn save_memory(&self) -> Result<(), CoreError> {
        self.store.save_memory(&self.memory.read())?;
        Ok(())
    }

    /// Snapshot a conversation's transcript for inspection.
    pub fn conversation_messages(&self, key: &str) -> Option<Vec<valet_storage::MessageSnapshot>> {
        self.conversations
            .read()
            .get(key)
            .map(|conversation| conversation.messages().to_vec())
    }
}
