//! Capability-module contract, registry, and per-turn context.

use crate::continuation::{ContinuationQueue, PendingStep, VariableBag};
use async_trait::async_trait;
use log::debug;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use valet_protocol::{Input, Output, Permissions, ToolSchema};
use valet_storage::MemoryRecord;

/// What a module handler produced for a claimed tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerResult {
    /// A finished, tool-authored output; ends the turn without a second
    /// model round-trip.
    Direct(Output),
    /// Arbitrary data for the model to summarize into the user reply.
    Data(Value),
}

/// A pluggable unit exposing named tool implementations gated by a
/// permission bit.
#[async_trait]
pub trait CapabilityModule: Send + Sync {
    /// Stable module name; pending steps reference it.
    fn name(&self) -> &str;

    /// Permission bits the caller must hold for this module to respond.
    fn permissions(&self) -> Permissions;

    /// Tool schemas this module contributes to the model prompt.
    fn schemas(&self) -> Vec<ToolSchema>;

    /// Handle a tool call, or return `None` when this module does not
    /// implement the function.
    async fn handle(
        &self,
        function: &str,
        ctx: &ModuleContext,
        input: &Input,
    ) -> Option<HandlerResult>;

    /// Resume a previously enqueued wizard step with the next raw input.
    async fn resume(&self, step: &str, ctx: &ModuleContext, input: &Input) -> Output {
        let _ = (ctx, input);
        Output::error(format!("module {} has no step '{step}'", self.name()))
    }
}

/// Ordered registry of capability modules; dispatch probes them in
/// registration order.
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    modules: Arc<RwLock<Vec<Arc<dyn CapabilityModule>>>>,
}

impl ModuleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module at the end of the probe order.
    pub fn register(&self, module: Arc<dyn CapabilityModule>) {
        debug!("registering module (name={})", module.name());
        self.modules.write().push(module);
    }

    /// Fetch a module by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn CapabilityModule>> {
        self.modules
            .read()
            .iter()
            .find(|module| module.name() == name)
            .cloned()
    }

    /// Return every module in registration order.
    pub fn all(&self) -> Vec<Arc<dyn CapabilityModule>> {
        self.modules.read().clone()
    }

    /// Collect the tool schemas of every registered module.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.modules
            .read()
            .iter()
            .flat_map(|module| module.schemas())
            .collect()
    }
}

/// Handles a module needs while serving one turn: the bot's memory profile,
/// the session variable bag, step enqueueing, and module settings.
#[derive(Clone)]
pub struct ModuleContext {
    memory: Arc<RwLock<MemoryRecord>>,
    variables: VariableBag,
    queue: ContinuationQueue,
    settings: Arc<HashMap<String, String>>,
}

impl ModuleContext {
    pub(crate) fn new(
        memory: Arc<RwLock<MemoryRecord>>,
        variables: VariableBag,
        queue: ContinuationQueue,
        settings: Arc<HashMap<String, String>>,
    ) -> Self {
        Self {
            memory,
            variables,
            queue,
            settings,
        }
    }

    /// Build a standalone context detached from any bot, with fresh session
    /// state and an empty memory profile. Intended for module tests.
    pub fn detached(settings: HashMap<String, String>) -> Self {
        Self {
            memory: Arc::new(RwLock::new(MemoryRecord::empty(uuid::Uuid::new_v4()))),
            variables: VariableBag::default(),
            queue: ContinuationQueue::default(),
            settings: Arc::new(settings),
        }
    }

    /// Snapshot the bot's memory profile.
    pub fn memory(&self) -> MemoryRecord {
        self.memory.read().clone()
    }

    /// Mutate the bot's memory profile; the engine persists it when the
    /// turn finishes.
    pub fn update_memory(&self, apply: impl FnOnce(&mut MemoryRecord)) {
        apply(&mut self.memory.write());
    }

    /// Read a session variable.
    pub fn var(&self, key: &str) -> Option<Value> {
        self.variables.get(key)
    }

    /// Write a session variable.
    pub fn set_var(&self, key: impl Into<String>, value: Value) {
        self.variables.set(key, value);
    }

    /// Enqueue a wizard step to run on the bot's next turn.
    pub fn push_step(&self, module: impl Into<String>, step: impl Into<String>) {
        self.queue.push(PendingStep::new(module, step));
    }

    /// Look up a module setting (service URLs, tokens).
    pub fn setting(&self, key: &str) -> Option<String> {
        self.settings.get(key).cloned()
    }
}
