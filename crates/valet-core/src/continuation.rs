//! Continuation queue and session variable bag.
//!
//! A wizard suspends itself by pushing a [`PendingStep`] — an explicit tag
//! naming the module and step function to resume — and parking collected
//! fields in the [`VariableBag`] as plain JSON values. Both live only in
//! process memory and die with it.

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// A suspended wizard step waiting for the next raw user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingStep {
    /// Name of the module that owns the step.
    pub module: String,
    /// Step tag the module resolves back to a step function.
    pub step: String,
}

impl PendingStep {
    /// Build a pending step.
    pub fn new(module: impl Into<String>, step: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            step: step.into(),
        }
    }
}

/// Strict per-bot FIFO of pending steps; one entry is consumed per turn.
#[derive(Debug, Clone, Default)]
pub(crate) struct ContinuationQueue {
    steps: Arc<Mutex<VecDeque<PendingStep>>>,
}

impl ContinuationQueue {
    /// Append a step to the back of the queue.
    pub(crate) fn push(&self, step: PendingStep) {
        self.steps.lock().push_back(step);
    }

    /// Pop the step at the front of the queue.
    pub(crate) fn pop(&self) -> Option<PendingStep> {
        self.steps.lock().pop_front()
    }

    /// Drop every pending step.
    pub(crate) fn clear(&self) {
        self.steps.lock().clear();
    }
}

/// Free-form session values step functions pass between turns.
#[derive(Debug, Clone, Default)]
pub struct VariableBag {
    values: Arc<Mutex<HashMap<String, Value>>>,
}

impl VariableBag {
    /// Write a value, replacing any previous one.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.values.lock().insert(key.into(), value);
    }

    /// Read a value by key.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().get(key).cloned()
    }

    /// Remove a value by key.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.values.lock().remove(key)
    }
}
