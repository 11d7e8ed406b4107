//! Configuration schema for the valet engine.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Root config for the engine and its collaborators.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ValetConfig {
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub modules: ModulesConfig,
}

impl ValetConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> ValetConfigBuilder {
        ValetConfigBuilder::new()
    }
}

/// Builder for assembling a `ValetConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct ValetConfigBuilder {
    config: ValetConfig,
}

impl ValetConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: ValetConfig::default(),
        }
    }

    /// Replace the chat-service configuration.
    pub fn chat(mut self, chat: ChatConfig) -> Self {
        self.config.chat = chat;
        self
    }

    /// Replace the storage configuration.
    pub fn storage(mut self, storage: StorageConfig) -> Self {
        self.config.storage = storage;
        self
    }

    /// Replace the module settings table.
    pub fn modules(mut self, modules: ModulesConfig) -> Self {
        self.config.modules = modules;
        self
    }

    /// Set a single module setting.
    pub fn module_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.modules.settings.insert(key.into(), value.into());
        self
    }

    /// Finalize and return the built `ValetConfig`.
    pub fn build(self) -> ValetConfig {
        self.config
    }
}

/// Chat-service collaborator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Base URL of the chat-completion endpoint.
    #[serde(default = "default_chat_base_url")]
    pub base_url: String,
    /// Bearer token, when the service requires one.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model identifier sent with every request.
    #[serde(default = "default_chat_model")]
    pub model: String,
    /// Sampling temperature sent with every request.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Synthetic system-role message seeded into every new conversation.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: default_chat_base_url(),
            api_key: None,
            model: default_chat_model(),
            temperature: default_temperature(),
            system_prompt: default_system_prompt(),
        }
    }
}

fn default_chat_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_system_prompt() -> String {
    "You are a helpful personal assistant named Valet.".to_string()
}

/// Persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Database file path. Relative paths resolve against the working
    /// directory; absent means a per-user default under the home directory.
    #[serde(default)]
    pub path: Option<String>,
}

impl StorageConfig {
    /// Resolve the database path, falling back to `~/.valet/valet.db`.
    pub fn resolve_path(&self) -> PathBuf {
        if let Some(path) = &self.path {
            return PathBuf::from(path);
        }
        if let Some(dirs) = directories::BaseDirs::new() {
            return dirs.home_dir().join(".valet").join("valet.db");
        }
        PathBuf::from(".valet").join("valet.db")
    }
}

/// Free-form settings handed to capability modules (service URLs, tokens).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModulesConfig {
    #[serde(default)]
    pub settings: HashMap<String, String>,
}
