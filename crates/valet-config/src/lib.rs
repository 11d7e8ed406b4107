//! Configuration loading for the valet engine.

mod error;
mod model;

pub use error::ConfigError;
pub use model::{
    ChatConfig, ModulesConfig, StorageConfig, ValetConfig, ValetConfigBuilder,
};

use log::info;
use std::path::Path;

/// Load a config from a YAML file.
pub fn load_file(path: impl AsRef<Path>) -> Result<ValetConfig, ConfigError> {
    let path = path.as_ref();
    info!("loading config (path={})", path.display());
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&raw)?)
}
