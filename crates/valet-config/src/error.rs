//! Error types for configuration loading.

use thiserror::Error;

/// Errors returned while loading or resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Config file could not be parsed.
    #[error("parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
}
