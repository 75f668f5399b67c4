//! Error types for Holonet.

use std::path::PathBuf;
use thiserror::Error;

/// Crate-level error for everything outside the update path.
#[derive(Debug, Error)]
pub enum HolonetError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read config {path:?}: {reason}")]
    ConfigRead { path: PathBuf, reason: String },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("protocol error: {0}")]
    Protocol(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HolonetError>;
