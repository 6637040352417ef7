//! Node error types.

use bluechat_core::{CoreError, StorageError};
use thiserror::Error;

/// Errors that stop the node.
#[derive(Error, Debug)]
pub enum NodeError {
    /// Socket or terminal I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Engine refused to start or failed fatally.
    #[error("engine error: {0}")]
    Core(#[from] CoreError),

    /// Database could not be opened.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Invalid configuration (missing onboarding fields, etc.)
    #[error("configuration error: {0}")]
    Config(String),
}
