//! Engine error types.
//!
//! Every variant is recoverable: the engine's in-memory state is unchanged
//! when one of these is returned.

use bluechat_proto::{IdentityError, PeerId};
use thiserror::Error;

use crate::storage::StorageError;

/// Errors returned by engine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Persisting or loading state failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Onboarding input was rejected.
    #[error("invalid profile: {0}")]
    Identity(#[from] IdentityError),

    /// No identity has been created on this installation yet.
    #[error("no local identity; onboarding required")]
    NotOnboarded,

    /// Onboarding was attempted twice.
    #[error("local identity already exists")]
    AlreadyOnboarded,

    /// Text was empty after trimming.
    #[error("message text is empty")]
    EmptyMessage,

    /// Operation needs the radio switched on.
    #[error("radio is off")]
    RadioOff,

    /// Peer is neither discovered nor known from an existing session.
    #[error("unknown peer: {0}")]
    UnknownPeer(PeerId),

    /// Operation needs an active conversation.
    #[error("no active session")]
    NoActiveSession,
}

impl CoreError {
    /// Returns true if retrying the same operation may succeed.
    ///
    /// Only storage faults are transient; everything else is a caller error.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Storage(StorageError::Io(_)))
    }
}
