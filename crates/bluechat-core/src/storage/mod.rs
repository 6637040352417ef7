//! Storage abstraction for BlueChat state.
//!
//! Two independently loaded records: the local identity (written once at
//! onboarding) and the full session list (rewritten on every mutation). The
//! trait is synchronous; records are small and every write replaces the whole
//! record.

mod chaotic;
mod error;
mod memory;

use bluechat_proto::Identity;
pub use chaotic::ChaoticStorage;
pub use error::StorageError;
pub use memory::MemoryStorage;

use crate::session::ChatSession;

/// Storage abstraction for identity and sessions.
///
/// Must be Clone (shared between the service and inspection code), Send +
/// Sync, and synchronous. Implementations typically share internal state via
/// Arc, so clones access the same underlying storage.
pub trait Storage: Clone + Send + Sync + 'static {
    /// Load the local identity. `None` before onboarding.
    fn load_identity(&self) -> Result<Option<Identity>, StorageError>;

    /// Persist the local identity, replacing any previous record.
    fn store_identity(&self, identity: &Identity) -> Result<(), StorageError>;

    /// Load the full session list. Empty if nothing was ever stored.
    ///
    /// Returns [`StorageError::Serialization`] if the stored record is
    /// malformed; callers decide whether that is fatal.
    fn load_sessions(&self) -> Result<Vec<ChatSession>, StorageError>;

    /// Replace the stored session list.
    ///
    /// # Invariants
    ///
    /// - Post: a subsequent `load_sessions` returns exactly `sessions`
    ///   (transient fields excepted)
    fn store_sessions(&self, sessions: &[ChatSession]) -> Result<(), StorageError>;
}

/// CBOR-encode a record for byte-oriented backends.
pub fn encode_record<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(value, &mut buf).map_err(|e| StorageError::Serialization(e.to_string()))?;
    Ok(buf)
}

/// Decode a record written by [`encode_record`].
pub fn decode_record<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
    ciborium::de::from_reader(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
}
