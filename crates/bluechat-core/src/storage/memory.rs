use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bluechat_proto::Identity;

use super::{Storage, StorageError, decode_record, encode_record};
use crate::session::ChatSession;

/// In-memory storage for tests and simulation.
///
/// Records are kept as CBOR bytes, exactly as a durable backend would hold
/// them, so transient fields are dropped on store and malformed records can
/// be planted with [`MemoryStorage::corrupt_sessions`]. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryStorageInner>>,
}

#[derive(Default)]
struct MemoryStorageInner {
    identity: Option<Vec<u8>>,
    sessions: Option<Vec<u8>>,
    session_writes: usize,
}

impl MemoryStorage {
    /// Create a new empty `MemoryStorage`.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryStorageInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Overwrite the stored session record with raw bytes.
    pub fn corrupt_sessions(&self, bytes: impl Into<Vec<u8>>) {
        self.lock().sessions = Some(bytes.into());
    }

    /// Number of successful session-list writes.
    pub fn session_writes(&self) -> usize {
        self.lock().session_writes
    }
}

impl Storage for MemoryStorage {
    fn load_identity(&self) -> Result<Option<Identity>, StorageError> {
        self.lock().identity.as_deref().map(decode_record::<Identity>).transpose()
    }

    fn store_identity(&self, identity: &Identity) -> Result<(), StorageError> {
        let bytes = encode_record(identity)?;
        self.lock().identity = Some(bytes);
        Ok(())
    }

    fn load_sessions(&self) -> Result<Vec<ChatSession>, StorageError> {
        match self.lock().sessions.as_deref() {
            Some(bytes) => decode_record(bytes),
            None => Ok(Vec::new()),
        }
    }

    fn store_sessions(&self, sessions: &[ChatSession]) -> Result<(), StorageError> {
        let bytes = encode_record(&sessions)?;
        let mut inner = self.lock();
        inner.sessions = Some(bytes);
        inner.session_writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bluechat_proto::{Message, MessageId, PeerId, Profile};

    use super::*;

    #[test]
    fn empty_storage_has_nothing() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.load_identity().unwrap(), None);
        assert!(storage.load_sessions().unwrap().is_empty());
    }

    #[test]
    fn identity_roundtrip() {
        let storage = MemoryStorage::new();
        let profile = Profile::new("Ana", "11", "98765432").unwrap();
        let identity = Identity::new(PeerId::from_u128(5), profile);

        storage.store_identity(&identity).unwrap();
        assert_eq!(storage.load_identity().unwrap(), Some(identity));
    }

    #[test]
    fn typing_flag_is_not_persisted() {
        let storage = MemoryStorage::new();
        let mut session = ChatSession::new(PeerId::from_u128(1), "Bia");
        session.push_message(Message::new(MessageId::from_u128(2), "oi", PeerId::from_u128(1), 10));
        session.is_typing = true;

        storage.store_sessions(std::slice::from_ref(&session)).unwrap();
        let loaded = storage.load_sessions().unwrap();

        assert!(!loaded[0].is_typing);
        assert_eq!(loaded[0].messages, session.messages);
        assert_eq!(storage.session_writes(), 1);
    }

    #[test]
    fn corrupt_record_is_a_serialization_error() {
        let storage = MemoryStorage::new();
        storage.corrupt_sessions(b"not cbor at all".to_vec());
        assert!(matches!(storage.load_sessions(), Err(StorageError::Serialization(_))));
    }
}
