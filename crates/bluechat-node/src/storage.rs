//! Redb-backed durable storage.
//!
//! Uses redb's ACID transactions, so a session-list rewrite is either fully
//! visible after a crash or not at all.

use std::{path::Path, sync::Arc};

use bluechat_core::{
    ChatSession, Storage, StorageError,
    storage::{decode_record, encode_record},
};
use bluechat_proto::Identity;
use redb::{Database, TableDefinition};

/// Table: identity
/// Key: [`RECORD`]
/// Value: CBOR-encoded Identity
const IDENTITY: TableDefinition<&str, &[u8]> = TableDefinition::new("identity");

/// Table: sessions
/// Key: [`RECORD`]
/// Value: CBOR-encoded list of ChatSession, newest first
const SESSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("sessions");

/// Each table holds exactly one record under this key.
const RECORD: &str = "current";

/// Durable storage backed by redb.
///
/// Thread-safe through redb's internal locking. Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbStorage {
    db: Arc<Database>,
}

impl RedbStorage {
    /// Open or create a database at the given path, creating both tables.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the database cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db = Database::create(path.as_ref()).map_err(|e| StorageError::Io(e.to_string()))?;

        let txn = db.begin_write().map_err(|e| StorageError::Io(e.to_string()))?;
        {
            let _ = txn.open_table(IDENTITY).map_err(|e| StorageError::Io(e.to_string()))?;
            let _ = txn.open_table(SESSIONS).map_err(|e| StorageError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    fn read(&self, table: TableDefinition<&str, &[u8]>) -> Result<Option<Vec<u8>>, StorageError> {
        let txn = self.db.begin_read().map_err(|e| StorageError::Io(e.to_string()))?;
        let table = txn.open_table(table).map_err(|e| StorageError::Io(e.to_string()))?;
        let value = table.get(RECORD).map_err(|e| StorageError::Io(e.to_string()))?;
        Ok(value.map(|v| v.value().to_vec()))
    }

    fn write(&self, table: TableDefinition<&str, &[u8]>, bytes: &[u8]) -> Result<(), StorageError> {
        let txn = self.db.begin_write().map_err(|e| StorageError::Io(e.to_string()))?;
        {
            let mut table = txn.open_table(table).map_err(|e| StorageError::Io(e.to_string()))?;
            table.insert(RECORD, bytes).map_err(|e| StorageError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| StorageError::Io(e.to_string()))?;
        Ok(())
    }

    /// Overwrite the session record with raw bytes.
    ///
    /// Recovery tests use this to plant a malformed record.
    #[doc(hidden)]
    pub fn write_raw_sessions(&self, bytes: &[u8]) -> Result<(), StorageError> {
        self.write(SESSIONS, bytes)
    }
}

impl Storage for RedbStorage {
    fn load_identity(&self) -> Result<Option<Identity>, StorageError> {
        self.read(IDENTITY)?.as_deref().map(decode_record::<Identity>).transpose()
    }

    fn store_identity(&self, identity: &Identity) -> Result<(), StorageError> {
        self.write(IDENTITY, &encode_record(identity)?)
    }

    fn load_sessions(&self) -> Result<Vec<ChatSession>, StorageError> {
        match self.read(SESSIONS)? {
            Some(bytes) => decode_record(&bytes),
            None => Ok(Vec::new()),
        }
    }

    fn store_sessions(&self, sessions: &[ChatSession]) -> Result<(), StorageError> {
        self.write(SESSIONS, &encode_record(&sessions)?)
    }
}
