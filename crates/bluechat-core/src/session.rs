//! Conversations and their persistence.
//!
//! A [`ChatSession`] is the durable record of one conversation with one peer.
//! The [`SessionStore`] keeps the full list in memory, newest first, and
//! mirrors it to [`Storage`] on every mutation.
//!
//! # Invariants
//!
//! - Unique keys: at most one session per peer id.
//! - Write-through: a mutation becomes visible in memory only after the full
//!   list has been stored. A failed write leaves memory untouched.
//! - `is_typing` is transient and never reaches storage.

use bluechat_proto::{Message, MessageId, PeerId};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::storage::{Storage, StorageError};

/// One conversation with one peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    /// Peer on the other side; the session key.
    pub peer_id: PeerId,
    /// Display name of the peer.
    pub peer_name: String,
    /// Peer's phone handle, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_phone_handle: Option<String>,
    /// Messages in arrival/send order.
    pub messages: Vec<Message>,
    /// Preview text of the most recent message.
    #[serde(default)]
    pub last_message: Option<String>,
    /// Timestamp of the most recent message.
    #[serde(default)]
    pub last_timestamp: Option<u64>,
    /// Inbound messages received while the session was not active.
    #[serde(default)]
    pub unread_count: u32,
    /// Peer is typing right now. Transient.
    #[serde(skip)]
    pub is_typing: bool,
}

impl ChatSession {
    /// Empty session with a peer.
    pub fn new(peer_id: PeerId, peer_name: impl Into<String>) -> Self {
        Self {
            peer_id,
            peer_name: peer_name.into(),
            peer_phone_handle: None,
            messages: Vec::new(),
            last_message: None,
            last_timestamp: None,
            unread_count: 0,
            is_typing: false,
        }
    }

    /// Append a message and refresh the preview fields.
    pub fn push_message(&mut self, message: Message) {
        self.last_message = Some(message.text.clone());
        self.last_timestamp = Some(message.timestamp);
        self.messages.push(message);
    }

    /// Look up a message by id.
    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Mutable lookup by id.
    pub fn message_mut(&mut self, id: MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }
}

/// In-memory session list with write-through persistence.
pub struct SessionStore<S: Storage> {
    storage: S,
    /// Newest first
    sessions: Vec<ChatSession>,
    /// Conversation currently in view. Not persisted.
    active: Option<PeerId>,
}

impl<S: Storage> SessionStore<S> {
    /// Load the persisted list.
    ///
    /// A malformed record loads as an empty list; only I/O failures are
    /// reported.
    pub fn load(storage: S) -> Result<Self, StorageError> {
        let sessions = match storage.load_sessions() {
            Ok(sessions) => sessions,
            Err(StorageError::Serialization(reason)) => {
                warn!(%reason, "stored sessions are malformed, starting empty");
                Vec::new()
            },
            Err(err) => return Err(err),
        };
        debug!(count = sessions.len(), "sessions loaded");

        Ok(Self { storage, sessions, active: None })
    }

    /// All sessions, newest first.
    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    /// Session with `peer`, if any.
    pub fn session(&self, peer: PeerId) -> Option<&ChatSession> {
        self.sessions.iter().find(|s| s.peer_id == peer)
    }

    /// Whether a session with `peer` exists.
    pub fn contains(&self, peer: PeerId) -> bool {
        self.session(peer).is_some()
    }

    /// Conversation currently in view.
    pub fn active(&self) -> Option<PeerId> {
        self.active
    }

    /// Backing storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Apply `mutate` to a copy of the list, persist the copy, then adopt it.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the write fails; memory is unchanged.
    pub fn update<R>(&mut self, mutate: impl FnOnce(&mut Vec<ChatSession>) -> R) -> Result<R, StorageError> {
        let mut next = self.sessions.clone();
        let out = mutate(&mut next);

        debug_assert!(
            next.iter().enumerate().all(|(i, s)| next[..i].iter().all(|o| o.peer_id != s.peer_id)),
            "session keys must stay unique"
        );

        self.storage.store_sessions(&next)?;
        self.sessions = next;
        Ok(out)
    }

    /// Create an empty session with `peer` unless one exists.
    ///
    /// New sessions go to the front. Persists only when something was
    /// created. Returns `true` if a session was created.
    pub fn ensure(&mut self, peer: PeerId, peer_name: &str) -> Result<bool, StorageError> {
        if self.contains(peer) {
            return Ok(false);
        }
        self.update(|sessions| sessions.insert(0, ChatSession::new(peer, peer_name)))?;
        debug!(%peer, "session created");
        Ok(true)
    }

    /// Change the conversation in view.
    ///
    /// Activating a session resets its unread counter, persisting first when
    /// the counter was non-zero. Activating an unknown peer clears the
    /// selection.
    pub fn set_active(&mut self, peer: Option<PeerId>) -> Result<(), StorageError> {
        let Some(peer) = peer else {
            self.active = None;
            return Ok(());
        };

        let Some(unread) = self.session(peer).map(|s| s.unread_count) else {
            self.active = None;
            return Ok(());
        };

        if unread > 0 {
            self.update(|sessions| {
                if let Some(s) = sessions.iter_mut().find(|s| s.peer_id == peer) {
                    s.unread_count = 0;
                }
            })?;
        }

        self.active = Some(peer);
        Ok(())
    }

    /// Set the transient typing flag. Returns `false` if there is no session.
    pub fn set_typing(&mut self, peer: PeerId, is_typing: bool) -> bool {
        match self.sessions.iter_mut().find(|s| s.peer_id == peer) {
            Some(session) => {
                session.is_typing = is_typing;
                true
            },
            None => false,
        }
    }

    /// Clear every transient typing flag.
    pub fn clear_typing(&mut self) {
        for session in &mut self.sessions {
            session.is_typing = false;
        }
    }
}
