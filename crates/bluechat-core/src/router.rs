//! Inbound reconciliation and outbound message handling.
//!
//! The router is the only component that changes sessions in response to
//! wire events. It is stateless apart from the local identity and the
//! placeholder name: the session store and directory are passed in, so the
//! caller decides what state is live.
//!
//! # Routing rules
//!
//! | event    | dropped when                           | effect                          |
//! |----------|----------------------------------------|---------------------------------|
//! | presence | from self, or a session already exists | directory entry                 |
//! | chat     | not addressed to us, or sent by us     | append, unread, receipt back    |
//! | typing   | from self, or no session               | transient flag                  |
//! | receipt  | from self                              | `Sent -> Delivered`             |

use bluechat_proto::{DeliveryStatus, Message, MessageId, PeerId, PeerInfo, WireEvent};
use tracing::{debug, trace};

use crate::{
    action::CoreAction,
    delivery::{DeliveryTracker, ReceiptOutcome},
    directory::PeerDirectory,
    error::CoreError,
    session::{ChatSession, SessionStore},
    storage::Storage,
};

/// Applies wire events and local sends to sessions.
#[derive(Debug, Clone)]
pub struct MessageRouter {
    local: PeerId,
    placeholder_name: String,
}

impl MessageRouter {
    /// Router for the given local peer.
    pub fn new(local: PeerId, placeholder_name: impl Into<String>) -> Self {
        Self { local, placeholder_name: placeholder_name.into() }
    }

    /// Local peer id.
    pub fn local(&self) -> PeerId {
        self.local
    }

    /// Apply one inbound event.
    ///
    /// # Errors
    ///
    /// Storage failure while persisting the result. State is unchanged and
    /// no actions are emitted.
    pub fn handle<S: Storage>(
        &self,
        store: &mut SessionStore<S>,
        directory: &mut PeerDirectory,
        event: WireEvent,
    ) -> Result<Vec<CoreAction>, CoreError> {
        if event.origin() == self.local {
            trace!(kind = event.kind(), "dropping own event");
            return Ok(vec![]);
        }

        match event {
            WireEvent::Presence { peer } => {
                self.apply_presence(store, directory, peer);
                Ok(vec![])
            },
            WireEvent::Chat { message, destination } => {
                if destination != self.local {
                    trace!(%destination, "dropping chat addressed elsewhere");
                    return Ok(vec![]);
                }
                self.apply_inbound(store, directory, message)
            },
            WireEvent::Typing { from, is_typing } => {
                Self::apply_typing(store, from, is_typing);
                Ok(vec![])
            },
            WireEvent::Receipt { message_id, from } => {
                self.apply_receipt(store, message_id, from)?;
                Ok(vec![])
            },
        }
    }

    /// Record a presence announcement unless a session with the peer exists.
    pub fn apply_presence<S: Storage>(
        &self,
        store: &SessionStore<S>,
        directory: &mut PeerDirectory,
        peer: PeerInfo,
    ) -> bool {
        if store.contains(peer.id) {
            trace!(peer = %peer.id, "presence from peer with a session");
            return false;
        }
        directory.on_presence(peer)
    }

    /// Open (or reopen) the conversation with `peer` and make it active.
    ///
    /// Idempotent: an existing session is reused unchanged. The peer leaves
    /// the directory.
    pub fn open_session<S: Storage>(
        &self,
        store: &mut SessionStore<S>,
        directory: &mut PeerDirectory,
        peer: PeerInfo,
    ) -> Result<(), CoreError> {
        store.ensure(peer.id, &peer.name)?;
        store.set_active(Some(peer.id))?;
        directory.remove(peer.id);
        Ok(())
    }

    /// Record a locally authored message and publish it.
    ///
    /// The message is stored and published as `Sent` whatever status it
    /// carried.
    ///
    /// # Errors
    ///
    /// - [`CoreError::UnknownPeer`] if there is no session with `destination`
    /// - [`CoreError::Storage`] if persisting fails; nothing is published
    pub fn apply_outbound<S: Storage>(
        &self,
        store: &mut SessionStore<S>,
        mut message: Message,
        destination: PeerId,
    ) -> Result<Vec<CoreAction>, CoreError> {
        if !store.contains(destination) {
            return Err(CoreError::UnknownPeer(destination));
        }
        message.status = DeliveryStatus::Sent;

        let event = WireEvent::Chat { message: message.clone(), destination };
        store.update(|sessions| {
            if let Some(session) = sessions.iter_mut().find(|s| s.peer_id == destination) {
                session.push_message(message);
            }
        })?;

        debug!(%destination, "message sent");
        Ok(vec![CoreAction::Publish(event)])
    }

    /// Record a message addressed to us and acknowledge it.
    ///
    /// Messages from peers without a session open one, named after the
    /// directory entry when the peer was discovered. A message id already
    /// present is not appended again but is still acknowledged.
    pub fn apply_inbound<S: Storage>(
        &self,
        store: &mut SessionStore<S>,
        directory: &mut PeerDirectory,
        message: Message,
    ) -> Result<Vec<CoreAction>, CoreError> {
        let sender = message.sender_id;
        let receipt = CoreAction::Publish(WireEvent::Receipt { message_id: message.id, from: self.local });
        let is_active = store.active() == Some(sender);

        let already_stored = store.session(sender).map(|s| s.message(message.id).is_some());

        match already_stored {
            Some(true) => {
                trace!(%sender, message_id = %message.id, "duplicate message");
            },
            Some(false) => {
                store.update(|sessions| {
                    if let Some(session) = sessions.iter_mut().find(|s| s.peer_id == sender) {
                        session.push_message(message);
                        session.is_typing = false;
                        if !is_active {
                            session.unread_count = session.unread_count.saturating_add(1);
                        }
                    }
                })?;
            },
            None => {
                let name = directory
                    .get(sender)
                    .map_or_else(|| self.placeholder_name.clone(), |d| d.name.clone());
                let mut session = ChatSession::new(sender, name);
                session.push_message(message);
                session.unread_count = u32::from(!is_active);

                store.update(|sessions| sessions.insert(0, session))?;
                directory.remove(sender);
                debug!(%sender, "session opened by inbound message");
            },
        }

        Ok(vec![receipt])
    }

    /// Update the transient typing flag of the session with `peer`.
    pub fn apply_typing<S: Storage>(store: &mut SessionStore<S>, peer: PeerId, is_typing: bool) {
        if !store.set_typing(peer, is_typing) {
            trace!(%peer, "typing from peer without a session");
        }
    }

    /// Apply a delivery receipt to one of our own messages.
    pub fn apply_receipt<S: Storage>(
        &self,
        store: &mut SessionStore<S>,
        message_id: MessageId,
        peer: PeerId,
    ) -> Result<ReceiptOutcome, CoreError> {
        Ok(DeliveryTracker::apply_receipt(store, self.local, message_id, peer)?)
    }
}
