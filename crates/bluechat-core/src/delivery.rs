//! Delivery receipts.
//!
//! A receipt names a message and the peer that received it. The message is
//! looked up among the messages we wrote in the session with that peer only,
//! and its status moves
//! `Sent -> Delivered` at most once. Duplicate, late or unknown receipts are
//! no-ops, so redelivery by the transport is harmless.

use bluechat_proto::{DeliveryStatus, MessageId, PeerId};
use tracing::{debug, trace};

use crate::{
    session::SessionStore,
    storage::{Storage, StorageError},
};

/// Result of applying one receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptOutcome {
    /// Status moved to `Delivered` and was persisted.
    Advanced,
    /// Message was already `Delivered` or further.
    AlreadyDelivered,
    /// No session with the acknowledging peer.
    UnknownSession,
    /// Session exists but holds no such outbound message.
    UnknownMessage,
}

/// Applies delivery receipts to stored messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeliveryTracker;

impl DeliveryTracker {
    /// Mark `message_id`, written by `local`, in the session with `peer` as
    /// delivered. Messages written by the peer never advance.
    ///
    /// # Errors
    ///
    /// Storage failure while persisting an advanced status. The in-memory
    /// status is left at its previous value.
    pub fn apply_receipt<S: Storage>(
        store: &mut SessionStore<S>,
        local: PeerId,
        message_id: MessageId,
        peer: PeerId,
    ) -> Result<ReceiptOutcome, StorageError> {
        let Some(session) = store.session(peer) else {
            trace!(%peer, %message_id, "receipt for unknown session");
            return Ok(ReceiptOutcome::UnknownSession);
        };
        let Some(message) = session.message(message_id).filter(|m| m.sender_id == local) else {
            trace!(%peer, %message_id, "receipt for unknown message");
            return Ok(ReceiptOutcome::UnknownMessage);
        };
        if message.status >= DeliveryStatus::Delivered {
            return Ok(ReceiptOutcome::AlreadyDelivered);
        }

        store.update(|sessions| {
            if let Some(message) = sessions
                .iter_mut()
                .find(|s| s.peer_id == peer)
                .and_then(|s| s.message_mut(message_id))
            {
                // Checked above: status is Sent, so this is a forward step.
                let _ = message.status.advance(DeliveryStatus::Delivered);
            }
        })?;

        debug!(%peer, %message_id, "message delivered");
        Ok(ReceiptOutcome::Advanced)
    }
}
