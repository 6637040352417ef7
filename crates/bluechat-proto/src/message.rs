//! Chat messages and their delivery status.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{MessageId, PeerId};

/// Delivery progress of a message.
///
/// Variants are declared in progression order, so the derived `Ord` matches
/// the only legal direction of travel: `Sent < Delivered < Read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// Handed to the transport by the sender.
    Sent,
    /// Acknowledged by the addressee.
    Delivered,
    /// Seen by the addressee. Reserved: no wire event produces it yet.
    Read,
}

/// Attempted to move a status backwards.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("delivery status cannot regress from {from:?} to {to:?}")]
pub struct StatusError {
    /// Current status
    pub from: DeliveryStatus,
    /// Rejected target status
    pub to: DeliveryStatus,
}

impl DeliveryStatus {
    /// Move to `next` if that is a forward step.
    ///
    /// Returns `Ok(true)` when the status changed and `Ok(false)` when it
    /// already equals `next`, so re-applying a transition is a no-op.
    ///
    /// # Errors
    ///
    /// [`StatusError`] if `next` precedes the current status.
    pub fn advance(&mut self, next: Self) -> Result<bool, StatusError> {
        match (*self).cmp(&next) {
            std::cmp::Ordering::Less => {
                *self = next;
                Ok(true)
            },
            std::cmp::Ordering::Equal => Ok(false),
            std::cmp::Ordering::Greater => Err(StatusError { from: *self, to: next }),
        }
    }
}

/// A text message as carried on the wire and stored in a session.
///
/// Immutable except for `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique id chosen by the sender.
    pub id: MessageId,
    /// Text payload.
    pub text: String,
    /// Identity of the author.
    pub sender_id: PeerId,
    /// Creation time in milliseconds since the Unix epoch, sender's clock.
    pub timestamp: u64,
    /// Delivery progress.
    pub status: DeliveryStatus,
}

impl Message {
    /// Create a freshly sent message.
    pub fn new(id: MessageId, text: impl Into<String>, sender_id: PeerId, timestamp: u64) -> Self {
        Self { id, text: text.into(), sender_id, timestamp, status: DeliveryStatus::Sent }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_moves_forward_once() {
        let mut status = DeliveryStatus::Sent;
        assert_eq!(status.advance(DeliveryStatus::Delivered), Ok(true));
        assert_eq!(status.advance(DeliveryStatus::Delivered), Ok(false));
        assert_eq!(status, DeliveryStatus::Delivered);
    }

    #[test]
    fn advance_can_skip_to_read() {
        let mut status = DeliveryStatus::Sent;
        assert_eq!(status.advance(DeliveryStatus::Read), Ok(true));
        assert_eq!(status, DeliveryStatus::Read);
    }

    #[test]
    fn advance_rejects_regression() {
        let mut status = DeliveryStatus::Read;
        let err = status.advance(DeliveryStatus::Delivered).unwrap_err();
        assert_eq!(err, StatusError { from: DeliveryStatus::Read, to: DeliveryStatus::Delivered });
        assert_eq!(status, DeliveryStatus::Read);
    }

    #[test]
    fn new_message_starts_sent() {
        let msg = Message::new(MessageId::from_u128(1), "oi", PeerId::from_u128(2), 10);
        assert_eq!(msg.status, DeliveryStatus::Sent);
    }
}
