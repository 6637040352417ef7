//! The four events exchanged between peers.
//!
//! Events are internally tagged by a `kind` field with camelCase field names,
//! so the encoded shapes are:
//!
//! - `{kind: "presence", peer: {id, name}}`
//! - `{kind: "chat", message: {..}, destination}`
//! - `{kind: "typing", from, isTyping}`
//! - `{kind: "receipt", messageId, from}`

use serde::{Deserialize, Serialize};

use crate::{
    identity::PeerInfo,
    ids::{MessageId, PeerId},
    message::Message,
};

/// A single event on the shared transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum WireEvent {
    /// A peer announces it is reachable.
    Presence {
        /// Announcing peer
        peer: PeerInfo,
    },

    /// A text message addressed to one peer.
    Chat {
        /// The message, including its sender id
        message: Message,
        /// Addressee
        destination: PeerId,
    },

    /// Typing indicator change.
    Typing {
        /// Peer whose typing state changed
        from: PeerId,
        /// New state
        is_typing: bool,
    },

    /// Acknowledges receipt of a chat message.
    Receipt {
        /// Acknowledged message
        message_id: MessageId,
        /// Peer that received the message
        from: PeerId,
    },
}

impl WireEvent {
    /// Short name of the event kind, matching the wire tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Presence { .. } => "presence",
            Self::Chat { .. } => "chat",
            Self::Typing { .. } => "typing",
            Self::Receipt { .. } => "receipt",
        }
    }

    /// Peer that produced the event.
    pub fn origin(&self) -> PeerId {
        match self {
            Self::Presence { peer } => peer.id,
            Self::Chat { message, .. } => message.sender_id,
            Self::Typing { from, .. } | Self::Receipt { from, .. } => *from,
        }
    }
}
