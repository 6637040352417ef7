//! BlueChat wire protocol.
//!
//! Types shared by every peer: identifiers, identities, messages with their
//! delivery status, and the four [`WireEvent`]s that make up the whole
//! cross-peer contract. The protocol is strictly peer-to-peer: events carry no
//! session identifier beyond the peer id.
//!
//! # Encoding
//!
//! Events are CBOR-encoded (self-describing, field names embedded) and, on a
//! datagram link, prefixed with a fixed 13-byte [`Datagram`] header.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod codec;
pub mod errors;
pub mod event;
pub mod identity;
pub mod ids;
pub mod message;

pub use codec::{Datagram, HEADER_SIZE, MAGIC, MAX_DATAGRAM_SIZE, WIRE_VERSION, decode_event, encode_event};
pub use errors::{ProtocolError, Result};
pub use event::WireEvent;
pub use identity::{Device, Identity, IdentityError, PeerInfo, Profile};
pub use ids::{MessageId, PeerId};
pub use message::{DeliveryStatus, Message, StatusError};
