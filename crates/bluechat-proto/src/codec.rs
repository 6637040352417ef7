//! CBOR event encoding and the datagram envelope.
//!
//! In-process transports hand [`WireEvent`] values around directly. Links
//! that cross a process boundary use [`encode_event`]/[`decode_event`] for
//! the body and, on datagram sockets, wrap it in a [`Datagram`]:
//!
//! ```text
//! +-------+---------+-------------+-------------------+
//! | magic | version | link nonce  | CBOR event body   |
//! | 4 B   | 1 B     | 8 B (BE)    | variable          |
//! +-------+---------+-------------+-------------------+
//! ```
//!
//! The link nonce lets a multicast link recognise and discard its own
//! looped-back datagrams.

use crate::{
    errors::{ProtocolError, Result},
    event::WireEvent,
};

/// Datagram magic bytes.
pub const MAGIC: [u8; 4] = *b"BLUE";

/// Current wire version.
pub const WIRE_VERSION: u8 = 1;

/// Size of the fixed datagram header in bytes.
pub const HEADER_SIZE: usize = 13;

/// Largest datagram that fits a single IPv4 UDP payload.
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Encode an event body as CBOR.
///
/// # Errors
///
/// [`ProtocolError::Encode`] if serialization fails.
pub fn encode_event(event: &WireEvent) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(event, &mut buf).map_err(|e| ProtocolError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Decode a CBOR event body.
///
/// # Errors
///
/// [`ProtocolError::Decode`] if the bytes are not CBOR or do not match any
/// event shape.
pub fn decode_event(bytes: &[u8]) -> Result<WireEvent> {
    ciborium::de::from_reader(bytes).map_err(|e| ProtocolError::Decode(e.to_string()))
}

/// An event plus the envelope used on datagram links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    /// Random value identifying the sending link instance.
    pub link_nonce: u64,
    /// Carried event
    pub event: WireEvent,
}

impl Datagram {
    /// Encode header and body into one buffer.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::Encode`] if the body cannot be serialized
    /// - [`ProtocolError::TooLarge`] if the result exceeds
    ///   [`MAX_DATAGRAM_SIZE`]
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(HEADER_SIZE + 128);
        buf.extend_from_slice(&MAGIC);
        buf.push(WIRE_VERSION);
        buf.extend_from_slice(&self.link_nonce.to_be_bytes());
        ciborium::ser::into_writer(&self.event, &mut buf)
            .map_err(|e| ProtocolError::Encode(e.to_string()))?;

        if buf.len() > MAX_DATAGRAM_SIZE {
            return Err(ProtocolError::TooLarge { size: buf.len(), max: MAX_DATAGRAM_SIZE });
        }
        Ok(buf)
    }

    /// Parse a received datagram.
    ///
    /// Header checks run before the body is touched.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::TooShort`] if fewer than [`HEADER_SIZE`] bytes
    /// - [`ProtocolError::BadMagic`] / [`ProtocolError::UnsupportedVersion`]
    ///   for foreign or incompatible senders
    /// - [`ProtocolError::Decode`] if the body is malformed
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(ProtocolError::TooShort { len: bytes.len(), min: HEADER_SIZE });
        }

        let (header, body) = bytes.split_at(HEADER_SIZE);
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&header[..4]);
        if magic != MAGIC {
            return Err(ProtocolError::BadMagic(magic));
        }
        if header[4] != WIRE_VERSION {
            return Err(ProtocolError::UnsupportedVersion(header[4]));
        }

        let mut nonce = [0u8; 8];
        nonce.copy_from_slice(&header[5..HEADER_SIZE]);

        Ok(Self { link_nonce: u64::from_be_bytes(nonce), event: decode_event(body)? })
    }
}

#[cfg(test)]
mod tests {
    use ciborium::Value;

    use super::*;
    use crate::{
        identity::PeerInfo,
        ids::{MessageId, PeerId},
        message::Message,
    };

    fn as_map(event: &WireEvent) -> Vec<(String, Value)> {
        let bytes = encode_event(event).unwrap();
        let value: Value = ciborium::de::from_reader(bytes.as_slice()).unwrap();
        value
            .into_map()
            .unwrap()
            .into_iter()
            .map(|(k, v)| (k.into_text().unwrap(), v))
            .collect()
    }

    fn keys(event: &WireEvent) -> Vec<String> {
        let mut keys: Vec<String> = as_map(event).into_iter().map(|(k, _)| k).collect();
        keys.sort();
        keys
    }

    #[test]
    fn wire_field_names() {
        let a = PeerId::from_u128(1);
        let b = PeerId::from_u128(2);

        let presence = WireEvent::Presence { peer: PeerInfo { id: a, name: "Ana".into() } };
        assert_eq!(keys(&presence), ["kind", "peer"]);

        let typing = WireEvent::Typing { from: a, is_typing: true };
        assert_eq!(keys(&typing), ["from", "isTyping", "kind"]);

        let receipt = WireEvent::Receipt { message_id: MessageId::from_u128(3), from: b };
        assert_eq!(keys(&receipt), ["from", "kind", "messageId"]);

        let chat = WireEvent::Chat {
            message: Message::new(MessageId::from_u128(3), "oi", a, 1_000),
            destination: b,
        };
        assert_eq!(keys(&chat), ["destination", "kind", "message"]);

        let message = as_map(&chat).into_iter().find(|(k, _)| k == "message").unwrap().1;
        let mut message_keys: Vec<String> = message
            .into_map()
            .unwrap()
            .into_iter()
            .map(|(k, _)| k.into_text().unwrap())
            .collect();
        message_keys.sort();
        assert_eq!(message_keys, ["id", "senderId", "status", "text", "timestamp"]);
    }

    #[test]
    fn kind_tag_is_lowercase() {
        let event = WireEvent::Typing { from: PeerId::from_u128(1), is_typing: false };
        let kind = as_map(&event).into_iter().find(|(k, _)| k == "kind").unwrap().1;
        assert_eq!(kind.into_text().unwrap(), "typing");
    }

    #[test]
    fn datagram_header_layout() {
        let event = WireEvent::Typing { from: PeerId::from_u128(1), is_typing: true };
        let bytes = Datagram { link_nonce: 0x0102_0304_0506_0708, event: event.clone() }.encode().unwrap();

        assert_eq!(&bytes[..4], b"BLUE");
        assert_eq!(bytes[4], WIRE_VERSION);
        assert_eq!(&bytes[5..13], &[1, 2, 3, 4, 5, 6, 7, 8]);

        let decoded = Datagram::decode(&bytes).unwrap();
        assert_eq!(decoded.link_nonce, 0x0102_0304_0506_0708);
        assert_eq!(decoded.event, event);
    }

    #[test]
    fn rejects_truncated_header() {
        assert_eq!(Datagram::decode(b"BLUE"), Err(ProtocolError::TooShort { len: 4, min: HEADER_SIZE }));
    }

    #[test]
    fn rejects_foreign_magic() {
        let mut bytes = vec![0u8; HEADER_SIZE + 1];
        bytes[..4].copy_from_slice(b"NOPE");
        assert_eq!(Datagram::decode(&bytes), Err(ProtocolError::BadMagic(*b"NOPE")));
    }

    #[test]
    fn rejects_other_versions() {
        let event = WireEvent::Typing { from: PeerId::from_u128(1), is_typing: true };
        let mut bytes = Datagram { link_nonce: 1, event }.encode().unwrap();
        bytes[4] = WIRE_VERSION + 1;
        assert_eq!(Datagram::decode(&bytes), Err(ProtocolError::UnsupportedVersion(WIRE_VERSION + 1)));
    }

    #[test]
    fn rejects_garbage_body() {
        let mut bytes = Vec::from(MAGIC);
        bytes.push(WIRE_VERSION);
        bytes.extend_from_slice(&7u64.to_be_bytes());
        bytes.extend_from_slice(&[0xff, 0x00, 0x13]);
        assert!(matches!(Datagram::decode(&bytes), Err(ProtocolError::Decode(_))));
    }
}
