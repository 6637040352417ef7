//! Property-based tests for the datagram envelope.
//!
//! Arbitrary events survive encode/decode unchanged, and arbitrary input
//! bytes are rejected with an error rather than a panic.

use bluechat_proto::{
    Datagram, DeliveryStatus, HEADER_SIZE, MAGIC, Message, MessageId, PeerId, PeerInfo, WIRE_VERSION, WireEvent,
};
use proptest::prelude::*;

fn arbitrary_status() -> impl Strategy<Value = DeliveryStatus> {
    prop_oneof![Just(DeliveryStatus::Sent), Just(DeliveryStatus::Delivered), Just(DeliveryStatus::Read)]
}

fn arbitrary_event() -> impl Strategy<Value = WireEvent> {
    let peer = any::<u128>().prop_map(PeerId::from_u128);
    let message_id = any::<u128>().prop_map(MessageId::from_u128);

    prop_oneof![
        (peer.clone(), ".{0,32}")
            .prop_map(|(id, name)| WireEvent::Presence { peer: PeerInfo { id, name } }),
        (message_id.clone(), ".{0,256}", peer.clone(), any::<u64>(), arbitrary_status(), peer.clone())
            .prop_map(|(id, text, sender, timestamp, status, destination)| {
                let mut message = Message::new(id, text, sender, timestamp);
                message.status = status;
                WireEvent::Chat { message, destination }
            }),
        (peer.clone(), any::<bool>()).prop_map(|(from, is_typing)| WireEvent::Typing { from, is_typing }),
        (message_id, peer).prop_map(|(message_id, from)| WireEvent::Receipt { message_id, from }),
    ]
}

#[test]
fn prop_datagram_roundtrip() {
    proptest!(|(event in arbitrary_event(), nonce in any::<u64>())| {
        let datagram = Datagram { link_nonce: nonce, event };
        let bytes = datagram.encode().expect("encode should succeed");
        let decoded = Datagram::decode(&bytes).expect("decode should succeed");
        prop_assert_eq!(decoded, datagram);
    });
}

#[test]
fn prop_decode_arbitrary_bytes_never_panics() {
    proptest!(|(bytes in prop::collection::vec(any::<u8>(), 0..512))| {
        let _ = Datagram::decode(&bytes);
    });
}

#[test]
fn prop_decode_valid_header_garbage_body_never_panics() {
    proptest!(|(nonce in any::<u64>(), body in prop::collection::vec(any::<u8>(), 0..256))| {
        let mut bytes = Vec::with_capacity(HEADER_SIZE + body.len());
        bytes.extend_from_slice(&MAGIC);
        bytes.push(WIRE_VERSION);
        bytes.extend_from_slice(&nonce.to_be_bytes());
        bytes.extend_from_slice(&body);
        let _ = Datagram::decode(&bytes);
    });
}
