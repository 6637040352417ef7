//! Fuzz target for WireEvent CBOR decoding
//!
//! # Strategy
//!
//! - Random bytes: completely arbitrary CBOR
//! - Type confusion: maps with a valid `kind` tag and mistyped fields
//! - Unknown tags: maps whose `kind` names no event
//! - Deep nesting: arrays nested to arbitrary depth
//!
//! # Invariants
//!
//! - Decoding NEVER panics
//! - Unknown or mistyped events are rejected, not defaulted

#![no_main]

use arbitrary::Arbitrary;
use bluechat_proto::decode_event;
use ciborium::Value;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Arbitrary)]
enum EventAttack {
    RandomBytes(Vec<u8>),
    TypeConfusion { kind: KnownKind, fields: Vec<(String, FieldValue)> },
    UnknownKind(String),
    DeeplyNested(u8),
}

#[derive(Debug, Clone, Copy, Arbitrary)]
enum KnownKind {
    Presence,
    Chat,
    Typing,
    Receipt,
}

#[derive(Debug, Clone, Arbitrary)]
enum FieldValue {
    Int(i64),
    Text(String),
    Bytes(Vec<u8>),
    Bool(bool),
    Null,
}

impl From<FieldValue> for Value {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Int(n) => Value::Integer(n.into()),
            FieldValue::Text(s) => Value::Text(s),
            FieldValue::Bytes(b) => Value::Bytes(b),
            FieldValue::Bool(b) => Value::Bool(b),
            FieldValue::Null => Value::Null,
        }
    }
}

fn encode(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    ciborium::into_writer(value, &mut out).expect("in-memory write");
    out
}

fuzz_target!(|attack: EventAttack| {
    let bytes = match attack {
        EventAttack::RandomBytes(bytes) => bytes,
        EventAttack::TypeConfusion { kind, fields } => {
            let tag = match kind {
                KnownKind::Presence => "presence",
                KnownKind::Chat => "chat",
                KnownKind::Typing => "typing",
                KnownKind::Receipt => "receipt",
            };
            let mut map = vec![(Value::Text("kind".into()), Value::Text(tag.into()))];
            map.extend(fields.into_iter().map(|(k, v)| (Value::Text(k), v.into())));
            encode(&Value::Map(map))
        },
        EventAttack::UnknownKind(kind) => {
            let known = ["presence", "chat", "typing", "receipt"];
            let map = Value::Map(vec![(Value::Text("kind".into()), Value::Text(kind.clone()))]);
            let result = decode_event(&encode(&map));
            if !known.contains(&kind.as_str()) {
                assert!(result.is_err(), "unknown kind {kind:?} accepted");
            }
            return;
        },
        EventAttack::DeeplyNested(depth) => {
            let mut value = Value::Null;
            for _ in 0..(depth % 64) {
                value = Value::Array(vec![value]);
            }
            encode(&value)
        },
    };

    let _ = decode_event(&bytes);
});
