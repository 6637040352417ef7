//! Opaque 128-bit identifiers.
//!
//! Peer and message identifiers are random 128-bit values. On the wire and in
//! persisted state they are rendered as 32 lowercase hex characters so that
//! they stay opaque to every consumer: nothing may derive meaning from their
//! structure.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::ProtocolError;

const HEX_LEN: usize = 32;

fn parse_hex(s: &str) -> Result<u128, ProtocolError> {
    if s.len() != HEX_LEN || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ProtocolError::InvalidId(s.to_string()));
    }
    u128::from_str_radix(s, 16).map_err(|_| ProtocolError::InvalidId(s.to_string()))
}

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u128);

        impl $name {
            /// Wrap a raw 128-bit value.
            pub const fn from_u128(raw: u128) -> Self {
                Self(raw)
            }

            /// Raw 128-bit value.
            pub const fn as_u128(self) -> u128 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:032x}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ProtocolError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_hex(s).map(Self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let text = String::deserialize(deserializer)?;
                text.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

opaque_id!(
    /// Globally unique identifier naming one installation.
    ///
    /// Generated once at onboarding and never changed afterwards.
    PeerId
);

opaque_id!(
    /// Identifier of a single message, generated by its sender.
    MessageId
);
