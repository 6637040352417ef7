//! Local identity, onboarding profile and discovery records.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::PeerId;

/// Country prefix prepended to every phone handle.
const COUNTRY_PREFIX: &str = "+55";
/// Digits required in the area code.
const AREA_CODE_DIGITS: usize = 2;
/// Minimum digits in the subscriber number.
const MIN_NUMBER_DIGITS: usize = 8;

/// Rejected onboarding input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// Display name is empty after trimming.
    #[error("display name must not be empty")]
    EmptyName,

    /// Area code does not have exactly two digits.
    #[error("area code must have {AREA_CODE_DIGITS} digits, got {0:?}")]
    InvalidAreaCode(String),

    /// Subscriber number is too short.
    #[error("phone number must have at least {MIN_NUMBER_DIGITS} digits, got {0:?}")]
    InvalidNumber(String),
}

/// Validated onboarding input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    name: String,
    phone_handle: String,
}

impl Profile {
    /// Validate onboarding input.
    ///
    /// The name is trimmed. Non-digit characters are stripped from the area
    /// code and number before validation, and the handle is normalised to
    /// `+55 <area> <number>`.
    pub fn new(name: &str, area_code: &str, number: &str) -> Result<Self, IdentityError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(IdentityError::EmptyName);
        }

        let area: String = area_code.chars().filter(char::is_ascii_digit).collect();
        if area.len() != AREA_CODE_DIGITS {
            return Err(IdentityError::InvalidAreaCode(area_code.to_string()));
        }

        let digits: String = number.chars().filter(char::is_ascii_digit).collect();
        if digits.len() < MIN_NUMBER_DIGITS {
            return Err(IdentityError::InvalidNumber(number.to_string()));
        }

        Ok(Self { name: name.to_string(), phone_handle: format!("{COUNTRY_PREFIX} {area} {digits}") })
    }

    /// Trimmed display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Normalised phone handle.
    pub fn phone_handle(&self) -> &str {
        &self.phone_handle
    }
}

/// The local installation's identity.
///
/// Created once at onboarding and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Globally unique peer id.
    pub id: PeerId,
    /// Display name.
    pub name: String,
    /// Phone-style handle.
    pub phone_handle: String,
    /// Always `true` for the local identity record.
    pub is_self: bool,
}

impl Identity {
    /// Build the local identity from a fresh id and a validated profile.
    pub fn new(id: PeerId, profile: Profile) -> Self {
        Self { id, name: profile.name, phone_handle: profile.phone_handle, is_self: true }
    }

    /// Public part announced in presence events.
    pub fn peer_info(&self) -> PeerInfo {
        PeerInfo { id: self.id, name: self.name.clone() }
    }
}

/// Peer identity as announced on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    /// Peer id.
    pub id: PeerId,
    /// Display name.
    pub name: String,
}

/// A discovered, not yet connected peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Peer id.
    pub id: PeerId,
    /// Display name.
    pub name: String,
    /// Signal strength hint in dBm, when the discovery source reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_strength: Option<i16>,
}

impl From<PeerInfo> for Device {
    fn from(peer: PeerInfo) -> Self {
        Self { id: peer.id, name: peer.name, signal_strength: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_normalises_handle() {
        let profile = Profile::new("  Ana ", "(11)", "9876-5432").unwrap();
        assert_eq!(profile.name(), "Ana");
        assert_eq!(profile.phone_handle(), "+55 11 98765432");
    }

    #[test]
    fn profile_rejects_blank_name() {
        assert_eq!(Profile::new("   ", "11", "98765432"), Err(IdentityError::EmptyName));
    }

    #[test]
    fn profile_rejects_short_fields() {
        assert!(matches!(
            Profile::new("Ana", "1", "98765432"),
            Err(IdentityError::InvalidAreaCode(_))
        ));
        assert!(matches!(Profile::new("Ana", "11", "9876"), Err(IdentityError::InvalidNumber(_))));
    }

    #[test]
    fn identity_is_self() {
        let profile = Profile::new("Ana", "11", "98765432").unwrap();
        let identity = Identity::new(PeerId::from_u128(7), profile);
        assert!(identity.is_self);
        assert_eq!(identity.peer_info(), PeerInfo { id: PeerId::from_u128(7), name: "Ana".into() });
    }
}
