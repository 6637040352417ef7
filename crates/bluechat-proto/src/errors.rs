//! Protocol error types.

use thiserror::Error;

/// Convenience alias for protocol results.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while encoding or decoding wire data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Datagram shorter than the fixed header.
    #[error("datagram too short: {len} bytes, need at least {min}")]
    TooShort {
        /// Bytes received
        len: usize,
        /// Minimum accepted length
        min: usize,
    },

    /// Datagram does not start with the protocol magic.
    #[error("bad magic: {0:02x?}")]
    BadMagic([u8; 4]),

    /// Datagram was produced by an incompatible protocol version.
    #[error("unsupported wire version: {0}")]
    UnsupportedVersion(u8),

    /// Encoded datagram exceeds the link's size limit.
    #[error("datagram too large: {size} bytes (max {max})")]
    TooLarge {
        /// Encoded size
        size: usize,
        /// Maximum allowed size
        max: usize,
    },

    /// CBOR encoding failed.
    #[error("encode error: {0}")]
    Encode(String),

    /// CBOR decoding failed or the body did not match any event shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// Identifier text is not 32 hex characters.
    #[error("invalid identifier: {0:?}")]
    InvalidId(String),
}
