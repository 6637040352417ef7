//! Hardware discovery capability.
//!
//! A [`Scanner`] asks the platform for one nearby device. The result is
//! merged into the [`crate::PeerDirectory`] with the same dedup rules as
//! presence. The capability is optional: [`UnsupportedScanner`] is used where
//! no radio API exists.

use std::future::Future;

use bluechat_proto::Device;
use thiserror::Error;

/// Why a scan produced no device.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// Platform has no scanning API.
    #[error("device scanning is not supported on this platform")]
    Unsupported,

    /// Radio adapter is off or missing.
    #[error("radio adapter is unavailable; check that it is switched on")]
    AdapterUnavailable,

    /// The user dismissed the scan.
    #[error("scan cancelled")]
    Cancelled,

    /// Anything else the platform reported.
    #[error("scan failed: {0}")]
    Unknown(String),
}

impl ScanError {
    /// Whether this outcome should be reported to the user.
    ///
    /// Cancellation is a user choice and stays silent.
    pub fn is_reportable(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

/// Platform device scanner.
pub trait Scanner: Send + Sync + 'static {
    /// Scan for one nearby device. `Ok(None)` when nothing was found.
    fn scan(&self) -> impl Future<Output = Result<Option<Device>, ScanError>> + Send;
}

/// Scanner for platforms without a radio API.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedScanner;

impl Scanner for UnsupportedScanner {
    async fn scan(&self) -> Result<Option<Device>, ScanError> {
        Err(ScanError::Unsupported)
    }
}
