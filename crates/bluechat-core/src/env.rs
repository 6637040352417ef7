//! Environment abstraction for deterministic testing.
//!
//! Decouples engine logic from system resources (time, randomness). Production
//! uses the real clock and OS entropy; simulation uses a virtual clock and a
//! seeded RNG so every run is reproducible.

use std::{ops::Sub, time::Duration};

use bluechat_proto::{MessageId, PeerId};

/// Abstract environment providing time, randomness, and async primitives.
///
/// Implementations MUST guarantee that `now()` never goes backwards.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Monotonic instant type.
    ///
    /// Production uses `std::time::Instant`; simulation uses a virtual
    /// instant driven by the test.
    type Instant: Copy + Ord + Send + Sync + std::fmt::Debug + Sub<Output = Duration>;

    /// Current monotonic time.
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// Only driver code awaits this; engine logic takes `now` as a parameter.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    ///
    /// Given the same seed, a simulated environment produces the same bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Milliseconds since the Unix epoch, used for message timestamps.
    fn wall_clock_millis(&self) -> u64;

    /// Generates a random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }

    /// Generates a random `u128`.
    fn random_u128(&self) -> u128 {
        let mut bytes = [0u8; 16];
        self.random_bytes(&mut bytes);
        u128::from_be_bytes(bytes)
    }

    /// Fresh peer identifier.
    fn new_peer_id(&self) -> PeerId {
        PeerId::from_u128(self.random_u128())
    }

    /// Fresh message identifier.
    fn new_message_id(&self) -> MessageId {
        MessageId::from_u128(self.random_u128())
    }
}
