//! Transport wrapper that loses events.

use std::sync::{Arc, Mutex, PoisonError};

use bluechat_core::{Subscription, Transport};
use bluechat_proto::WireEvent;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Wraps a [`Transport`] and drops outbound events at a seeded rate.
///
/// A partitioned link drops everything it publishes. Inbound delivery is
/// untouched, so loss is modelled once, at the sender.
#[derive(Clone)]
pub struct LossyLink<T> {
    inner: T,
    faults: Arc<Mutex<Faults>>,
}

struct Faults {
    drop_rate: f64,
    partitioned: bool,
    rng: ChaCha8Rng,
    published: u64,
    dropped: u64,
}

impl<T: Transport> LossyLink<T> {
    /// Wrap `inner`. `drop_rate` is clamped to `0.0..=1.0`.
    pub fn new(inner: T, drop_rate: f64, seed: u64) -> Self {
        let faults = Faults {
            drop_rate: drop_rate.clamp(0.0, 1.0),
            partitioned: false,
            rng: ChaCha8Rng::seed_from_u64(seed),
            published: 0,
            dropped: 0,
        };
        Self { inner, faults: Arc::new(Mutex::new(faults)) }
    }

    /// Change the drop rate.
    pub fn set_drop_rate(&self, drop_rate: f64) {
        self.lock().drop_rate = drop_rate.clamp(0.0, 1.0);
    }

    /// Cut this link off from the bus, or reconnect it.
    pub fn set_partitioned(&self, partitioned: bool) {
        self.lock().partitioned = partitioned;
    }

    /// Events handed to the wrapped transport.
    pub fn published(&self) -> u64 {
        self.lock().published
    }

    /// Events dropped.
    pub fn dropped(&self) -> u64 {
        self.lock().dropped
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Transport> Transport for LossyLink<T> {
    fn publish(&self, event: &WireEvent) {
        {
            let mut faults = self.lock();
            let drop_rate = faults.drop_rate;
            if faults.partitioned || faults.rng.gen_bool(drop_rate) {
                faults.dropped += 1;
                debug!(kind = event.kind(), "dropped outbound event");
                return;
            }
            faults.published += 1;
        }
        self.inner.publish(event);
    }

    fn subscribe(&self) -> Subscription {
        self.inner.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use bluechat_core::LocalBus;
    use bluechat_proto::{PeerId, PeerInfo};

    use super::*;

    fn presence() -> WireEvent {
        WireEvent::Presence { peer: PeerInfo { id: PeerId::from_u128(1), name: "Ana".into() } }
    }

    #[test]
    fn zero_rate_passes_everything() {
        let bus = LocalBus::new();
        let link = LossyLink::new(bus.link(), 0.0, 1);
        let mut other = bus.link().subscribe();

        for _ in 0..10 {
            link.publish(&presence());
        }

        assert_eq!(link.published(), 10);
        assert_eq!(link.dropped(), 0);
        let mut received = 0;
        while other.try_recv().is_some() {
            received += 1;
        }
        assert_eq!(received, 10);
    }

    #[test]
    fn partition_drops_everything() {
        let bus = LocalBus::new();
        let link = LossyLink::new(bus.link(), 0.0, 1);
        let mut other = bus.link().subscribe();

        link.set_partitioned(true);
        link.publish(&presence());
        assert!(other.try_recv().is_none());
        assert_eq!(link.dropped(), 1);

        link.set_partitioned(false);
        link.publish(&presence());
        assert!(other.try_recv().is_some());
    }

    #[test]
    fn loss_is_reproducible_from_seed() {
        let run = |seed| {
            let bus = LocalBus::new();
            let link = LossyLink::new(bus.link(), 0.5, seed);
            for _ in 0..64 {
                link.publish(&presence());
            }
            link.dropped()
        };

        assert_eq!(run(9), run(9));
        let dropped = run(9);
        assert!(dropped > 0 && dropped < 64);
    }
}
