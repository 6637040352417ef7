//! In-process broadcast medium.

use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicU64, Ordering},
};

use bluechat_proto::WireEvent;
use tokio::sync::mpsc;
use tracing::trace;

use super::{Subscription, Transport};

/// Shared in-process medium. Each participant takes its own [`LocalLink`].
#[derive(Clone, Default)]
pub struct LocalBus {
    inner: Arc<BusInner>,
}

#[derive(Default)]
struct BusInner {
    next_link: AtomicU64,
    subscribers: Mutex<Vec<Subscriber>>,
}

struct Subscriber {
    link: u64,
    tx: mpsc::UnboundedSender<WireEvent>,
}

impl LocalBus {
    /// Empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new participant.
    pub fn link(&self) -> LocalLink {
        let id = self.inner.next_link.fetch_add(1, Ordering::Relaxed);
        LocalLink { id, bus: self.clone() }
    }

    /// Live subscriptions across all links.
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.lock();
        subscribers.retain(|s| !s.tx.is_closed());
        subscribers.len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Subscriber>> {
        self.inner.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One participant's view of a [`LocalBus`].
#[derive(Clone)]
pub struct LocalLink {
    id: u64,
    bus: LocalBus,
}

impl Transport for LocalLink {
    fn publish(&self, event: &WireEvent) {
        let mut subscribers = self.bus.lock();
        subscribers.retain(|s| !s.tx.is_closed());

        let mut delivered = 0usize;
        for subscriber in subscribers.iter().filter(|s| s.link != self.id) {
            if subscriber.tx.send(event.clone()).is_ok() {
                delivered += 1;
            }
        }
        trace!(link = self.id, kind = event.kind(), delivered, "published");
    }

    fn subscribe(&self) -> Subscription {
        let (tx, subscription) = Subscription::channel();
        self.bus.lock().push(Subscriber { link: self.id, tx });
        subscription
    }
}

#[cfg(test)]
mod tests {
    use bluechat_proto::PeerId;

    use super::*;

    fn typing(n: u128) -> WireEvent {
        WireEvent::Typing { from: PeerId::from_u128(n), is_typing: true }
    }

    #[test]
    fn publisher_does_not_hear_itself() {
        let bus = LocalBus::new();
        let a = bus.link();
        let b = bus.link();
        let mut a_sub = a.subscribe();
        let mut b_sub = b.subscribe();

        a.publish(&typing(1));

        assert_eq!(b_sub.try_recv(), Some(typing(1)));
        assert_eq!(b_sub.try_recv(), None);
        assert_eq!(a_sub.try_recv(), None);
    }

    #[test]
    fn per_publisher_order_is_preserved() {
        let bus = LocalBus::new();
        let a = bus.link();
        let mut sub = bus.link().subscribe();

        for n in 0..5 {
            a.publish(&typing(n));
        }
        for n in 0..5 {
            assert_eq!(sub.try_recv(), Some(typing(n)));
        }
    }

    #[test]
    fn unsubscribed_queues_are_pruned() {
        let bus = LocalBus::new();
        let a = bus.link();
        let b = bus.link();
        let sub = b.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        sub.unsubscribe();
        a.publish(&typing(1));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn publishing_with_no_subscribers_is_silent() {
        let bus = LocalBus::new();
        bus.link().publish(&typing(1));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn recv_waits_for_events() {
        let bus = LocalBus::new();
        let a = bus.link();
        let mut sub = bus.link().subscribe();

        a.publish(&typing(3));
        assert_eq!(sub.recv().await, Some(typing(3)));
    }
}
