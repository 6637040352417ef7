//! Transport abstraction.
//!
//! A transport is a shared broadcast medium. Every event published by one
//! participant reaches every other current subscriber at most once, in the
//! order that publisher sent it. There is no ordering across publishers and
//! no delivery guarantee; with no subscribers an event is silently dropped.
//!
//! Subscriptions are queues rather than callbacks. The owner of a
//! [`Subscription`] drains it and applies each event to whatever state is
//! live at that moment, so nothing ever observes a captured snapshot.

mod local;

use bluechat_proto::WireEvent;
pub use local::{LocalBus, LocalLink};
use tokio::sync::mpsc;

/// A participant's handle onto a shared medium.
pub trait Transport: Send + Sync + 'static {
    /// Hand `event` to every other participant's subscriptions.
    ///
    /// Never blocks and never fails: undeliverable events are dropped, and
    /// the publisher's own subscriptions never see the event.
    fn publish(&self, event: &WireEvent);

    /// Start receiving events published by other participants.
    fn subscribe(&self) -> Subscription;
}

/// Queue of inbound events.
///
/// Dropping the subscription (or calling [`Subscription::unsubscribe`])
/// detaches it; publishers prune closed queues lazily.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<WireEvent>,
}

impl Subscription {
    /// New subscription and the sender that feeds it.
    pub fn channel() -> (mpsc::UnboundedSender<WireEvent>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }

    /// Next event, waiting if none is queued. `None` once every sender is
    /// gone.
    pub async fn recv(&mut self) -> Option<WireEvent> {
        self.rx.recv().await
    }

    /// Next queued event without waiting.
    pub fn try_recv(&mut self) -> Option<WireEvent> {
        self.rx.try_recv().ok()
    }

    /// Detach from the medium.
    pub fn unsubscribe(mut self) {
        self.rx.close();
    }
}
