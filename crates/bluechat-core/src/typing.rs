//! Local typing indicator debouncing.
//!
//! Each conversation is either idle or active. The first keystroke in an idle
//! conversation announces `typing(true)`; further keystrokes only refresh the
//! timer. After a quiet period the coordinator announces `typing(false)` on
//! the next [`TypingCoordinator::poll`].
//!
//! ```text
//!          keystroke / typing(true)
//!   ┌──────┐ ─────────────────────────> ┌────────────────────────┐
//!   │ Idle │                            │ Active{last_keystroke} │ ──┐ keystroke
//!   └──────┘ <───────────────────────── └────────────────────────┘ <─┘ (refresh)
//!        idle timeout | send | cancel_all / typing(false)
//! ```
//!
//! Pure state machine: time is passed in, actions are returned.

use std::{collections::HashMap, ops::Sub, time::Duration};

use bluechat_proto::{PeerId, WireEvent};
use tracing::trace;

use crate::action::CoreAction;

/// Per-conversation typing state.
#[derive(Debug, Clone)]
pub struct TypingCoordinator<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    local: PeerId,
    idle_timeout: Duration,
    /// Active conversations and their last keystroke. Absent means idle.
    active: HashMap<PeerId, I>,
}

impl<I> TypingCoordinator<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Coordinator announcing as `local`.
    pub fn new(local: PeerId, idle_timeout: Duration) -> Self {
        Self { local, idle_timeout, active: HashMap::new() }
    }

    fn signal(&self, is_typing: bool) -> CoreAction {
        CoreAction::Publish(WireEvent::Typing { from: self.local, is_typing })
    }

    /// A key was pressed in the conversation with `peer`.
    pub fn on_keystroke(&mut self, peer: PeerId, now: I) -> Vec<CoreAction> {
        match self.active.insert(peer, now) {
            Some(_) => vec![],
            None => {
                trace!(%peer, "typing started");
                vec![self.signal(true)]
            },
        }
    }

    /// Expire conversations quiet for at least the idle timeout.
    pub fn poll(&mut self, now: I) -> Vec<CoreAction> {
        let timeout = self.idle_timeout;
        let before = self.active.len();
        self.active.retain(|_, last| now - *last < timeout);
        let expired = before - self.active.len();

        if expired > 0 {
            trace!(expired, "typing timed out");
        }
        (0..expired).map(|_| self.signal(false)).collect()
    }

    /// A message was sent to `peer`: always announce `typing(false)`.
    pub fn on_send(&mut self, peer: PeerId) -> Vec<CoreAction> {
        self.active.remove(&peer);
        vec![self.signal(false)]
    }

    /// Stop every active conversation, announcing each.
    pub fn cancel_all(&mut self) -> Vec<CoreAction> {
        let stopped = self.active.len();
        self.active.clear();
        (0..stopped).map(|_| self.signal(false)).collect()
    }

    /// Whether the local user is typing to `peer`.
    pub fn is_active(&self, peer: PeerId) -> bool {
        self.active.contains_key(&peer)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    const ME: PeerId = PeerId::from_u128(1);
    const BIA: PeerId = PeerId::from_u128(2);
    const CAU: PeerId = PeerId::from_u128(3);

    fn typing(is_typing: bool) -> CoreAction {
        CoreAction::Publish(WireEvent::Typing { from: ME, is_typing })
    }

    #[test]
    #[allow(clippy::disallowed_methods)]
    fn keystrokes_debounce_into_one_start() {
        let t0 = Instant::now();
        let mut typing_sm = TypingCoordinator::new(ME, Duration::from_secs(2));

        assert_eq!(typing_sm.on_keystroke(BIA, t0), [typing(true)]);
        assert!(typing_sm.on_keystroke(BIA, t0 + Duration::from_millis(500)).is_empty());
        assert!(typing_sm.on_keystroke(BIA, t0 + Duration::from_millis(1500)).is_empty());

        // 2s after the last keystroke, not the first
        assert!(typing_sm.poll(t0 + Duration::from_millis(3000)).is_empty());
        assert_eq!(typing_sm.poll(t0 + Duration::from_millis(3500)), [typing(false)]);
        assert!(!typing_sm.is_active(BIA));
        assert!(typing_sm.poll(t0 + Duration::from_secs(10)).is_empty());
    }

    #[test]
    #[allow(clippy::disallowed_methods)]
    fn send_always_stops() {
        let t0 = Instant::now();
        let mut typing_sm = TypingCoordinator::new(ME, Duration::from_secs(2));

        assert_eq!(typing_sm.on_send(BIA), [typing(false)]);

        typing_sm.on_keystroke(BIA, t0);
        assert_eq!(typing_sm.on_send(BIA), [typing(false)]);
        assert!(typing_sm.poll(t0 + Duration::from_secs(5)).is_empty());
    }

    #[test]
    #[allow(clippy::disallowed_methods)]
    fn cancel_all_stops_every_conversation() {
        let t0 = Instant::now();
        let mut typing_sm = TypingCoordinator::new(ME, Duration::from_secs(2));
        typing_sm.on_keystroke(BIA, t0);
        typing_sm.on_keystroke(CAU, t0);

        assert_eq!(typing_sm.cancel_all(), [typing(false), typing(false)]);
        assert!(typing_sm.cancel_all().is_empty());
        assert!(!typing_sm.is_active(BIA));
    }
}
