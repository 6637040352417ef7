//! The chat engine as one owned object.
//!
//! [`ChatService`] owns a transport link, a storage handle and an
//! environment, plus one of each engine component. Presentation code calls
//! its methods and reads back state; the driver feeds it inbound events from
//! the subscription and periodic ticks.
//!
//! # Lifecycle
//!
//! ```text
//! onboard (once per installation)
//!    │
//! start ── subscribe, load sessions, radio off
//!    │
//!    ├─ set_radio(true) ── announce presence
//!    ├─ pump / next_event + handle_event ── inbound
//!    ├─ send_text / keystroke / tick ── outbound
//!    │
//! shutdown ── stop typing, unsubscribe
//! ```

use bluechat_proto::{Device, Identity, Message, MessageId, PeerId, PeerInfo, Profile, WireEvent};
use tracing::{debug, info, trace, warn};

use crate::{
    action::CoreAction,
    config::CoreConfig,
    directory::PeerDirectory,
    discovery::{ScanError, Scanner},
    env::Environment,
    error::CoreError,
    router::MessageRouter,
    session::{ChatSession, SessionStore},
    storage::Storage,
    transport::{Subscription, Transport},
    typing::TypingCoordinator,
};

/// Radio-level state shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Radio is off.
    Disconnected,
    /// Radio is on, no conversation open.
    Scanning,
    /// Radio is on and a conversation is open.
    Connected,
}

/// One running chat engine.
pub struct ChatService<E: Environment, S: Storage, T: Transport> {
    env: E,
    transport: T,
    identity: Identity,
    store: SessionStore<S>,
    directory: PeerDirectory,
    router: MessageRouter,
    typing: TypingCoordinator<E::Instant>,
    /// `None` after shutdown
    subscription: Option<Subscription>,
    radio_on: bool,
}

impl<E: Environment, S: Storage, T: Transport> ChatService<E, S, T> {
    /// Create and persist the local identity.
    ///
    /// # Errors
    ///
    /// - [`CoreError::AlreadyOnboarded`] if an identity exists
    /// - [`CoreError::Storage`] if loading or storing fails
    pub fn onboard(env: &E, storage: &S, profile: Profile) -> Result<Identity, CoreError> {
        if storage.load_identity()?.is_some() {
            return Err(CoreError::AlreadyOnboarded);
        }

        let identity = Identity::new(env.new_peer_id(), profile);
        storage.store_identity(&identity)?;
        info!(peer = %identity.id, name = %identity.name, "identity created");
        Ok(identity)
    }

    /// Load state and subscribe to the transport. The radio starts off.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotOnboarded`] if no identity was ever created
    /// - [`CoreError::Storage`] on I/O failure (malformed sessions load empty)
    pub fn start(env: E, storage: S, transport: T, config: CoreConfig) -> Result<Self, CoreError> {
        let identity = storage.load_identity()?.ok_or(CoreError::NotOnboarded)?;
        let store = SessionStore::load(storage)?;
        let subscription = transport.subscribe();

        info!(peer = %identity.id, sessions = store.sessions().len(), "chat service started");

        Ok(Self {
            directory: PeerDirectory::new(identity.id),
            router: MessageRouter::new(identity.id, config.placeholder_name),
            typing: TypingCoordinator::new(identity.id, config.typing_idle_timeout),
            env,
            transport,
            identity,
            store,
            subscription: Some(subscription),
            radio_on: false,
        })
    }

    /// Stop typing timers and detach from the transport.
    ///
    /// Idempotent. Afterwards inbound events are no longer received.
    pub fn shutdown(&mut self) {
        let Some(subscription) = self.subscription.take() else {
            return;
        };

        let actions = self.typing.cancel_all();
        self.execute(actions);
        subscription.unsubscribe();
        info!("chat service stopped");
    }

    /// Whether [`shutdown`](Self::shutdown) has not been called.
    pub fn is_running(&self) -> bool {
        self.subscription.is_some()
    }

    /// Local identity.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// All sessions, newest first.
    pub fn sessions(&self) -> &[ChatSession] {
        self.store.sessions()
    }

    /// Session with `peer`.
    pub fn session(&self, peer: PeerId) -> Option<&ChatSession> {
        self.store.session(peer)
    }

    /// Conversation in view.
    pub fn active(&self) -> Option<PeerId> {
        self.store.active()
    }

    /// Discovered peers without a session, in first-seen order.
    pub fn nearby(&self) -> &[Device] {
        self.directory.devices()
    }

    /// Backing storage.
    pub fn storage(&self) -> &S {
        self.store.storage()
    }

    /// Whether the radio is on.
    pub fn is_radio_on(&self) -> bool {
        self.radio_on
    }

    /// Radio-level state derived from the radio switch and the active session.
    pub fn connection_state(&self) -> ConnectionState {
        match (self.radio_on, self.store.active()) {
            (false, _) => ConnectionState::Disconnected,
            (true, None) => ConnectionState::Scanning,
            (true, Some(_)) => ConnectionState::Connected,
        }
    }

    /// Switch the radio.
    ///
    /// Turning it on announces presence. Turning it off announces that typing
    /// stopped, forgets discovered peers and clears typing flags; inbound
    /// events are then ignored until it is switched back on.
    pub fn set_radio(&mut self, on: bool) {
        if on == self.radio_on {
            return;
        }

        if on {
            self.radio_on = true;
            info!("radio on");
            self.announce();
        } else {
            let actions = self.typing.cancel_all();
            self.execute(actions);
            self.radio_on = false;
            self.directory.reset();
            self.store.clear_typing();
            info!("radio off");
        }
    }

    /// Ask nearby peers to notice us by re-announcing presence.
    ///
    /// # Errors
    ///
    /// [`CoreError::RadioOff`] if the radio is off.
    pub fn scan_nearby(&mut self) -> Result<(), CoreError> {
        if !self.radio_on {
            return Err(CoreError::RadioOff);
        }
        self.announce();
        Ok(())
    }

    /// Run a hardware scan and merge the result.
    pub async fn scan_with<Sc: Scanner>(&mut self, scanner: &Sc) -> Result<bool, ScanError> {
        let result = scanner.scan().await;
        self.apply_scan_result(result)
    }

    /// Merge a finished hardware scan into the directory.
    ///
    /// Returns `Ok(true)` if a new peer was listed. Cancellation is silent
    /// and yields `Ok(false)`; other failures are returned for display.
    pub fn apply_scan_result(&mut self, result: Result<Option<Device>, ScanError>) -> Result<bool, ScanError> {
        match result {
            Ok(Some(device)) => {
                if self.store.contains(device.id) {
                    trace!(peer = %device.id, "scanned peer already has a session");
                    return Ok(false);
                }
                Ok(self.directory.insert(device))
            },
            Ok(None) => Ok(false),
            Err(ScanError::Cancelled) => {
                debug!("scan cancelled");
                Ok(false)
            },
            Err(err) => {
                warn!(%err, "scan failed");
                Err(err)
            },
        }
    }

    /// Open the conversation with `peer` and make it active.
    ///
    /// The peer must be either discovered or known from an existing session.
    pub fn connect(&mut self, peer: PeerId) -> Result<(), CoreError> {
        let info = match (self.directory.get(peer), self.store.session(peer)) {
            (_, Some(session)) => PeerInfo { id: peer, name: session.peer_name.clone() },
            (Some(device), None) => PeerInfo { id: peer, name: device.name.clone() },
            (None, None) => return Err(CoreError::UnknownPeer(peer)),
        };
        self.router.open_session(&mut self.store, &mut self.directory, info)
    }

    /// Open (or reopen) a conversation with a peer described by the caller.
    pub fn open_session(&mut self, peer: PeerInfo) -> Result<(), CoreError> {
        self.router.open_session(&mut self.store, &mut self.directory, peer)
    }

    /// Change the conversation in view; `None` returns to the list.
    pub fn set_active(&mut self, peer: Option<PeerId>) -> Result<(), CoreError> {
        Ok(self.store.set_active(peer)?)
    }

    /// Send text to `destination`.
    ///
    /// Always announces that typing stopped after the message.
    ///
    /// # Errors
    ///
    /// - [`CoreError::EmptyMessage`] for blank text
    /// - [`CoreError::RadioOff`] if the radio is off
    /// - [`CoreError::UnknownPeer`] if there is no session with `destination`
    /// - [`CoreError::Storage`] if persisting fails; nothing is published
    pub fn send_text(&mut self, destination: PeerId, text: &str) -> Result<MessageId, CoreError> {
        if text.trim().is_empty() {
            return Err(CoreError::EmptyMessage);
        }
        if !self.radio_on {
            return Err(CoreError::RadioOff);
        }

        let message = Message::new(self.env.new_message_id(), text, self.identity.id, self.env.wall_clock_millis());
        let id = message.id;

        let mut actions = self.router.apply_outbound(&mut self.store, message, destination)?;
        actions.extend(self.typing.on_send(destination));
        self.execute(actions);
        Ok(id)
    }

    /// Send text to the active conversation.
    pub fn send_to_active(&mut self, text: &str) -> Result<MessageId, CoreError> {
        let destination = self.store.active().ok_or(CoreError::NoActiveSession)?;
        self.send_text(destination, text)
    }

    /// The local user pressed a key in the conversation with `peer`.
    pub fn keystroke(&mut self, peer: PeerId) {
        if !self.radio_on {
            return;
        }
        let actions = self.typing.on_keystroke(peer, self.env.now());
        self.execute(actions);
    }

    /// Expire idle typing indicators. Call periodically.
    pub fn tick(&mut self) {
        let actions = self.typing.poll(self.env.now());
        self.execute(actions);
    }

    /// Apply one inbound event against current state.
    ///
    /// Ignored while the radio is off or after shutdown.
    ///
    /// # Errors
    ///
    /// Storage failure while persisting; state is unchanged and nothing is
    /// published.
    pub fn handle_event(&mut self, event: WireEvent) -> Result<(), CoreError> {
        if !self.radio_on || !self.is_running() {
            trace!(kind = event.kind(), "radio off, ignoring event");
            return Ok(());
        }

        let actions = self.router.handle(&mut self.store, &mut self.directory, event)?;
        self.execute(actions);
        Ok(())
    }

    /// Drain every queued inbound event. Returns how many were taken.
    ///
    /// Failures are logged per event and do not stop the drain.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.subscription.as_mut().and_then(Subscription::try_recv) {
            handled += 1;
            if let Err(err) = self.handle_event(event) {
                warn!(%err, "failed to apply inbound event");
            }
        }
        handled
    }

    /// Wait for the next inbound event. `None` once detached or the
    /// transport has closed.
    pub async fn next_event(&mut self) -> Option<WireEvent> {
        match self.subscription.as_mut() {
            Some(subscription) => subscription.recv().await,
            None => None,
        }
    }

    fn announce(&self) {
        debug!("announcing presence");
        self.transport.publish(&WireEvent::Presence { peer: self.identity.peer_info() });
    }

    fn execute(&self, actions: Vec<CoreAction>) {
        if !self.radio_on {
            trace!(dropped = actions.len(), "radio off, not publishing");
            return;
        }
        for action in actions {
            match action {
                CoreAction::Publish(event) => self.transport.publish(&event),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicU64, Ordering},
        time::{Duration, Instant},
    };

    use bluechat_proto::DeliveryStatus;

    use super::*;
    use crate::{
        storage::MemoryStorage,
        transport::{LocalBus, LocalLink},
    };

    static NEXT_ID: AtomicU64 = AtomicU64::new(1);

    /// Real monotonic clock, process-wide counter for ids.
    #[derive(Clone, Default)]
    struct TestEnv;

    impl Environment for TestEnv {
        type Instant = Instant;

        #[allow(clippy::disallowed_methods)]
        fn now(&self) -> Instant {
            Instant::now()
        }

        async fn sleep(&self, duration: Duration) {
            tokio::time::sleep(duration).await;
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            let n = NEXT_ID.fetch_add(1, Ordering::Relaxed);
            let bytes = n.to_be_bytes();
            for (i, b) in buffer.iter_mut().enumerate() {
                *b = bytes[i % bytes.len()];
            }
        }

        fn wall_clock_millis(&self) -> u64 {
            1_700_000_000_000
        }
    }

    type Service = ChatService<TestEnv, MemoryStorage, LocalLink>;

    fn service(bus: &LocalBus, name: &str) -> Service {
        let env = TestEnv;
        let storage = MemoryStorage::new();
        let profile = Profile::new(name, "11", "98765432").unwrap();
        Service::onboard(&env, &storage, profile).unwrap();
        Service::start(env, storage, bus.link(), CoreConfig::default()).unwrap()
    }

    #[test]
    fn start_requires_onboarding() {
        let result = Service::start(
            TestEnv,
            MemoryStorage::new(),
            LocalBus::new().link(),
            CoreConfig::default(),
        );
        assert!(matches!(result, Err(CoreError::NotOnboarded)));
    }

    #[test]
    fn onboarding_happens_once() {
        let env = TestEnv;
        let storage = MemoryStorage::new();
        let profile = Profile::new("Ana", "11", "98765432").unwrap();
        Service::onboard(&env, &storage, profile.clone()).unwrap();
        assert_eq!(Service::onboard(&env, &storage, profile), Err(CoreError::AlreadyOnboarded));
    }

    #[test]
    fn radio_controls_connection_state() {
        let bus = LocalBus::new();
        let mut ana = service(&bus, "Ana");
        assert_eq!(ana.connection_state(), ConnectionState::Disconnected);

        ana.set_radio(true);
        assert_eq!(ana.connection_state(), ConnectionState::Scanning);

        ana.set_radio(false);
        assert_eq!(ana.connection_state(), ConnectionState::Disconnected);
    }

    #[test]
    fn presence_reaches_radio_on_peers_only() {
        let bus = LocalBus::new();
        let mut ana = service(&bus, "Ana");
        let mut bia = service(&bus, "Bia");

        ana.set_radio(true);
        bia.pump();
        bia.set_radio(true);
        ana.pump();

        // Ana was listening when Bia announced; Bia was still off when Ana did.
        assert_eq!(ana.nearby().len(), 1);
        assert!(bia.nearby().is_empty());

        ana.scan_nearby().unwrap();
        bia.pump();
        assert_eq!(bia.nearby()[0].name, "Ana");
    }

    #[test]
    fn send_requires_text_radio_and_session() {
        let bus = LocalBus::new();
        let mut ana = service(&bus, "Ana");
        let stranger = PeerId::from_u128(99);

        assert_eq!(ana.send_text(stranger, "   "), Err(CoreError::EmptyMessage));
        assert_eq!(ana.send_text(stranger, "oi"), Err(CoreError::RadioOff));
        ana.set_radio(true);
        assert_eq!(ana.send_text(stranger, "oi"), Err(CoreError::UnknownPeer(stranger)));
        assert_eq!(ana.send_to_active("oi"), Err(CoreError::NoActiveSession));
    }

    #[test]
    fn message_roundtrip_marks_delivered() {
        let bus = LocalBus::new();
        let mut ana = service(&bus, "Ana");
        let mut bia = service(&bus, "Bia");
        ana.set_radio(true);
        bia.set_radio(true);
        ana.pump();

        let bia_id = bia.identity().id;
        ana.connect(bia_id).unwrap();
        assert_eq!(ana.connection_state(), ConnectionState::Connected);

        let id = ana.send_to_active("oi, Bia").unwrap();
        bia.pump();
        ana.pump();

        let received = bia.session(ana.identity().id).unwrap();
        assert_eq!(received.peer_name, "Ana");
        assert_eq!(received.unread_count, 1);

        let sent = ana.session(bia_id).unwrap().message(id).unwrap();
        assert_eq!(sent.status, DeliveryStatus::Delivered);
    }

    #[test]
    fn radio_off_ignores_inbound_and_forgets_peers() {
        let bus = LocalBus::new();
        let mut ana = service(&bus, "Ana");
        let mut bia = service(&bus, "Bia");
        ana.set_radio(true);
        bia.set_radio(true);
        ana.pump();
        assert_eq!(ana.nearby().len(), 1);

        ana.set_radio(false);
        assert!(ana.nearby().is_empty());

        bia.scan_nearby().unwrap();
        assert_eq!(ana.pump(), 1);
        assert!(ana.nearby().is_empty());
    }

    #[test]
    fn connect_unknown_peer_fails() {
        let bus = LocalBus::new();
        let mut ana = service(&bus, "Ana");
        let peer = PeerId::from_u128(42);
        assert_eq!(ana.connect(peer), Err(CoreError::UnknownPeer(peer)));
    }

    #[test]
    fn scan_results_merge_and_classify() {
        let bus = LocalBus::new();
        let mut ana = service(&bus, "Ana");
        let device = Device { id: PeerId::from_u128(77), name: "Fone".into(), signal_strength: Some(-50) };

        assert_eq!(ana.apply_scan_result(Ok(Some(device.clone()))), Ok(true));
        assert_eq!(ana.apply_scan_result(Ok(Some(device))), Ok(false));
        assert_eq!(ana.apply_scan_result(Err(ScanError::Cancelled)), Ok(false));
        assert_eq!(ana.apply_scan_result(Err(ScanError::AdapterUnavailable)), Err(ScanError::AdapterUnavailable));
        assert_eq!(ana.nearby().len(), 1);
    }

    #[test]
    fn shutdown_detaches() {
        let bus = LocalBus::new();
        let mut ana = service(&bus, "Ana");
        assert_eq!(bus.subscriber_count(), 1);

        ana.shutdown();
        ana.shutdown();
        assert!(!ana.is_running());
        assert_eq!(bus.subscriber_count(), 0);
    }
}
