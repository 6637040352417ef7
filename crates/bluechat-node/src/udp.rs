//! UDP multicast link.
//!
//! Every node joins the same multicast group and port. A published event is
//! one datagram to the group; every member (including the sender, through
//! multicast loopback) receives it. Each link draws a random nonce at bind
//! time and stamps it into the datagram header so its own loopback copies
//! can be discarded.
//!
//! Delivery is whatever UDP gives: at most once, unordered across senders,
//! silently lost under congestion. Outbound sends never wait: a full socket
//! buffer drops the event.

use std::{
    io,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use bluechat_core::{Subscription, Transport};
use bluechat_proto::{Datagram, MAX_DATAGRAM_SIZE, ProtocolError, WireEvent};
use tokio::{net::UdpSocket, sync::mpsc, task::JoinHandle};
use tracing::{debug, trace, warn};

/// First pause after a failed receive.
const RECV_BACKOFF_MIN: Duration = Duration::from_millis(50);

/// Longest pause between failed receives.
const RECV_BACKOFF_MAX: Duration = Duration::from_secs(5);

type Subscribers = Arc<Mutex<Vec<mpsc::UnboundedSender<WireEvent>>>>;

/// [`Transport`] over a UDP multicast group.
///
/// Clones share one socket and one receive task. The task stops when the
/// last clone is dropped.
#[derive(Clone)]
pub struct UdpLink {
    inner: Arc<LinkInner>,
}

struct LinkInner {
    socket: Arc<UdpSocket>,
    group: SocketAddr,
    nonce: u64,
    subscribers: Subscribers,
    recv_task: JoinHandle<()>,
}

impl Drop for LinkInner {
    fn drop(&mut self) {
        self.recv_task.abort();
    }
}

impl UdpLink {
    /// Join `group:port` and start receiving.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Socket creation, bind or group membership failed.
    pub fn bind(group: Ipv4Addr, port: u16, nonce: u64) -> io::Result<Self> {
        let socket = Arc::new(make_multicast_socket(group, port)?);
        let subscribers: Subscribers = Arc::default();

        let recv_task = tokio::spawn(recv_loop(Arc::clone(&socket), nonce, Arc::clone(&subscribers)));
        debug!(%group, port, nonce, "multicast link bound");

        Ok(Self {
            inner: Arc::new(LinkInner {
                socket,
                group: SocketAddr::V4(SocketAddrV4::new(group, port)),
                nonce,
                subscribers,
                recv_task,
            }),
        })
    }

    /// Nonce stamped into this link's datagrams.
    pub fn nonce(&self) -> u64 {
        self.inner.nonce
    }

    /// Local socket address.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.socket.local_addr()
    }
}

impl Transport for UdpLink {
    fn publish(&self, event: &WireEvent) {
        let datagram = Datagram { link_nonce: self.inner.nonce, event: event.clone() };
        let bytes = match datagram.encode() {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(%err, kind = event.kind(), "cannot encode event");
                return;
            },
        };

        match self.inner.socket.try_send_to(&bytes, self.inner.group) {
            Ok(_) => trace!(kind = event.kind(), len = bytes.len(), "datagram sent"),
            Err(err) => warn!(%err, kind = event.kind(), "dropping outbound event"),
        }
    }

    fn subscribe(&self) -> Subscription {
        let (tx, subscription) = Subscription::channel();
        lock(&self.inner.subscribers).push(tx);
        subscription
    }
}

fn lock(subscribers: &Subscribers) -> MutexGuard<'_, Vec<mpsc::UnboundedSender<WireEvent>>> {
    subscribers.lock().unwrap_or_else(PoisonError::into_inner)
}

fn make_multicast_socket(group: Ipv4Addr, port: u16) -> io::Result<UdpSocket> {
    let std_sock = std::net::UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port))?;
    std_sock.join_multicast_v4(&group, &Ipv4Addr::UNSPECIFIED)?;
    std_sock.set_multicast_ttl_v4(1)?;
    std_sock.set_multicast_loop_v4(true)?;
    std_sock.set_nonblocking(true)?;
    UdpSocket::from_std(std_sock)
}

/// What a received datagram turned out to be.
#[derive(Debug, PartialEq, Eq)]
enum Inbound {
    Event(WireEvent),
    Own,
    Malformed(ProtocolError),
}

fn classify(own_nonce: u64, bytes: &[u8]) -> Inbound {
    match Datagram::decode(bytes) {
        Ok(datagram) if datagram.link_nonce == own_nonce => Inbound::Own,
        Ok(datagram) => Inbound::Event(datagram.event),
        Err(err) => Inbound::Malformed(err),
    }
}

async fn recv_loop(socket: Arc<UdpSocket>, nonce: u64, subscribers: Subscribers) {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    let mut backoff = Duration::ZERO;

    loop {
        let (len, from) = match socket.recv_from(&mut buf).await {
            Ok(received) => {
                backoff = Duration::ZERO;
                received
            },
            Err(err) => {
                backoff = next_backoff(backoff);
                warn!(%err, ?backoff, "multicast receive failed");
                tokio::time::sleep(backoff).await;
                continue;
            },
        };

        match classify(nonce, &buf[..len]) {
            Inbound::Event(event) => {
                let mut subscribers = lock(&subscribers);
                subscribers.retain(|tx| tx.send(event.clone()).is_ok());
                trace!(%from, kind = event.kind(), "datagram received");
            },
            Inbound::Own => {},
            Inbound::Malformed(err) => debug!(%from, %err, "dropping malformed datagram"),
        }
    }
}

/// Pause before the next receive after another consecutive failure.
fn next_backoff(current: Duration) -> Duration {
    (current * 2).clamp(RECV_BACKOFF_MIN, RECV_BACKOFF_MAX)
}

#[cfg(test)]
mod tests {
    use bluechat_proto::{HEADER_SIZE, PeerId};

    use super::*;

    fn encoded(nonce: u64) -> Vec<u8> {
        let event = WireEvent::Typing { from: PeerId::from_u128(1), is_typing: true };
        Datagram { link_nonce: nonce, event }.encode().unwrap()
    }

    #[test]
    fn own_datagrams_are_filtered() {
        assert_eq!(classify(7, &encoded(7)), Inbound::Own);
    }

    #[test]
    fn foreign_datagrams_are_delivered() {
        assert!(matches!(classify(7, &encoded(8)), Inbound::Event(WireEvent::Typing { .. })));
    }

    #[test]
    fn garbage_is_malformed() {
        assert_eq!(
            classify(7, b"hi"),
            Inbound::Malformed(ProtocolError::TooShort { len: 2, min: HEADER_SIZE })
        );
    }

    #[test]
    fn receive_failures_back_off_up_to_a_cap() {
        let mut backoff = Duration::ZERO;
        let mut pauses = Vec::new();
        for _ in 0..10 {
            backoff = next_backoff(backoff);
            pauses.push(backoff);
        }

        assert_eq!(pauses[0], RECV_BACKOFF_MIN);
        assert_eq!(pauses[1], RECV_BACKOFF_MIN * 2);
        assert!(pauses.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(pauses[9], RECV_BACKOFF_MAX);
    }
}
