//! Observable state extracted from running nodes.

use bluechat_core::{ChatService, Environment, Storage, Transport};
use bluechat_proto::{DeliveryStatus, MessageId, PeerId};

/// State of every node at one point in time.
#[derive(Debug, Clone, Default)]
pub struct SystemSnapshot {
    /// One entry per node.
    pub nodes: Vec<NodeSnapshot>,
}

/// What one node shows.
#[derive(Debug, Clone)]
pub struct NodeSnapshot {
    /// Local peer id.
    pub id: PeerId,
    /// Radio switch.
    pub radio_on: bool,
    /// Conversation in view.
    pub active: Option<PeerId>,
    /// Conversations, newest first.
    pub sessions: Vec<SessionSnapshot>,
    /// Discovered peers, in discovery order.
    pub nearby: Vec<PeerId>,
}

/// One conversation.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    /// Remote peer.
    pub peer: PeerId,
    /// Unread counter.
    pub unread: u32,
    /// `(id, sender, status)` per message, in arrival order.
    pub messages: Vec<(MessageId, PeerId, DeliveryStatus)>,
}

impl SystemSnapshot {
    /// Snapshot with no nodes.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Capture every service.
    pub fn from_nodes<E, S, T>(nodes: &[ChatService<E, S, T>]) -> Self
    where
        E: Environment,
        S: Storage,
        T: Transport,
    {
        Self { nodes: nodes.iter().map(NodeSnapshot::capture).collect() }
    }

    /// Node with the given id.
    pub fn node(&self, id: PeerId) -> Option<&NodeSnapshot> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

impl NodeSnapshot {
    /// Capture one service.
    pub fn capture<E, S, T>(service: &ChatService<E, S, T>) -> Self
    where
        E: Environment,
        S: Storage,
        T: Transport,
    {
        let sessions = service
            .sessions()
            .iter()
            .map(|s| SessionSnapshot {
                peer: s.peer_id,
                unread: s.unread_count,
                messages: s.messages.iter().map(|m| (m.id, m.sender_id, m.status)).collect(),
            })
            .collect();

        Self {
            id: service.identity().id,
            radio_on: service.is_radio_on(),
            active: service.active(),
            sessions,
            nearby: service.nearby().iter().map(|d| d.id).collect(),
        }
    }

    /// Session with `peer`.
    pub fn session(&self, peer: PeerId) -> Option<&SessionSnapshot> {
        self.sessions.iter().find(|s| s.peer == peer)
    }
}

impl SessionSnapshot {
    /// Whether the conversation holds message `id`.
    pub fn contains(&self, id: MessageId) -> bool {
        self.messages.iter().any(|(m, _, _)| *m == id)
    }
}
