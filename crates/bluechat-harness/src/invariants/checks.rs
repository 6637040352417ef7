//! Standard invariant checks.

use std::collections::HashSet;

use bluechat_proto::DeliveryStatus;

use super::{Invariant, InvariantResult, SystemSnapshot, Violation};

/// The active conversation must exist.
///
/// If `active` is `Some(peer)`, the node must hold a session with `peer`.
pub struct ActiveSessionExists;

impl Invariant for ActiveSessionExists {
    fn name(&self) -> &'static str {
        "active_session_exists"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for node in &state.nodes {
            if let Some(active) = node.active
                && node.session(active).is_none()
            {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("node {}: active peer {active} has no session", node.id),
                });
            }
        }
        Ok(())
    }
}

/// The conversation in view has nothing unread.
pub struct ActiveSessionRead;

impl Invariant for ActiveSessionRead {
    fn name(&self) -> &'static str {
        "active_session_read"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for node in &state.nodes {
            let Some(session) = node.active.and_then(|peer| node.session(peer)) else {
                continue;
            };
            if session.unread != 0 {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("node {}: active session {} has {} unread", node.id, session.peer, session.unread),
                });
            }
        }
        Ok(())
    }
}

/// At most one session per peer, none with self, no repeated message ids.
pub struct UniqueSessions;

impl Invariant for UniqueSessions {
    fn name(&self) -> &'static str {
        "unique_sessions"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for node in &state.nodes {
            let mut peers = HashSet::new();
            for session in &node.sessions {
                if session.peer == node.id {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!("node {}: session with itself", node.id),
                    });
                }
                if !peers.insert(session.peer) {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!("node {}: two sessions with {}", node.id, session.peer),
                    });
                }

                let mut ids = HashSet::new();
                if let Some((dup, _, _)) = session.messages.iter().find(|(id, _, _)| !ids.insert(*id)) {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!("node {} session {}: message {dup} stored twice", node.id, session.peer),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Discovered peers are unique, never self, and never already in a session.
pub struct DirectoryHygiene;

impl Invariant for DirectoryHygiene {
    fn name(&self) -> &'static str {
        "directory_hygiene"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for node in &state.nodes {
            if !node.radio_on && !node.nearby.is_empty() {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("node {}: radio off but {} peers listed", node.id, node.nearby.len()),
                });
            }

            let mut seen = HashSet::new();
            for peer in &node.nearby {
                let problem = if *peer == node.id {
                    Some("lists itself")
                } else if !seen.insert(*peer) {
                    Some("lists a peer twice")
                } else if node.session(*peer).is_some() {
                    Some("lists a peer it already has a session with")
                } else {
                    None
                };
                if let Some(problem) = problem {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!("node {} {problem}: {peer}", node.id),
                    });
                }
            }
        }
        Ok(())
    }
}

/// A message marked delivered was written by its holder and is stored by
/// the peer that acknowledged it.
pub struct DeliveredMessagesStored;

impl Invariant for DeliveredMessagesStored {
    fn name(&self) -> &'static str {
        "delivered_messages_stored"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for node in &state.nodes {
            for session in &node.sessions {
                for (id, sender, status) in &session.messages {
                    if *status == DeliveryStatus::Sent {
                        continue;
                    }
                    if *sender != node.id {
                        return Err(Violation {
                            invariant: self.name(),
                            message: format!("node {}: inbound message {id} marked {status:?}", node.id),
                        });
                    }
                    let stored = state
                        .node(session.peer)
                        .and_then(|peer| peer.session(node.id))
                        .is_some_and(|s| s.contains(*id));
                    if !stored {
                        return Err(Violation {
                            invariant: self.name(),
                            message: format!("node {}: message {id} delivered but {} lacks it", node.id, session.peer),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}
