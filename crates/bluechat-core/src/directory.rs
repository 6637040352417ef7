//! Peers discovered nearby but not yet chatted with.
//!
//! Entries keep first-seen order. A peer leaves the directory when a session
//! with it is opened, and the whole directory is cleared when the radio goes
//! off.

use bluechat_proto::{Device, PeerId, PeerInfo};
use tracing::{debug, trace};

/// Ordered set of discovered devices keyed by peer id.
///
/// # Invariants
///
/// - No two entries share a peer id.
/// - The local peer never appears.
#[derive(Debug, Clone)]
pub struct PeerDirectory {
    local: PeerId,
    devices: Vec<Device>,
}

impl PeerDirectory {
    /// Empty directory for the given local peer.
    pub fn new(local: PeerId) -> Self {
        Self { local, devices: Vec::new() }
    }

    /// Record a presence announcement. Returns `true` if the peer is new.
    pub fn on_presence(&mut self, peer: PeerInfo) -> bool {
        self.insert(Device::from(peer))
    }

    /// Record a discovered device, with the same dedup rules as presence.
    pub fn insert(&mut self, device: Device) -> bool {
        if device.id == self.local {
            trace!("ignoring own presence");
            return false;
        }
        if self.contains(device.id) {
            return false;
        }

        debug!(peer = %device.id, name = %device.name, "peer discovered");
        self.devices.push(device);
        true
    }

    /// Remove a peer, returning its entry.
    pub fn remove(&mut self, peer: PeerId) -> Option<Device> {
        let index = self.devices.iter().position(|d| d.id == peer)?;
        Some(self.devices.remove(index))
    }

    /// Forget every discovered peer.
    pub fn reset(&mut self) {
        self.devices.clear();
    }

    /// Entry for `peer`, if discovered.
    pub fn get(&self, peer: PeerId) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == peer)
    }

    /// Whether `peer` is listed.
    pub fn contains(&self, peer: PeerId) -> bool {
        self.get(peer).is_some()
    }

    /// Discovered devices in first-seen order.
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Number of listed devices.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether nothing has been discovered.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
