//! Simulated cluster of peers on one in-process bus.
//!
//! Every node gets its own [`ChaoticStorage`] (healthy until told otherwise)
//! and its own [`LossyLink`] (lossless until told otherwise). All nodes share
//! one [`SimEnv`], so the virtual clock is global and runs are reproducible
//! from the seed.

use std::time::Duration;

use bluechat_core::{
    ChaoticStorage, ChatService, CoreConfig, CoreError, LocalBus, LocalLink, MemoryStorage,
};
use bluechat_proto::{PeerId, Profile};
use tracing::{debug, warn};

use crate::{
    SimEnv,
    invariants::SystemSnapshot,
    operation::{NodeIndex, Operation, OperationResult},
    sim_transport::LossyLink,
};

/// One simulated peer.
pub type SimNode = ChatService<SimEnv, ChaoticStorage<MemoryStorage>, LossyLink<LocalLink>>;

const NAMES: [&str; 8] = ["Ana", "Bia", "Caio", "Duda", "Enzo", "Flor", "Gabi", "Hugo"];

/// Upper bound on pump rounds before delivery is considered stuck.
const MAX_DELIVERY_ROUNDS: usize = 64;

/// Deterministic cluster of [`SimNode`]s.
pub struct SimCluster {
    env: SimEnv,
    nodes: Vec<SimNode>,
    links: Vec<LossyLink<LocalLink>>,
}

impl SimCluster {
    /// Onboard and start `size` nodes with default tunables. Radios start off.
    pub fn new(seed: u64, size: usize) -> Result<Self, CoreError> {
        Self::with_config(seed, size, &CoreConfig::default())
    }

    /// Onboard and start `size` nodes. Radios start off.
    pub fn with_config(seed: u64, size: usize, config: &CoreConfig) -> Result<Self, CoreError> {
        let env = SimEnv::with_seed(seed);
        let bus = LocalBus::new();
        let mut nodes = Vec::with_capacity(size);
        let mut links = Vec::with_capacity(size);

        for i in 0..size {
            let node_seed = seed.wrapping_add(i as u64);
            let storage = ChaoticStorage::with_seed(MemoryStorage::new(), 0.0, node_seed);
            let profile = Profile::new(NAMES[i % NAMES.len()], "11", &format!("9{i:08}"))?;
            let identity = SimNode::onboard(&env, &storage, profile)?;
            debug!(node = i, peer = %identity.id, "node onboarded");

            let link = LossyLink::new(bus.link(), 0.0, node_seed);
            links.push(link.clone());
            nodes.push(SimNode::start(env.clone(), storage, link, config.clone())?);
        }

        Ok(Self { env, nodes, links })
    }

    /// Shared environment.
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True for an empty cluster.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes.
    pub fn nodes(&self) -> &[SimNode] {
        &self.nodes
    }

    /// Node `i`.
    pub fn node(&self, i: usize) -> &SimNode {
        &self.nodes[i]
    }

    /// Node `i`, mutably.
    pub fn node_mut(&mut self, i: usize) -> &mut SimNode {
        &mut self.nodes[i]
    }

    /// Peer id of node `i`.
    pub fn id(&self, i: usize) -> PeerId {
        self.nodes[i].identity().id
    }

    /// Fault-injection handle for node `i`'s outbound link.
    pub fn link(&self, i: usize) -> &LossyLink<LocalLink> {
        &self.links[i]
    }

    /// Switch every radio on and let the announcements land.
    pub fn power_on_all(&mut self) {
        for node in &mut self.nodes {
            node.set_radio(true);
        }
        self.deliver_all();
    }

    /// Pump every node until a full round moves nothing. Returns events taken.
    pub fn deliver_all(&mut self) -> usize {
        let mut total = 0;
        for _ in 0..MAX_DELIVERY_ROUNDS {
            let round: usize = self.nodes.iter_mut().map(SimNode::pump).sum();
            if round == 0 {
                return total;
            }
            total += round;
        }
        warn!(total, "delivery did not settle");
        total
    }

    /// Advance the virtual clock and tick every node.
    pub fn advance(&mut self, duration: Duration) {
        self.env.advance(duration);
        for node in &mut self.nodes {
            node.tick();
        }
    }

    /// Apply one operation. Rejections come back as errors; nothing panics.
    pub fn apply(&mut self, operation: &Operation) -> OperationResult {
        if self.nodes.is_empty() {
            return Ok(());
        }

        match *operation {
            Operation::Radio { node, on } => {
                let i = self.index(node);
                self.nodes[i].set_radio(on);
                Ok(())
            },
            Operation::Scan { node } => {
                let i = self.index(node);
                self.nodes[i].scan_nearby()
            },
            Operation::Connect { node, peer } => {
                let (i, peer) = (self.index(node), self.id(self.index(peer)));
                self.nodes[i].connect(peer)
            },
            Operation::Back { node } => {
                let i = self.index(node);
                self.nodes[i].set_active(None)
            },
            Operation::Send { node, peer, text } => {
                let (i, peer) = (self.index(node), self.id(self.index(peer)));
                self.nodes[i].send_text(peer, &text.render()).map(|_| ())
            },
            Operation::Keystroke { node, peer } => {
                let (i, peer) = (self.index(node), self.id(self.index(peer)));
                self.nodes[i].keystroke(peer);
                Ok(())
            },
            Operation::Deliver => {
                self.deliver_all();
                Ok(())
            },
            Operation::Advance { millis } => {
                self.advance(Duration::from_millis(u64::from(millis)));
                Ok(())
            },
            Operation::StorageFaults { node, failing } => {
                let i = self.index(node);
                self.nodes[i].storage().set_failure_rate(if failing { 1.0 } else { 0.0 });
                Ok(())
            },
        }
    }

    /// Observable state of every node.
    pub fn snapshot(&self) -> SystemSnapshot {
        SystemSnapshot::from_nodes(&self.nodes)
    }

    fn index(&self, node: NodeIndex) -> usize {
        usize::from(node) % self.nodes.len()
    }
}
