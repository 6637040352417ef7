//! Node configuration.

use std::{net::Ipv4Addr, path::PathBuf, time::Duration};

use bluechat_core::CoreConfig;

/// Multicast group shared by all nodes on the segment.
pub const DEFAULT_GROUP: Ipv4Addr = Ipv4Addr::new(239, 255, 60, 61);

/// UDP port of the multicast group.
pub const DEFAULT_PORT: u16 = 47_800;

/// How often the runtime expires typing indicators.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Runtime configuration for a node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Multicast group address
    pub group: Ipv4Addr,
    /// Multicast port
    pub port: u16,
    /// Directory holding the database file
    pub data_dir: PathBuf,
    /// Tick interval for typing timeouts
    pub tick_interval: Duration,
    /// Switch the radio on at startup
    pub radio_on_start: bool,
    /// Engine tunables
    pub core: CoreConfig,
}

impl NodeConfig {
    /// Path of the redb database inside the data directory.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("bluechat.redb")
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            group: DEFAULT_GROUP,
            port: DEFAULT_PORT,
            data_dir: PathBuf::from(".bluechat"),
            tick_interval: DEFAULT_TICK_INTERVAL,
            radio_on_start: true,
            core: CoreConfig::default(),
        }
    }
}
