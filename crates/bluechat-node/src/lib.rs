//! BlueChat production node.
//!
//! Production glue around [`bluechat_core`]: the engine's seams are filled
//! with a real network link, durable storage and the system clock, and a
//! line-oriented runtime drives it from a terminal.
//!
//! # Components
//!
//! - [`UdpLink`]: [`Transport`](bluechat_core::Transport) over a UDP
//!   multicast group
//! - [`RedbStorage`]: [`Storage`](bluechat_core::Storage) backed by redb
//! - [`SystemEnv`]: real time and OS entropy
//! - [`Runtime`]: select loop over input lines, inbound events, ticks and
//!   hardware scans
//! - [`Command`]: parsed input line

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod command;
mod config;
mod error;
mod runtime;
mod storage;
mod system_env;
mod udp;

pub use command::{Command, CommandError};
pub use config::{DEFAULT_GROUP, DEFAULT_PORT, DEFAULT_TICK_INTERVAL, NodeConfig};
pub use error::NodeError;
pub use runtime::Runtime;
pub use storage::RedbStorage;
pub use system_env::SystemEnv;
pub use udp::UdpLink;
