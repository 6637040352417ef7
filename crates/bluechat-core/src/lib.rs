//! BlueChat peer-session engine.
//!
//! Everything between the wire and the screen: who is nearby, which
//! conversations exist, how inbound events are reconciled into them, and
//! what must be published in response. No sockets, no files, no clocks:
//! those arrive through the [`Transport`], [`Storage`] and [`Environment`]
//! seams so the same code runs in production and in deterministic simulation.
//!
//! # Components
//!
//! - [`PeerDirectory`]: peers discovered but not yet chatted with
//! - [`SessionStore`]: conversations, mirrored in memory and persisted whole
//! - [`MessageRouter`]: applies [`WireEvent`]s, emits [`CoreAction`]s
//! - [`TypingCoordinator`]: debounces local keystrokes into typing signals
//! - [`DeliveryTracker`]: advances message status on receipts
//! - [`ChatService`]: owns one of each and drives them from a subscription
//!
//! [`WireEvent`]: bluechat_proto::WireEvent

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod action;
pub mod config;
pub mod delivery;
pub mod directory;
pub mod discovery;
pub mod env;
pub mod error;
pub mod router;
pub mod service;
pub mod session;
pub mod storage;
pub mod transport;
pub mod typing;

pub use action::CoreAction;
pub use config::CoreConfig;
pub use delivery::{DeliveryTracker, ReceiptOutcome};
pub use directory::PeerDirectory;
pub use discovery::{ScanError, Scanner, UnsupportedScanner};
pub use env::Environment;
pub use error::CoreError;
pub use router::MessageRouter;
pub use service::{ChatService, ConnectionState};
pub use session::{ChatSession, SessionStore};
pub use storage::{ChaoticStorage, MemoryStorage, Storage, StorageError};
pub use transport::{LocalBus, LocalLink, Subscription, Transport};
pub use typing::TypingCoordinator;
