//! Deterministic simulation harness for BlueChat.
//!
//! Simulated implementations of the engine seams ([`SimEnv`], [`LossyLink`],
//! [`ScriptedScanner`]) and a [`SimCluster`] that runs several peers on one
//! in-process bus with a shared virtual clock. Every run is reproducible from
//! its seed.
//!
//! # Model-Based Testing
//!
//! [`Operation`] enumerates what a user or the network can do to a cluster.
//! Sequences are generated with `arbitrary` (from proptest bytes or a fuzzer
//! corpus) and applied with [`SimCluster::apply`].
//!
//! # Invariant Testing
//!
//! The `invariants` module checks properties over a [`SystemSnapshot`] of
//! the whole cluster. Use [`InvariantRegistry::standard()`] after every
//! operation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cluster;
pub mod invariants;
pub mod operation;
pub mod sim_env;
pub mod sim_scanner;
pub mod sim_transport;

pub use cluster::{SimCluster, SimNode};
pub use invariants::{
    ActiveSessionExists, ActiveSessionRead, DeliveredMessagesStored, DirectoryHygiene, Invariant,
    InvariantRegistry, InvariantResult, NodeSnapshot, SessionSnapshot, SystemSnapshot,
    UniqueSessions, Violation,
};
pub use operation::{NodeIndex, Operation, OperationResult, SmallText};
pub use sim_env::{SimEnv, SimInstant};
pub use sim_scanner::ScriptedScanner;
pub use sim_transport::LossyLink;
