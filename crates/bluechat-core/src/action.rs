//! Side effects requested by the engine.
//!
//! The router and typing coordinator never touch the transport themselves;
//! they return [`CoreAction`]s and the [`crate::ChatService`] executes them.

use bluechat_proto::WireEvent;

/// Actions produced by the engine's state machines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreAction {
    /// Publish this event on the transport.
    Publish(WireEvent),
}
