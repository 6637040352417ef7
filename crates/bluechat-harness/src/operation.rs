//! Operations for model-based testing.
//!
//! Operations represent everything a user or the medium can do to a
//! [`crate::SimCluster`]. They are generated by `arbitrary` and applied in
//! order; invariants are checked after each one.

use arbitrary::Arbitrary;
use bluechat_core::CoreError;

/// Node index, taken modulo the cluster size when applied.
pub type NodeIndex = u8;

/// Result of applying an operation. Rejections are expected outcomes.
pub type OperationResult = Result<(), CoreError>;

/// Message text drawn from a small alphabet so duplicates happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub struct SmallText(pub u8);

impl SmallText {
    /// Rendered text. Index 0 renders blank to exercise rejection.
    pub fn render(self) -> String {
        match self.0 % 8 {
            0 => "   ".to_owned(),
            n => format!("msg-{n}"),
        }
    }
}

/// Operations that can be applied to a cluster.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// Switch a node's radio.
    Radio {
        /// Node switching.
        node: NodeIndex,
        /// New state.
        on: bool,
    },

    /// Node re-announces its presence.
    Scan {
        /// Node scanning.
        node: NodeIndex,
    },

    /// Node opens a conversation with a peer.
    Connect {
        /// Node connecting.
        node: NodeIndex,
        /// Peer to connect to.
        peer: NodeIndex,
    },

    /// Node returns to the conversation list.
    Back {
        /// Node leaving.
        node: NodeIndex,
    },

    /// Node sends a message to a peer.
    Send {
        /// Sender.
        node: NodeIndex,
        /// Addressee.
        peer: NodeIndex,
        /// Payload.
        text: SmallText,
    },

    /// Node types in a conversation.
    Keystroke {
        /// Node typing.
        node: NodeIndex,
        /// Peer being typed to.
        peer: NodeIndex,
    },

    /// Deliver every queued event until the cluster is quiet.
    Deliver,

    /// Advance the virtual clock and tick every node.
    Advance {
        /// Milliseconds to advance.
        millis: u16,
    },

    /// Make a node's storage fail every write, or heal it.
    StorageFaults {
        /// Affected node.
        node: NodeIndex,
        /// Fail writes when `true`.
        failing: bool,
    },
}
