//! Input line parsing.
//!
//! Lines starting with `/` are commands; anything else is message text for
//! the active conversation.

use bluechat_proto::{PeerId, ProtocolError};
use thiserror::Error;

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/radio on|off`
    Radio(bool),
    /// `/scan`: re-announce presence and run a hardware scan
    Scan,
    /// `/peers`: list discovered peers
    Peers,
    /// `/connect <n>`: open a chat with the n-th discovered peer (1-based)
    Connect(usize),
    /// `/open <peer-id>`: open a chat by peer id
    Open(PeerId),
    /// `/sessions`: list conversations
    Sessions,
    /// `/back`: leave the active conversation
    Back,
    /// `/type`: signal a keystroke in the active conversation
    Type,
    /// `/whoami`: show the local identity
    WhoAmI,
    /// `/help`
    Help,
    /// `/quit`
    Quit,
    /// Plain text to send
    Say(String),
}

/// Rejected input line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Command name not recognised.
    #[error("unknown command: /{0} (try /help)")]
    Unknown(String),

    /// Argument missing or malformed.
    #[error("usage: {0}")]
    Usage(&'static str),

    /// Peer id argument is not a valid id.
    #[error("invalid peer id: {0}")]
    InvalidPeer(#[from] ProtocolError),
}

/// Help text listing every command.
pub const HELP: &str = "\
/radio on|off     switch the radio
/scan             announce presence and scan for devices
/peers            list discovered peers
/connect <n>      chat with the n-th discovered peer
/open <peer-id>   chat with a known peer
/sessions         list conversations
/back             leave the current conversation
/type             signal typing in the current conversation
/whoami           show your identity
/quit             exit
<text>            send to the current conversation";

impl Command {
    /// Parse one input line. `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Some(Self::Say(line.to_string())));
        };

        let mut words = rest.split_whitespace();
        let name = words.next().unwrap_or_default();
        let arg = words.next();

        let command = match (name, arg) {
            ("radio", Some("on")) => Self::Radio(true),
            ("radio", Some("off")) => Self::Radio(false),
            ("radio", _) => return Err(CommandError::Usage("/radio on|off")),
            ("scan", _) => Self::Scan,
            ("peers", _) => Self::Peers,
            ("connect", Some(n)) => match n.parse::<usize>() {
                Ok(n) if n > 0 => Self::Connect(n),
                _ => return Err(CommandError::Usage("/connect <n>, n from /peers")),
            },
            ("connect", None) => return Err(CommandError::Usage("/connect <n>, n from /peers")),
            ("open", Some(id)) => Self::Open(id.parse()?),
            ("open", None) => return Err(CommandError::Usage("/open <peer-id>")),
            ("sessions", _) => Self::Sessions,
            ("back", _) => Self::Back,
            ("type", _) => Self::Type,
            ("whoami", _) => Self::WhoAmI,
            ("help", _) => Self::Help,
            ("quit" | "exit", _) => Self::Quit,
            (other, _) => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }
}
