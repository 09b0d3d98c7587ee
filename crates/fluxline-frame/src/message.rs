use fluxline_telem::TimeStamp;
use serde::{Deserialize, Serialize};

use crate::frame::Frame;

/// Current control envelope version.
pub const ENVELOPE_VERSION: u8 = 1;

/// Protocol command tags, shared by requests and responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Open,
    Write,
    Commit,
    SetAuthority,
    /// Client is done sending; the stream's send direction is closing.
    CloseSend,
}

/// The generic, self-describing envelope used for every non-WRITE message.
///
/// Able to represent any command and any payload at the cost of per-message
/// overhead. WRITE commands never travel in an envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlEnvelope {
    pub version: u8,
    pub command: CommandKind,
    /// Command-specific payload (writer config, authority config, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
    /// Server-reported end of the affected range, on responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<TimeStamp>,
    /// Server-reported error, on responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ControlEnvelope {
    /// A request envelope with no payload.
    pub fn request(command: CommandKind) -> Self {
        Self {
            version: ENVELOPE_VERSION,
            command,
            config: None,
            end: None,
            error: None,
        }
    }

    /// A response envelope acknowledging `command`.
    pub fn response(command: CommandKind, end: Option<TimeStamp>) -> Self {
        Self {
            version: ENVELOPE_VERSION,
            command,
            config: None,
            end,
            error: None,
        }
    }

    /// A response envelope carrying a server error.
    pub fn error_response(command: CommandKind, error: impl Into<String>) -> Self {
        Self {
            version: ENVELOPE_VERSION,
            command,
            config: None,
            end: None,
            error: Some(error.into()),
        }
    }

    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = Some(config);
        self
    }
}

/// A protocol message as seen by the wire codec.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Any non-WRITE command or stream-close signal (control path).
    Control(ControlEnvelope),
    /// A WRITE command carrying a frame (data path). Decoded messages on
    /// this path are always reconstructed as a synthetic WRITE with no
    /// further fields.
    Write(Frame),
}

impl Message {
    /// The command tag this message carries.
    pub fn command(&self) -> CommandKind {
        match self {
            Message::Control(envelope) => envelope.command,
            Message::Write(_) => CommandKind::Write,
        }
    }
}
