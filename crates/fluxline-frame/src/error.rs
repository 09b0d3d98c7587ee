/// Errors that can occur while encoding, decoding, or streaming messages.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The wire header contains an invalid magic number.
    #[error("invalid wire magic (expected 0x4658 \"FX\")")]
    InvalidMagic,

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The leading discriminant byte is neither marker value.
    #[error("unknown codec marker byte 0x{0:02X}")]
    UnknownMarker(u8),

    /// The control envelope carries an unsupported version.
    #[error("unsupported envelope version {0}")]
    UnsupportedVersion(u8),

    /// A data-codec payload is structurally invalid.
    #[error("malformed data payload: {0}")]
    Malformed(&'static str),

    /// The control envelope failed to serialize or parse.
    #[error("envelope error: {0}")]
    Envelope(#[from] serde_json::Error),

    /// A telemetry value failed to decode.
    #[error("telemetry error: {0}")]
    Telem(#[from] fluxline_telem::TelemError),

    /// An I/O error occurred while reading or writing messages.
    #[error("message I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream closed before a complete message was received.
    #[error("connection closed (incomplete message)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
