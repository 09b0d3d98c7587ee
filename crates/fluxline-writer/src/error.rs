use fluxline_telem::ChannelKey;

/// Errors raised by the writer state machine.
///
/// Configuration errors are synchronous and never retried. Protocol errors
/// carry the cluster's message verbatim. Once an error has been recorded in
/// the writer's accumulated slot, every later operation surfaces
/// [`WriterError::Accumulated`] until close.
#[derive(Debug, thiserror::Error)]
pub enum WriterError {
    /// The writer was configured with no channels.
    #[error("writer requires at least one channel")]
    NoChannels,

    /// The authority list is neither a single broadcast value nor one value
    /// per channel.
    #[error("expected 1 or {channels} authorities, got {got}")]
    AuthorityCount { channels: usize, got: usize },

    /// The frame is missing channels the writer owns.
    #[error("frame missing channels {missing:?}")]
    MissingChannels { missing: Vec<ChannelKey> },

    /// The frame carries channels the writer does not own.
    #[error("frame has extra channels {extra:?}")]
    ExtraChannels { extra: Vec<ChannelKey> },

    /// The frame is both missing owned channels and carrying unowned ones.
    #[error("frame missing channels {missing:?} and has extra channels {extra:?}")]
    MissingAndExtraChannels {
        missing: Vec<ChannelKey>,
        extra: Vec<ChannelKey>,
    },

    /// Series in the frame disagree on sample count for a shared index.
    #[error("series aligned to index {index} have mismatched sample counts")]
    MisalignedSeries { index: ChannelKey },

    /// A series datatype cannot be written to its channel.
    #[error("channel {channel} expects {expected}, series is {actual}")]
    TypeMismatch {
        channel: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// A channel referenced by key or name is not owned by this writer.
    #[error("unknown channel {0}")]
    UnknownChannel(String),

    /// An authority batch was empty.
    #[error("authority batch is empty")]
    EmptyAuthoritySet,

    /// The cluster returned an error for a command.
    #[error("cluster error: {0}")]
    Remote(String),

    /// A response arrived without the field the command requires.
    #[error("commit response missing end timestamp")]
    MissingEnd,

    /// The cluster answered with a different command tag than the one
    /// awaited in a strict single-response exchange.
    #[error("unexpected {got:?} response while awaiting {want:?}")]
    UnexpectedResponse {
        want: fluxline_frame::CommandKind,
        got: fluxline_frame::CommandKind,
    },

    /// A blocking operation did not receive its response in time.
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// A previously recorded error, resurfacing.
    #[error("writer failed previously: {0}")]
    Accumulated(String),

    /// The writer is already closed.
    #[error("writer is closed")]
    Closed,

    /// Telemetry-level error (datatype cast, series construction).
    #[error(transparent)]
    Telem(#[from] fluxline_telem::TelemError),

    /// Codec or stream-framing error.
    #[error(transparent)]
    Frame(#[from] fluxline_frame::FrameError),

    /// Transport-level error.
    #[error(transparent)]
    Transport(#[from] fluxline_transport::TransportError),

    /// Config serialization error.
    #[error("config serialization error: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WriterError>;
