//! Columnar telemetry frames and the dual-path wire codec.
//!
//! Every protocol message is one byte-discriminated payload. WRITE commands
//! — the per-tick hot path — travel as raw columnar binary behind a
//! high-performance marker byte; everything else travels as a versioned,
//! self-describing JSON envelope behind a low-performance marker byte.
//! [`MessageReader`] and [`MessageWriter`] frame those payloads onto any
//! `Read`/`Write` stream. No partial reads, no buffer management in user code.

pub mod codec;
pub mod error;
pub mod frame;
pub mod message;
pub mod reader;
pub mod segment;
pub mod writer;

pub use codec::{
    decode_message, encode_message, CodecConfig, CONTROL_MARKER, DATA_MARKER,
    DEFAULT_MAX_PAYLOAD, HEADER_SIZE, MAGIC,
};
pub use error::{FrameError, Result};
pub use frame::Frame;
pub use message::{CommandKind, ControlEnvelope, Message, ENVELOPE_VERSION};
pub use reader::MessageReader;
pub use segment::{split_segment, Segment};
pub use writer::MessageWriter;
