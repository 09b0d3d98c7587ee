//! Write protocol state machine for telemetry clusters.
//!
//! A [`Writer`] owns one duplex stream to the cluster's write endpoint and
//! walks the protocol: open → write → commit → set-authority → close. Errors
//! encountered mid-stream accumulate and resurface on every subsequent
//! operation until the writer is closed. [`BufferedWriter`] batches many
//! small row writes into fewer wire frames.

pub mod buffered;
pub mod config;
pub mod error;
pub mod writer;

pub use buffered::{BufferedWriter, Row, Sample};
pub use config::{
    AuthoritySpec, ChannelParam, CoercionPolicy, Subject, WriterConfig, WriterMode,
    ALWAYS_INDEX_PERSIST, DEFAULT_RESPONSE_TIMEOUT,
};
pub use error::{Result, WriterError};
pub use writer::{open_writer, with_writer, Writer};
