//! Client engine for high-rate telemetry write streams.
//!
//! fluxline writes time-ordered telemetry to a remote time-series cluster
//! over one duplex stream per logical writer, and drives remote hardware
//! tasks over the cluster's pub/sub substrate.
//!
//! # Crate Structure
//!
//! - [`telem`] — Nanosecond time primitives and typed series
//! - [`transport`] — Duplex stream transport to the write endpoint
//! - [`frame`] — Columnar frames and the dual-path wire codec
//! - [`writer`] — The write protocol state machine and buffered writer
//! - [`task`] — Command/acknowledgment correlation for hardware tasks

/// Re-export telemetry value types.
pub mod telem {
    pub use fluxline_telem::*;
}

/// Re-export transport types.
pub mod transport {
    pub use fluxline_transport::*;
}

/// Re-export frame and codec types.
pub mod frame {
    pub use fluxline_frame::*;
}

/// Re-export writer types.
pub mod writer {
    pub use fluxline_writer::*;
}

/// Re-export task command types.
pub mod task {
    pub use fluxline_task::*;
}

pub use fluxline_telem::{
    Authority, Channel, ChannelKey, DataType, Rate, Series, TimeRange, TimeSpan, TimeStamp,
};
pub use fluxline_writer::{
    open_writer, with_writer, BufferedWriter, CoercionPolicy, Writer, WriterConfig, WriterMode,
};
