//! Nanosecond time primitives and typed telemetry series.
//!
//! This is the lowest layer of fluxline. Everything else depends on these
//! value types for ordering, rate conversion, and columnar sample storage.

pub mod channel;
pub mod datatype;
pub mod error;
pub mod series;
pub mod time;

pub use channel::{Authority, Channel, ChannelKey};
pub use datatype::DataType;
pub use error::{Result, TelemError};
pub use series::Series;
pub use time::{Rate, TimeRange, TimeSpan, TimeStamp};
