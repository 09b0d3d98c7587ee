/// Errors that can occur when constructing or converting telemetry values.
#[derive(Debug, thiserror::Error)]
pub enum TelemError {
    /// Raw series bytes are not a whole number of samples.
    #[error("series data not aligned ({len} bytes, {density}-byte {name} samples)")]
    UnalignedData {
        len: usize,
        density: usize,
        name: &'static str,
    },

    /// The requested datatype conversion would lose information.
    #[error("cannot safely cast {from} to {to}")]
    InvalidCast { from: &'static str, to: &'static str },

    /// An unrecognized datatype code was read off the wire.
    #[error("unknown datatype code {0}")]
    UnknownDataType(u8),
}

pub type Result<T> = std::result::Result<T, TelemError>;
