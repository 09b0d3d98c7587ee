use serde::{Deserialize, Serialize};

use crate::error::{Result, TelemError};

/// The sample type of a telemetry series.
///
/// All variants are fixed-density: every sample occupies exactly
/// [`DataType::density`] bytes, little-endian on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Float64,
    Float32,
    Int64,
    Int32,
    Int16,
    Int8,
    Uint64,
    Uint32,
    Uint16,
    Uint8,
    Timestamp,
}

impl DataType {
    /// Bytes per sample.
    pub const fn density(&self) -> usize {
        match self {
            DataType::Float64 | DataType::Int64 | DataType::Uint64 | DataType::Timestamp => 8,
            DataType::Float32 | DataType::Int32 | DataType::Uint32 => 4,
            DataType::Int16 | DataType::Uint16 => 2,
            DataType::Int8 | DataType::Uint8 => 1,
        }
    }

    /// Stable single-byte code used by the data codec.
    pub const fn code(&self) -> u8 {
        match self {
            DataType::Float64 => 1,
            DataType::Float32 => 2,
            DataType::Int64 => 3,
            DataType::Int32 => 4,
            DataType::Int16 => 5,
            DataType::Int8 => 6,
            DataType::Uint64 => 7,
            DataType::Uint32 => 8,
            DataType::Uint16 => 9,
            DataType::Uint8 => 10,
            DataType::Timestamp => 11,
        }
    }

    /// Inverse of [`DataType::code`].
    pub fn from_code(code: u8) -> Result<Self> {
        Ok(match code {
            1 => DataType::Float64,
            2 => DataType::Float32,
            3 => DataType::Int64,
            4 => DataType::Int32,
            5 => DataType::Int16,
            6 => DataType::Int8,
            7 => DataType::Uint64,
            8 => DataType::Uint32,
            9 => DataType::Uint16,
            10 => DataType::Uint8,
            11 => DataType::Timestamp,
            other => return Err(TelemError::UnknownDataType(other)),
        })
    }

    /// Human-readable name.
    pub const fn name(&self) -> &'static str {
        match self {
            DataType::Float64 => "float64",
            DataType::Float32 => "float32",
            DataType::Int64 => "int64",
            DataType::Int32 => "int32",
            DataType::Int16 => "int16",
            DataType::Int8 => "int8",
            DataType::Uint64 => "uint64",
            DataType::Uint32 => "uint32",
            DataType::Uint16 => "uint16",
            DataType::Uint8 => "uint8",
            DataType::Timestamp => "timestamp",
        }
    }

    /// True if every value of `self` is exactly representable as `to`.
    ///
    /// This is the allowlist behind implicit write-path coercion; anything
    /// outside it is a hard validation error.
    pub fn can_cast_to(&self, to: DataType) -> bool {
        use DataType::*;
        if *self == to {
            return true;
        }
        matches!(
            (*self, to),
            (Int8, Int16 | Int32 | Int64 | Float32 | Float64)
                | (Int16, Int32 | Int64 | Float32 | Float64)
                | (Int32, Int64 | Float64)
                | (Uint8, Uint16 | Uint32 | Uint64 | Int16 | Int32 | Int64 | Float32 | Float64)
                | (Uint16, Uint32 | Uint64 | Int32 | Int64 | Float32 | Float64)
                | (Uint32, Uint64 | Int64 | Float64)
                | (Float32, Float64)
                | (Timestamp, Int64)
                | (Int64, Timestamp)
        )
    }

    /// True if the Timestamp/Int64 pairing applies: same 8-byte layout,
    /// coerced without a warning.
    pub fn is_timestamp_int64_pair(&self, other: DataType) -> bool {
        matches!(
            (*self, other),
            (DataType::Timestamp, DataType::Int64) | (DataType::Int64, DataType::Timestamp)
        )
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [DataType; 11] = [
        DataType::Float64,
        DataType::Float32,
        DataType::Int64,
        DataType::Int32,
        DataType::Int16,
        DataType::Int8,
        DataType::Uint64,
        DataType::Uint32,
        DataType::Uint16,
        DataType::Uint8,
        DataType::Timestamp,
    ];

    #[test]
    fn codes_roundtrip() {
        for dt in ALL {
            assert_eq!(DataType::from_code(dt.code()).unwrap(), dt);
        }
    }

    #[test]
    fn unknown_code_rejected() {
        assert!(matches!(
            DataType::from_code(0),
            Err(TelemError::UnknownDataType(0))
        ));
        assert!(matches!(
            DataType::from_code(200),
            Err(TelemError::UnknownDataType(200))
        ));
    }

    #[test]
    fn widening_casts_allowed() {
        assert!(DataType::Int32.can_cast_to(DataType::Int64));
        assert!(DataType::Float32.can_cast_to(DataType::Float64));
        assert!(DataType::Uint16.can_cast_to(DataType::Int64));
        assert!(DataType::Int8.can_cast_to(DataType::Float32));
    }

    #[test]
    fn narrowing_casts_rejected() {
        assert!(!DataType::Int64.can_cast_to(DataType::Int32));
        assert!(!DataType::Float64.can_cast_to(DataType::Float32));
        assert!(!DataType::Int64.can_cast_to(DataType::Float64));
        assert!(!DataType::Uint64.can_cast_to(DataType::Int64));
        assert!(!DataType::Int8.can_cast_to(DataType::Uint16));
    }

    #[test]
    fn timestamp_int64_pair() {
        assert!(DataType::Timestamp.is_timestamp_int64_pair(DataType::Int64));
        assert!(DataType::Int64.is_timestamp_int64_pair(DataType::Timestamp));
        assert!(!DataType::Int64.is_timestamp_int64_pair(DataType::Int64));
        assert!(DataType::Timestamp.can_cast_to(DataType::Int64));
        assert!(DataType::Int64.can_cast_to(DataType::Timestamp));
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&DataType::Float64).unwrap();
        assert_eq!(json, "\"float64\"");
        let back: DataType = serde_json::from_str("\"timestamp\"").unwrap();
        assert_eq!(back, DataType::Timestamp);
    }
}
