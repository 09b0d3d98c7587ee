use crate::datatype::DataType;
use crate::error::{Result, TelemError};
use crate::time::TimeStamp;

/// A columnar run of samples of a single [`DataType`].
///
/// Samples are stored contiguously, little-endian. The buffer is owned and
/// may be rewritten in place by datatype coercion on the write path.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    data_type: DataType,
    data: Vec<u8>,
}

impl Series {
    /// Construct from raw little-endian sample bytes.
    pub fn new(data_type: DataType, data: Vec<u8>) -> Result<Self> {
        if data.len() % data_type.density() != 0 {
            return Err(TelemError::UnalignedData {
                len: data.len(),
                density: data_type.density(),
                name: data_type.name(),
            });
        }
        Ok(Self { data_type, data })
    }

    /// An empty series of the given type.
    pub fn empty(data_type: DataType) -> Self {
        Self {
            data_type,
            data: Vec::new(),
        }
    }

    pub fn from_f64s(samples: &[f64]) -> Self {
        Self::from_fixed(DataType::Float64, samples, |v| v.to_le_bytes())
    }

    pub fn from_f32s(samples: &[f32]) -> Self {
        Self::from_fixed(DataType::Float32, samples, |v| v.to_le_bytes())
    }

    pub fn from_i64s(samples: &[i64]) -> Self {
        Self::from_fixed(DataType::Int64, samples, |v| v.to_le_bytes())
    }

    pub fn from_i32s(samples: &[i32]) -> Self {
        Self::from_fixed(DataType::Int32, samples, |v| v.to_le_bytes())
    }

    pub fn from_u8s(samples: &[u8]) -> Self {
        Self {
            data_type: DataType::Uint8,
            data: samples.to_vec(),
        }
    }

    pub fn from_timestamps(samples: &[TimeStamp]) -> Self {
        Self::from_fixed(DataType::Timestamp, samples, |v| v.0.to_le_bytes())
    }

    fn from_fixed<T: Copy, const N: usize>(
        data_type: DataType,
        samples: &[T],
        encode: impl Fn(T) -> [u8; N],
    ) -> Self {
        let mut data = Vec::with_capacity(samples.len() * N);
        for &sample in samples {
            data.extend_from_slice(&encode(sample));
        }
        Self { data_type, data }
    }

    /// The sample type.
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.data.len() / self.data_type.density()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw little-endian sample bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Total size of the sample buffer in bytes.
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// Rewrite this series as `to`, sample by sample.
    ///
    /// Only casts admitted by [`DataType::can_cast_to`] succeed; everything
    /// else returns [`TelemError::InvalidCast`].
    pub fn cast(&mut self, to: DataType) -> Result<()> {
        if self.data_type == to {
            return Ok(());
        }
        if !self.data_type.can_cast_to(to) {
            return Err(TelemError::InvalidCast {
                from: self.data_type.name(),
                to: to.name(),
            });
        }

        // Timestamp <-> Int64 share an 8-byte two's-complement layout.
        if self.data_type.is_timestamp_int64_pair(to) {
            self.data_type = to;
            return Ok(());
        }

        let len = self.len();
        let mut out = Vec::with_capacity(len * to.density());
        for i in 0..len {
            if matches!(to, DataType::Float64 | DataType::Float32) {
                let v = self.sample_f64(i);
                match to {
                    DataType::Float64 => out.extend_from_slice(&v.to_le_bytes()),
                    DataType::Float32 => out.extend_from_slice(&(v as f32).to_le_bytes()),
                    _ => unreachable!(),
                }
            } else {
                let v = self.sample_i128(i);
                match to {
                    DataType::Int64 | DataType::Timestamp => {
                        out.extend_from_slice(&(v as i64).to_le_bytes())
                    }
                    DataType::Int32 => out.extend_from_slice(&(v as i32).to_le_bytes()),
                    DataType::Int16 => out.extend_from_slice(&(v as i16).to_le_bytes()),
                    DataType::Uint64 => out.extend_from_slice(&(v as u64).to_le_bytes()),
                    DataType::Uint32 => out.extend_from_slice(&(v as u32).to_le_bytes()),
                    DataType::Uint16 => out.extend_from_slice(&(v as u16).to_le_bytes()),
                    _ => unreachable!(),
                }
            }
        }

        self.data_type = to;
        self.data = out;
        Ok(())
    }

    /// Decode every sample as `i64`. Floating samples are truncated.
    pub fn as_i64s(&self) -> Vec<i64> {
        (0..self.len()).map(|i| self.sample_i128(i) as i64).collect()
    }

    /// Decode every sample as `f64`.
    pub fn as_f64s(&self) -> Vec<f64> {
        (0..self.len()).map(|i| self.sample_f64(i)).collect()
    }

    /// Decode every sample as a [`TimeStamp`].
    pub fn as_timestamps(&self) -> Vec<TimeStamp> {
        (0..self.len())
            .map(|i| TimeStamp::new(self.sample_i128(i) as i64))
            .collect()
    }

    fn sample_bytes(&self, index: usize) -> &[u8] {
        let density = self.data_type.density();
        &self.data[index * density..(index + 1) * density]
    }

    fn sample_i128(&self, index: usize) -> i128 {
        let b = self.sample_bytes(index);
        match self.data_type {
            DataType::Int64 | DataType::Timestamp => {
                i64::from_le_bytes(b.try_into().expect("sample width")) as i128
            }
            DataType::Int32 => i32::from_le_bytes(b.try_into().expect("sample width")) as i128,
            DataType::Int16 => i16::from_le_bytes(b.try_into().expect("sample width")) as i128,
            DataType::Int8 => i8::from_le_bytes(b.try_into().expect("sample width")) as i128,
            DataType::Uint64 => u64::from_le_bytes(b.try_into().expect("sample width")) as i128,
            DataType::Uint32 => u32::from_le_bytes(b.try_into().expect("sample width")) as i128,
            DataType::Uint16 => u16::from_le_bytes(b.try_into().expect("sample width")) as i128,
            DataType::Uint8 => b[0] as i128,
            DataType::Float64 => f64::from_le_bytes(b.try_into().expect("sample width")) as i128,
            DataType::Float32 => f32::from_le_bytes(b.try_into().expect("sample width")) as i128,
        }
    }

    fn sample_f64(&self, index: usize) -> f64 {
        let b = self.sample_bytes(index);
        match self.data_type {
            DataType::Float64 => f64::from_le_bytes(b.try_into().expect("sample width")),
            DataType::Float32 => f32::from_le_bytes(b.try_into().expect("sample width")) as f64,
            _ => self.sample_i128(index) as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_constructors_and_accessors() {
        let series = Series::from_i64s(&[1, 2, 3]);
        assert_eq!(series.data_type(), DataType::Int64);
        assert_eq!(series.len(), 3);
        assert_eq!(series.byte_len(), 24);
        assert_eq!(series.as_i64s(), vec![1, 2, 3]);

        let series = Series::from_f64s(&[1.5, -2.5]);
        assert_eq!(series.as_f64s(), vec![1.5, -2.5]);
    }

    #[test]
    fn raw_construction_checks_alignment() {
        assert!(Series::new(DataType::Int64, vec![0; 16]).is_ok());
        assert!(matches!(
            Series::new(DataType::Int64, vec![0; 10]),
            Err(TelemError::UnalignedData { .. })
        ));
    }

    #[test]
    fn widening_int_cast() {
        let mut series = Series::from_i32s(&[-5, 0, 7]);
        series.cast(DataType::Int64).unwrap();
        assert_eq!(series.data_type(), DataType::Int64);
        assert_eq!(series.as_i64s(), vec![-5, 0, 7]);
    }

    #[test]
    fn int_to_float_cast() {
        let mut series = Series::from_i32s(&[1, 2, 3]);
        series.cast(DataType::Float64).unwrap();
        assert_eq!(series.as_f64s(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn float_widening_cast() {
        let mut series = Series::from_f32s(&[0.5, -1.25]);
        series.cast(DataType::Float64).unwrap();
        assert_eq!(series.as_f64s(), vec![0.5, -1.25]);
    }

    #[test]
    fn timestamp_int64_cast_is_a_relabel() {
        let mut series = Series::from_timestamps(&[TimeStamp::new(100), TimeStamp::new(200)]);
        let raw = series.data().to_vec();
        series.cast(DataType::Int64).unwrap();
        assert_eq!(series.data(), raw.as_slice());
        assert_eq!(series.as_i64s(), vec![100, 200]);
    }

    #[test]
    fn narrowing_cast_rejected() {
        let mut series = Series::from_i64s(&[1]);
        assert!(matches!(
            series.cast(DataType::Int32),
            Err(TelemError::InvalidCast { .. })
        ));
        // Series unchanged on failure.
        assert_eq!(series.data_type(), DataType::Int64);
        assert_eq!(series.as_i64s(), vec![1]);
    }

    #[test]
    fn same_type_cast_is_noop() {
        let mut series = Series::from_f64s(&[1.0]);
        series.cast(DataType::Float64).unwrap();
        assert_eq!(series.as_f64s(), vec![1.0]);
    }

    #[test]
    fn unsigned_widening() {
        let mut series = Series::from_u8s(&[0, 128, 255]);
        series.cast(DataType::Uint16).unwrap();
        assert_eq!(series.data_type(), DataType::Uint16);
        assert_eq!(series.as_i64s(), vec![0, 128, 255]);

        let mut series = Series::from_u8s(&[0, 128, 255]);
        series.cast(DataType::Int64).unwrap();
        assert_eq!(series.as_i64s(), vec![0, 128, 255]);
    }
}
