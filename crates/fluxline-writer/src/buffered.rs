use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use fluxline_frame::Frame;
use fluxline_telem::{Channel, ChannelKey, DataType, Series, TimeStamp};
use tracing::debug;

use crate::error::{Result, WriterError};
use crate::writer::Writer;

/// One logical sample heading for a channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    F64(f64),
    I64(i64),
    Timestamp(TimeStamp),
}

impl Sample {
    fn as_f64(&self) -> f64 {
        match self {
            Sample::F64(v) => *v,
            Sample::I64(v) => *v as f64,
            Sample::Timestamp(ts) => ts.nanos() as f64,
        }
    }

    fn as_i64(&self) -> i64 {
        match self {
            Sample::F64(v) => *v as i64,
            Sample::I64(v) => *v,
            Sample::Timestamp(ts) => ts.nanos(),
        }
    }
}

impl From<f64> for Sample {
    fn from(v: f64) -> Self {
        Sample::F64(v)
    }
}

impl From<i64> for Sample {
    fn from(v: i64) -> Self {
        Sample::I64(v)
    }
}

impl From<TimeStamp> for Sample {
    fn from(ts: TimeStamp) -> Self {
        Sample::Timestamp(ts)
    }
}

/// One row of samples: a value for every channel the writer owns.
pub type Row = Vec<(ChannelKey, Sample)>;

/// Batches many small row writes into fewer wire writes.
///
/// Rows accumulate in a column-oriented buffer keyed by channel. After each
/// append the buffer flushes — forwarded to the wrapped writer, committed,
/// clock reset, buffer cleared — once the buffered row×column cell count
/// reaches `size_threshold` or the time since the last flush reaches
/// `time_threshold`. The time check runs on every call; there is no
/// background timer. `close` performs one final flush, so no appended row is
/// ever dropped.
pub struct BufferedWriter {
    inner: Writer,
    size_threshold: usize,
    time_threshold: Duration,
    last_flush: Instant,
    columns: Vec<(Channel, Vec<Sample>)>,
}

impl BufferedWriter {
    pub fn new(writer: Writer, size_threshold: usize, time_threshold: Duration) -> Self {
        let columns = writer
            .channels()
            .iter()
            .map(|channel| (channel.clone(), Vec::new()))
            .collect();
        Self {
            inner: writer,
            size_threshold,
            time_threshold,
            last_flush: Instant::now(),
            columns,
        }
    }

    /// Buffered cells (rows × columns) awaiting flush.
    pub fn buffered_cells(&self) -> usize {
        self.columns.iter().map(|(_, samples)| samples.len()).sum()
    }

    /// Append rows, then flush if either threshold has been reached.
    pub fn write(&mut self, rows: &[Row]) -> Result<()> {
        for row in rows {
            self.append(row)?;
        }

        if self.buffered_cells() >= self.size_threshold
            || self.last_flush.elapsed() >= self.time_threshold
        {
            self.flush()?;
        }
        Ok(())
    }

    /// Forward the buffer to the wrapped writer and commit it.
    pub fn flush(&mut self) -> Result<()> {
        if self.buffered_cells() == 0 {
            self.last_flush = Instant::now();
            return Ok(());
        }

        let mut frame = Frame::with_capacity(self.columns.len());
        for (channel, samples) in &mut self.columns {
            frame.push(channel.key, series_from_samples(channel.data_type, samples)?);
            samples.clear();
        }

        debug!(columns = frame.len(), "flushing buffered rows");
        self.inner.write(frame)?;
        self.inner.commit()?;
        self.last_flush = Instant::now();
        Ok(())
    }

    /// Flush any remaining rows, then close the wrapped writer.
    pub fn close(mut self) -> Result<()> {
        self.flush()?;
        self.inner.close()
    }

    fn append(&mut self, row: &Row) -> Result<()> {
        self.validate_row(row)?;
        for (key, sample) in row {
            let (_, samples) = self
                .columns
                .iter_mut()
                .find(|(channel, _)| channel.key == *key)
                .expect("row validated against channel set");
            samples.push(*sample);
        }
        Ok(())
    }

    fn validate_row(&self, row: &Row) -> Result<()> {
        let owned: BTreeSet<ChannelKey> = self.columns.iter().map(|(c, _)| c.key).collect();
        let present: BTreeSet<ChannelKey> = row.iter().map(|(k, _)| *k).collect();

        let missing: Vec<ChannelKey> = owned.difference(&present).copied().collect();
        let extra: Vec<ChannelKey> = present.difference(&owned).copied().collect();
        match (missing.is_empty(), extra.is_empty()) {
            (true, true) => Ok(()),
            (false, false) => Err(WriterError::MissingAndExtraChannels { missing, extra }),
            (true, false) => Err(WriterError::ExtraChannels { extra }),
            (false, true) => Err(WriterError::MissingChannels { missing }),
        }
    }
}

fn series_from_samples(data_type: DataType, samples: &[Sample]) -> Result<Series> {
    let mut data = Vec::with_capacity(samples.len() * data_type.density());
    for sample in samples {
        match data_type {
            DataType::Float64 => data.extend_from_slice(&sample.as_f64().to_le_bytes()),
            DataType::Float32 => data.extend_from_slice(&(sample.as_f64() as f32).to_le_bytes()),
            DataType::Int64 | DataType::Timestamp => {
                data.extend_from_slice(&sample.as_i64().to_le_bytes())
            }
            DataType::Int32 => data.extend_from_slice(&(sample.as_i64() as i32).to_le_bytes()),
            DataType::Int16 => data.extend_from_slice(&(sample.as_i64() as i16).to_le_bytes()),
            DataType::Int8 => data.extend_from_slice(&(sample.as_i64() as i8).to_le_bytes()),
            DataType::Uint64 => data.extend_from_slice(&(sample.as_i64() as u64).to_le_bytes()),
            DataType::Uint32 => data.extend_from_slice(&(sample.as_i64() as u32).to_le_bytes()),
            DataType::Uint16 => data.extend_from_slice(&(sample.as_i64() as u16).to_le_bytes()),
            DataType::Uint8 => data.push(sample.as_i64() as u8),
        }
    }
    Ok(Series::new(data_type, data)?)
}
