use bytes::Bytes;
use fluxline_telem::ChannelKey;

/// A contiguous run of raw sample bytes for one channel, positioned by byte
/// offset within its domain. The unit of transport/storage packaging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub channel: ChannelKey,
    /// Byte offset of the first sample relative to the segment's domain.
    pub offset: u64,
    pub data: Bytes,
}

impl Segment {
    pub fn new(channel: impl Into<ChannelKey>, offset: u64, data: impl Into<Bytes>) -> Self {
        Self {
            channel: channel.into(),
            offset,
            data: data.into(),
        }
    }

    /// Size of the segment payload in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Partition an oversized segment into size-bounded sub-segments.
///
/// A segment at or under `threshold` bytes is returned unchanged as a
/// single-element result. Otherwise a prefix of exactly `threshold` bytes is
/// split off — keeping the channel, with the remainder's offset adjusted to
/// immediately follow the prefix — and the remainder is split the same way.
/// Each call strictly shrinks the remainder by `threshold`, so the recursion
/// terminates with `ceil(len / threshold)` pieces whose concatenation is the
/// original payload. `threshold` must be positive.
pub fn split_segment(segment: Segment, threshold: usize) -> Vec<Segment> {
    if threshold == 0 || segment.len() <= threshold {
        return vec![segment];
    }

    let Segment {
        channel,
        offset,
        mut data,
    } = segment;

    let prefix = Segment::new(channel, offset, data.split_to(threshold));
    let remainder = Segment::new(channel, offset + threshold as u64, data);

    let mut out = vec![prefix];
    out.extend(split_segment(remainder, threshold));
    out
}
