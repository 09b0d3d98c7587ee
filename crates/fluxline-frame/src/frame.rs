use std::collections::BTreeSet;

use fluxline_telem::{ChannelKey, Series};

/// A batch of columnar samples for one or more channels, exchanged in a
/// single protocol message.
///
/// Columns keep their insertion order. A key may appear more than once when
/// several runs for the same channel are batched together; lookups return
/// the first match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    columns: Vec<(ChannelKey, Series)>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            columns: Vec::with_capacity(capacity),
        }
    }

    /// Append a series for a channel.
    pub fn push(&mut self, key: impl Into<ChannelKey>, series: Series) {
        self.columns.push((key.into(), series));
    }

    /// The first series for `key`, if any.
    pub fn get(&self, key: ChannelKey) -> Option<&Series> {
        self.columns
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, series)| series)
    }

    /// Number of columns (not samples).
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// The distinct channel keys present in this frame.
    pub fn channel_set(&self) -> BTreeSet<ChannelKey> {
        self.columns.iter().map(|(k, _)| *k).collect()
    }

    /// Total payload size across all columns, in bytes.
    pub fn byte_len(&self) -> usize {
        self.columns.iter().map(|(_, s)| s.byte_len()).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChannelKey, &Series)> {
        self.columns.iter().map(|(k, s)| (*k, s))
    }

    /// Mutable column iteration — the write path coerces series in place.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ChannelKey, &mut Series)> {
        self.columns.iter_mut().map(|(k, s)| (*k, s))
    }
}

impl FromIterator<(ChannelKey, Series)> for Frame {
    fn from_iter<I: IntoIterator<Item = (ChannelKey, Series)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}
