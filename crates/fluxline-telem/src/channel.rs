use std::fmt;

use serde::{Deserialize, Serialize};

use crate::datatype::DataType;

/// The cluster-assigned key of a channel.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ChannelKey(pub u32);

impl ChannelKey {
    /// The zero key, meaning "no channel" (e.g. a data channel with no index).
    pub const NONE: ChannelKey = ChannelKey(0);

    pub fn is_none(&self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for ChannelKey {
    fn from(key: u32) -> Self {
        Self(key)
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Write priority for a channel, 0 (lowest) through 255 (absolute).
///
/// When several writers hold the same channel, the cluster applies the value
/// from the writer with the highest authority and silently drops the rest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Authority(pub u8);

impl Authority {
    pub const ABSOLUTE: Authority = Authority(255);
}

impl Default for Authority {
    fn default() -> Self {
        Authority(Authority::ABSOLUTE.0)
    }
}

impl From<u8> for Authority {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

/// Client-side metadata for one cluster channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub key: ChannelKey,
    pub name: String,
    pub data_type: DataType,
    /// True if this channel stores timestamps that other channels align to.
    #[serde(default)]
    pub is_index: bool,
    /// Key of the index channel this channel aligns to. [`ChannelKey::NONE`]
    /// for index channels themselves.
    #[serde(default)]
    pub index: ChannelKey,
}

impl Channel {
    /// An index channel: a monotonically increasing run of timestamps.
    pub fn index(key: impl Into<ChannelKey>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            data_type: DataType::Timestamp,
            is_index: true,
            index: ChannelKey::NONE,
        }
    }

    /// A data channel aligned to the given index channel.
    pub fn data(
        key: impl Into<ChannelKey>,
        name: impl Into<String>,
        data_type: DataType,
        index: impl Into<ChannelKey>,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            data_type,
            is_index: false,
            index: index.into(),
        }
    }

    /// The index channel this channel's samples align to: itself for an index
    /// channel, otherwise its `index` field.
    pub fn alignment_key(&self) -> ChannelKey {
        if self.is_index {
            self.key
        } else {
            self.index
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors() {
        let idx = Channel::index(1u32, "time");
        assert!(idx.is_index);
        assert_eq!(idx.data_type, DataType::Timestamp);
        assert_eq!(idx.alignment_key(), ChannelKey(1));

        let data = Channel::data(2u32, "pressure", DataType::Float32, 1u32);
        assert!(!data.is_index);
        assert_eq!(data.index, ChannelKey(1));
        assert_eq!(data.alignment_key(), ChannelKey(1));
    }

    #[test]
    fn authority_ordering() {
        assert!(Authority(10) < Authority::ABSOLUTE);
        assert_eq!(Authority::default(), Authority::ABSOLUTE);
    }

    #[test]
    fn channel_key_none() {
        assert!(ChannelKey::NONE.is_none());
        assert!(!ChannelKey(3).is_none());
    }
}
