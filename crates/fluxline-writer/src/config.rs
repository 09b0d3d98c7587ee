use std::time::Duration;

use fluxline_telem::{Authority, Channel, ChannelKey, TimeSpan, TimeStamp};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WriterError};

/// Default timeout for blocking protocol operations.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Sentinel interval meaning "persist the index on every auto-commit".
pub const ALWAYS_INDEX_PERSIST: TimeSpan = TimeSpan(-1);

/// What the cluster does with written frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriterMode {
    /// Durably store and broadcast live. The default.
    #[default]
    PersistStream,
    /// Store only; concurrent readers must not observe the data live.
    Persist,
    /// Broadcast only; nothing reaches durable storage.
    Stream,
}

impl WriterMode {
    /// Wire encoding: persist and stream bits.
    pub const fn code(&self) -> u8 {
        match self {
            WriterMode::Persist => 1,
            WriterMode::Stream => 2,
            WriterMode::PersistStream => 3,
        }
    }

    pub const fn persists(&self) -> bool {
        self.code() & 1 != 0
    }

    pub const fn streams(&self) -> bool {
        self.code() & 2 != 0
    }
}

/// How `write` treats a series whose datatype differs from its channel's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoercionPolicy {
    /// Any mismatch is a hard validation error.
    Strict,
    /// Safely castable mismatches are coerced with a logged warning.
    #[default]
    WarnAndCoerce,
    /// Safely castable mismatches are coerced without a warning.
    SilentCoerce,
}

/// Identity of the control subject operating this writer, reported to the
/// cluster for authority arbitration and audit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub key: String,
    pub name: String,
}

impl Subject {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
        }
    }
}

/// Configuration for opening a [`crate::Writer`].
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// The channels this writer owns, with their metadata.
    pub channels: Vec<Channel>,
    /// Start of the domain this writer appends to.
    pub start: TimeStamp,
    /// One authority per channel, or a single broadcast authority.
    pub authorities: Vec<Authority>,
    /// Control-subject identity.
    pub subject: Subject,
    pub mode: WriterMode,
    /// Raise on unauthorized writes instead of silently dropping them.
    pub err_on_unauthorized: bool,
    /// Commit after every successful write.
    pub enable_auto_commit: bool,
    /// How often auto-commits durably flush the backing index.
    /// [`ALWAYS_INDEX_PERSIST`] flushes on every auto-commit.
    pub auto_index_persist_interval: TimeSpan,
    pub coercion: CoercionPolicy,
    /// Default timeout for open/commit/set-authority/close waits.
    pub response_timeout: Duration,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            channels: Vec::new(),
            start: TimeStamp::new(0),
            authorities: vec![Authority::ABSOLUTE],
            subject: Subject::default(),
            mode: WriterMode::default(),
            err_on_unauthorized: false,
            enable_auto_commit: false,
            auto_index_persist_interval: ALWAYS_INDEX_PERSIST,
            coercion: CoercionPolicy::default(),
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
        }
    }
}

impl WriterConfig {
    pub fn new(channels: Vec<Channel>, start: TimeStamp) -> Self {
        Self {
            channels,
            start,
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.channels.is_empty() {
            return Err(WriterError::NoChannels);
        }
        if self.authorities.len() != 1 && self.authorities.len() != self.channels.len() {
            return Err(WriterError::AuthorityCount {
                channels: self.channels.len(),
                got: self.authorities.len(),
            });
        }
        Ok(())
    }

    /// The OPEN command payload sent over the control path.
    pub(crate) fn wire_config(&self) -> Result<serde_json::Value> {
        let keys: Vec<u32> = self.channels.iter().map(|c| c.key.0).collect();
        let authorities: Vec<u8> = self.authorities.iter().map(|a| a.0).collect();
        Ok(serde_json::json!({
            "keys": keys,
            "start": self.start,
            "authorities": authorities,
            "subject": self.subject,
            "mode": self.mode.code(),
            "err_on_unauthorized": self.err_on_unauthorized,
            "enable_auto_commit": self.enable_auto_commit,
            "auto_index_persist_interval": self.auto_index_persist_interval,
        }))
    }
}

/// A channel argument: key, name, or already-resolved channel payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelParam {
    Key(ChannelKey),
    Name(String),
    Resolved(Channel),
}

impl From<ChannelKey> for ChannelParam {
    fn from(key: ChannelKey) -> Self {
        Self::Key(key)
    }
}

impl From<u32> for ChannelParam {
    fn from(key: u32) -> Self {
        Self::Key(ChannelKey(key))
    }
}

impl From<&str> for ChannelParam {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for ChannelParam {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<Channel> for ChannelParam {
    fn from(channel: Channel) -> Self {
        Self::Resolved(channel)
    }
}

/// The closed set of shapes `set_authority` accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthoritySpec {
    /// One value for every channel the writer owns.
    All(Authority),
    /// A value for a single channel.
    One(ChannelParam, Authority),
    /// A batch of channel → authority pairs.
    Many(Vec<(ChannelParam, Authority)>),
}

/// Normalize an [`AuthoritySpec`] to the canonical parallel keys/authorities
/// lists the SET_AUTHORITY command carries.
pub(crate) fn normalize_authority(
    owned: &[Channel],
    spec: AuthoritySpec,
) -> Result<(Vec<ChannelKey>, Vec<Authority>)> {
    match spec {
        AuthoritySpec::All(authority) => Ok((
            owned.iter().map(|c| c.key).collect(),
            vec![authority; owned.len()],
        )),
        AuthoritySpec::One(param, authority) => {
            let key = resolve_param(owned, &param)?;
            Ok((vec![key], vec![authority]))
        }
        AuthoritySpec::Many(pairs) => {
            if pairs.is_empty() {
                return Err(WriterError::EmptyAuthoritySet);
            }
            let mut keys = Vec::with_capacity(pairs.len());
            let mut authorities = Vec::with_capacity(pairs.len());
            for (param, authority) in pairs {
                keys.push(resolve_param(owned, &param)?);
                authorities.push(authority);
            }
            Ok((keys, authorities))
        }
    }
}

fn resolve_param(owned: &[Channel], param: &ChannelParam) -> Result<ChannelKey> {
    let found = match param {
        ChannelParam::Key(key) => owned.iter().find(|c| c.key == *key),
        ChannelParam::Name(name) => owned.iter().find(|c| &c.name == name),
        ChannelParam::Resolved(channel) => owned.iter().find(|c| c.key == channel.key),
    };
    found.map(|c| c.key).ok_or_else(|| {
        WriterError::UnknownChannel(match param {
            ChannelParam::Key(key) => key.to_string(),
            ChannelParam::Name(name) => name.clone(),
            ChannelParam::Resolved(channel) => channel.name.clone(),
        })
    })
}
