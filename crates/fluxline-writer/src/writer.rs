use std::collections::{BTreeSet, HashMap};
use std::io::ErrorKind;
use std::time::{Duration, Instant};

use fluxline_frame::{
    CodecConfig, CommandKind, ControlEnvelope, Frame, FrameError, Message, MessageReader,
    MessageWriter,
};
use fluxline_telem::{Authority, Channel, ChannelKey, TimeSpan, TimeStamp};
use fluxline_transport::ClusterStream;
use tracing::{debug, info, warn};

use crate::config::{
    normalize_authority, AuthoritySpec, ChannelParam, CoercionPolicy, WriterConfig,
    ALWAYS_INDEX_PERSIST,
};
use crate::error::{Result, WriterError};

/// The write protocol state machine.
///
/// Owns one duplex stream to the cluster's write endpoint. All operations
/// are serialized on the calling thread; a writer is not shareable. Every
/// writer must be closed exactly once — prefer [`with_writer`] so close runs
/// on all exit paths.
pub struct Writer {
    reader: MessageReader<ClusterStream>,
    writer: MessageWriter<ClusterStream>,
    channels: Vec<Channel>,
    coercion: CoercionPolicy,
    enable_auto_commit: bool,
    auto_index_persist_interval: TimeSpan,
    last_index_persist: Instant,
    response_timeout: Duration,
    closed: bool,
    accumulated: Option<String>,
}

impl Writer {
    /// Open a writer over a freshly established stream.
    ///
    /// Sends OPEN with the configuration and blocks for exactly one
    /// response. A response carrying an error (e.g. the requested start
    /// overlaps existing data) is raised immediately and the writer is never
    /// considered opened.
    pub fn open(stream: ClusterStream, config: WriterConfig) -> Result<Self> {
        config.validate()?;

        let codec_config = CodecConfig {
            read_timeout: Some(config.response_timeout),
            write_timeout: Some(config.response_timeout),
            ..CodecConfig::default()
        };
        let reader_stream = stream.try_clone()?;
        let mut reader = MessageReader::with_config_stream(reader_stream, codec_config.clone())?;
        let mut writer = MessageWriter::with_config_stream(stream, codec_config)?;

        let request = ControlEnvelope::request(CommandKind::Open).with_config(config.wire_config()?);
        writer.send(&Message::Control(request))?;

        let response = await_single_response(&mut reader, config.response_timeout)?;
        if let Some(error) = response.error {
            return Err(WriterError::Remote(error));
        }
        if response.command != CommandKind::Open {
            return Err(WriterError::UnexpectedResponse {
                want: CommandKind::Open,
                got: response.command,
            });
        }

        info!(channels = config.channels.len(), "writer opened");
        Ok(Self {
            reader,
            writer,
            channels: config.channels,
            coercion: config.coercion,
            enable_auto_commit: config.enable_auto_commit,
            auto_index_persist_interval: config.auto_index_persist_interval,
            last_index_persist: Instant::now(),
            response_timeout: config.response_timeout,
            closed: false,
            accumulated: None,
        })
    }

    /// The channels this writer owns.
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// True once the writer has transitioned to CLOSED.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Send one frame of telemetry. Fire-and-forget: no response is awaited.
    ///
    /// The frame's channel set must equal the writer's. Series whose
    /// datatype differs from their channel's are coerced in place per the
    /// configured [`CoercionPolicy`]. End-of-stream on send transparently
    /// closes the writer instead of raising; any other send error is raised
    /// and recorded as the writer's terminal state.
    pub fn write(&mut self, mut frame: Frame) -> Result<()> {
        self.ensure_usable()?;
        self.validate_channel_set(&frame)?;
        self.validate_alignment(&frame)?;
        self.coerce(&mut frame)?;

        match self.writer.send(&Message::Write(frame)) {
            Ok(()) => {}
            Err(err) if is_end_of_stream(&err) => {
                debug!("end of stream during write; closing writer");
                return self.close();
            }
            Err(err) => {
                self.accumulated = Some(err.to_string());
                return Err(err.into());
            }
        }

        if self.enable_auto_commit {
            self.auto_commit()?;
        }
        Ok(())
    }

    /// Commit everything written so far, using the default timeout.
    ///
    /// Blocks until a COMMIT-tagged response arrives, draining and ignoring
    /// intervening non-matching responses. Returns the server-reported end
    /// of the committed range.
    pub fn commit(&mut self) -> Result<TimeStamp> {
        self.commit_with_timeout(self.response_timeout)
    }

    /// Commit with an explicit timeout. A timeout cancels only the pending
    /// wait; the stream stays open and reusable.
    pub fn commit_with_timeout(&mut self, timeout: Duration) -> Result<TimeStamp> {
        self.ensure_usable()?;
        self.writer
            .send(&Message::Control(ControlEnvelope::request(
                CommandKind::Commit,
            )))?;
        let response = self.await_response(CommandKind::Commit, timeout)?;
        response.end.ok_or(WriterError::MissingEnd)
    }

    /// Set one authority value for every channel this writer owns.
    pub fn set_authority(&mut self, authority: impl Into<Authority>) -> Result<()> {
        self.apply_authority(AuthoritySpec::All(authority.into()))
    }

    /// Set a single channel's authority. Accepts a key, a name, or a
    /// resolved channel.
    pub fn set_channel_authority(
        &mut self,
        channel: impl Into<ChannelParam>,
        authority: impl Into<Authority>,
    ) -> Result<()> {
        self.apply_authority(AuthoritySpec::One(channel.into(), authority.into()))
    }

    /// Set a batch of channel → authority pairs.
    pub fn set_authorities(&mut self, batch: Vec<(ChannelParam, Authority)>) -> Result<()> {
        self.apply_authority(AuthoritySpec::Many(batch))
    }

    /// Normalize any authority shape and send SET_AUTHORITY, blocking for
    /// the matching response.
    pub fn apply_authority(&mut self, spec: AuthoritySpec) -> Result<()> {
        self.ensure_usable()?;
        let (keys, authorities) = normalize_authority(&self.channels, spec)?;

        let request = ControlEnvelope::request(CommandKind::SetAuthority).with_config(
            serde_json::json!({ "keys": keys, "authorities": authorities }),
        );
        self.writer.send(&Message::Control(request))?;
        self.await_response(CommandKind::SetAuthority, self.response_timeout)?;
        Ok(())
    }

    /// Close the writer.
    ///
    /// Raises a previously recorded terminal error if one exists (exactly
    /// once). Otherwise signals close, half-closes the send direction, and
    /// drains remaining responses until end-of-stream, raising any non-EOF
    /// error observed on the way. A second close raises
    /// [`WriterError::Closed`] and never re-sends the close signal.
    pub fn close(&mut self) -> Result<()> {
        if let Some(message) = self.accumulated.take() {
            self.closed = true;
            return Err(WriterError::Accumulated(message));
        }
        if self.closed {
            return Err(WriterError::Closed);
        }
        self.closed = true;

        let signal = Message::Control(ControlEnvelope::request(CommandKind::CloseSend));
        match self.writer.send(&signal) {
            Ok(()) => {}
            // Stream already torn down; the drain below observes the EOF.
            Err(err) if is_end_of_stream(&err) => {}
            Err(err) => return Err(err.into()),
        }
        self.writer.get_ref().shutdown_send()?;

        let deadline = Instant::now() + self.response_timeout;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return Err(WriterError::Timeout(self.response_timeout));
            }
            self.reader.get_ref().set_read_timeout(Some(deadline - now))?;

            match self.reader.read_message() {
                Ok(Message::Control(envelope)) => {
                    if let Some(error) = envelope.error {
                        return Err(WriterError::Remote(error));
                    }
                    debug!(command = ?envelope.command, "drained response during close");
                }
                Ok(Message::Write(_)) => {}
                Err(err) if is_end_of_stream(&err) => break,
                Err(FrameError::Io(err))
                    if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    continue;
                }
                Err(err) => return Err(err.into()),
            }
        }

        debug!("writer closed");
        Ok(())
    }

    fn ensure_usable(&self) -> Result<()> {
        if let Some(message) = &self.accumulated {
            return Err(WriterError::Accumulated(message.clone()));
        }
        if self.closed {
            return Err(WriterError::Closed);
        }
        Ok(())
    }

    fn validate_channel_set(&self, frame: &Frame) -> Result<()> {
        let owned: BTreeSet<ChannelKey> = self.channels.iter().map(|c| c.key).collect();
        let present = frame.channel_set();

        let missing: Vec<ChannelKey> = owned.difference(&present).copied().collect();
        let extra: Vec<ChannelKey> = present.difference(&owned).copied().collect();

        match (missing.is_empty(), extra.is_empty()) {
            (true, true) => Ok(()),
            (false, false) => Err(WriterError::MissingAndExtraChannels { missing, extra }),
            (true, false) => Err(WriterError::ExtraChannels { extra }),
            (false, true) => Err(WriterError::MissingChannels { missing }),
        }
    }

    /// Series aligned to the same index channel must agree on sample count.
    fn validate_alignment(&self, frame: &Frame) -> Result<()> {
        let mut counts: HashMap<ChannelKey, usize> = HashMap::new();
        for (key, series) in frame.iter() {
            let channel = self
                .channels
                .iter()
                .find(|c| c.key == key)
                .expect("channel set validated");
            let index = channel.alignment_key();
            if index.is_none() {
                continue;
            }
            if let Some(&count) = counts.get(&index) {
                if count != series.len() {
                    return Err(WriterError::MisalignedSeries { index });
                }
            } else {
                counts.insert(index, series.len());
            }
        }
        Ok(())
    }

    fn coerce(&self, frame: &mut Frame) -> Result<()> {
        for (key, series) in frame.iter_mut() {
            let channel = self
                .channels
                .iter()
                .find(|c| c.key == key)
                .expect("channel set validated");
            let actual = series.data_type();
            let expected = channel.data_type;
            if actual == expected {
                continue;
            }
            // Timestamp/Int64 share a layout: compatible, never warned.
            if actual.is_timestamp_int64_pair(expected) {
                series.cast(expected)?;
                continue;
            }
            if !actual.can_cast_to(expected) {
                return Err(WriterError::TypeMismatch {
                    channel: channel.name.clone(),
                    expected: expected.name(),
                    actual: actual.name(),
                });
            }
            match self.coercion {
                CoercionPolicy::Strict => {
                    return Err(WriterError::TypeMismatch {
                        channel: channel.name.clone(),
                        expected: expected.name(),
                        actual: actual.name(),
                    });
                }
                CoercionPolicy::WarnAndCoerce => {
                    warn!(
                        channel = %channel.name,
                        from = %actual,
                        to = %expected,
                        "coercing series datatype"
                    );
                    series.cast(expected)?;
                }
                CoercionPolicy::SilentCoerce => series.cast(expected)?,
            }
        }
        Ok(())
    }

    fn auto_commit(&mut self) -> Result<()> {
        let persist = self.auto_index_persist_interval == ALWAYS_INDEX_PERSIST
            || self.last_index_persist.elapsed()
                >= self.auto_index_persist_interval.as_duration();

        let mut request = ControlEnvelope::request(CommandKind::Commit);
        if persist {
            request = request.with_config(serde_json::json!({ "persist_index": true }));
        }
        self.writer.send(&Message::Control(request))?;
        self.await_response(CommandKind::Commit, self.response_timeout)?;

        if persist {
            self.last_index_persist = Instant::now();
        }
        Ok(())
    }

    /// Block until a response tagged `want` arrives, draining non-matching
    /// responses. A response carrying an error terminates the wait and is
    /// recorded as the writer's terminal state.
    fn await_response(&mut self, want: CommandKind, timeout: Duration) -> Result<ControlEnvelope> {
        let deadline = Instant::now() + timeout;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return Err(WriterError::Timeout(timeout));
            }
            self.reader.get_ref().set_read_timeout(Some(deadline - now))?;

            match self.reader.read_message() {
                Ok(Message::Control(envelope)) => {
                    if let Some(error) = envelope.error {
                        self.accumulated = Some(error.clone());
                        return Err(WriterError::Remote(error));
                    }
                    if envelope.command == want {
                        return Ok(envelope);
                    }
                    debug!(got = ?envelope.command, want = ?want, "draining non-matching response");
                }
                Ok(Message::Write(_)) => debug!("ignoring frame from cluster"),
                Err(FrameError::Io(err))
                    if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    continue;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

/// Read exactly one control response, retrying only on read timeouts.
fn await_single_response(
    reader: &mut MessageReader<ClusterStream>,
    timeout: Duration,
) -> Result<ControlEnvelope> {
    let deadline = Instant::now() + timeout;
    loop {
        let now = Instant::now();
        if now >= deadline {
            return Err(WriterError::Timeout(timeout));
        }
        reader.get_ref().set_read_timeout(Some(deadline - now))?;

        match reader.read_message() {
            Ok(Message::Control(envelope)) => return Ok(envelope),
            Ok(Message::Write(_)) => {
                return Err(WriterError::UnexpectedResponse {
                    want: CommandKind::Open,
                    got: CommandKind::Write,
                })
            }
            Err(FrameError::Io(err))
                if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                continue;
            }
            Err(err) => return Err(err.into()),
        }
    }
}

fn is_end_of_stream(err: &FrameError) -> bool {
    match err {
        FrameError::ConnectionClosed => true,
        FrameError::Io(io) => matches!(
            io.kind(),
            ErrorKind::BrokenPipe
                | ErrorKind::ConnectionReset
                | ErrorKind::ConnectionAborted
                | ErrorKind::UnexpectedEof
        ),
        _ => false,
    }
}

/// Open a writer against the write endpoint at `path`.
pub fn open_writer(path: impl AsRef<std::path::Path>, config: WriterConfig) -> Result<Writer> {
    let stream = fluxline_transport::Endpoint::connect(path)?;
    Writer::open(stream, config)
}

/// Scoped writer usage: open, run `f`, and close on every exit path.
///
/// The callback's error wins over a close error; a close error surfaces when
/// the callback succeeded.
pub fn with_writer<T>(
    stream: ClusterStream,
    config: WriterConfig,
    f: impl FnOnce(&mut Writer) -> Result<T>,
) -> Result<T> {
    let mut writer = Writer::open(stream, config)?;
    let result = f(&mut writer);
    match (result, writer.close()) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(close_err)) => Err(close_err),
        (Err(err), _) => Err(err),
    }
}
