use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use fluxline_transport::ClusterStream;

use crate::codec::{encode_message, encode_wire, CodecConfig};
use crate::error::{FrameError, Result};
use crate::message::Message;
use crate::reader::transport_to_frame_error;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes complete protocol messages to any `Write` stream.
pub struct MessageWriter<T> {
    inner: T,
    payload: BytesMut,
    wire: BytesMut,
    config: CodecConfig,
}

impl<T: Write> MessageWriter<T> {
    /// Create a new message writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, CodecConfig::default())
    }

    /// Create a new message writer with explicit configuration.
    pub fn with_config(inner: T, config: CodecConfig) -> Self {
        Self {
            inner,
            payload: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            wire: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Encode and send one message (blocking).
    pub fn send(&mut self, message: &Message) -> Result<()> {
        self.payload.clear();
        encode_message(message, &mut self.payload)?;

        if self.payload.len() > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: self.payload.len(),
                max: self.config.max_payload_size,
            });
        }

        self.wire.clear();
        encode_wire(&self.payload, &mut self.wire)?;

        let mut offset = 0usize;
        while offset < self.wire.len() {
            match self.inner.write(&self.wire[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current codec configuration.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }
}

impl MessageWriter<ClusterStream> {
    /// Create a message writer for a `ClusterStream`, applying the write
    /// timeout from `config` to the socket.
    pub fn with_config_stream(inner: ClusterStream, config: CodecConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use fluxline_telem::Series;

    use super::*;
    use crate::frame::Frame;
    use crate::message::{CommandKind, ControlEnvelope};
    use crate::reader::MessageReader;

    #[test]
    fn sent_messages_decode() {
        let mut writer = MessageWriter::new(Cursor::new(Vec::<u8>::new()));

        let mut frame = Frame::new();
        frame.push(7u32, Series::from_i32s(&[1, 2]));
        writer.send(&Message::Write(frame.clone())).unwrap();
        writer
            .send(&Message::Control(ControlEnvelope::request(
                CommandKind::Commit,
            )))
            .unwrap();

        let wire = writer.into_inner().into_inner();
        let mut reader = MessageReader::new(Cursor::new(wire));
        assert_eq!(reader.read_message().unwrap(), Message::Write(frame));
        assert_eq!(
            reader.read_message().unwrap().command(),
            CommandKind::Commit
        );
    }

    #[test]
    fn oversized_payload_rejected_before_write() {
        let cfg = CodecConfig {
            max_payload_size: 32,
            ..CodecConfig::default()
        };
        let mut writer = MessageWriter::with_config(Cursor::new(Vec::<u8>::new()), cfg);

        let mut frame = Frame::new();
        frame.push(1u32, Series::from_f64s(&[0.0; 64]));

        assert!(matches!(
            writer.send(&Message::Write(frame)).unwrap_err(),
            FrameError::PayloadTooLarge { .. }
        ));
        assert!(writer.into_inner().into_inner().is_empty());
    }

    #[test]
    fn zero_length_write_is_connection_closed() {
        struct ZeroWriter;
        impl Write for ZeroWriter {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Ok(0)
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut writer = MessageWriter::new(ZeroWriter);
        let err = writer
            .send(&Message::Control(ControlEnvelope::request(
                CommandKind::Open,
            )))
            .unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn interrupted_write_retries() {
        struct InterruptedOnce {
            tripped: bool,
            data: Vec<u8>,
        }
        impl Write for InterruptedOnce {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                if !self.tripped {
                    self.tripped = true;
                    return Err(std::io::Error::from(ErrorKind::Interrupted));
                }
                self.data.extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut writer = MessageWriter::new(InterruptedOnce {
            tripped: false,
            data: Vec::new(),
        });
        writer
            .send(&Message::Control(ControlEnvelope::request(
                CommandKind::Commit,
            )))
            .unwrap();
        assert!(!writer.into_inner().data.is_empty());
    }
}
