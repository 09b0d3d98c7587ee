use bytes::{Buf, BufMut, Bytes, BytesMut};
use fluxline_telem::{DataType, Series};

use crate::error::{FrameError, Result};
use crate::frame::Frame;
use crate::message::{ControlEnvelope, Message, ENVELOPE_VERSION};

/// Wire header: magic (2) + length (4) = 6 bytes.
pub const HEADER_SIZE: usize = 6;

/// Magic bytes: "FX" (0x46 0x58).
pub const MAGIC: [u8; 2] = [0x46, 0x58];

/// Default maximum message payload size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Leading byte of every control-path (low-performance) message.
///
/// Never a valid first byte of the control codec's native output (JSON text)
/// or of the data codec's native output (its version byte).
pub const CONTROL_MARKER: u8 = 0xFB;

/// Leading byte of every data-path (high-performance) message.
pub const DATA_MARKER: u8 = 0xFC;

/// Current data-codec version. Occupies the first byte of native data-codec
/// output, which the wire layer overwrites with [`DATA_MARKER`]; a single
/// codec version is live per stream, negotiated at OPEN, so the decoder
/// reconstructs it.
pub const DATA_CODEC_VERSION: u8 = 1;

const COLUMN_HEADER_SIZE: usize = 4 + 1 + 4;

/// Configuration for message framing over a stream.
#[derive(Debug, Clone)]
pub struct CodecConfig {
    /// Maximum payload size in bytes. Default: 16 MiB.
    pub max_payload_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

/// Encode a message into its byte-discriminated payload.
///
/// Control messages: `[CONTROL_MARKER][JSON envelope]`. WRITE messages: the
/// data codec's columnar output with its version byte overwritten by
/// [`DATA_MARKER`] — no envelope, no per-message overhead beyond the marker.
pub fn encode_message(message: &Message, dst: &mut BytesMut) -> Result<()> {
    match message {
        Message::Control(envelope) => {
            dst.put_u8(CONTROL_MARKER);
            let payload = serde_json::to_vec(envelope)?;
            dst.put_slice(&payload);
        }
        Message::Write(frame) => {
            let start = dst.len();
            encode_frame_data(frame, dst)?;
            dst[start] = DATA_MARKER;
        }
    }
    Ok(())
}

/// Decode a message from its byte-discriminated payload.
///
/// Only the first byte is inspected to pick a decoder. A data-marked payload
/// is always reconstructed as a synthetic WRITE command carrying the frame.
pub fn decode_message(src: &[u8]) -> Result<Message> {
    let (&marker, rest) = src
        .split_first()
        .ok_or(FrameError::Malformed("empty message"))?;

    match marker {
        CONTROL_MARKER => {
            let envelope: ControlEnvelope = serde_json::from_slice(rest)?;
            if envelope.version != ENVELOPE_VERSION {
                return Err(FrameError::UnsupportedVersion(envelope.version));
            }
            Ok(Message::Control(envelope))
        }
        DATA_MARKER => Ok(Message::Write(decode_frame_data(rest)?)),
        other => Err(FrameError::UnknownMarker(other)),
    }
}

/// Data codec: compact columnar binary.
///
/// ```text
/// ┌──────────────┬──────────────┬───────────────────────────────────┐
/// │ Version (1B) │ Columns (4B) │ Per column:                       │
/// │              │ (LE)         │ key (4B LE) · dtype (1B) ·        │
/// │              │              │ byte length (4B LE) · samples     │
/// └──────────────┴──────────────┴───────────────────────────────────┘
/// ```
fn encode_frame_data(frame: &Frame, dst: &mut BytesMut) -> Result<()> {
    if frame.len() > u32::MAX as usize {
        return Err(FrameError::Malformed("too many columns"));
    }

    dst.reserve(1 + 4 + frame.len() * COLUMN_HEADER_SIZE + frame.byte_len());
    dst.put_u8(DATA_CODEC_VERSION);
    dst.put_u32_le(frame.len() as u32);

    for (key, series) in frame.iter() {
        if series.byte_len() > u32::MAX as usize {
            return Err(FrameError::PayloadTooLarge {
                size: series.byte_len(),
                max: u32::MAX as usize,
            });
        }
        dst.put_u32_le(key.0);
        dst.put_u8(series.data_type().code());
        dst.put_u32_le(series.byte_len() as u32);
        dst.put_slice(series.data());
    }

    Ok(())
}

/// Decode the data codec's columnar payload (version byte already consumed
/// by the marker overwrite).
fn decode_frame_data(mut src: &[u8]) -> Result<Frame> {
    if src.len() < 4 {
        return Err(FrameError::Malformed("truncated column count"));
    }
    let columns = src.get_u32_le() as usize;

    let mut frame = Frame::with_capacity(columns);
    for _ in 0..columns {
        if src.len() < COLUMN_HEADER_SIZE {
            return Err(FrameError::Malformed("truncated column header"));
        }
        let key = src.get_u32_le();
        let data_type = DataType::from_code(src.get_u8())?;
        let byte_len = src.get_u32_le() as usize;

        if src.len() < byte_len {
            return Err(FrameError::Malformed("truncated column data"));
        }
        let data = src[..byte_len].to_vec();
        src.advance(byte_len);

        frame.push(key, Series::new(data_type, data)?);
    }

    if !src.is_empty() {
        return Err(FrameError::Malformed("trailing bytes after last column"));
    }

    Ok(frame)
}

/// Frame a payload for the wire: magic + length header.
pub(crate) fn encode_wire(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > u32::MAX as usize {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: u32::MAX as usize,
        });
    }
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_slice(&MAGIC);
    dst.put_u32_le(payload.len() as u32);
    dst.put_slice(payload);
    Ok(())
}

/// Take one complete payload off the wire buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete message yet.
pub(crate) fn decode_wire(src: &mut BytesMut, max_payload: usize) -> Result<Option<Bytes>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }

    if src[0..2] != MAGIC {
        return Err(FrameError::InvalidMagic);
    }

    let payload_len = u32::from_le_bytes(src[2..6].try_into().expect("header width")) as usize;
    if payload_len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    if src.len() < HEADER_SIZE + payload_len {
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    Ok(Some(src.split_to(payload_len).freeze()))
}
