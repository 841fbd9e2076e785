//! Native-messaging framing
//!
//! Each frame is a u32 length in native byte order followed by that many
//! bytes of UTF-8 JSON.

use bytes::{Buf, BufMut, BytesMut};
use serde_json::Value;
use tokio_util::codec::{Decoder, Encoder};

use crate::envelope::Envelope;

/// Default maximum inbound frame size (64 MiB)
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// Default maximum outbound frame size. Browsers drop the port on any
/// host message larger than 1 MB.
pub const MAX_REPLY_SIZE: usize = 1024 * 1024;

const LENGTH_PREFIX: usize = 4;

/// Frame-level failure. Any of these desynchronizes the stream.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },
}

/// A decoded inbound frame.
///
/// A frame whose JSON is unreadable does not break the stream; it surfaces as
/// `Malformed` so the reader can reply (when an id is recoverable) and move on.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Envelope(Envelope),
    Malformed { id: Option<String>, reason: String },
}

/// Codec for envelopes in both directions.
///
/// Inbound and outbound frames have separate limits: `max_frame` bounds what
/// is decoded, `max_reply` bounds what is encoded.
#[derive(Debug, Clone)]
pub struct EnvelopeCodec {
    max_frame: usize,
    max_reply: usize,
}

impl EnvelopeCodec {
    pub fn new() -> Self {
        Self::with_max_frame(MAX_MESSAGE_SIZE)
    }

    pub fn with_max_frame(max_frame: usize) -> Self {
        Self {
            max_frame,
            max_reply: MAX_REPLY_SIZE,
        }
    }

    pub fn with_max_reply(mut self, max_reply: usize) -> Self {
        self.max_reply = max_reply;
        self
    }

    pub fn max_frame(&self) -> usize {
        self.max_frame
    }

    pub fn max_reply(&self) -> usize {
        self.max_reply
    }
}

impl Default for EnvelopeCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for EnvelopeCodec {
    type Item = Inbound;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < LENGTH_PREFIX {
            return Ok(None);
        }

        // Peek at length without consuming
        let len = u32::from_ne_bytes([src[0], src[1], src[2], src[3]]) as usize;

        if len > self.max_frame {
            return Err(CodecError::MessageTooLarge {
                size: len,
                max: self.max_frame,
            });
        }

        if src.len() < LENGTH_PREFIX + len {
            src.reserve(LENGTH_PREFIX + len - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_PREFIX);
        let data = src.split_to(len);

        Ok(Some(parse_frame(&data)))
    }
}

impl Encoder<Envelope> for EnvelopeCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Envelope, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let data = serde_json::to_vec(&item)?;

        if data.len() > self.max_reply {
            return Err(CodecError::MessageTooLarge {
                size: data.len(),
                max: self.max_reply,
            });
        }

        dst.reserve(LENGTH_PREFIX + data.len());
        dst.put_slice(&(data.len() as u32).to_ne_bytes());
        dst.put_slice(&data);
        Ok(())
    }
}

fn parse_frame(data: &[u8]) -> Inbound {
    let value: Value = match serde_json::from_slice(data) {
        Ok(value) => value,
        Err(e) => {
            return Inbound::Malformed {
                id: None,
                reason: format!("invalid JSON: {e}"),
            }
        }
    };

    let id = value
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string);

    match serde_json::from_value::<Envelope>(value) {
        Ok(envelope) => Inbound::Envelope(envelope),
        Err(e) => Inbound::Malformed {
            id,
            reason: format!("invalid envelope: {e}"),
        },
    }
}
