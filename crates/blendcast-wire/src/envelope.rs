//! Message envelope for datagram transports
//!
//! Layout (little endian):
//! - Bytes 0-1: Magic `BC`
//! - Byte 2: Envelope version
//! - Byte 3: Channel name length (N)
//! - Bytes 4..4+N: Channel name (UTF-8)
//! - 8 bytes: Per-channel sequence number
//! - 4 bytes: Body length (M)
//! - M bytes: Body (record text, UTF-8)

use bytes::{Buf, BufMut, Bytes, BytesMut};

use blendcast_core::{BlendcastError, BlendcastResult, ChannelId};

pub const ENVELOPE_MAGIC: [u8; 2] = *b"BC";

/// Current envelope version
pub const ENVELOPE_VERSION: u8 = 1;

/// Magic + version + channel length byte
const PREFIX_SIZE: usize = 4;

/// Sequence + body length
const TRAILER_SIZE: usize = 12;

/// Smallest possible envelope (empty channel and body)
pub const MIN_ENVELOPE_SIZE: usize = PREFIX_SIZE + TRAILER_SIZE;

/// Largest envelope that fits one UDP datagram
pub const MAX_ENVELOPE_SIZE: usize = 65_507;

/// A text message addressed to a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEnvelope {
    pub channel: ChannelId,
    pub sequence: u64,
    pub body: String,
}

impl MessageEnvelope {
    pub fn new(channel: ChannelId, sequence: u64, body: impl Into<String>) -> Self {
        Self {
            channel,
            sequence,
            body: body.into(),
        }
    }

    pub fn encoded_len(&self) -> usize {
        MIN_ENVELOPE_SIZE + self.channel.len() + self.body.len()
    }

    pub fn encode(&self) -> BlendcastResult<Bytes> {
        if self.channel.len() > u8::MAX as usize {
            return Err(BlendcastError::ChannelTooLong(self.channel.len()));
        }
        let len = self.encoded_len();
        if len > MAX_ENVELOPE_SIZE {
            return Err(BlendcastError::Transport(format!(
                "envelope of {} bytes exceeds datagram limit",
                len
            )));
        }

        let mut buf = BytesMut::with_capacity(len);
        buf.put_slice(&ENVELOPE_MAGIC);
        buf.put_u8(ENVELOPE_VERSION);
        buf.put_u8(self.channel.len() as u8);
        buf.put_slice(self.channel.as_str().as_bytes());
        buf.put_u64_le(self.sequence);
        buf.put_u32_le(self.body.len() as u32);
        buf.put_slice(self.body.as_bytes());
        Ok(buf.freeze())
    }

    pub fn decode(mut buf: &[u8]) -> BlendcastResult<Self> {
        let total = buf.len();
        if total < MIN_ENVELOPE_SIZE {
            return Err(BlendcastError::BufferTooShort {
                expected: MIN_ENVELOPE_SIZE,
                actual: total,
            });
        }

        let mut magic = [0u8; 2];
        buf.copy_to_slice(&mut magic);
        if magic != ENVELOPE_MAGIC {
            return Err(BlendcastError::BadMagic);
        }

        let version = buf.get_u8();
        if version != ENVELOPE_VERSION {
            return Err(BlendcastError::UnsupportedVersion(version));
        }

        let channel_len = buf.get_u8() as usize;
        let expected = MIN_ENVELOPE_SIZE + channel_len;
        if total < expected {
            return Err(BlendcastError::BufferTooShort {
                expected,
                actual: total,
            });
        }
        let channel = std::str::from_utf8(&buf[..channel_len])
            .map_err(|_| BlendcastError::InvalidUtf8("channel"))?;
        let channel = ChannelId::from(channel);
        buf.advance(channel_len);

        let sequence = buf.get_u64_le();
        let body_len = buf.get_u32_le() as usize;
        if buf.remaining() < body_len {
            return Err(BlendcastError::BufferTooShort {
                expected: expected + body_len,
                actual: total,
            });
        }
        let body = std::str::from_utf8(&buf[..body_len])
            .map_err(|_| BlendcastError::InvalidUtf8("body"))?
            .to_string();

        Ok(MessageEnvelope {
            channel,
            sequence,
            body,
        })
    }
}
