//! MessagePack framing over a byte stream.
//!
//! MessagePack values are self-delimiting, so frames are simply consecutive
//! values with no length prefix. The decoder retries on every read until a
//! complete value is buffered, so the frame cap stays small.

use std::io::{self, Cursor};

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use pluginserver_core::AppError;

/// Largest frame the decoder will buffer.
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

/// The one marker byte MessagePack never assigns.
const RESERVED_MARKER: u8 = 0xc1;

/// Errors raised while framing MessagePack values.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The underlying stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The buffered bytes are not a valid MessagePack value.
    #[error("MessagePack decoding error: {0}")]
    Decode(String),

    /// The value could not be written.
    #[error("MessagePack encoding error: {0}")]
    Encode(String),

    /// A frame grew past [`MAX_FRAME_SIZE`] without completing.
    #[error("Frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },
}

impl From<CodecError> for AppError {
    fn from(err: CodecError) -> Self {
        AppError::encoding(err.to_string())
    }
}

/// Codec turning a byte stream into [`rmpv::Value`] frames and back.
#[derive(Debug, Clone, Copy)]
pub struct MsgpackCodec {
    /// Largest accepted frame.
    max_frame_size: usize,
}

impl MsgpackCodec {
    /// Creates a codec with the default frame limit.
    pub fn new() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
        }
    }

    /// Creates a codec with a custom frame limit.
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }
}

impl Default for MsgpackCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for MsgpackCodec {
    type Item = rmpv::Value;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        // rmpv reads the reserved marker as nil.
        if src[0] == RESERVED_MARKER {
            return Err(CodecError::Decode(format!(
                "reserved marker 0x{RESERVED_MARKER:x} at start of frame"
            )));
        }

        let mut cursor = Cursor::new(&src[..]);
        match rmpv::decode::read_value(&mut cursor) {
            Ok(value) => {
                let consumed = cursor.position() as usize;
                src.advance(consumed);
                Ok(Some(value))
            }
            Err(e) if is_incomplete(&e) => {
                if src.len() > self.max_frame_size {
                    return Err(CodecError::FrameTooLarge {
                        size: src.len(),
                        max: self.max_frame_size,
                    });
                }
                src.reserve(1024);
                Ok(None)
            }
            Err(e) => Err(CodecError::Decode(e.to_string())),
        }
    }
}

impl Encoder<rmpv::Value> for MsgpackCodec {
    type Error = CodecError;

    fn encode(&mut self, item: rmpv::Value, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let mut writer = dst.writer();
        rmpv::encode::write_value(&mut writer, &item).map_err(|e| CodecError::Encode(e.to_string()))
    }
}

/// Whether a decode error only means more bytes are needed.
fn is_incomplete(err: &rmpv::decode::Error) -> bool {
    match err {
        rmpv::decode::Error::InvalidMarkerRead(io) | rmpv::decode::Error::InvalidDataRead(io) => {
            io.kind() == io::ErrorKind::UnexpectedEof
        }
        _ => false,
    }
}
