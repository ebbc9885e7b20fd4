use bytes::{Buf, Bytes, BytesMut};
use std::env;
use std::io::Cursor;
use tokio_util::codec::{Decoder, Encoder};

use crate::command::Command;
use crate::decode::{self, Progress};
use crate::error::ProtocolError;
use crate::reply::Reply;
use crate::Error;

const DEFAULT_MAX_FRAME_SIZE: usize = 512 * 1024 * 1024;

/// Limit on the bytes buffered for a single frame, read from `MAX_FRAME_SIZE` when set.
fn max_frame_size() -> usize {
    env::var("MAX_FRAME_SIZE")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_MAX_FRAME_SIZE)
}

/// Client side codec: decodes replies, encodes commands.
#[derive(Clone, Debug)]
pub struct ReplyCodec {
    max_frame_size: usize,
    progress: Progress,
}

impl ReplyCodec {
    pub fn new() -> ReplyCodec {
        ReplyCodec::with_max_frame_size(max_frame_size())
    }

    pub fn with_max_frame_size(max_frame_size: usize) -> ReplyCodec {
        ReplyCodec {
            max_frame_size,
            progress: Progress::default(),
        }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Default for ReplyCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ReplyCodec {
    type Item = Reply;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_frame(src, self.max_frame_size, &mut self.progress, decode::parse)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_frame_eof(src, self.max_frame_size, &mut self.progress, decode::parse)
    }
}

impl Encoder<Command> for ReplyCodec {
    type Error = Error;

    fn encode(&mut self, cmd: Command, dst: &mut BytesMut) -> Result<(), Self::Error> {
        cmd.encode(dst);
        Ok(())
    }
}

/// Server side codec: decodes requests, writes already encoded reply bytes.
#[derive(Clone, Debug)]
pub struct RequestCodec {
    max_frame_size: usize,
    progress: Progress,
}

impl RequestCodec {
    pub fn new() -> RequestCodec {
        RequestCodec::with_max_frame_size(max_frame_size())
    }

    pub fn with_max_frame_size(max_frame_size: usize) -> RequestCodec {
        RequestCodec {
            max_frame_size,
            progress: Progress::default(),
        }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Default for RequestCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for RequestCodec {
    type Item = Vec<Bytes>;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_frame(src, self.max_frame_size, &mut self.progress, decode::parse_request)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_frame_eof(src, self.max_frame_size, &mut self.progress, decode::parse_request)
    }
}

impl Encoder<Bytes> for RequestCodec {
    type Error = Error;

    fn encode(&mut self, bytes: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(&bytes);
        Ok(())
    }
}

type Parser<T> = fn(&mut Cursor<&[u8]>) -> Result<T, ProtocolError>;

fn decode_frame<T>(
    src: &mut BytesMut,
    max_frame_size: usize,
    progress: &mut Progress,
    parse: Parser<T>,
) -> Result<Option<T>, Error> {
    if src.is_empty() {
        return Ok(None);
    }

    // Not enough data to parse a frame.
    if !progress.complete(&src[..]) {
        if src.len() > max_frame_size {
            return Err(ProtocolError::FrameTooLarge(max_frame_size).into());
        }
        return Ok(None);
    }
    progress.reset();

    let mut cursor = Cursor::new(&src[..]);
    let frame = match parse(&mut cursor) {
        Ok(frame) => frame,
        Err(ProtocolError::Incomplete) if src.len() > max_frame_size => {
            return Err(ProtocolError::FrameTooLarge(max_frame_size).into())
        }
        // Elements after an embedded error may still be missing.
        Err(ProtocolError::Incomplete) => return Ok(None),
        Err(err) => return Err(err.into()),
    };

    // The cursor never moves past the end of the buffer.
    let position = cursor.position() as usize;

    // Remove the parsed frame from the buffer.
    src.advance(position);

    Ok(Some(frame))
}

/// Like [`decode_frame`], for a stream that has ended: leftover bytes that do not form a whole
/// frame are a truncated frame, never a clean end.
fn decode_frame_eof<T>(
    src: &mut BytesMut,
    max_frame_size: usize,
    progress: &mut Progress,
    parse: Parser<T>,
) -> Result<Option<T>, Error> {
    match decode_frame(src, max_frame_size, progress, parse)? {
        Some(frame) => Ok(Some(frame)),
        None if src.is_empty() => Ok(None),
        None => Err(ProtocolError::Truncated.into()),
    }
}
