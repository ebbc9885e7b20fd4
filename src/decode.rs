//! Decoding of wire frames.
//!
//! Two grammars are supported. [`parse`] accepts anything a server may send back: every reply
//! kind, at any depth. [`parse_request`] accepts only what a client may send to a server: one
//! array of non-null bulk strings.

use bytes::{Buf, Bytes};
use std::io::Cursor;

use crate::error::ProtocolError;
use crate::framing::{self, Sigil};
use crate::reply::Reply;

// Upper bound on the capacity reserved up front for an array, whatever count it declares.
const MAX_PREALLOCATED_ITEMS: usize = 1024;

/// Arrays nested deeper than this are rejected instead of recursing further.
pub const MAX_DEPTH: usize = 512;

/// Parses one reply starting at the cursor position.
///
/// Returns [`ProtocolError::Incomplete`] when the buffer ends before the frame does. A failure
/// while parsing an array element is stored in the array as a [`Reply::Error`] and parsing goes
/// on with the next element.
pub fn parse(src: &mut Cursor<&[u8]>) -> Result<Reply, ProtocolError> {
    parse_nested(src, 0)
}

fn parse_nested(src: &mut Cursor<&[u8]>, depth: usize) -> Result<Reply, ProtocolError> {
    match framing::get_sigil(src)? {
        Sigil::Status => Ok(Reply::Status(framing::get_text(src)?)),
        Sigil::Error => Ok(Reply::Error(framing::get_text(src)?)),
        Sigil::Integer => Ok(Reply::Integer(framing::get_integer(src)?)),
        // $<length>\r\n<data>\r\n
        Sigil::Bulk => match framing::get_length(src)? {
            None => Ok(Reply::NullBulk),
            Some(len) => {
                let data = framing::get_payload(src, len)?;
                Ok(Reply::Bulk(Bytes::copy_from_slice(data)))
            }
        },
        // *<number-of-elements>\r\n<element-1>...<element-n>
        Sigil::Array => match framing::get_length(src)? {
            None => Ok(Reply::NullArray),
            Some(_) if depth == MAX_DEPTH => Err(ProtocolError::NestingTooDeep(MAX_DEPTH)),
            Some(count) => {
                let mut items = Vec::with_capacity(count.min(MAX_PREALLOCATED_ITEMS));
                for _ in 0..count {
                    match parse_nested(src, depth + 1) {
                        Ok(item) => items.push(item),
                        Err(ProtocolError::Incomplete) => return Err(ProtocolError::Incomplete),
                        Err(err) => items.push(Reply::Error(err.to_string())),
                    }
                }
                Ok(Reply::Array(items))
            }
        },
    }
}

/// Parses one request: an array whose elements are all non-null bulk strings.
pub fn parse_request(src: &mut Cursor<&[u8]>) -> Result<Vec<Bytes>, ProtocolError> {
    expect_sigil(src, Sigil::Array)?;
    let count = framing::get_length(src)?.ok_or(ProtocolError::NullInRequest("array"))?;

    let mut args = Vec::with_capacity(count.min(MAX_PREALLOCATED_ITEMS));
    for _ in 0..count {
        expect_sigil(src, Sigil::Bulk)?;
        let len = framing::get_length(src)?.ok_or(ProtocolError::NullInRequest("bulk string"))?;
        let data = framing::get_payload(src, len)?;
        args.push(Bytes::copy_from_slice(data));
    }

    Ok(args)
}

/// Decodes the next reply of a finished buffer.
///
/// Returns `Ok(None)` when the cursor is at the end of the buffer, which is the only place a
/// stream may cleanly end. Running out of data anywhere else is [`ProtocolError::Truncated`].
pub fn decode(src: &mut Cursor<&[u8]>) -> Result<Option<Reply>, ProtocolError> {
    if !src.has_remaining() {
        return Ok(None);
    }
    parse(src).map(Some).map_err(truncated)
}

/// Decodes a buffer holding exactly one request. Bytes left over after the declared number of
/// elements are an error.
pub fn decode_request(data: &[u8]) -> Result<Vec<Bytes>, ProtocolError> {
    let mut src = Cursor::new(data);
    let args = parse_request(&mut src).map_err(truncated)?;

    match src.remaining() {
        0 => Ok(args),
        n => Err(ProtocolError::TrailingBytes(n)),
    }
}

fn expect_sigil(src: &mut Cursor<&[u8]>, expected: Sigil) -> Result<(), ProtocolError> {
    let actual = framing::get_sigil(src)?;
    if actual != expected {
        return Err(ProtocolError::UnexpectedFrame {
            expected: expected.name(),
            actual: actual.name(),
        });
    }
    Ok(())
}

/// How much of a partially buffered frame is known to be complete. Each call to
/// [`Progress::complete`] resumes where the previous one stopped, so a frame that arrives in
/// many chunks is scanned once overall and nothing is copied until it is whole.
#[derive(Clone, Debug, Default)]
pub(crate) struct Progress {
    // Offset just past the last element scanned in full.
    offset: usize,
    // Elements still expected by each open array, innermost last.
    pending: Vec<usize>,
}

impl Progress {
    /// Returns true once `buf` holds a whole frame, or a fault that parsing will report.
    pub(crate) fn complete(&mut self, buf: &[u8]) -> bool {
        let mut src = Cursor::new(buf);
        src.set_position(self.offset as u64);

        loop {
            match skip_header(&mut src) {
                Err(ProtocolError::Incomplete) => return false,
                Err(_) => return true,
                Ok(Some(_)) if self.pending.len() == MAX_DEPTH => return true,
                Ok(Some(count)) if count > 0 => {
                    self.offset = src.position() as usize;
                    self.pending.push(count);
                    continue;
                }
                Ok(_) => self.offset = src.position() as usize,
            }

            // An element ended: close every array it completes.
            loop {
                match self.pending.last_mut() {
                    None => return true,
                    Some(1) => {
                        self.pending.pop();
                    }
                    Some(remaining) => {
                        *remaining -= 1;
                        break;
                    }
                }
            }
        }
    }

    pub(crate) fn reset(&mut self) {
        self.offset = 0;
        self.pending.clear();
    }
}

// Moves past one element without copying it. Returns the count of a non-null array, whose
// elements come next; any other element is skipped whole.
fn skip_header(src: &mut Cursor<&[u8]>) -> Result<Option<usize>, ProtocolError> {
    match framing::get_sigil(src)? {
        Sigil::Status | Sigil::Error | Sigil::Integer => {
            framing::get_line(src)?;
            Ok(None)
        }
        Sigil::Bulk => {
            if let Some(len) = framing::get_length(src)? {
                framing::get_payload(src, len)?;
            }
            Ok(None)
        }
        Sigil::Array => framing::get_length(src),
    }
}

fn truncated(err: ProtocolError) -> ProtocolError {
    match err {
        ProtocolError::Incomplete => ProtocolError::Truncated,
        err => err,
    }
}
