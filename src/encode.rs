//! Serialization of values into wire frames. Every function appends one complete frame to `dst`.

use bytes::{BufMut, BytesMut};

use crate::command::Arg;
use crate::framing::{Sigil, CRLF};

/// `$<len>\r\n<bytes>\r\n`. The payload is copied verbatim, CR and LF included.
pub fn encode_bulk(dst: &mut BytesMut, bytes: &[u8]) {
    let length = bytes.len().to_string();
    dst.reserve(1 + length.len() + CRLF.len() + bytes.len() + CRLF.len());
    dst.put_u8(u8::from(Sigil::Bulk));
    dst.put_slice(length.as_bytes());
    dst.put_slice(CRLF);
    dst.put_slice(bytes);
    dst.put_slice(CRLF);
}

pub fn encode_integer(dst: &mut BytesMut, n: i64) {
    put_line(dst, Sigil::Integer, n.to_string().as_bytes());
}

/// `+<status>\r\n`. The status must not contain CR or LF; it is not sanitized.
pub fn encode_status(dst: &mut BytesMut, status: &str) {
    put_line(dst, Sigil::Status, status.as_bytes());
}

pub fn encode_error(dst: &mut BytesMut, msg: &str) {
    put_line(dst, Sigil::Error, msg.as_bytes());
}

pub fn encode_null_bulk(dst: &mut BytesMut) {
    put_line(dst, Sigil::Bulk, b"-1");
}

pub fn encode_null_array(dst: &mut BytesMut) {
    put_line(dst, Sigil::Array, b"-1");
}

/// `*<len>\r\n`, to be followed by `len` frames.
pub fn encode_array_header(dst: &mut BytesMut, len: usize) {
    put_line(dst, Sigil::Array, len.to_string().as_bytes());
}

/// An array holding one frame per argument.
pub fn encode_command(dst: &mut BytesMut, args: &[Arg]) {
    encode_array_header(dst, args.len());
    for arg in args {
        match arg {
            Arg::Str(bytes) => encode_bulk(dst, bytes),
            Arg::Int(n) => encode_integer(dst, *n),
            Arg::Null => encode_null_bulk(dst),
            Arg::Error(msg) => encode_error(dst, msg),
        }
    }
}

fn put_line(dst: &mut BytesMut, sigil: Sigil, line: &[u8]) {
    dst.reserve(1 + line.len() + CRLF.len());
    dst.put_u8(u8::from(sigil));
    dst.put_slice(line);
    dst.put_slice(CRLF);
}
