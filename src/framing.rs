// https://redis.io/docs/reference/protocol-spec

use bytes::Buf;
use std::io::Cursor;
use strum_macros::IntoStaticStr;

use crate::error::ProtocolError;

pub(crate) static CRLF: &[u8; 2] = b"\r\n";

/// The leading byte of every frame, identifying its type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoStaticStr)]
pub enum Sigil {
    #[strum(serialize = "status")]
    Status, // '+'
    #[strum(serialize = "error")]
    Error, // '-'
    #[strum(serialize = "integer")]
    Integer, // ':'
    #[strum(serialize = "bulk string")]
    Bulk, // '$'
    #[strum(serialize = "array")]
    Array, // '*'
}

impl Sigil {
    pub fn name(self) -> &'static str {
        self.into()
    }
}

impl TryFrom<u8> for Sigil {
    type Error = ProtocolError;

    fn try_from(byte: u8) -> Result<Self, ProtocolError> {
        match byte {
            b'+' => Ok(Sigil::Status),
            b'-' => Ok(Sigil::Error),
            b':' => Ok(Sigil::Integer),
            b'$' => Ok(Sigil::Bulk),
            b'*' => Ok(Sigil::Array),
            _ => Err(ProtocolError::UnrecognizedIndicator(byte)),
        }
    }
}

impl From<Sigil> for u8 {
    fn from(value: Sigil) -> Self {
        match value {
            Sigil::Status => b'+',
            Sigil::Error => b'-',
            Sigil::Integer => b':',
            Sigil::Bulk => b'$',
            Sigil::Array => b'*',
        }
    }
}

pub(crate) fn get_byte(src: &mut Cursor<&[u8]>) -> Result<u8, ProtocolError> {
    if !src.has_remaining() {
        return Err(ProtocolError::Incomplete);
    }
    Ok(src.get_u8())
}

pub(crate) fn get_sigil(src: &mut Cursor<&[u8]>) -> Result<Sigil, ProtocolError> {
    Sigil::try_from(get_byte(src)?)
}

/// Returns the bytes up to the next CRLF and moves the cursor past it. A CR that is not
/// immediately followed by LF is part of the line.
pub(crate) fn get_line<'a>(src: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], ProtocolError> {
    let buf: &'a [u8] = *src.get_ref();
    let start = src.position() as usize;

    let end = buf[start..]
        .windows(2)
        .position(|window| window == CRLF)
        .map(|index| start + index)
        .ok_or(ProtocolError::Incomplete)?;

    src.set_position((end + CRLF.len()) as u64);

    Ok(&buf[start..end])
}

pub(crate) fn get_text(src: &mut Cursor<&[u8]>) -> Result<String, ProtocolError> {
    let line = get_line(src)?;
    String::from_utf8(line.to_vec()).map_err(|_| ProtocolError::InvalidUtf8)
}

pub(crate) fn get_integer(src: &mut Cursor<&[u8]>) -> Result<i64, ProtocolError> {
    parse_integer(get_line(src)?)
}

/// Reads a bulk length or array count. `-1` is the null sentinel and yields `None`.
pub(crate) fn get_length(src: &mut Cursor<&[u8]>) -> Result<Option<usize>, ProtocolError> {
    match get_integer(src)? {
        -1 => Ok(None),
        n => usize::try_from(n)
            .map(Some)
            .map_err(|_| ProtocolError::InvalidLength(n)),
    }
}

/// Reads exactly `len` raw bytes followed by CRLF. The payload is never inspected.
pub(crate) fn get_payload<'a>(
    src: &mut Cursor<&'a [u8]>,
    len: usize,
) -> Result<&'a [u8], ProtocolError> {
    let buf: &'a [u8] = *src.get_ref();
    let start = src.position() as usize;
    let remaining = buf.len() - start;

    if remaining < len || remaining - len < CRLF.len() {
        return Err(ProtocolError::Incomplete);
    }

    let end = start + len;
    if &buf[end..end + CRLF.len()] != CRLF {
        return Err(ProtocolError::InvalidTerminator);
    }

    src.set_position((end + CRLF.len()) as u64);

    Ok(&buf[start..end])
}

/// Parses ASCII decimal text: an optional single leading `-` followed by at least one digit.
fn parse_integer(line: &[u8]) -> Result<i64, ProtocolError> {
    let invalid = || ProtocolError::InvalidInteger(String::from_utf8_lossy(line).into_owned());

    let (negative, digits) = match line.split_first() {
        Some((b'-', rest)) => (true, rest),
        _ => (false, line),
    };

    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(invalid());
    }

    // Accumulate towards the sign so that i64::MIN is representable.
    digits.iter().try_fold(0i64, |acc, digit| {
        let digit = i64::from(digit - b'0');
        acc.checked_mul(10)
            .and_then(|acc| {
                if negative {
                    acc.checked_sub(digit)
                } else {
                    acc.checked_add(digit)
                }
            })
            .ok_or_else(invalid)
    })
}
