use std::fmt;

use bytes::{Bytes, BytesMut};

use crate::encode;

/// A single value of the wire protocol, as sent by a server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    Status(String),
    /// The full line content, error code included (e.g. `ERR unknown key`).
    Error(String),
    Integer(i64),
    Bulk(Bytes),
    NullBulk,
    Array(Vec<Reply>),
    NullArray,
}

impl Reply {
    pub fn is_null(&self) -> bool {
        matches!(self, Reply::NullBulk | Reply::NullArray)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }

    /// The payload of a status or bulk reply.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Reply::Status(s) => Some(s.as_bytes()),
            Reply::Bulk(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Reply::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// The leading error code of an error reply, when it starts with an upper-case word such as
    /// `ERR` or `WRONGTYPE`.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Reply::Error(line) => split_error(line).0,
            _ => None,
        }
    }

    /// The message of an error reply, without its error code.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Reply::Error(line) => Some(split_error(line).1),
            _ => None,
        }
    }

    /// Appends the wire form of this reply to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        match self {
            Reply::Status(s) => encode::encode_status(dst, s),
            Reply::Error(msg) => encode::encode_error(dst, msg),
            Reply::Integer(i) => encode::encode_integer(dst, *i),
            Reply::Bulk(bytes) => encode::encode_bulk(dst, bytes),
            Reply::NullBulk => encode::encode_null_bulk(dst),
            Reply::Array(items) => {
                encode::encode_array_header(dst, items.len());
                for item in items {
                    item.encode(dst);
                }
            }
            Reply::NullArray => encode::encode_null_array(dst),
        }
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut dst = BytesMut::new();
        self.encode(&mut dst);
        dst.freeze()
    }
}

fn split_error(line: &str) -> (Option<&str>, &str) {
    match line.split_once(' ') {
        Some((code, message))
            if !code.is_empty() && code.bytes().all(|b| b.is_ascii_uppercase()) =>
        {
            (Some(code), message)
        }
        _ => (None, line),
    }
}

impl From<Reply> for Vec<u8> {
    fn from(reply: Reply) -> Self {
        reply.to_bytes().to_vec()
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Status(s) => write!(f, "{}", s),
            Reply::Error(s) => write!(f, "(error) {}", s),
            Reply::Integer(i) => write!(f, "(integer) {}", i),
            Reply::Bulk(bytes) => write!(f, "{:?}", String::from_utf8_lossy(bytes)),
            Reply::NullBulk | Reply::NullArray => write!(f, "(nil)"),
            Reply::Array(items) if items.is_empty() => write!(f, "(empty array)"),
            Reply::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}) {}", i + 1, item)?;
                }
                Ok(())
            }
        }
    }
}
