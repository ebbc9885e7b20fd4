use std::io;

use thiserror::Error as ThisError;

/// Framing faults detected while decoding the wire format.
#[derive(Clone, Debug, ThisError, PartialEq, Eq)]
pub enum ProtocolError {
    /// Not a failure by itself: the buffer ends before the frame does. Stream readers wait for
    /// more data; readers over a finished buffer turn it into [`ProtocolError::Truncated`].
    #[error("not enough data is available to parse an entire frame")]
    Incomplete,
    #[error("stream ended in the middle of a frame")]
    Truncated,
    #[error("unrecognized indicator '{}'", escape(.0))]
    UnrecognizedIndicator(u8),
    #[error("invalid integer {0:?}")]
    InvalidInteger(String),
    #[error("invalid length {0}")]
    InvalidLength(i64),
    #[error("invalid terminator, expected CRLF")]
    InvalidTerminator,
    #[error("invalid UTF-8 in line")]
    InvalidUtf8,
    #[error("expected {expected}, got {actual}")]
    UnexpectedFrame {
        expected: &'static str,
        actual: &'static str,
    },
    #[error("null {0} is not allowed in a request")]
    NullInRequest(&'static str),
    #[error("{0} trailing bytes after request")]
    TrailingBytes(usize),
    #[error("arrays nested deeper than {0} levels")]
    NestingTooDeep(usize),
    #[error("frame size exceeds limit of {0} bytes")]
    FrameTooLarge(usize),
}

fn escape(byte: &u8) -> std::ascii::EscapeDefault {
    std::ascii::escape_default(*byte)
}

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("protocol error; {0}")]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("connection closed by peer")]
    Disconnected,
    #[error("client handle is closed")]
    Closed,
    #[error("a command needs at least one argument")]
    EmptyCommand,
}

impl Error {
    /// Returns true when the failure is a framing fault rather than a transport or usage one.
    pub fn is_protocol(&self) -> bool {
        matches!(self, Error::Protocol(_))
    }
}
