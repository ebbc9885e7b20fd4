use bytes::{Bytes, BytesMut};

use crate::encode;
use crate::Error;

/// One argument of a command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Arg {
    /// Sent as a bulk string.
    Str(Bytes),
    /// Sent as an integer line.
    Int(i64),
    /// Sent as a null bulk string.
    Null,
    /// Sent as an error line.
    Error(String),
}

impl From<&str> for Arg {
    fn from(s: &str) -> Self {
        Arg::Str(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for Arg {
    fn from(s: String) -> Self {
        Arg::Str(Bytes::from(s))
    }
}

impl From<&[u8]> for Arg {
    fn from(bytes: &[u8]) -> Self {
        Arg::Str(Bytes::copy_from_slice(bytes))
    }
}

impl From<Vec<u8>> for Arg {
    fn from(bytes: Vec<u8>) -> Self {
        Arg::Str(Bytes::from(bytes))
    }
}

impl From<Bytes> for Arg {
    fn from(bytes: Bytes) -> Self {
        Arg::Str(bytes)
    }
}

impl From<i64> for Arg {
    fn from(n: i64) -> Self {
        Arg::Int(n)
    }
}

impl<T: Into<Arg>> From<Option<T>> for Arg {
    fn from(value: Option<T>) -> Self {
        value.map_or(Arg::Null, Into::into)
    }
}

/// A request to be sent to a server: the verb followed by its arguments.
///
/// ```
/// use respwire::Command;
///
/// let cmd = Command::new("SET").arg("lorem").arg("ipsum");
/// assert_eq!(&cmd.to_bytes()[..], b"*3\r\n$3\r\nSET\r\n$5\r\nlorem\r\n$5\r\nipsum\r\n");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    args: Vec<Arg>,
}

impl Command {
    pub fn new(verb: impl Into<Arg>) -> Command {
        Command {
            args: vec![verb.into()],
        }
    }

    pub fn arg(mut self, arg: impl Into<Arg>) -> Command {
        self.args.push(arg.into());
        self
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    pub fn encode(&self, dst: &mut BytesMut) {
        encode::encode_command(dst, &self.args);
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut dst = BytesMut::new();
        self.encode(&mut dst);
        dst.freeze()
    }
}

impl TryFrom<Vec<Arg>> for Command {
    type Error = Error;

    fn try_from(args: Vec<Arg>) -> Result<Self, Self::Error> {
        if args.is_empty() {
            return Err(Error::EmptyCommand);
        }
        Ok(Command { args })
    }
}
