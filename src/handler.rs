use bytes::{Bytes, BytesMut};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::encode;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Code run for one verb. It receives the arguments that follow the verb and writes its reply
/// through `out`.
///
/// Implemented for every `Fn(&[Bytes], &mut ReplyWriter) -> Result<(), BoxError>` closure.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, args: &[Bytes], out: &mut ReplyWriter) -> Result<(), BoxError>;
}

impl<F> Handler for F
where
    F: Fn(&[Bytes], &mut ReplyWriter) -> Result<(), BoxError> + Send + Sync + 'static,
{
    fn call(&self, args: &[Bytes], out: &mut ReplyWriter) -> Result<(), BoxError> {
        self(args, out)
    }
}

/// Collects the bytes a handler sends back. They are written to the connection once the
/// handler returns.
#[derive(Debug, Default)]
pub struct ReplyWriter {
    buffer: BytesMut,
}

impl ReplyWriter {
    pub fn new() -> ReplyWriter {
        ReplyWriter::default()
    }

    /// Writes bytes as is, without any framing.
    pub fn write(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub fn status(&mut self, status: &str) {
        encode::encode_status(&mut self.buffer, &single_line(status));
    }

    /// Writes an error line, e.g. `out.error(format_args!("ERR no such key '{}'", key))`.
    pub fn error(&mut self, msg: impl fmt::Display) {
        let msg = msg.to_string();
        encode::encode_error(&mut self.buffer, &single_line(&msg));
    }

    pub fn bulk(&mut self, bytes: &[u8]) {
        encode::encode_bulk(&mut self.buffer, bytes);
    }

    pub fn null(&mut self) {
        encode::encode_null_bulk(&mut self.buffer);
    }

    pub fn integer(&mut self, n: i64) {
        encode::encode_integer(&mut self.buffer, n);
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.buffer.freeze()
    }
}

// Status and error lines end at the first CRLF, so CR and LF inside them become spaces.
fn single_line(text: &str) -> Cow<'_, str> {
    if text.contains(['\r', '\n']) {
        Cow::Owned(text.replace(['\r', '\n'], " "))
    } else {
        Cow::Borrowed(text)
    }
}

/// Handlers indexed by upper-cased verb.
#[derive(Clone, Default)]
pub struct Handlers {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl Handlers {
    pub fn new() -> Handlers {
        Handlers::default()
    }

    /// Registers `handler` for `verb`, replacing any previous handler for the same verb.
    pub fn insert(&mut self, verb: &str, handler: impl Handler) {
        self.handlers.insert(verb.to_uppercase(), Arc::new(handler));
    }

    /// Looks up the handler for an already normalized verb.
    pub fn get(&self, verb: &str) -> Option<&Arc<dyn Handler>> {
        self.handlers.get(verb)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

/// Case-normalizes a verb as received on the wire.
pub fn normalize_verb(verb: &[u8]) -> String {
    String::from_utf8_lossy(verb).to_uppercase()
}
