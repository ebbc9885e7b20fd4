use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use itertools::Itertools;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::time;
use tokio_util::codec::Framed;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::codec::RequestCodec;
use crate::handler::{normalize_verb, BoxError, Handlers, ReplyWriter};
use crate::Error;

const ACCEPT_INITIAL_DELAY: Duration = Duration::from_millis(10);
const ACCEPT_MAX_DELAY: Duration = Duration::from_secs(1);

/// A source of connected streams.
pub trait Listener: Send {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Waits for the next connection and returns it with a printable peer address.
    fn next_conn(&mut self) -> impl Future<Output = io::Result<(Self::Stream, String)>> + Send;
}

impl Listener for TcpListener {
    type Stream = tokio::net::TcpStream;

    fn next_conn(&mut self) -> impl Future<Output = io::Result<(Self::Stream, String)>> + Send {
        async move {
            let (stream, addr) = self.accept().await?;
            Ok((stream, addr.to_string()))
        }
    }
}

#[cfg(unix)]
impl Listener for tokio::net::UnixListener {
    type Stream = tokio::net::UnixStream;

    fn next_conn(&mut self) -> impl Future<Output = io::Result<(Self::Stream, String)>> + Send {
        async move {
            let (stream, addr) = self.accept().await?;
            Ok((stream, format!("{:?}", addr)))
        }
    }
}

/// A generic server that routes each request to the handler registered for its verb.
///
/// ```no_run
/// use bytes::Bytes;
/// use respwire::{ReplyWriter, Server};
/// use tokio::net::TcpListener;
///
/// # async fn run() -> Result<(), respwire::Error> {
/// let mut server = Server::new();
/// server.handle("PING", |_args: &[Bytes], out: &mut ReplyWriter| {
///     out.status("PONG");
///     Ok(())
/// });
///
/// let listener = TcpListener::bind("127.0.0.1:6379").await?;
/// server.listen(listener).await
/// # }
/// ```
#[derive(Debug, Default)]
pub struct Server {
    handlers: Handlers,
    max_frame_size: Option<usize>,
}

impl Server {
    pub fn new() -> Server {
        Server::default()
    }

    /// Registers `handler` for `verb`, case-insensitively. Registering the same verb again
    /// replaces the previous handler.
    pub fn handle<F>(&mut self, verb: &str, handler: F) -> &mut Server
    where
        F: Fn(&[Bytes], &mut ReplyWriter) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.handlers.insert(verb, handler);
        self
    }

    /// Overrides the frame size limit otherwise taken from `MAX_FRAME_SIZE`.
    pub fn max_frame_size(&mut self, max_frame_size: usize) -> &mut Server {
        self.max_frame_size = Some(max_frame_size);
        self
    }

    /// Accepts connections forever, serving each one on its own task. A failed accept is logged
    /// and retried after a delay that doubles on each consecutive failure, up to one second.
    pub async fn listen<L: Listener>(self, mut listener: L) -> Result<(), Error> {
        let handlers = Arc::new(self.handlers);
        let codec = match self.max_frame_size {
            Some(max_frame_size) => RequestCodec::with_max_frame_size(max_frame_size),
            None => RequestCodec::new(),
        };

        info!(verbs = ?handlers, "server listening");

        let mut delay = ACCEPT_INITIAL_DELAY;
        loop {
            let (stream, client_address) = match listener.next_conn().await {
                Ok(conn) => {
                    delay = ACCEPT_INITIAL_DELAY;
                    conn
                }
                Err(e) => {
                    error!(error = %e, ?delay, "accept failed");
                    time::sleep(delay).await;
                    delay = (delay * 2).min(ACCEPT_MAX_DELAY);
                    continue;
                }
            };
            let handlers = handlers.clone();
            let codec = codec.clone();
            info!("Accepted connection from {}", client_address);

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, client_address, handlers, codec).await {
                    error!(error = %e, "connection failed");
                }
            });
        }
    }
}

#[instrument(
    name = "connection",
    skip(stream, handlers, codec),
    fields(connection_id, client_address)
)]
async fn handle_connection<S>(
    stream: S,
    client_address: String,
    handlers: Arc<Handlers>,
    codec: RequestCodec,
) -> Result<(), Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    tracing::Span::current()
        .record("connection_id", Uuid::new_v4().to_string())
        .record("client_address", client_address.as_str());

    let mut framed = Framed::new(stream, codec);

    while let Some(request) = framed.next().await.transpose()? {
        debug!(
            "Received request: {}",
            request.iter().map(|arg| String::from_utf8_lossy(arg)).join(" ")
        );

        let out = dispatch(&handlers, &request);
        if !out.is_empty() {
            framed.send(out.into_bytes()).await?;
        }
    }

    info!("Connection closed");
    Ok(())
}

fn dispatch(handlers: &Handlers, request: &[Bytes]) -> ReplyWriter {
    let mut out = ReplyWriter::new();

    let Some((verb, args)) = request.split_first() else {
        out.error("ERR empty command");
        return out;
    };

    let verb = normalize_verb(verb);
    match handlers.get(&verb) {
        Some(handler) => {
            if let Err(e) = handler.call(args, &mut out) {
                warn!(%verb, error = %e, "handler failed");
                // The client is waiting for a reply.
                if out.is_empty() {
                    out.error(format_args!("ERR {}", e));
                }
            }
        }
        None => out.error(format_args!("ERR unrecognized command '{}'", verb)),
    }

    out
}
