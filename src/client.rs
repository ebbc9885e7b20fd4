use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_util::codec::Framed;
use tracing::debug;

use crate::codec::ReplyCodec;
use crate::command::Command;
use crate::reply::Reply;
use crate::Error;

/// A handle over a connected stream that sends commands and reads replies.
///
/// Each [`Client::send`] writes one command and waits for exactly one reply. Nothing is retried
/// and nothing is pipelined.
pub struct Client<S> {
    framed: Option<Framed<S, ReplyCodec>>,
}

impl Client<TcpStream> {
    /// Connects to a server over TCP.
    pub async fn dial(addr: impl ToSocketAddrs) -> Result<Client<TcpStream>, Error> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Client::connect(stream))
    }
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn connect(stream: S) -> Client<S> {
        Client::with_codec(stream, ReplyCodec::new())
    }

    pub fn with_codec(stream: S, codec: ReplyCodec) -> Client<S> {
        Client {
            framed: Some(Framed::new(stream, codec)),
        }
    }

    /// Sends `cmd` and returns the reply. An error reply is returned as `Ok(Reply::Error(_))`.
    ///
    /// A transport or protocol failure closes the handle: the stream position is unknown
    /// afterwards, and later calls fail with [`Error::Closed`].
    pub async fn send(&mut self, cmd: Command) -> Result<Reply, Error> {
        let framed = self.framed.as_mut().ok_or(Error::Closed)?;

        debug!(?cmd, "sending command");
        let result = match framed.send(cmd).await {
            Ok(()) => framed.next().await.transpose(),
            Err(e) => Err(e),
        };

        match self.check(result)? {
            Some(reply) => Ok(reply),
            None => {
                self.framed = None;
                Err(Error::Disconnected)
            }
        }
    }

    /// Reads one reply without sending anything first, as needed for `MONITOR` or `SUBSCRIBE`
    /// streams. Returns `Ok(None)` once the server has closed the stream.
    pub async fn read_one(&mut self) -> Result<Option<Reply>, Error> {
        let framed = self.framed.as_mut().ok_or(Error::Closed)?;
        let result = framed.next().await.transpose();
        self.check(result)
    }

    fn check<T>(&mut self, result: Result<T, Error>) -> Result<T, Error> {
        if result.is_err() {
            self.framed = None;
        }
        result
    }

    /// Flushes and shuts down the stream. Later calls fail with [`Error::Closed`].
    pub async fn close(&mut self) -> Result<(), Error> {
        match self.framed.take() {
            Some(mut framed) => SinkExt::<Command>::close(&mut framed).await,
            None => Ok(()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.framed.is_none()
    }
}
