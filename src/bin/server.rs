use bytes::Bytes;
use clap::Parser;
use respwire::{Error, ReplyWriter, Server};
use tokio::net::TcpListener;
use tracing::{debug, info};

const PORT: u16 = 6379;

#[derive(Parser, Debug)]
struct Args {
    /// The address to bind to
    #[arg(short, long, env = "BIND", default_value = "127.0.0.1")]
    bind: String,

    /// The port to listen on
    #[arg(short, long, env = "PORT", default_value_t = PORT)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let _ = tracing_subscriber::fmt()
        .try_init()
        .map_err(|e| debug!("Failed to initialize global tracing: {}", e));

    let cli = Args::parse();

    let mut server = Server::new();
    server
        .handle("PING", |args: &[Bytes], out: &mut ReplyWriter| {
            match args {
                [] => out.status("PONG"),
                [msg] => out.bulk(msg),
                _ => out.error("ERR wrong number of arguments for 'PING' command"),
            }
            Ok(())
        })
        .handle("ECHO", |args: &[Bytes], out: &mut ReplyWriter| {
            match args {
                [msg] => out.bulk(msg),
                _ => out.error("ERR wrong number of arguments for 'ECHO' command"),
            }
            Ok(())
        });

    let listener = TcpListener::bind((cli.bind.as_str(), cli.port)).await?;
    info!("Server listening on {}", listener.local_addr()?);

    server.listen(listener).await
}
