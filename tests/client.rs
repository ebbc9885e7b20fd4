use bytes::Bytes;
use rand::RngCore;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, UnboundedSender};

use respwire::{Arg, Client, Command, Error, ProtocolError, Reply};

async fn create_tcp_connection() -> Result<(UnboundedSender<Vec<u8>>, TcpStream), std::io::Error> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let local_addr = listener.local_addr()?;

    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            while let Some(data) = rx.recv().await {
                // Write the received channel data to the socket.
                if socket.write_all(&data).await.is_err() {
                    break;
                }
            }
        }
    });

    // Connect to the server as a client to complete the setup.
    let stream = TcpStream::connect(local_addr).await?;

    Ok((tx, stream))
}

#[tokio::test]
async fn test_read_status() {
    let (tcp_stream_tx, tcp_stream) = create_tcp_connection().await.unwrap();
    let mut client = Client::connect(tcp_stream);

    tcp_stream_tx.send(b"+OK\r\n".to_vec()).unwrap();

    let actual = client.read_one().await.unwrap();
    assert_eq!(actual, Some(Reply::Status("OK".to_string())));
}

#[tokio::test]
async fn test_read_bulk_string() {
    let (tcp_stream_tx, tcp_stream) = create_tcp_connection().await.unwrap();
    let mut client = Client::connect(tcp_stream);

    tcp_stream_tx.send(b"$5\r\nhello\r\n".to_vec()).unwrap();

    let actual = client.read_one().await.unwrap();
    assert_eq!(actual, Some(Reply::Bulk(Bytes::from("hello"))));
}

#[tokio::test]
async fn test_read_nulls_and_empties() {
    let (tcp_stream_tx, tcp_stream) = create_tcp_connection().await.unwrap();
    let mut client = Client::connect(tcp_stream);

    tcp_stream_tx
        .send(b"$-1\r\n$0\r\n\r\n*-1\r\n*0\r\n".to_vec())
        .unwrap();

    assert_eq!(client.read_one().await.unwrap(), Some(Reply::NullBulk));
    assert_eq!(
        client.read_one().await.unwrap(),
        Some(Reply::Bulk(Bytes::new()))
    );
    assert_eq!(client.read_one().await.unwrap(), Some(Reply::NullArray));
    assert_eq!(client.read_one().await.unwrap(), Some(Reply::Array(vec![])));
}

#[tokio::test]
async fn test_read_transaction_reply() {
    let (tcp_stream_tx, tcp_stream) = create_tcp_connection().await.unwrap();
    let mut client = Client::connect(tcp_stream);

    tcp_stream_tx
        .send(b"*3\r\n+OK\r\n-ERR x\r\n*1\r\n*1\r\n$5\r\nlorem\r\n".to_vec())
        .unwrap();

    let actual = client.read_one().await.unwrap();
    let expected = Some(Reply::Array(vec![
        Reply::Status("OK".to_string()),
        Reply::Error("ERR x".to_string()),
        Reply::Array(vec![Reply::Array(vec![Reply::Bulk(Bytes::from("lorem"))])]),
    ]));
    assert_eq!(actual, expected);
}

#[tokio::test]
async fn test_read_multiple_replies_sequentially() {
    let (tcp_stream_tx, tcp_stream) = create_tcp_connection().await.unwrap();
    let mut client = Client::connect(tcp_stream);

    tcp_stream_tx.send(b"+OK\r\n".to_vec()).unwrap();
    tcp_stream_tx.send(b"$5\r\nhello\r\n".to_vec()).unwrap();
    tcp_stream_tx
        .send(b"*2\r\n$7\r\nmykey_1\r\n$9\r\nmyvalue_1\r\n".to_vec())
        .unwrap();
    tcp_stream_tx.send(b"-Error message\r\n".to_vec()).unwrap();
    tcp_stream_tx.send(b":1000\r\n".to_vec()).unwrap();

    // Simple string.
    let actual = client.read_one().await.unwrap();
    assert_eq!(actual, Some(Reply::Status("OK".to_string())));

    // Bulk string.
    let actual = client.read_one().await.unwrap();
    assert_eq!(actual, Some(Reply::Bulk(Bytes::from("hello"))));

    // Array.
    let actual = client.read_one().await.unwrap();
    let expected = Some(Reply::Array(vec![
        Reply::Bulk(Bytes::from("mykey_1")),
        Reply::Bulk(Bytes::from("myvalue_1")),
    ]));
    assert_eq!(actual, expected);

    // Error.
    let actual = client.read_one().await.unwrap();
    assert_eq!(actual, Some(Reply::Error(String::from("Error message"))));

    // Integer.
    let actual = client.read_one().await.unwrap();
    assert_eq!(actual, Some(Reply::Integer(1000)));
}

#[tokio::test]
async fn test_read_incomplete_frame() {
    let (tcp_stream_tx, tcp_stream) = create_tcp_connection().await.unwrap();
    let mut client = Client::connect(tcp_stream);

    // Reply split into three parts to simulate partial data.
    // "*3\r\n$3\r\nSET\r\n$5\r\nmykey\r\n$7\r\nmyvalue\r\n";
    let part1 = b"*3\r\n$3\r\nSE";
    let part2 = b"T\r\n$5\r\nmyke";
    let part3 = b"y\r\n$7\r\nmyvalue\r\n";

    tokio::spawn(async move {
        let parts = vec![part1.to_vec(), part2.to_vec(), part3.to_vec()];
        for part in parts {
            tcp_stream_tx.send(part).unwrap();
            // Simulate a delay in sending/receiving the data.
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        }
    });

    let actual = client.read_one().await.unwrap();
    let expected = Some(Reply::Array(vec![
        Reply::Bulk(Bytes::from("SET")),
        Reply::Bulk(Bytes::from("mykey")),
        Reply::Bulk(Bytes::from("myvalue")),
    ]));
    assert_eq!(actual, expected);
}

#[tokio::test]
async fn test_read_after_clean_close() {
    let (tcp_stream_tx, tcp_stream) = create_tcp_connection().await.unwrap();
    let mut client = Client::connect(tcp_stream);

    tcp_stream_tx.send(b":1\r\n".to_vec()).unwrap();
    drop(tcp_stream_tx);

    assert_eq!(client.read_one().await.unwrap(), Some(Reply::Integer(1)));
    assert_eq!(client.read_one().await.unwrap(), None);
}

#[tokio::test]
async fn test_read_truncated_frame() {
    let (tcp_stream_tx, tcp_stream) = create_tcp_connection().await.unwrap();
    let mut client = Client::connect(tcp_stream);

    tcp_stream_tx.send(b"*2\r\n$5\r\nhello\r\n$5\r\nwor".to_vec()).unwrap();
    drop(tcp_stream_tx);

    let err = client.read_one().await.unwrap_err();
    assert!(matches!(err, Error::Protocol(ProtocolError::Truncated)));
}

#[tokio::test]
async fn test_read_malformed_count() {
    let (tcp_stream_tx, tcp_stream) = create_tcp_connection().await.unwrap();
    let mut client = Client::connect(tcp_stream);

    tcp_stream_tx.send(b"*a\r\n".to_vec()).unwrap();

    let err = client.read_one().await.unwrap_err();
    assert!(matches!(
        err,
        Error::Protocol(ProtocolError::InvalidInteger(_))
    ));

    // Not a clean end of stream: the handle is unusable.
    tcp_stream_tx.send(b"+OK\r\n".to_vec()).unwrap();
    assert!(matches!(client.read_one().await, Err(Error::Closed)));
}

/// Echoes back every command it receives as the reply, so that the round trip goes through the
/// client's encoder and decoder.
async fn echo_server() -> Result<std::net::SocketAddr, std::io::Error> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let local_addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = vec![0; 64 * 1024];
            while let Ok(n) = socket.read(&mut buf).await {
                if n == 0 || socket.write_all(&buf[..n]).await.is_err() {
                    break;
                }
            }
        }
    });

    Ok(local_addr)
}

fn reply_for(arg: &Arg) -> Reply {
    match arg {
        Arg::Str(bytes) => Reply::Bulk(bytes.clone()),
        Arg::Int(n) => Reply::Integer(*n),
        Arg::Null => Reply::NullBulk,
        Arg::Error(msg) => Reply::Error(msg.clone()),
    }
}

#[tokio::test]
async fn test_send_round_trip() {
    let addr = echo_server().await.unwrap();
    let mut client = Client::dial(addr).await.unwrap();

    let mut payload = vec![0u8; 4096];
    rand::thread_rng().fill_bytes(&mut payload);
    payload.extend_from_slice(b"\r\n$3\r\n*-1\r\n");

    let cmd = Command::new("SET")
        .arg("")
        .arg(payload)
        .arg(i64::MIN)
        .arg(None::<&str>)
        .arg(Arg::Error("ERR lorem".to_string()));

    let expected = Reply::Array(cmd.args().iter().map(reply_for).collect());
    let actual = client.send(cmd).await.unwrap();

    assert_eq!(actual, expected);

    client.close().await.unwrap();
    assert!(matches!(
        client.send(Command::new("PING")).await,
        Err(Error::Closed)
    ));
}
