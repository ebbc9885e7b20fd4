pub mod client;
pub mod codec;
pub mod command;
pub mod decode;
pub mod encode;
pub mod error;
pub mod framing;
pub mod handler;
pub mod reply;
pub mod server;

pub use client::Client;
pub use command::{Arg, Command};
pub use error::{Error, ProtocolError};
pub use handler::{Handler, ReplyWriter};
pub use reply::Reply;
pub use server::{Listener, Server};

pub type Result<T> = std::result::Result<T, Error>;
