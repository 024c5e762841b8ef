//! # Summary
//!
//! This module abstracts over TCP connections between processes.
//!
//! Uses `tokio-util`'s `LinesCodec` around `tokio`'s asynchronous TCP stream,
//! so each frame is one newline-terminated `Message` in its text encoding.
//! Several frames arriving in a single read are split by the codec and
//! handed out one at a time.

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};

use crate::error::{Error, Result};
use crate::message::{Message, ProcessID};

/// Upper bound on a single frame, to keep a bad peer from exhausting memory.
pub const MAX_FRAME: usize = 64 * 1024;

/// Inbound frames from one connection.
pub struct Rx<R = TcpStream>(FramedRead<R, LinesCodec>);

/// Outbound frames on a connection to one peer.
pub struct Tx<W = TcpStream>(FramedWrite<W, LinesCodec>);

impl<R: AsyncRead + Unpin> Rx<R> {
    pub fn new(reader: R) -> Self {
        Rx(FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_FRAME)))
    }

    /// Next raw frame, or `None` once the remote end closes.
    pub async fn recv(&mut self) -> Option<Result<String>> {
        self.0.next()
            .await
            .map(|frame| frame.map_err(Error::from))
    }
}

impl Tx<TcpStream> {
    /// Opens a connection to peer `id`.
    pub async fn connect(id: ProcessID, address: &str) -> Result<Self> {
        TcpStream::connect(address)
            .await
            .map(Tx::new)
            .map_err(|source| Error::PeerUnreachable {
                id,
                address: address.to_owned(),
                source,
            })
    }
}

impl<W: AsyncWrite + Unpin> Tx<W> {
    pub fn new(writer: W) -> Self {
        Tx(FramedWrite::new(writer, LinesCodec::new()))
    }

    /// Writes and flushes one frame.
    pub async fn send(&mut self, message: &Message) -> Result<()> {
        self.0.send(message.to_string())
            .await
            .map_err(Error::from)
    }
}
