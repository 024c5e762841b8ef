//! # Summary
//!
//! Owns the outbound TCP connection to one peer and drains that peer's FIFO
//! queue into it. The connection is opened lazily on the first message and
//! reopened on the next message after a failure. A message that cannot be
//! delivered is logged and dropped; there is no retry and no buffering.

use tokio_util::codec::LinesCodecError;

use crate::error::Error;
use crate::internal::Rx;
use crate::message::{Message, ProcessID};
use crate::socket;

pub struct Peer {
    self_id: ProcessID,
    peer_id: ProcessID,
    address: String,
    rx: Rx<Message>,
    tx: Option<socket::Tx>,
}

impl Peer {
    pub fn new(self_id: ProcessID, peer_id: ProcessID, address: String, rx: Rx<Message>) -> Self {
        Peer {
            self_id,
            peer_id,
            address,
            rx,
            tx: None,
        }
    }

    /// Runs until every sender for this peer is dropped.
    pub async fn run(mut self) {
        while let Some(message) = self.rx.recv().await {
            self.deliver(message).await;
        }
        if self.tx.is_some() {
            info!("[P{}] disconnected from P{}", self.self_id, self.peer_id);
        }
    }

    async fn deliver(&mut self, message: Message) {
        if self.tx.is_none() {
            match socket::Tx::connect(self.peer_id, &self.address).await {
            | Ok(tx) => {
                info!("[P{}] connected to P{} at {}", self.self_id, self.peer_id, self.address);
                self.tx = Some(tx);
            }
            | Err(error) => {
                warn!("[P{}] dropping {} for P{}: {}", self.self_id, message.kind, self.peer_id, error);
                return
            }
            }
        }

        if let Some(tx) = self.tx.as_mut() {
            trace!("[P{}] writing {} to P{}", self.self_id, message, self.peer_id);
            if let Err(error) = tx.send(&message).await {
                let error = self.unreachable(error);
                warn!("[P{}] dropping {} for P{}: {}", self.self_id, message.kind, self.peer_id, error);
                self.tx = None;
            }
        }
    }

    fn unreachable(&self, error: Error) -> Error {
        match error {
        | Error::Io(source)
        | Error::Codec(LinesCodecError::Io(source)) => Error::PeerUnreachable {
            id: self.peer_id,
            address: self.address.clone(),
            source,
        },
        | error => error,
        }
    }
}
