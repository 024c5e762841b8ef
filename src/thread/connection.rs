//! # Summary
//!
//! Reads frames from one inbound connection and hands each decoded message
//! to the core. Frames are processed strictly in arrival order, each under
//! its own acquisition of the core lock. A malformed frame is dropped and
//! the connection stays open; an I/O or framing error ends this task only.

use tokio::io::AsyncRead;

use crate::message::{Message, ProcessID};
use crate::shared::Shared;
use crate::socket;
use crate::state::Application;

pub async fn run<R, A>(id: ProcessID, mut rx: socket::Rx<R>, shared: Shared<A>)
    where R: AsyncRead + Unpin,
          A: Application,
{
    while let Some(frame) = rx.recv().await {
        let frame = match frame {
        | Ok(frame) => frame,
        | Err(error) => {
            warn!("[P{}] closing connection: {}", id, error);
            break
        }
        };

        if frame.trim().is_empty() {
            continue
        }

        let message = match frame.parse::<Message>() {
        | Ok(message) => message,
        | Err(error) => {
            warn!("[P{}] dropping frame: {}", id, error);
            continue
        }
        };

        if let Err(error) = shared.lock().receive(message) {
            warn!("[P{}] dropping message: {}", id, error);
        }
    }
    debug!("[P{}] connection closed", id);
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap as Map;

    use tokio::io::AsyncWriteExt;

    use super::*;
    use crate::internal;
    use crate::shared::Core;
    use crate::state::Transfer;

    #[tokio::test]
    async fn malformed_frame_keeps_connection_open() {
        let (peer_rx, peer_tx) = internal::new::<Message>();
        let (mut snapshots, snapshot_tx) = internal::new();
        let mut peer_txs = Map::new();
        peer_txs.insert(2, peer_tx);
        let shared = Shared::new(Core::new(1, Transfer, peer_txs, snapshot_tx));

        let (mut client, server) = tokio::io::duplex(1024);
        client.write_all(b"abc:1:APPLICATION\n\n1:2:TRANSFER:5\n").await.unwrap();
        client.write_all(b"2:9:TRANSFER:5\n").await.unwrap();
        client.write_all(b"3:2:MARKER:\n").await.unwrap();
        drop(client);

        run(1, socket::Rx::new(server), shared.clone()).await;

        let core = shared.lock();
        assert_eq!(core.local_state(), 5);
        assert_eq!(core.clock(), 5);
        assert!(!core.is_capturing());
        drop(core);

        let snapshot = snapshots.try_recv().unwrap();
        assert_eq!(snapshot.state, 5);
        assert_eq!(snapshot.in_transit(), 0);
        drop(peer_rx);
    }
}
