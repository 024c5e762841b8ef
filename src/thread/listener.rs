//! # Summary
//!
//! Accepts inbound connections and runs one reader task per connection.
//! The reader tasks are owned by this task's `JoinSet`, so aborting the
//! listener on shutdown also closes every connection it accepted.

use tokio::net::TcpListener;
use tokio::task::JoinSet;

use crate::shared::Shared;
use crate::socket;
use crate::state::Application;
use crate::thread::connection;

/// Back-off after a failed accept, so a persistent error does not spin.
const ACCEPT_BACKOFF: std::time::Duration = std::time::Duration::from_millis(100);

/// Accepts connections until aborted.
pub async fn run<A: Application>(listener: TcpListener, shared: Shared<A>) {
    let id = shared.lock().id();
    let mut connections = JoinSet::new();
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
            | Ok((stream, address)) => {
                debug!("[P{}] accepted connection from {}", id, address);
                let rx = socket::Rx::new(stream);
                connections.spawn(connection::run(id, rx, shared.clone()));
            }
            | Err(error) => {
                error!("[P{}] failed to accept connection: {}", id, error);
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
            },
            // Reap finished readers
            Some(_) = connections.join_next() => (),
        }
    }
}
