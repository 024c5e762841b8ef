//! # Summary
//!
//! Handle to a running process, returned by `Config::start`. Every operation
//! takes the core lock for exactly one atomic step; none of them touches the
//! network directly.

use crate::error::Result;
use crate::internal;
use crate::message::ProcessID;
use crate::shared::Shared;
use crate::snapshot::Snapshot;
use crate::state::{Application, Transfer};

pub struct Process<A: Application> {
    id: ProcessID,
    local_addr: std::net::SocketAddr,
    shared: Shared<A>,
    snapshots: internal::Rx<Snapshot>,
    tasks: Vec<tokio::task::JoinHandle<()>>,
}

impl<A: Application> Process<A> {
    pub(crate) fn new(
        id: ProcessID,
        local_addr: std::net::SocketAddr,
        shared: Shared<A>,
        snapshots: internal::Rx<Snapshot>,
        tasks: Vec<tokio::task::JoinHandle<()>>,
    ) -> Self {
        Process { id, local_addr, shared, snapshots, tasks }
    }

    pub fn id(&self) -> ProcessID {
        self.id
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> std::net::SocketAddr {
        self.local_addr
    }

    pub fn clock(&self) -> u64 {
        self.shared.lock().clock()
    }

    pub fn local_state(&self) -> i64 {
        self.shared.lock().local_state()
    }

    pub fn is_capturing(&self) -> bool {
        self.shared.lock().is_capturing()
    }

    pub fn internal_event(&self) {
        self.shared.lock().internal_event()
    }

    /// Sends an application message of type `kind` to peer `to`.
    pub fn send(&self, to: ProcessID, kind: &str, payload: &str) -> Result<()> {
        self.shared.lock().send(to, kind, payload)
    }

    /// Initiates a global snapshot from this process. Returns false if a
    /// snapshot is already being captured here.
    pub fn start_snapshot(&self) -> bool {
        self.shared.lock().start_snapshot(false)
    }

    /// Waits for this process's next finalized snapshot.
    pub async fn next_snapshot(&mut self) -> Option<Snapshot> {
        self.snapshots.recv().await
    }

    /// Takes a finalized snapshot if one is ready.
    pub fn try_snapshot(&mut self) -> Option<Snapshot> {
        self.snapshots.try_recv()
    }

    /// Keeps the process serving for `duration`.
    pub async fn run_for(&self, duration: std::time::Duration) {
        tokio::time::sleep(duration).await
    }

    /// Stops accepting connections and closes outbound channels.
    pub fn shutdown(mut self) {
        info!("[P{}] shutting down", self.id);
        self.abort();
    }

    fn abort(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Process<Transfer> {
    /// Moves `amount` from this process to peer `to`.
    pub fn transfer(&self, to: ProcessID, amount: i64) -> Result<()> {
        self.send(to, Transfer::KIND, &amount.to_string())
    }
}

impl<A: Application> Drop for Process<A> {
    fn drop(&mut self) {
        self.abort();
    }
}
