//! # Summary
//!
//! This module implements the process core: the Lamport clock, the local
//! state counter and the snapshot session, together with the outbound queue
//! to every peer. We wrap the `Core` with Arc<Mutex<T>> so that every
//! connection task observes, decides and mutates as one atomic step.
//!
//! Outbound messages are stamped and enqueued while the lock is held. The
//! queues are unbounded and drained by one task per peer (`thread::peer`),
//! so the order of a channel matches the order of the clock ticks that
//! produced its messages, and no network I/O happens under the lock.

use std::collections::BTreeMap as Map;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::internal::Tx;
use crate::message::{Kind, Message, ProcessID};
use crate::snapshot::{Session, Snapshot};
use crate::state::Application;

/// Thread-safe wrapper around the process `Core`.
#[derive(Derivative)]
#[derivative(Clone(bound = ""))]
pub struct Shared<A: Application>(Arc<Mutex<Core<A>>>);

impl<A: Application> Shared<A> {
    pub fn new(core: Core<A>) -> Self {
        Shared(Arc::new(Mutex::new(core)))
    }

    /// Acquires the lock on the underlying core.
    pub fn lock(&self) -> MutexGuard<Core<A>> {
        self.0.lock()
    }
}

pub struct Core<A: Application> {
    id: ProcessID,
    clock: Clock,
    local: i64,
    application: A,

    /// Active snapshot, if capturing
    session: Option<Session>,

    /// Outbound FIFO queue per peer
    peer_txs: Map<ProcessID, Tx<Message>>,

    /// Finalized snapshots
    snapshot_tx: Tx<Snapshot>,
}

impl<A: Application> Core<A> {
    pub fn new(
        id: ProcessID,
        application: A,
        peer_txs: Map<ProcessID, Tx<Message>>,
        snapshot_tx: Tx<Snapshot>,
    ) -> Self {
        Core {
            id,
            clock: Clock::new(),
            local: 0,
            application,
            session: None,
            peer_txs,
            snapshot_tx,
        }
    }

    pub fn id(&self) -> ProcessID {
        self.id
    }

    pub fn clock(&self) -> u64 {
        self.clock.time()
    }

    pub fn local_state(&self) -> i64 {
        self.local
    }

    pub fn is_capturing(&self) -> bool {
        self.session.is_some()
    }

    /// Application work unrelated to messaging.
    pub fn internal_event(&mut self) {
        self.clock.tick();
        self.local += 1;
        info!("[P{} | clock {} | state {}] internal event", self.id, self.clock, self.local);
    }

    /// Sends an application message of type `kind` to peer `to`.
    pub fn send(&mut self, to: ProcessID, kind: &str, payload: &str) -> Result<()> {
        if !self.peer_txs.contains_key(&to) {
            return Err(Error::UnknownPeer(to))
        }
        let kind = Kind::application(kind)?;
        if payload.contains(|c: char| c == '\n' || c == '\r') {
            return Err(Error::InvalidPayload(payload.to_owned()))
        }
        let message = Message {
            timestamp: self.clock.tick(),
            origin: self.id,
            kind,
            payload: payload.to_owned(),
        };
        self.application.on_send(&mut self.local, &message.kind.to_string(), payload);
        self.enqueue(to, message);
        Ok(())
    }

    /// Records local state and sends a marker on every outgoing channel.
    /// Refused while another snapshot is in progress.
    pub fn start_snapshot(&mut self, initiated_by_marker: bool) -> bool {
        if self.session.is_some() {
            debug!("[P{} | clock {}] snapshot already in progress", self.id, self.clock);
            return false
        }

        self.session = Some(Session::new(
            self.peer_txs.keys(),
            self.local,
            self.clock.time(),
            initiated_by_marker,
        ));

        if initiated_by_marker {
            info!("[P{} | clock {} | state {}] snapshot started by marker", self.id, self.clock, self.local);
        } else {
            info!("[P{} | clock {} | state {}] snapshot initiated", self.id, self.clock, self.local);
        }

        let peers = self.peer_txs.keys().cloned().collect::<Vec<_>>();
        for peer in peers {
            let marker = Message::marker(self.clock.tick(), self.id);
            self.enqueue(peer, marker);
        }

        if self.session.as_ref().map_or(false, Session::is_complete) {
            self.finalize();
        }
        true
    }

    /// Dispatches one decoded message from the network.
    pub fn receive(&mut self, message: Message) -> Result<()> {
        // Frames from outside the directory are dropped before they can move the clock
        if !self.peer_txs.contains_key(&message.origin) {
            return Err(Error::UnknownPeer(message.origin))
        }

        self.clock.observe(message.timestamp);
        debug!(
            "[P{} | clock {} | state {}] received {} from P{} [ts {}]",
            self.id, self.clock, self.local, message.kind, message.origin, message.timestamp,
        );

        match &message.kind {
        | Kind::Marker => {
            if self.session.is_none() {
                self.start_snapshot(true);
            }
            let complete = self.session
                .as_mut()
                .map_or(false, |session| session.mark(message.origin));
            if complete {
                self.finalize();
            }
        }
        | Kind::Application(kind) => {
            if let Some(session) = self.session.as_mut() {
                if session.record(&message) {
                    info!("[P{} | clock {}] {} from P{} in transit", self.id, self.clock, kind, message.origin);
                }
            }
            self.application.on_deliver(&mut self.local, kind, &message.payload);
        }
        }
        Ok(())
    }

    fn finalize(&mut self) {
        if let Some(session) = self.session.take() {
            let snapshot = session.finish(self.id);
            info!("[P{} | clock {}] snapshot complete: {}", self.id, self.clock, snapshot);
            if !self.snapshot_tx.send(snapshot) {
                debug!("[P{}] snapshot receiver dropped", self.id);
            }
        }
    }

    fn enqueue(&self, to: ProcessID, message: Message) {
        trace!("[P{} | clock {}] sending {} to P{}", self.id, self.clock, message.kind, to);
        if let Some(tx) = self.peer_txs.get(&to) {
            if !tx.send(message) {
                warn!("[P{}] outbound queue to P{} closed", self.id, to);
            }
        }
    }
}
