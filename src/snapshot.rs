//! # Summary
//!
//! Bookkeeping for a single Chandy-Lamport snapshot on one process.
//!
//! A `Session` exists from the moment the process records its own state
//! until a marker has arrived on every incoming channel. While a channel
//! is still unmarked, application messages arriving on it are recorded as
//! in transit. Once the last marker arrives the session is turned into an
//! immutable `Snapshot` record.

use std::collections::BTreeMap as Map;

use serde_derive::{Deserialize, Serialize};

use crate::message::{Message, ProcessID};

#[derive(Clone, Debug)]
pub struct Session {
    /// Local state recorded when capture began
    state: i64,

    /// Lamport time when capture began
    clock: u64,

    initiated_by_marker: bool,

    /// Whether a marker has arrived from each peer
    markers: Map<ProcessID, bool>,

    /// Messages received on each channel before its marker
    in_transit: Map<ProcessID, Vec<Message>>,
}

impl Session {
    pub fn new<'a, T>(peers: T, state: i64, clock: u64, initiated_by_marker: bool) -> Self
        where T: IntoIterator<Item = &'a ProcessID>
    {
        Session {
            state,
            clock,
            initiated_by_marker,
            markers: peers.into_iter().map(|id| (*id, false)).collect(),
            in_transit: Map::default(),
        }
    }

    pub fn is_marked(&self, peer: ProcessID) -> bool {
        self.markers.get(&peer).cloned().unwrap_or(true)
    }

    pub fn is_complete(&self) -> bool {
        self.markers.values().all(|marked| *marked)
    }

    /// Records `message` as in transit if its channel is still unmarked.
    pub fn record(&mut self, message: &Message) -> bool {
        if self.is_marked(message.origin) {
            return false
        }
        self.in_transit
            .entry(message.origin)
            .or_insert_with(Vec::new)
            .push(message.clone());
        true
    }

    /// Marks the channel from `peer`. Returns true only on the call that
    /// completes the session; duplicate markers return false.
    pub fn mark(&mut self, peer: ProcessID) -> bool {
        match self.markers.get_mut(&peer) {
        | Some(marked) if !*marked => *marked = true,
        | _ => return false,
        }
        self.is_complete()
    }

    pub fn finish(self, process: ProcessID) -> Snapshot {
        let mut in_transit = self.in_transit;
        let channels = self.markers
            .keys()
            .map(|peer| (*peer, in_transit.remove(peer).unwrap_or_default()))
            .collect();
        Snapshot {
            process,
            state: self.state,
            clock: self.clock,
            initiated_by_marker: self.initiated_by_marker,
            channels,
        }
    }
}

/// One process's contribution to a global snapshot.
#[derive(Serialize, Deserialize)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub process: ProcessID,

    /// Local state at capture
    pub state: i64,

    /// Lamport time at capture
    pub clock: u64,

    pub initiated_by_marker: bool,

    /// In-transit messages per incoming channel, in arrival order.
    /// Every peer has an entry, empty if nothing was in flight.
    pub channels: Map<ProcessID, Vec<Message>>,
}

impl Snapshot {
    pub fn in_transit(&self) -> usize {
        self.channels.values().map(Vec::len).sum()
    }
}

impl std::fmt::Display for Snapshot {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(fmt, "P{} state {} at clock {}", self.process, self.state, self.clock)?;
        for (peer, messages) in &self.channels {
            write!(fmt, " | P{} -> P{}: [", peer, self.process)?;
            for (index, message) in messages.iter().enumerate() {
                if index > 0 { write!(fmt, ", ")?; }
                write!(fmt, "{}", message)?;
            }
            write!(fmt, "]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Kind;

    fn application(timestamp: u64, origin: ProcessID) -> Message {
        Message {
            timestamp,
            origin,
            kind: Kind::Application("TRANSFER".into()),
            payload: "1".into(),
        }
    }

    #[test]
    fn starts_unmarked_and_empty() {
        let session = Session::new(&[2, 3], 5, 9, false);
        assert!(!session.is_marked(2));
        assert!(!session.is_marked(3));
        assert!(!session.is_complete());
        let snapshot = session.finish(1);
        assert_eq!(snapshot.state, 5);
        assert_eq!(snapshot.clock, 9);
        assert_eq!(snapshot.in_transit(), 0);
        assert_eq!(snapshot.channels.keys().cloned().collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn records_only_unmarked_channels() {
        let mut session = Session::new(&[2, 3], 0, 0, true);
        assert!(!session.mark(2));
        assert!(!session.record(&application(4, 2)));
        assert!(session.record(&application(5, 3)));
        assert!(session.record(&application(6, 3)));
        assert!(session.mark(3));
        assert!(!session.record(&application(7, 3)));

        let snapshot = session.finish(1);
        assert!(snapshot.channels[&2].is_empty());
        assert_eq!(snapshot.channels[&3], vec![application(5, 3), application(6, 3)]);
    }

    #[test]
    fn duplicate_marker_does_not_complete() {
        let mut session = Session::new(&[2, 3], 0, 0, false);
        assert!(!session.mark(2));
        assert!(!session.mark(2));
        assert!(session.mark(3));
        assert!(!session.mark(3));
        assert!(!session.mark(2));
    }

    #[test]
    fn no_peers_is_complete() {
        let session = Session::new(&[], 0, 0, false);
        assert!(session.is_complete());
    }
}
