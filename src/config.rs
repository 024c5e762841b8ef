use std::collections::BTreeMap as Map;

use serde_derive::{Deserialize, Serialize};
use tokio::net::TcpListener;

use crate::error::{Error, Result};
use crate::internal;
use crate::message::ProcessID;
use crate::process::Process;
use crate::shared;
use crate::state::Application;
use crate::thread;

/// Network location of a process.
#[derive(Serialize, Deserialize)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Address {
    pub host: String,
    pub port: u16,
}

impl Address {
    pub fn new<S: Into<String>>(host: S, port: u16) -> Self {
        Address { host: host.into(), port }
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(fmt, "{}:{}", self.host, self.port)
    }
}

/// Static membership: every process id and where it listens.
/// Known identically by all processes at startup.
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Directory(Map<ProcessID, Address>);

impl Directory {
    /// Processes `1..=ports.len()` on 127.0.0.1 at the given ports.
    pub fn localhost(ports: &[u16]) -> Self {
        Directory(ports.iter()
            .enumerate()
            .map(|(index, port)| (index + 1, Address::new("127.0.0.1", *port)))
            .collect())
    }

    /// Reads a JSON object mapping process ids to `{ "host", "port" }`.
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let directory = serde_json::from_reader(std::io::BufReader::new(file))?;
        Ok(directory)
    }

    pub fn insert(&mut self, id: ProcessID, address: Address) {
        self.0.insert(id, address);
    }

    pub fn get(&self, id: ProcessID) -> Option<&Address> {
        self.0.get(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = ProcessID> + '_ {
        self.0.keys().cloned()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::iter::FromIterator<(ProcessID, Address)> for Directory {
    fn from_iter<T: IntoIterator<Item = (ProcessID, Address)>>(iter: T) -> Self {
        Directory(iter.into_iter().collect())
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Unique process ID
    id: ProcessID,

    /// Every process, including this one
    directory: Directory,
}

impl Config {
    /// Fails if `id` is not listed in `directory`.
    pub fn new(id: ProcessID, directory: Directory) -> Result<Self> {
        if directory.get(id).is_none() {
            return Err(Error::UnknownProcessId(id))
        }
        Ok(Config { id, directory })
    }

    pub fn id(&self) -> ProcessID {
        self.id
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Every process except this one.
    pub fn peers(&self) -> impl Iterator<Item = (ProcessID, &Address)> + '_ {
        let id = self.id;
        self.directory.0.iter()
            .filter(move |(peer, _)| **peer != id)
            .map(|(peer, address)| (*peer, address))
    }

    /// Binds this process's own address and starts it.
    pub async fn start<A: Application>(self, application: A) -> Result<Process<A>> {
        let address = self.directory
            .get(self.id)
            .map(ToString::to_string)
            .ok_or(Error::UnknownProcessId(self.id))?;
        let listener = TcpListener::bind(address.as_str()).await?;
        self.start_on(listener, application)
    }

    /// Starts this process on an already bound listener. Must be called
    /// from within a tokio runtime.
    pub fn start_on<A: Application>(self, listener: TcpListener, application: A) -> Result<Process<A>> {
        let local_addr = listener.local_addr()?;
        info!("[P{}] listening on {}", self.id, local_addr);

        let mut tasks = Vec::new();
        let mut peer_txs = Map::new();
        for (peer_id, address) in self.peers() {
            let (rx, tx) = internal::new();
            peer_txs.insert(peer_id, tx);
            let peer = thread::peer::Peer::new(self.id, peer_id, address.to_string(), rx);
            tasks.push(tokio::spawn(peer.run()));
        }

        let (snapshot_rx, snapshot_tx) = internal::new();
        let core = shared::Core::new(self.id, application, peer_txs, snapshot_tx);
        let shared = shared::Shared::new(core);

        tasks.push(tokio::spawn(thread::listener::run(listener, shared.clone())));

        Ok(Process::new(self.id, local_addr, shared, snapshot_rx, tasks))
    }
}
