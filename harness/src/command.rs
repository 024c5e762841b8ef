use serde_derive::{Serialize, Deserialize};

use snapshot::Directory;

#[derive(Serialize, Deserialize)]
pub struct Execution {
    /// Membership shared by every started process
    pub directory: Directory,

    pub commands: Vec<Command>,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type")]
#[derive(Clone, Debug)]
pub enum Command {
    /// Start the process with the given ID from the directory
    Start {
        id: usize,
    },

    /// Perform an internal event on the given process
    Internal {
        id: usize,
    },

    /// Move `amount` from one process to another
    Transfer {
        from: usize,
        to: usize,
        amount: i64,
    },

    /// Initiate a snapshot from the given process
    Snapshot {
        id: usize,
    },

    /// Shut the specified process down
    Crash {
        id: usize,
    },

    /// Sleep the test harness for `ms` milliseconds
    Sleep {
        ms: u64,
    },

    /// Wait up to `ms` milliseconds for every running process to finalize a snapshot
    Collect {
        ms: u64,
    },
}
