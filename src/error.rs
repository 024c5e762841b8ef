use thiserror::Error;

use crate::message::ProcessID;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Frame did not split into `<timestamp>:<origin>:<type>:<payload>`.
    #[error("malformed frame {frame:?}: {reason}")]
    MalformedMessage {
        frame: String,
        reason: &'static str,
    },

    /// Connecting or writing to a peer failed. The message is not delivered.
    #[error("peer {id} unreachable at {address}: {source}")]
    PeerUnreachable {
        id: ProcessID,
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Own id missing from the peer directory.
    #[error("process id {0} is not in the peer directory")]
    UnknownProcessId(ProcessID),

    #[error("process {0} is not a peer of this process")]
    UnknownPeer(ProcessID),

    #[error("invalid application message type {0:?}")]
    InvalidKind(String),

    /// Payload would not fit on a single frame.
    #[error("invalid application payload {0:?}: must not contain line breaks")]
    InvalidPayload(String),

    #[error("invalid peer directory: {0}")]
    Directory(#[from] serde_json::Error),

    #[error(transparent)]
    Codec(#[from] tokio_util::codec::LinesCodecError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
