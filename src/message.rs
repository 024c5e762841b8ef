//! # Summary
//!
//! Messages exchanged between processes, and their text wire format:
//!
//! ```text
//! <timestamp>:<origin>:<type>:<payload>
//! ```
//!
//! The payload is the remainder of the frame and may itself contain `:`.
//! Framing on newlines is handled by `socket`.

use serde_derive::{Deserialize, Serialize};

use crate::error::Error;

/// Unique process identifier, as listed in the peer directory.
pub type ProcessID = usize;

const MARKER: &str = "MARKER";

#[derive(Serialize, Deserialize)]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Chandy-Lamport channel delimiter.
    Marker,

    /// Application-defined message type.
    Application(String),
}

impl Kind {
    pub fn is_marker(&self) -> bool {
        match self {
        | Kind::Marker => true,
        | Kind::Application(_) => false,
        }
    }

    /// Checks that `kind` can be used as an application type on the wire.
    pub fn application<S: Into<String>>(kind: S) -> Result<Self, Error> {
        let kind = kind.into();
        if kind.is_empty() || kind == MARKER || kind.contains(|c: char| c == ':' || c == '\n' || c == '\r') {
            return Err(Error::InvalidKind(kind))
        }
        Ok(Kind::Application(kind))
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
        | Kind::Marker => write!(fmt, "{}", MARKER),
        | Kind::Application(kind) => write!(fmt, "{}", kind),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Message {
    /// Sender's Lamport time at send
    pub timestamp: u64,

    /// Sending process
    pub origin: ProcessID,

    pub kind: Kind,

    pub payload: String,
}

impl Message {
    pub fn marker(timestamp: u64, origin: ProcessID) -> Self {
        Message {
            timestamp,
            origin,
            kind: Kind::Marker,
            payload: String::new(),
        }
    }
}

/// Encodes the frame without its trailing newline.
impl std::fmt::Display for Message {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(fmt, "{}:{}:{}:{}", self.timestamp, self.origin, self.kind, self.payload)
    }
}

impl std::str::FromStr for Message {
    type Err = Error;
    fn from_str(frame: &str) -> Result<Self, Self::Err> {
        let malformed = |reason| Error::MalformedMessage {
            frame: frame.to_owned(),
            reason,
        };

        let mut parts = frame.splitn(4, ':');
        let (timestamp, origin, kind, payload) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        | (Some(timestamp), Some(origin), Some(kind), Some(payload)) => (timestamp, origin, kind, payload),
        | _ => return Err(malformed("expected 4 fields")),
        };

        let timestamp = timestamp.trim()
            .parse::<u64>()
            .map_err(|_| malformed("timestamp is not a number"))?;

        let origin = origin.trim()
            .parse::<ProcessID>()
            .map_err(|_| malformed("origin is not a process id"))?;

        let kind = match kind {
        | MARKER => Kind::Marker,
        | "" => return Err(malformed("empty message type")),
        | kind => Kind::Application(kind.to_owned()),
        };

        Ok(Message {
            timestamp,
            origin,
            kind,
            payload: payload.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_marker() {
        let message = "7:2:MARKER:".parse::<Message>().unwrap();
        assert_eq!(message, Message::marker(7, 2));
    }

    #[test]
    fn payload_keeps_colons() {
        let message = "3:1:TRANSFER:a:b:c".parse::<Message>().unwrap();
        assert_eq!(message.kind, Kind::Application("TRANSFER".into()));
        assert_eq!(message.payload, "a:b:c");
        assert_eq!(message.to_string(), "3:1:TRANSFER:a:b:c");
    }

    #[test]
    fn rejects_three_fields() {
        match "abc:1:APPLICATION".parse::<Message>() {
        | Err(Error::MalformedMessage { reason, .. }) => assert_eq!(reason, "expected 4 fields"),
        | other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn rejects_bad_numbers() {
        assert!("abc:1:APPLICATION:x".parse::<Message>().is_err());
        assert!("1:p2:APPLICATION:x".parse::<Message>().is_err());
        assert!("-1:2:APPLICATION:x".parse::<Message>().is_err());
        assert!("1:2::x".parse::<Message>().is_err());
    }

    #[test]
    fn application_kind_validation() {
        assert!(Kind::application("TRANSFER").is_ok());
        assert!(Kind::application("MARKER").is_err());
        assert!(Kind::application("").is_err());
        assert!(Kind::application("A:B").is_err());
        assert!(Kind::application("A\nB").is_err());
    }
}
