//! # Summary
//!
//! Application semantics layered on top of the snapshot protocol. The core
//! owns the local state counter; an `Application` decides how sending and
//! delivering application messages change it. Both hooks run under the same
//! lock as the clock and snapshot bookkeeping.

/// Per-type semantics for application messages.
pub trait Application: Send + 'static {
    /// Applied when this process sends a message of type `kind`.
    fn on_send(&mut self, _local: &mut i64, _kind: &str, _payload: &str) {}

    /// Applied when a message of type `kind` is delivered to this process.
    fn on_deliver(&mut self, _local: &mut i64, _kind: &str, _payload: &str) {}
}

/// Messages are observed but never change local state.
#[derive(Copy, Clone, Debug, Default)]
pub struct Passive;

impl Application for Passive {}

/// Moves integer amounts between processes. The sender's state drops by
/// `amount` and the receiver's grows by it, so the global total is only
/// changed by internal events.
#[derive(Copy, Clone, Debug, Default)]
pub struct Transfer;

impl Transfer {
    pub const KIND: &'static str = "TRANSFER";

    /// Amount carried by a `TRANSFER` payload, if it is one.
    pub fn amount(kind: &str, payload: &str) -> Option<i64> {
        if kind == Self::KIND {
            payload.trim().parse().ok()
        } else {
            None
        }
    }
}

impl Application for Transfer {
    fn on_send(&mut self, local: &mut i64, kind: &str, payload: &str) {
        if let Some(amount) = Transfer::amount(kind, payload) {
            *local -= amount;
        }
    }

    fn on_deliver(&mut self, local: &mut i64, kind: &str, payload: &str) {
        match Transfer::amount(kind, payload) {
        | Some(amount) => *local += amount,
        | None => warn!("ignoring {} message with payload {:?}", kind, payload),
        }
    }
}
