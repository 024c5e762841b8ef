//! # Summary
//!
//! This module contains the tasks that connect the process core to the
//! network. The core itself never touches a socket: inbound frames reach it
//! through `connection`, outbound messages leave it through `peer`.

/// Inbound connection acceptor.
pub(crate) mod listener;

/// Inbound frame reader, one per accepted connection.
pub(crate) mod connection;

/// Outbound channel writer, one per peer.
pub(crate) mod peer;
