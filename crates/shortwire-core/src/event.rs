//! Typed events posted by the link workers
//!
//! Workers never call back into presentation code. Every outcome they
//! produce - an established connection, a failed attempt, inbound bytes -
//! goes onto the manager's event channel as one of these variants, and
//! whoever embeds the link (UI, logger, notifier) consumes them there.

use crate::address::PeerAddress;

/// Events emitted by the role workers and the active stream pump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// A connection was established and a stream pump now owns it.
    Connected { peer: PeerAddress },

    /// The acceptor terminated before an inbound connection was established.
    AcceptFailed { reason: String },

    /// The connector could not reach the dialed peer.
    ConnectFailed { peer: PeerAddress, reason: String },

    /// Bytes arrived on the active stream. `len` is the number of bytes
    /// read; `data` holds exactly that many.
    DataReceived { len: usize, data: Vec<u8> },

    /// Bytes were handed to the transport successfully.
    DataSent { len: usize },

    /// A write was rejected by the transport. The stream stays up.
    WriteFailed { reason: String },

    /// The active stream terminated (peer close or read failure).
    Disconnected { peer: PeerAddress, reason: String },
}
