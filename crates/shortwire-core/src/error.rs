//! Error taxonomy for the shortwire stack
//!
//! Three layers, mirroring where a failure is allowed to surface:
//!
//! - [`SetupError`] - rejected synchronously at the link command surface
//! - [`TransportError`] - returned by transport implementations; workers
//!   convert these into state transitions plus events at the boundary of
//!   their own execution unit, so they never cross a task boundary
//! - [`SendError`] - the data-path result of pushing bytes down the stream

use thiserror::Error;

use crate::address::PeerAddress;
use crate::state::ConnectionState;

// ----------------------------------------------------------------------------
// Command Surface Errors
// ----------------------------------------------------------------------------

/// Rejections issued synchronously by the link command surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    #[error("another connection role is already active (state: {state})")]
    AlreadyActive { state: ConnectionState },

    #[error("peer address cannot be resolved: {address}")]
    InvalidAddress { address: String },
}

// ----------------------------------------------------------------------------
// Transport Errors
// ----------------------------------------------------------------------------

/// Failures surfaced by the transport primitives (accept, connect, read,
/// write, listen).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("endpoint closed")]
    Closed,

    #[error("connection refused by {peer}: {reason}")]
    Refused { peer: PeerAddress, reason: String },

    #[error("no route to peer {peer}")]
    NoRoute { peer: PeerAddress },

    #[error("address not resolvable by this transport: {address}")]
    Unresolvable { address: String },

    #[error("operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },
}

impl TransportError {
    /// Create a refusal error with a reason.
    pub fn refused(peer: PeerAddress, reason: impl Into<String>) -> Self {
        TransportError::Refused {
            peer,
            reason: reason.into(),
        }
    }

    /// Create a no-route error for a peer.
    pub fn no_route(peer: PeerAddress) -> Self {
        TransportError::NoRoute { peer }
    }

    /// Create an unresolvable-address error.
    pub fn unresolvable(address: impl Into<String>) -> Self {
        TransportError::Unresolvable {
            address: address.into(),
        }
    }
}

/// Result alias for transport primitives.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

// ----------------------------------------------------------------------------
// Data Path Errors
// ----------------------------------------------------------------------------

/// Result of pushing bytes down the active stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("no active connection")]
    NotConnected,

    #[error("write failed: {reason}")]
    WriteFailed { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_errors_render_their_context() {
        let err = SetupError::AlreadyActive {
            state: ConnectionState::Listening,
        };
        assert!(err.to_string().contains("Listening"));

        let err = SetupError::InvalidAddress {
            address: "bogus".to_string(),
        };
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn transport_errors_render_the_peer() {
        let peer = PeerAddress::new("AA:BB");
        assert!(TransportError::no_route(peer.clone())
            .to_string()
            .contains("AA:BB"));
        assert!(TransportError::refused(peer, "busy")
            .to_string()
            .contains("busy"));
    }
}
