//! Transport seam between the link core and the radio collaborator
//!
//! The core never touches the radio directly. Discovery, permissions, and
//! the physical medium live outside; what comes in is a capability to open
//! stream endpoints, expressed by the traits below. `accept`, `connect`,
//! and `read` are the only operations allowed to block, and each blocks
//! exactly one dedicated worker - never the caller.

use std::sync::Arc;

use async_trait::async_trait;
use shortwire_core::{PeerAddress, TransportResult};
use uuid::Uuid;

// ----------------------------------------------------------------------------
// Stream Connection
// ----------------------------------------------------------------------------

/// An established duplex byte channel to one peer.
///
/// Reads and writes may be issued concurrently from different tasks. A
/// peer-initiated shutdown surfaces as [`TransportError::Closed`] from
/// `read`. `close` is idempotent and must unblock a pending `read`.
///
/// [`TransportError::Closed`]: shortwire_core::TransportError::Closed
#[async_trait]
pub trait StreamConnection: Send + Sync + std::fmt::Debug {
    /// Address of the remote end.
    fn peer(&self) -> PeerAddress;

    /// Read into `buf`, blocking until data arrives, the peer closes, or
    /// the connection is torn down. Returns the number of bytes read.
    async fn read(&self, buf: &mut [u8]) -> TransportResult<usize>;

    /// Write all of `data`, bounded only by the transport's own buffering.
    async fn write(&self, data: &[u8]) -> TransportResult<()>;

    /// Tear the connection down. Idempotent.
    async fn close(&self);
}

// ----------------------------------------------------------------------------
// Stream Listener
// ----------------------------------------------------------------------------

/// A listening endpoint for inbound stream connections.
#[async_trait]
pub trait StreamListener: Send + Sync {
    /// Block until one inbound connection arrives.
    ///
    /// Closing the listener causes a pending accept to return an error
    /// rather than hang.
    async fn accept(&self) -> TransportResult<Arc<dyn StreamConnection>>;

    /// Stop listening. Idempotent.
    async fn close(&self);
}

// ----------------------------------------------------------------------------
// Stream Transport
// ----------------------------------------------------------------------------

/// Capability handed in by the radio collaborator for opening stream
/// endpoints.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Validate a raw address string and turn it into a dialable peer
    /// address. Rejections surface as `InvalidAddress` at the command
    /// surface.
    fn resolve(&self, address: &str) -> TransportResult<PeerAddress>;

    /// Open a listening endpoint under `service_id`.
    async fn listen(&self, service_id: Uuid) -> TransportResult<Box<dyn StreamListener>>;

    /// Dial `peer` under `service_id`, blocking until the connection is
    /// established or the attempt fails. Dropping the returned future must
    /// abort the attempt; cancellation relies on it.
    async fn connect(
        &self,
        peer: &PeerAddress,
        service_id: Uuid,
    ) -> TransportResult<Arc<dyn StreamConnection>>;

    /// Abort any ongoing device discovery that would interfere with
    /// connection setup. Transports without discovery do nothing.
    async fn cancel_discovery(&self) {}
}
