//! Stream link management over a short-range radio
//!
//! This crate owns the connection-role state machine and its three
//! execution units:
//!
//! - an acceptor that listens for exactly one inbound connection,
//! - a connector that dials one peer,
//! - a stream pump that moves bytes over whichever connection won.
//!
//! The radio itself stays behind the [`transport`] traits; callers hand in
//! a [`StreamTransport`] capability and drive the link through
//! [`LinkManager`]. At most one of the three units is active at any
//! instant, and every failure resolves the role back to idle with an event
//! on the manager's channel.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

mod acceptor;
mod connector;
mod manager;
mod pump;
mod transport;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use manager::LinkManager;
pub use pump::StreamPump;
pub use transport::{StreamConnection, StreamListener, StreamTransport};
