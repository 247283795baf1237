//! Shared foundation for the shortwire link stack
//!
//! This crate holds the types every other shortwire crate agrees on:
//!
//! - [`address`] - opaque peer addressing
//! - [`state`] - the observable connection-role state
//! - [`protocol`] - identifiers both ends of a link must share
//! - [`error`] - the error taxonomy for the command surface and transports
//! - [`event`] - typed events posted by the link workers
//! - [`config`] - link configuration
//! - [`worker`] - the supervised execution-unit primitive

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod address;
pub mod config;
pub mod error;
pub mod event;
pub mod protocol;
pub mod state;
pub mod worker;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use address::PeerAddress;
pub use config::LinkConfig;
pub use error::{SendError, SetupError, TransportError, TransportResult};
pub use event::LinkEvent;
pub use state::ConnectionState;
pub use worker::Worker;
