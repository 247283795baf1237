//! Test harness for shortwire
//!
//! Deterministic in-memory implementations of the transport seams, for
//! exercising the link and attribute cores without radio hardware:
//!
//! - [`MemoryNetwork`] / [`MemoryTransport`] - an in-process radio whose
//!   accept and connect calls genuinely block (rendezvous handshake), so
//!   cancellation paths run against real pending I/O
//! - [`attribute_endpoint`] - a scripted attribute endpoint: tests inject
//!   server events and collect the responses the server produced

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

mod attribute;
mod memory;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use attribute::{attribute_endpoint, AttributeEndpointHandle, MemoryAttributeEndpoint};
pub use memory::{MemoryNetwork, MemoryTransport};
