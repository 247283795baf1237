//! Attribute serving for shortwire
//!
//! The local device exposes a small attribute table to remote peers: one
//! well-known service grouping a content characteristic (read + notify) and
//! its client configuration descriptor (read + write). This crate answers
//! every remote request against that table - success or failure, exactly
//! once - and tracks which peers opted into notifications.
//!
//! Notification pushes themselves are the embedding application's job; it
//! reads the subscriber snapshot from [`GattServer::subscribers`] and
//! invokes whatever push capability the radio offers.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

mod registry;
mod server;
mod table;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use registry::SubscriptionRegistry;
pub use server::{
    AttributeEndpoint, AttributeRequest, AttributeResponse, GattServer, ResponseStatus,
    ServerEvent,
};
pub use table::{
    AttributeTable, AttributeTableBuilder, Characteristic, Descriptor, Permissions, Service,
};
