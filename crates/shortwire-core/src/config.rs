//! Link configuration

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::protocol::{LINK_SERVICE_UUID, READ_BUFFER_CAPACITY};

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// Configuration for a link manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Service identifier both ends must share.
    pub service_id: Uuid,
    /// Capacity of the stream pump's read buffer.
    pub read_buffer_capacity: usize,
    /// Cancel any ongoing device discovery before dialing. Discovery
    /// interferes with connection setup on the underlying radio.
    pub cancel_discovery_on_dial: bool,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            service_id: LINK_SERVICE_UUID,
            read_buffer_capacity: READ_BUFFER_CAPACITY,
            cancel_discovery_on_dial: true,
        }
    }
}

impl LinkConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shared service identifier.
    pub fn with_service_id(mut self, service_id: Uuid) -> Self {
        self.service_id = service_id;
        self
    }

    /// Set the read buffer capacity.
    pub fn with_read_buffer_capacity(mut self, capacity: usize) -> Self {
        self.read_buffer_capacity = capacity;
        self
    }

    /// Enable or disable cancelling discovery before a dial.
    pub fn with_cancel_discovery_on_dial(mut self, enabled: bool) -> Self {
        self.cancel_discovery_on_dial = enabled;
        self
    }
}
