//! Scripted attribute endpoint
//!
//! Stands in for the radio's attribute-server capability: the test side
//! injects [`ServerEvent`]s through the handle and collects every
//! [`AttributeResponse`] the server produced.

use async_trait::async_trait;
use tokio::sync::mpsc;

use shortwire_core::{TransportError, TransportResult};
use shortwire_gatt::{AttributeEndpoint, AttributeResponse, ServerEvent};

/// Build a connected endpoint/handle pair.
pub fn attribute_endpoint() -> (MemoryAttributeEndpoint, AttributeEndpointHandle) {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (responses_tx, responses_rx) = mpsc::unbounded_channel();
    (
        MemoryAttributeEndpoint {
            events: events_rx,
            responses: responses_tx,
        },
        AttributeEndpointHandle {
            events: events_tx,
            responses: responses_rx,
        },
    )
}

/// Endpoint half, handed to `GattServer::serve`.
pub struct MemoryAttributeEndpoint {
    events: mpsc::UnboundedReceiver<ServerEvent>,
    responses: mpsc::UnboundedSender<AttributeResponse>,
}

#[async_trait]
impl AttributeEndpoint for MemoryAttributeEndpoint {
    async fn next_event(&mut self) -> Option<ServerEvent> {
        self.events.recv().await
    }

    async fn send_response(&mut self, response: AttributeResponse) -> TransportResult<()> {
        self.responses
            .send(response)
            .map_err(|_| TransportError::Closed)
    }
}

/// Test half: inject events, observe responses. Dropping the handle shuts
/// the endpoint down, which ends the server loop.
pub struct AttributeEndpointHandle {
    events: mpsc::UnboundedSender<ServerEvent>,
    responses: mpsc::UnboundedReceiver<AttributeResponse>,
}

impl AttributeEndpointHandle {
    /// Deliver one event to the server, in order.
    pub fn deliver(&self, event: ServerEvent) {
        let _ = self.events.send(event);
    }

    /// Next response the server produced.
    pub async fn next_response(&mut self) -> Option<AttributeResponse> {
        self.responses.recv().await
    }

    /// Responses produced so far, without waiting.
    pub fn drain_responses(&mut self) -> Vec<AttributeResponse> {
        let mut drained = Vec::new();
        while let Ok(response) = self.responses.try_recv() {
            drained.push(response);
        }
        drained
    }
}
