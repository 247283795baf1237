//! Attribute server
//!
//! Dispatches inbound read and write requests against the attribute table,
//! mutates the subscription registry on configuration-descriptor writes,
//! and produces exactly one response per request that asked for one. An
//! unknown attribute or descriptor identifier is expected, recoverable
//! traffic: it resolves to a FAILURE response, never to a fault.

use std::sync::Arc;

use async_trait::async_trait;
use smallvec::SmallVec;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shortwire_core::protocol::{
    CLIENT_CONFIG_DESCRIPTOR_UUID, DISABLE_NOTIFICATIONS_VALUE, ENABLE_NOTIFICATIONS_VALUE,
};
use shortwire_core::{PeerAddress, TransportResult, Worker};

use crate::registry::SubscriptionRegistry;
use crate::table::AttributeTable;

// ----------------------------------------------------------------------------
// Requests and Responses
// ----------------------------------------------------------------------------

/// Outcome status carried on every attribute response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    Success,
    Failure,
}

/// One in-flight request from a remote peer.
///
/// Consumed exactly once by producing at most one response - exactly one
/// whenever the requester expects an answer. The server never retries;
/// retry, if any, is the remote peer's business.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeRequest {
    ReadCharacteristic {
        peer: PeerAddress,
        request_id: u32,
        uuid: Uuid,
        offset: u16,
    },
    ReadDescriptor {
        peer: PeerAddress,
        request_id: u32,
        uuid: Uuid,
        offset: u16,
    },
    WriteDescriptor {
        peer: PeerAddress,
        request_id: u32,
        uuid: Uuid,
        offset: u16,
        value: Vec<u8>,
        response_needed: bool,
    },
}

impl AttributeRequest {
    pub fn peer(&self) -> &PeerAddress {
        match self {
            AttributeRequest::ReadCharacteristic { peer, .. }
            | AttributeRequest::ReadDescriptor { peer, .. }
            | AttributeRequest::WriteDescriptor { peer, .. } => peer,
        }
    }

    pub fn request_id(&self) -> u32 {
        match self {
            AttributeRequest::ReadCharacteristic { request_id, .. }
            | AttributeRequest::ReadDescriptor { request_id, .. }
            | AttributeRequest::WriteDescriptor { request_id, .. } => *request_id,
        }
    }
}

/// Response handed back to the transport for serialization onto the radio.
/// These four fields are the entire wire contract this server controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeResponse {
    pub peer: PeerAddress,
    pub request_id: u32,
    pub status: ResponseStatus,
    pub offset: u16,
    pub value: Vec<u8>,
}

impl AttributeResponse {
    fn success(peer: PeerAddress, request_id: u32, value: Vec<u8>) -> Self {
        Self {
            peer,
            request_id,
            status: ResponseStatus::Success,
            offset: 0,
            value,
        }
    }

    fn failure(peer: PeerAddress, request_id: u32) -> Self {
        Self {
            peer,
            request_id,
            status: ResponseStatus::Failure,
            offset: 0,
            value: Vec::new(),
        }
    }
}

// ----------------------------------------------------------------------------
// Endpoint Seam
// ----------------------------------------------------------------------------

/// Events delivered by the attribute-server endpoint capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// A remote peer issued a request.
    Request(AttributeRequest),
    /// A peer connected to the attribute server.
    PeerConnected { peer: PeerAddress },
    /// A peer disconnected; its subscription must not survive.
    PeerDisconnected { peer: PeerAddress },
}

/// Capability handed in by the radio collaborator: delivers peer requests
/// and carries responses back, on the transport's own delivery context.
#[async_trait]
pub trait AttributeEndpoint: Send {
    /// Next event from the transport; `None` once the endpoint shuts down.
    async fn next_event(&mut self) -> Option<ServerEvent>;

    /// Hand one response back to the transport.
    async fn send_response(&mut self, response: AttributeResponse) -> TransportResult<()>;
}

// ----------------------------------------------------------------------------
// Server
// ----------------------------------------------------------------------------

/// Answers remote attribute requests against the table and keeps the
/// subscription registry in step with descriptor writes and disconnects.
#[derive(Clone)]
pub struct GattServer {
    table: Arc<AttributeTable>,
    registry: Arc<SubscriptionRegistry>,
}

impl GattServer {
    pub fn new(table: Arc<AttributeTable>, registry: Arc<SubscriptionRegistry>) -> Self {
        Self { table, registry }
    }

    pub fn table(&self) -> &AttributeTable {
        &self.table
    }

    /// Snapshot of the peers currently eligible for notification pushes.
    pub fn subscribers(&self) -> SmallVec<[PeerAddress; 4]> {
        self.registry.subscribers()
    }

    /// Dispatch one request.
    ///
    /// Returns `None` only for a write whose requester did not ask for a
    /// response. Every other request produces exactly one response, with
    /// FAILURE status iff the target identifier is unrecognized or lacks
    /// the permission the operation needs.
    pub fn handle_request(&self, request: AttributeRequest) -> Option<AttributeResponse> {
        match request {
            AttributeRequest::ReadCharacteristic {
                peer,
                request_id,
                uuid,
                offset,
            } => Some(self.read_characteristic(peer, request_id, uuid, offset)),
            AttributeRequest::ReadDescriptor {
                peer,
                request_id,
                uuid,
                ..
            } => Some(self.read_descriptor(peer, request_id, uuid)),
            AttributeRequest::WriteDescriptor {
                peer,
                request_id,
                uuid,
                value,
                response_needed,
                ..
            } => self.write_descriptor(peer, request_id, uuid, value, response_needed),
        }
    }

    /// Connection-state change to disconnected: purge the peer's
    /// subscription unconditionally.
    pub fn peer_disconnected(&self, peer: &PeerAddress) {
        if self.registry.unsubscribe(peer) {
            info!(peer = %peer, "removed subscription of disconnected peer");
        }
    }

    fn read_characteristic(
        &self,
        peer: PeerAddress,
        request_id: u32,
        uuid: Uuid,
        offset: u16,
    ) -> AttributeResponse {
        match self.table.characteristic(uuid) {
            Some(characteristic) if characteristic.permissions().allows_read() => {
                if offset != 0 {
                    // Full value regardless; offset-aware chunking lives
                    // above this layer.
                    debug!(peer = %peer, %uuid, offset, "ignoring nonzero read offset");
                }
                debug!(peer = %peer, %uuid, "characteristic read");
                AttributeResponse::success(peer, request_id, characteristic.value())
            }
            Some(_) => {
                warn!(peer = %peer, %uuid, "characteristic is not readable");
                AttributeResponse::failure(peer, request_id)
            }
            None => {
                warn!(peer = %peer, %uuid, "read of unknown characteristic");
                AttributeResponse::failure(peer, request_id)
            }
        }
    }

    fn read_descriptor(&self, peer: PeerAddress, request_id: u32, uuid: Uuid) -> AttributeResponse {
        if uuid == CLIENT_CONFIG_DESCRIPTOR_UUID && self.table.descriptor(uuid).is_some() {
            let value = if self.registry.contains(&peer) {
                ENABLE_NOTIFICATIONS_VALUE
            } else {
                DISABLE_NOTIFICATIONS_VALUE
            };
            debug!(peer = %peer, "configuration descriptor read");
            AttributeResponse::success(peer, request_id, value.to_vec())
        } else {
            warn!(peer = %peer, %uuid, "read of unknown descriptor");
            AttributeResponse::failure(peer, request_id)
        }
    }

    fn write_descriptor(
        &self,
        peer: PeerAddress,
        request_id: u32,
        uuid: Uuid,
        value: Vec<u8>,
        response_needed: bool,
    ) -> Option<AttributeResponse> {
        let writable = uuid == CLIENT_CONFIG_DESCRIPTOR_UUID
            && self
                .table
                .descriptor(uuid)
                .map(|descriptor| descriptor.permissions().allows_write())
                .unwrap_or(false);
        if !writable {
            warn!(peer = %peer, %uuid, "write to unknown descriptor");
            return response_needed.then(|| AttributeResponse::failure(peer, request_id));
        }

        if value == ENABLE_NOTIFICATIONS_VALUE {
            if self.registry.subscribe(peer.clone()) {
                info!(peer = %peer, "peer subscribed to notifications");
            }
        } else if value == DISABLE_NOTIFICATIONS_VALUE {
            if self.registry.unsubscribe(&peer) {
                info!(peer = %peer, "peer unsubscribed from notifications");
            }
        } else {
            // Neither sentinel: leave the registry untouched.
            debug!(peer = %peer, "unrecognized configuration value ignored");
        }
        response_needed.then(|| AttributeResponse::success(peer, request_id, Vec::new()))
    }

    /// Serve an endpoint until it shuts down or the worker is cancelled.
    /// Requests from one peer are handled in the order the transport
    /// delivers them.
    pub fn serve(&self, mut endpoint: Box<dyn AttributeEndpoint>) -> Worker {
        let server = self.clone();
        Worker::spawn("gatt-server", move |cancel| async move {
            info!("attribute server started");
            loop {
                let event = tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = endpoint.next_event() => match event {
                        Some(event) => event,
                        None => break,
                    },
                };
                match event {
                    ServerEvent::Request(request) => {
                        if let Some(response) = server.handle_request(request) {
                            if let Err(e) = endpoint.send_response(response).await {
                                warn!(reason = %e, "failed to deliver attribute response");
                            }
                        }
                    }
                    ServerEvent::PeerConnected { peer } => {
                        debug!(peer = %peer, "peer connected to attribute server");
                    }
                    ServerEvent::PeerDisconnected { peer } => {
                        debug!(peer = %peer, "peer disconnected from attribute server");
                        server.peer_disconnected(&peer);
                    }
                }
            }
            info!("attribute server stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Characteristic, Permissions, Service};
    use shortwire_core::protocol::CONTENT_CHARACTERISTIC_UUID;

    fn server() -> GattServer {
        GattServer::new(
            Arc::new(AttributeTable::content_service(b"current".to_vec())),
            Arc::new(SubscriptionRegistry::new()),
        )
    }

    fn peer(name: &str) -> PeerAddress {
        PeerAddress::new(name)
    }

    fn read_characteristic(uuid: Uuid, offset: u16) -> AttributeRequest {
        AttributeRequest::ReadCharacteristic {
            peer: peer("X"),
            request_id: 7,
            uuid,
            offset,
        }
    }

    fn write_config(value: &[u8], response_needed: bool) -> AttributeRequest {
        AttributeRequest::WriteDescriptor {
            peer: peer("X"),
            request_id: 9,
            uuid: CLIENT_CONFIG_DESCRIPTOR_UUID,
            offset: 0,
            value: value.to_vec(),
            response_needed,
        }
    }

    #[test]
    fn known_characteristic_read_returns_the_value() {
        let server = server();
        let response = server
            .handle_request(read_characteristic(CONTENT_CHARACTERISTIC_UUID, 0))
            .expect("reads always answer");
        assert_eq!(response.status, ResponseStatus::Success);
        assert_eq!(response.request_id, 7);
        assert_eq!(response.offset, 0);
        assert_eq!(response.value, b"current");
    }

    #[test]
    fn nonzero_offsets_still_return_the_full_value() {
        let server = server();
        let response = server
            .handle_request(read_characteristic(CONTENT_CHARACTERISTIC_UUID, 3))
            .unwrap();
        assert_eq!(response.status, ResponseStatus::Success);
        assert_eq!(response.value, b"current");
        assert_eq!(response.offset, 0);
    }

    #[test]
    fn unknown_characteristic_read_fails_without_side_effects() {
        let server = server();
        let response = server
            .handle_request(read_characteristic(Uuid::from_u128(0xBAD), 0))
            .unwrap();
        assert_eq!(response.status, ResponseStatus::Failure);
        assert!(response.value.is_empty());
        assert!(server.subscribers().is_empty());
        assert_eq!(
            server
                .table()
                .characteristic(CONTENT_CHARACTERISTIC_UUID)
                .unwrap()
                .value(),
            b"current"
        );
    }

    #[test]
    fn unreadable_characteristic_read_fails() {
        let hidden = Uuid::from_u128(0x51EE9);
        let table = AttributeTable::builder()
            .service(Service::primary(Uuid::from_u128(0x1)).with_characteristic(
                Characteristic::new(hidden, Permissions::default(), b"secret".to_vec()),
            ))
            .build();
        let server = GattServer::new(Arc::new(table), Arc::new(SubscriptionRegistry::new()));

        let response = server.handle_request(read_characteristic(hidden, 0)).unwrap();
        assert_eq!(response.status, ResponseStatus::Failure);
        assert!(response.value.is_empty());
    }

    #[test]
    fn descriptor_read_reflects_subscription_state() {
        let server = server();
        let request = AttributeRequest::ReadDescriptor {
            peer: peer("X"),
            request_id: 1,
            uuid: CLIENT_CONFIG_DESCRIPTOR_UUID,
            offset: 0,
        };

        let response = server.handle_request(request.clone()).unwrap();
        assert_eq!(response.status, ResponseStatus::Success);
        assert_eq!(response.value, DISABLE_NOTIFICATIONS_VALUE.to_vec());

        let _ = server.handle_request(write_config(&ENABLE_NOTIFICATIONS_VALUE, false));
        let response = server.handle_request(request).unwrap();
        assert_eq!(response.value, ENABLE_NOTIFICATIONS_VALUE.to_vec());
    }

    #[test]
    fn unknown_descriptor_read_fails() {
        let server = server();
        let response = server
            .handle_request(AttributeRequest::ReadDescriptor {
                peer: peer("X"),
                request_id: 2,
                uuid: Uuid::from_u128(0xBAD),
                offset: 0,
            })
            .unwrap();
        assert_eq!(response.status, ResponseStatus::Failure);
        assert!(response.value.is_empty());
    }

    #[test]
    fn enable_write_subscribes_and_acknowledges() {
        let server = server();
        let response = server
            .handle_request(write_config(&ENABLE_NOTIFICATIONS_VALUE, true))
            .expect("requester asked for a response");
        assert_eq!(response.status, ResponseStatus::Success);
        assert_eq!(response.request_id, 9);
        assert!(response.value.is_empty());
        assert_eq!(server.subscribers().to_vec(), vec![peer("X")]);
    }

    #[test]
    fn disable_write_unsubscribes() {
        let server = server();
        let _ = server.handle_request(write_config(&ENABLE_NOTIFICATIONS_VALUE, false));
        let response = server.handle_request(write_config(&DISABLE_NOTIFICATIONS_VALUE, true));
        assert_eq!(response.unwrap().status, ResponseStatus::Success);
        assert!(server.subscribers().is_empty());
    }

    #[test]
    fn silent_write_produces_no_response_but_takes_effect() {
        let server = server();
        assert!(server
            .handle_request(write_config(&ENABLE_NOTIFICATIONS_VALUE, false))
            .is_none());
        assert_eq!(server.subscribers().to_vec(), vec![peer("X")]);
    }

    #[test]
    fn unrecognized_config_values_are_ignored() {
        let server = server();
        let response = server.handle_request(write_config(&[0x42, 0x42], true));
        assert_eq!(response.unwrap().status, ResponseStatus::Success);
        assert!(server.subscribers().is_empty());

        let _ = server.handle_request(write_config(&ENABLE_NOTIFICATIONS_VALUE, false));
        let response = server.handle_request(write_config(&[0x42, 0x42], true));
        assert_eq!(response.unwrap().status, ResponseStatus::Success);
        assert_eq!(server.subscribers().to_vec(), vec![peer("X")]);
    }

    #[test]
    fn unknown_descriptor_write_fails_only_when_a_response_is_needed() {
        let server = server();
        let unknown = |response_needed| AttributeRequest::WriteDescriptor {
            peer: peer("X"),
            request_id: 4,
            uuid: Uuid::from_u128(0xBAD),
            offset: 0,
            value: ENABLE_NOTIFICATIONS_VALUE.to_vec(),
            response_needed,
        };

        let response = server.handle_request(unknown(true)).unwrap();
        assert_eq!(response.status, ResponseStatus::Failure);
        assert!(server.handle_request(unknown(false)).is_none());
        // The write content is ignored either way.
        assert!(server.subscribers().is_empty());
    }

    #[test]
    fn disconnect_purges_the_subscription() {
        let server = server();
        let _ = server.handle_request(write_config(&ENABLE_NOTIFICATIONS_VALUE, false));
        assert!(!server.subscribers().is_empty());

        server.peer_disconnected(&peer("X"));
        assert!(server.subscribers().is_empty());

        // Purging an unsubscribed peer is harmless.
        server.peer_disconnected(&peer("X"));
        assert!(server.subscribers().is_empty());
    }

    #[test]
    fn every_answered_request_echoes_its_request_id() {
        let server = server();
        let requests = vec![
            read_characteristic(CONTENT_CHARACTERISTIC_UUID, 0),
            read_characteristic(Uuid::from_u128(0xBAD), 0),
            AttributeRequest::ReadDescriptor {
                peer: peer("X"),
                request_id: 7,
                uuid: CLIENT_CONFIG_DESCRIPTOR_UUID,
                offset: 0,
            },
            write_config(&ENABLE_NOTIFICATIONS_VALUE, true),
        ];
        for request in requests {
            let id = request.request_id();
            let response = server.handle_request(request).expect("one response each");
            assert_eq!(response.request_id, id);
        }
    }
}
