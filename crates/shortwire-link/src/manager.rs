//! Connection role management
//!
//! The manager owns the single connection role: at most one of the
//! acceptor, the connector, and the active stream pump runs at any instant.
//! State and the active unit live in one mutex-guarded slot, mutated only
//! through the transition methods here; critical sections are O(1) and the
//! lock is never held across an await.
//!
//! Workers report outcomes under the generation they were started with.
//! Every command that changes the role bumps the generation, so a report
//! from a superseded worker is recognized and discarded - that is what
//! keeps a cancelled unit from installing its result after a replacement
//! started.

use std::mem;
use std::sync::Arc;

use parking_lot::Mutex;
use shortwire_core::{
    ConnectionState, LinkConfig, LinkEvent, PeerAddress, SendError, SetupError, Worker,
};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::acceptor::AcceptorWorker;
use crate::connector::ConnectorWorker;
use crate::pump::StreamPump;
use crate::transport::{StreamConnection, StreamTransport};

// ----------------------------------------------------------------------------
// Role Slot
// ----------------------------------------------------------------------------

enum ActiveRole {
    Idle,
    Listening(Worker),
    Connecting(Worker),
    Connected(Arc<StreamPump>),
}

struct RoleSlot {
    generation: u64,
    active: ActiveRole,
}

// ----------------------------------------------------------------------------
// Shared Inner
// ----------------------------------------------------------------------------

pub(crate) struct LinkShared {
    pub(crate) transport: Arc<dyn StreamTransport>,
    pub(crate) config: LinkConfig,
    slot: Mutex<RoleSlot>,
    state_tx: watch::Sender<ConnectionState>,
    events: mpsc::UnboundedSender<LinkEvent>,
}

impl LinkShared {
    /// Publish a state change. Callers hold the slot lock, which keeps the
    /// published sequence consistent with the slot contents.
    fn set_state(&self, state: ConnectionState) {
        if self.state_tx.send_replace(state) != state {
            debug!(state = %state, "connection state changed");
        }
    }

    fn emit(&self, event: LinkEvent) {
        let _ = self.events.send(event);
    }

    /// Worker failure report: resolves the role back to idle and forwards
    /// the failure event, unless the worker was already superseded.
    pub(crate) fn report_failure(&self, generation: u64, event: LinkEvent) {
        {
            let mut slot = self.slot.lock();
            if slot.generation != generation {
                return;
            }
            slot.generation += 1;
            slot.active = ActiveRole::Idle;
            self.set_state(ConnectionState::None);
        }
        self.emit(event);
    }

    /// Install an established connection as the active stream pump.
    ///
    /// Called by whichever worker won the race under `generation`. Any
    /// previously installed pump is cancelled and fully joined before the
    /// replacement starts delivering into the sink, so two pumps never feed
    /// it concurrently.
    pub(crate) async fn install_connection(
        self: Arc<Self>,
        generation: u64,
        conn: Arc<dyn StreamConnection>,
    ) {
        let previous = {
            let mut slot = self.slot.lock();
            if slot.generation != generation {
                None
            } else {
                Some(mem::replace(&mut slot.active, ActiveRole::Idle))
            }
        };
        let Some(previous) = previous else {
            // Superseded while the transport was still establishing.
            conn.close().await;
            return;
        };
        if let ActiveRole::Connected(old) = previous {
            old.shutdown().await;
        }

        let peer = conn.peer();
        let superseded = {
            let mut slot = self.slot.lock();
            if slot.generation != generation {
                true
            } else {
                let shared = Arc::clone(&self);
                let stop_peer = peer.clone();
                let pump = Arc::new(StreamPump::spawn(
                    conn.clone(),
                    self.events.clone(),
                    self.config.read_buffer_capacity,
                    Box::new(move |reason| shared.pump_stopped(generation, stop_peer, reason)),
                ));
                slot.active = ActiveRole::Connected(pump);
                self.set_state(ConnectionState::Connected);
                false
            }
        };
        if superseded {
            conn.close().await;
            return;
        }
        info!(peer = %peer, "stream connection established");
        self.emit(LinkEvent::Connected { peer });
    }

    /// Pump termination report (read failure or peer close). Cancelled
    /// pumps arrive here with a stale generation and are ignored.
    fn pump_stopped(&self, generation: u64, peer: PeerAddress, reason: String) {
        {
            let mut slot = self.slot.lock();
            if slot.generation != generation {
                return;
            }
            slot.generation += 1;
            slot.active = ActiveRole::Idle;
            self.set_state(ConnectionState::None);
        }
        warn!(peer = %peer, reason = %reason, "stream disconnected");
        self.emit(LinkEvent::Disconnected { peer, reason });
    }
}

// ----------------------------------------------------------------------------
// Manager
// ----------------------------------------------------------------------------

/// Command surface for the connection role.
///
/// `listen` and `dial` return immediately after starting the matching
/// worker; outcomes arrive on the event channel and on the state watch.
pub struct LinkManager {
    shared: Arc<LinkShared>,
    state_rx: watch::Receiver<ConnectionState>,
}

impl LinkManager {
    /// Create a manager over a stream transport capability. Returns the
    /// manager and the receiving end of its event channel.
    pub fn new(
        transport: Arc<dyn StreamTransport>,
        config: LinkConfig,
    ) -> (Self, mpsc::UnboundedReceiver<LinkEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::None);
        let shared = Arc::new(LinkShared {
            transport,
            config,
            slot: Mutex::new(RoleSlot {
                generation: 0,
                active: ActiveRole::Idle,
            }),
            state_tx,
            events: events_tx,
        });
        (Self { shared, state_rx }, events_rx)
    }

    /// Current role state.
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Watch for state transitions.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Address of the connected peer, while one is connected.
    pub fn connected_peer(&self) -> Option<PeerAddress> {
        let slot = self.shared.slot.lock();
        match &slot.active {
            ActiveRole::Connected(pump) => Some(pump.peer().clone()),
            _ => None,
        }
    }

    /// Start listening for one inbound connection.
    pub fn listen(&self) -> Result<(), SetupError> {
        let mut slot = self.shared.slot.lock();
        let state = self.state();
        if state.is_active() {
            return Err(SetupError::AlreadyActive { state });
        }
        slot.generation += 1;
        let generation = slot.generation;
        let worker = AcceptorWorker::spawn(Arc::clone(&self.shared), generation);
        slot.active = ActiveRole::Listening(worker);
        self.shared.set_state(ConnectionState::Listening);
        Ok(())
    }

    /// Dial a peer by its raw address.
    pub fn dial(&self, address: &str) -> Result<(), SetupError> {
        let peer = self.shared.transport.resolve(address).map_err(|e| {
            debug!(address, reason = %e, "dial target rejected");
            SetupError::InvalidAddress {
                address: address.to_string(),
            }
        })?;
        let mut slot = self.shared.slot.lock();
        let state = self.state();
        if state.is_active() {
            return Err(SetupError::AlreadyActive { state });
        }
        slot.generation += 1;
        let generation = slot.generation;
        let worker = ConnectorWorker::spawn(Arc::clone(&self.shared), generation, peer);
        slot.active = ActiveRole::Connecting(worker);
        self.shared.set_state(ConnectionState::Connecting);
        Ok(())
    }

    /// Cancel whichever worker or pump is active and wait until it has
    /// terminated. Idempotent; a no-op when the role is already idle.
    pub async fn stop(&self) {
        let previous = {
            let mut slot = self.shared.slot.lock();
            slot.generation += 1;
            let previous = mem::replace(&mut slot.active, ActiveRole::Idle);
            self.shared.set_state(ConnectionState::None);
            previous
        };
        match previous {
            ActiveRole::Idle => {}
            ActiveRole::Listening(worker) | ActiveRole::Connecting(worker) => {
                worker.join().await;
            }
            ActiveRole::Connected(pump) => pump.shutdown().await,
        }
    }

    /// Push bytes down the active stream.
    pub async fn send(&self, data: &[u8]) -> Result<(), SendError> {
        let pump = {
            let slot = self.shared.slot.lock();
            match &slot.active {
                ActiveRole::Connected(pump) => Arc::clone(pump),
                _ => return Err(SendError::NotConnected),
            }
        };
        pump.write(data).await
    }
}
