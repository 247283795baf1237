//! In-memory stream transport
//!
//! One [`MemoryNetwork`] is one in-process radio. Devices register an
//! address on it and receive a [`MemoryTransport`] capability; listeners
//! rendezvous with dialers through a per-listener queue, and a dial only
//! completes once the listener's `accept` is awaited, so both calls block
//! against real pending I/O.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, Mutex as AsyncMutex};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use shortwire_core::{PeerAddress, TransportError, TransportResult};
use shortwire_link::{StreamConnection, StreamListener, StreamTransport};

// ----------------------------------------------------------------------------
// Network Hub
// ----------------------------------------------------------------------------

type ListenerKey = (PeerAddress, Uuid);

struct ConnectRequest {
    dialer: PeerAddress,
    reply: oneshot::Sender<Arc<dyn StreamConnection>>,
}

#[derive(Default)]
struct NetworkInner {
    addresses: HashSet<PeerAddress>,
    listeners: HashMap<ListenerKey, mpsc::UnboundedSender<ConnectRequest>>,
}

/// Shared in-memory radio. Clone handles freely; they all point at the same
/// network.
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    inner: Arc<Mutex<NetworkInner>>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device on the network and hand out its transport
    /// capability. Only registered addresses resolve.
    pub fn device(&self, address: &str) -> MemoryTransport {
        let local = PeerAddress::new(address);
        self.inner.lock().addresses.insert(local.clone());
        MemoryTransport {
            network: self.clone(),
            local,
        }
    }

    /// Wait until `address` has a listener registered under `service_id`.
    /// Listeners are opened by a background worker, so a test that dials
    /// right after issuing `listen` on another manager needs this barrier.
    pub async fn until_listening(&self, address: &str, service_id: Uuid) {
        let peer = PeerAddress::new(address);
        loop {
            if self
                .inner
                .lock()
                .listeners
                .contains_key(&(peer.clone(), service_id))
            {
                return;
            }
            tokio::task::yield_now().await;
        }
    }
}

// ----------------------------------------------------------------------------
// Transport Capability
// ----------------------------------------------------------------------------

/// One device's view of the in-memory radio.
pub struct MemoryTransport {
    network: MemoryNetwork,
    local: PeerAddress,
}

impl MemoryTransport {
    /// Address this device is registered under.
    pub fn local_address(&self) -> &PeerAddress {
        &self.local
    }
}

#[async_trait]
impl StreamTransport for MemoryTransport {
    fn resolve(&self, address: &str) -> TransportResult<PeerAddress> {
        let peer = PeerAddress::new(address);
        if self.network.inner.lock().addresses.contains(&peer) {
            Ok(peer)
        } else {
            Err(TransportError::unresolvable(address))
        }
    }

    async fn listen(&self, service_id: Uuid) -> TransportResult<Box<dyn StreamListener>> {
        let key = (self.local.clone(), service_id);
        let (requests_tx, requests_rx) = mpsc::unbounded_channel();
        {
            let mut inner = self.network.inner.lock();
            if inner.listeners.contains_key(&key) {
                return Err(TransportError::refused(
                    self.local.clone(),
                    "address is already listening under this service",
                ));
            }
            inner.listeners.insert(key.clone(), requests_tx);
        }
        Ok(Box::new(MemoryListener {
            network: self.network.clone(),
            key,
            requests: AsyncMutex::new(requests_rx),
            closed: CancellationToken::new(),
        }))
    }

    async fn connect(
        &self,
        peer: &PeerAddress,
        service_id: Uuid,
    ) -> TransportResult<Arc<dyn StreamConnection>> {
        let queue = {
            let inner = self.network.inner.lock();
            inner
                .listeners
                .get(&(peer.clone(), service_id))
                .cloned()
                .ok_or_else(|| TransportError::no_route(peer.clone()))?
        };
        let (reply_tx, reply_rx) = oneshot::channel();
        queue
            .send(ConnectRequest {
                dialer: self.local.clone(),
                reply: reply_tx,
            })
            .map_err(|_| TransportError::no_route(peer.clone()))?;
        // Blocks until the listener's accept is awaited.
        reply_rx.await.map_err(|_| {
            TransportError::refused(peer.clone(), "listener closed before accepting")
        })
    }
}

// ----------------------------------------------------------------------------
// Listener
// ----------------------------------------------------------------------------

struct MemoryListener {
    network: MemoryNetwork,
    key: ListenerKey,
    requests: AsyncMutex<mpsc::UnboundedReceiver<ConnectRequest>>,
    closed: CancellationToken,
}

#[async_trait]
impl StreamListener for MemoryListener {
    async fn accept(&self) -> TransportResult<Arc<dyn StreamConnection>> {
        let mut requests = self.requests.lock().await;
        let request = tokio::select! {
            _ = self.closed.cancelled() => return Err(TransportError::Closed),
            request = requests.recv() => request.ok_or(TransportError::Closed)?,
        };
        let (local_half, remote_half) = pipe(self.key.0.clone(), request.dialer.clone());
        if request.reply.send(remote_half).is_err() {
            return Err(TransportError::refused(
                request.dialer,
                "dialer gave up before the accept completed",
            ));
        }
        Ok(local_half)
    }

    async fn close(&self) {
        self.closed.cancel();
        self.network.inner.lock().listeners.remove(&self.key);
    }
}

// ----------------------------------------------------------------------------
// Connection Pipes
// ----------------------------------------------------------------------------

enum Frame {
    Data(Vec<u8>),
    Shutdown,
}

#[derive(Debug)]
struct ReadHalf {
    frames: mpsc::UnboundedReceiver<Frame>,
    /// Unread remainder of the last frame, for reads into small buffers.
    pending: Vec<u8>,
}

#[derive(Debug)]
struct MemoryConnection {
    peer: PeerAddress,
    frames_tx: mpsc::UnboundedSender<Frame>,
    read_half: AsyncMutex<ReadHalf>,
    closed: CancellationToken,
}

/// Build both ends of a duplex byte pipe between a listener-side device and
/// the dialer that reached it. Returns `(listener_side, dialer_side)`.
fn pipe(
    listener: PeerAddress,
    dialer: PeerAddress,
) -> (Arc<dyn StreamConnection>, Arc<dyn StreamConnection>) {
    let (to_dialer_tx, to_dialer_rx) = mpsc::unbounded_channel();
    let (to_listener_tx, to_listener_rx) = mpsc::unbounded_channel();
    let listener_side: Arc<dyn StreamConnection> = Arc::new(MemoryConnection {
        peer: dialer,
        frames_tx: to_dialer_tx,
        read_half: AsyncMutex::new(ReadHalf {
            frames: to_listener_rx,
            pending: Vec::new(),
        }),
        closed: CancellationToken::new(),
    });
    let dialer_side: Arc<dyn StreamConnection> = Arc::new(MemoryConnection {
        peer: listener,
        frames_tx: to_listener_tx,
        read_half: AsyncMutex::new(ReadHalf {
            frames: to_dialer_rx,
            pending: Vec::new(),
        }),
        closed: CancellationToken::new(),
    });
    (listener_side, dialer_side)
}

#[async_trait]
impl StreamConnection for MemoryConnection {
    fn peer(&self) -> PeerAddress {
        self.peer.clone()
    }

    async fn read(&self, buf: &mut [u8]) -> TransportResult<usize> {
        let mut read_half = self.read_half.lock().await;
        loop {
            if !read_half.pending.is_empty() {
                let n = read_half.pending.len().min(buf.len());
                buf[..n].copy_from_slice(&read_half.pending[..n]);
                read_half.pending.drain(..n);
                return Ok(n);
            }
            let frame = tokio::select! {
                _ = self.closed.cancelled() => return Err(TransportError::Closed),
                frame = read_half.frames.recv() => frame,
            };
            match frame {
                Some(Frame::Data(data)) => read_half.pending = data,
                Some(Frame::Shutdown) | None => return Err(TransportError::Closed),
            }
        }
    }

    async fn write(&self, data: &[u8]) -> TransportResult<()> {
        if self.closed.is_cancelled() {
            return Err(TransportError::Closed);
        }
        self.frames_tx
            .send(Frame::Data(data.to_vec()))
            .map_err(|_| TransportError::Closed)
    }

    async fn close(&self) {
        if !self.closed.is_cancelled() {
            // Tell the peer before unblocking our own reader.
            let _ = self.frames_tx.send(Frame::Shutdown);
            self.closed.cancel();
        }
    }
}
