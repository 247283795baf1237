//! TCP realization of the stream transport
//!
//! Stands in for the short-range radio so the demo runs between two
//! terminals. The service identifier is exchanged as a 16-byte preamble on
//! every connection: the dialer sends its id, the listener verifies and
//! acknowledges, and a mismatch refuses the stream - both ends must agree
//! on the identifier or no link comes up, exactly as on the radio.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use shortwire_core::{PeerAddress, TransportError, TransportResult};
use shortwire_link::{StreamConnection, StreamListener, StreamTransport};

const PREAMBLE_ACK: u8 = 0x01;

// ----------------------------------------------------------------------------
// Transport
// ----------------------------------------------------------------------------

/// Stream transport over local TCP.
pub struct TcpTransport {
    bind: SocketAddr,
}

impl TcpTransport {
    /// Transport whose listening endpoints bind to `bind`.
    pub fn new(bind: SocketAddr) -> Self {
        Self { bind }
    }
}

#[async_trait]
impl StreamTransport for TcpTransport {
    fn resolve(&self, address: &str) -> TransportResult<PeerAddress> {
        address
            .parse::<SocketAddr>()
            .map(|_| PeerAddress::new(address))
            .map_err(|_| TransportError::unresolvable(address))
    }

    async fn listen(&self, service_id: Uuid) -> TransportResult<Box<dyn StreamListener>> {
        let listener = TcpListener::bind(self.bind).await?;
        debug!(bind = %self.bind, "TCP listener open");
        Ok(Box::new(TcpStreamListener {
            listener,
            service_id,
            closed: CancellationToken::new(),
        }))
    }

    async fn connect(
        &self,
        peer: &PeerAddress,
        service_id: Uuid,
    ) -> TransportResult<Arc<dyn StreamConnection>> {
        let mut stream = TcpStream::connect(peer.as_str()).await?;

        // Present our service id and wait for the listener's verdict.
        stream.write_all(service_id.as_bytes()).await?;
        let mut ack = [0u8; 1];
        stream.read_exact(&mut ack).await?;
        if ack[0] != PREAMBLE_ACK {
            return Err(TransportError::refused(
                peer.clone(),
                "service identifier rejected",
            ));
        }

        Ok(Arc::new(TcpConnection::new(peer.clone(), stream)))
    }
}

// ----------------------------------------------------------------------------
// Listener
// ----------------------------------------------------------------------------

struct TcpStreamListener {
    listener: TcpListener,
    service_id: Uuid,
    closed: CancellationToken,
}

#[async_trait]
impl StreamListener for TcpStreamListener {
    async fn accept(&self) -> TransportResult<Arc<dyn StreamConnection>> {
        let (mut stream, remote) = tokio::select! {
            _ = self.closed.cancelled() => return Err(TransportError::Closed),
            accepted = self.listener.accept() => accepted?,
        };

        let mut preamble = [0u8; 16];
        stream.read_exact(&mut preamble).await?;
        if Uuid::from_bytes(preamble) != self.service_id {
            let peer = PeerAddress::new(remote.to_string());
            stream.write_all(&[0u8]).await.ok();
            return Err(TransportError::refused(
                peer,
                "dialer presented a different service identifier",
            ));
        }
        stream.write_all(&[PREAMBLE_ACK]).await?;

        let peer = PeerAddress::new(remote.to_string());
        debug!(peer = %peer, "TCP connection accepted");
        Ok(Arc::new(TcpConnection::new(peer, stream)))
    }

    async fn close(&self) {
        self.closed.cancel();
    }
}

// ----------------------------------------------------------------------------
// Connection
// ----------------------------------------------------------------------------

#[derive(Debug)]
struct TcpConnection {
    peer: PeerAddress,
    reader: AsyncMutex<OwnedReadHalf>,
    writer: AsyncMutex<OwnedWriteHalf>,
    closed: CancellationToken,
}

impl TcpConnection {
    fn new(peer: PeerAddress, stream: TcpStream) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            peer,
            reader: AsyncMutex::new(reader),
            writer: AsyncMutex::new(writer),
            closed: CancellationToken::new(),
        }
    }
}

#[async_trait]
impl StreamConnection for TcpConnection {
    fn peer(&self) -> PeerAddress {
        self.peer.clone()
    }

    async fn read(&self, buf: &mut [u8]) -> TransportResult<usize> {
        let mut reader = self.reader.lock().await;
        let n = tokio::select! {
            _ = self.closed.cancelled() => return Err(TransportError::Closed),
            read = reader.read(buf) => read?,
        };
        if n == 0 {
            return Err(TransportError::Closed);
        }
        Ok(n)
    }

    async fn write(&self, data: &[u8]) -> TransportResult<()> {
        if self.closed.is_cancelled() {
            return Err(TransportError::Closed);
        }
        let mut writer = self.writer.lock().await;
        writer.write_all(data).await?;
        writer.flush().await?;
        Ok(())
    }

    async fn close(&self) {
        if !self.closed.is_cancelled() {
            self.closed.cancel();
            let mut writer = self.writer.lock().await;
            let _ = writer.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shortwire_core::protocol::LINK_SERVICE_UUID;
    use std::time::Duration;
    use tokio::time::timeout;

    async fn bound_listener() -> (Box<dyn StreamListener>, SocketAddr, TcpTransport) {
        // Bind to an ephemeral port, then rebuild a transport that knows it.
        let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = probe.local_addr().unwrap();
        drop(probe);
        let transport = TcpTransport::new(addr);
        let listener = transport.listen(LINK_SERVICE_UUID).await.unwrap();
        (listener, addr, transport)
    }

    #[tokio::test]
    async fn preamble_handshake_establishes_a_stream() {
        let (listener, addr, transport) = bound_listener().await;
        let accept = tokio::spawn(async move { listener.accept().await });

        let peer = transport.resolve(&addr.to_string()).unwrap();
        let dialer_side = transport.connect(&peer, LINK_SERVICE_UUID).await.unwrap();
        let listener_side = accept.await.unwrap().unwrap();

        dialer_side.write(b"over tcp").await.unwrap();
        let mut buf = [0u8; 32];
        let n = listener_side.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"over tcp");
    }

    #[tokio::test]
    async fn mismatched_service_identifiers_refuse_the_stream() {
        let (listener, addr, transport) = bound_listener().await;
        let accept = tokio::spawn(async move { listener.accept().await });

        let peer = transport.resolve(&addr.to_string()).unwrap();
        let err = transport
            .connect(&peer, Uuid::from_u128(0x0DD))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Refused { .. }));
        assert!(accept.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn bad_addresses_do_not_resolve() {
        let transport = TcpTransport::new("127.0.0.1:0".parse().unwrap());
        assert!(matches!(
            transport.resolve("not-an-address"),
            Err(TransportError::Unresolvable { .. })
        ));
        assert!(transport.resolve("127.0.0.1:7100").is_ok());
    }

    #[tokio::test]
    async fn close_unblocks_a_pending_read() {
        let (listener, addr, transport) = bound_listener().await;
        let accept = tokio::spawn(async move { listener.accept().await });
        let peer = transport.resolve(&addr.to_string()).unwrap();
        let dialer_side = transport.connect(&peer, LINK_SERVICE_UUID).await.unwrap();
        let _listener_side = accept.await.unwrap().unwrap();

        let pending = Arc::clone(&dialer_side);
        let read = tokio::spawn(async move {
            let mut buf = [0u8; 8];
            pending.read(&mut buf).await
        });
        tokio::task::yield_now().await;

        dialer_side.close().await;
        let result = timeout(Duration::from_secs(1), read)
            .await
            .expect("read must unblock on close")
            .unwrap();
        assert!(matches!(result, Err(TransportError::Closed)));
    }
}
