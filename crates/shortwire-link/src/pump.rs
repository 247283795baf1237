//! Stream pump
//!
//! Owns one established connection and moves bytes in both directions: a
//! dedicated read loop delivers inbound data to the event channel, while
//! writes run on the caller's task against the shared connection so they
//! never block the reader.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use shortwire_core::{LinkEvent, PeerAddress, SendError, Worker};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::transport::StreamConnection;

/// Callback invoked exactly once when the read loop terminates, carrying a
/// human-readable cause.
pub(crate) type StopReport = Box<dyn FnOnce(String) + Send + 'static>;

/// Owns one connection and pumps it until the peer goes away or the pump is
/// cancelled. After it stops, no further reads or writes go through this
/// instance; a new connection requires a new pump.
pub struct StreamPump {
    peer: PeerAddress,
    conn: Arc<dyn StreamConnection>,
    events: mpsc::UnboundedSender<LinkEvent>,
    stopped: Arc<AtomicBool>,
    reader: Worker,
}

impl StreamPump {
    /// Take ownership of `conn` and start the read loop.
    pub(crate) fn spawn(
        conn: Arc<dyn StreamConnection>,
        events: mpsc::UnboundedSender<LinkEvent>,
        buffer_capacity: usize,
        on_stopped: StopReport,
    ) -> Self {
        let peer = conn.peer();
        let stopped = Arc::new(AtomicBool::new(false));
        let reader = {
            let conn = Arc::clone(&conn);
            let events = events.clone();
            let stopped = Arc::clone(&stopped);
            let peer = peer.clone();
            Worker::spawn("stream-pump", move |cancel| async move {
                let mut buf = vec![0u8; buffer_capacity];
                let reason = loop {
                    let read = tokio::select! {
                        _ = cancel.cancelled() => break "cancelled".to_string(),
                        read = conn.read(&mut buf) => read,
                    };
                    match read {
                        Ok(len) => {
                            let _ = events.send(LinkEvent::DataReceived {
                                len,
                                data: buf[..len].to_vec(),
                            });
                        }
                        Err(e) => break e.to_string(),
                    }
                };
                conn.close().await;
                stopped.store(true, Ordering::Release);
                debug!(peer = %peer, reason = %reason, "stream pump stopped");
                on_stopped(reason);
            })
        };
        Self {
            peer,
            conn,
            events,
            stopped,
            reader,
        }
    }

    /// Address of the connected peer.
    pub fn peer(&self) -> &PeerAddress {
        &self.peer
    }

    /// True once the read loop has terminated and the connection is
    /// released.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Push bytes to the peer on the caller's task.
    ///
    /// A rejected write leaves the read loop running; the cause goes out as
    /// a [`LinkEvent::WriteFailed`] event in addition to the returned error.
    pub async fn write(&self, data: &[u8]) -> Result<(), SendError> {
        if self.is_stopped() {
            return Err(SendError::NotConnected);
        }
        match self.conn.write(data).await {
            Ok(()) => {
                let _ = self.events.send(LinkEvent::DataSent { len: data.len() });
                Ok(())
            }
            Err(e) => {
                let reason = e.to_string();
                warn!(peer = %self.peer, reason = %reason, "stream write failed");
                let _ = self.events.send(LinkEvent::WriteFailed {
                    reason: reason.clone(),
                });
                Err(SendError::WriteFailed { reason })
            }
        }
    }

    /// Cancel the read loop and wait until the connection is released.
    pub async fn shutdown(&self) {
        self.reader.join().await;
    }
}
