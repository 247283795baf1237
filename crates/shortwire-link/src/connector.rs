//! Dial worker
//!
//! Dials one peer under the shared service identifier and hands the
//! resulting connection to a fresh stream pump. Address resolution already
//! happened at the command surface; this worker only performs the blocking
//! connect.

use std::sync::Arc;

use shortwire_core::{LinkEvent, PeerAddress, Worker};
use tracing::{debug, warn};

use crate::manager::LinkShared;

pub(crate) struct ConnectorWorker;

impl ConnectorWorker {
    /// Spawn the dial worker under `generation`. Cancellation aborts the
    /// pending connect attempt.
    pub(crate) fn spawn(shared: Arc<LinkShared>, generation: u64, peer: PeerAddress) -> Worker {
        Worker::spawn("connector", move |cancel| async move {
            if shared.config.cancel_discovery_on_dial {
                // Discovery slows down or defeats connection setup on the
                // underlying radio.
                shared.transport.cancel_discovery().await;
            }
            debug!(peer = %peer, service = %shared.config.service_id, "dialing");

            let connected = tokio::select! {
                _ = cancel.cancelled() => return,
                connected = shared.transport.connect(&peer, shared.config.service_id) => connected,
            };

            match connected {
                Ok(conn) => shared.install_connection(generation, conn).await,
                Err(e) => {
                    warn!(peer = %peer, reason = %e, "connect failed");
                    shared.report_failure(
                        generation,
                        LinkEvent::ConnectFailed {
                            peer,
                            reason: e.to_string(),
                        },
                    );
                }
            }
        })
    }
}
