//! One-shot accept worker
//!
//! Services exactly one inbound connection: open a listening endpoint,
//! block on a single accept, hand the connection to a fresh stream pump,
//! stop listening. One acceptor instance never accepts a second
//! connection.

use std::sync::Arc;

use shortwire_core::{LinkEvent, Worker};
use tracing::{debug, warn};

use crate::manager::LinkShared;

pub(crate) struct AcceptorWorker;

impl AcceptorWorker {
    /// Spawn the accept worker under `generation`. Cancellation closes the
    /// listening endpoint, which unblocks a pending accept.
    pub(crate) fn spawn(shared: Arc<LinkShared>, generation: u64) -> Worker {
        Worker::spawn("acceptor", move |cancel| async move {
            let listener = match shared.transport.listen(shared.config.service_id).await {
                Ok(listener) => listener,
                Err(e) => {
                    warn!(reason = %e, "failed to open listening endpoint");
                    shared.report_failure(
                        generation,
                        LinkEvent::AcceptFailed {
                            reason: e.to_string(),
                        },
                    );
                    return;
                }
            };
            debug!(service = %shared.config.service_id, "listening for one inbound connection");

            let accepted = tokio::select! {
                _ = cancel.cancelled() => {
                    listener.close().await;
                    return;
                }
                accepted = listener.accept() => accepted,
            };
            // One inbound connection per acceptor: stop listening either way.
            listener.close().await;

            match accepted {
                Ok(conn) => {
                    debug!(peer = %conn.peer(), "inbound connection accepted");
                    shared.install_connection(generation, conn).await;
                }
                Err(e) => {
                    warn!(reason = %e, "accept failed");
                    shared.report_failure(
                        generation,
                        LinkEvent::AcceptFailed {
                            reason: e.to_string(),
                        },
                    );
                }
            }
        })
    }
}
