//! Supervised execution units
//!
//! One [`Worker`] is one unit of concurrent execution with start, cancel,
//! and join semantics, parameterized by the blocking operation it performs.
//! The acceptor, the connector, the stream pump's read loop, and the
//! attribute server loop all run as workers.

use std::future::Future;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Handle to a supervised background execution unit.
///
/// Cancellation is idempotent and safe from any task. [`Worker::join`]
/// guarantees the unit has terminated before it returns. Dropping the handle
/// requests cancellation but does not wait.
#[derive(Debug)]
pub struct Worker {
    name: &'static str,
    cancel: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Worker {
    /// Spawn a worker. The body receives the worker's cancellation token and
    /// is expected to `select!` on it around its blocking call, closing the
    /// underlying endpoint on the cancel path so nothing is left half-open.
    pub fn spawn<F, Fut>(name: &'static str, body: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        debug!(worker = name, "spawning worker");
        let handle = tokio::spawn(body(cancel.clone()));
        Self {
            name,
            cancel,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Request cancellation without waiting for termination. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Cancel and wait until the unit has terminated.
    ///
    /// The first caller observes the join; concurrent callers return once
    /// their cancel request is registered.
    pub async fn join(&self) {
        self.cancel.cancel();
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    warn!(worker = self.name, error = %e, "worker panicked");
                }
            }
            debug!(worker = self.name, "worker joined");
        }
    }

    /// True once the unit's task has run to completion.
    pub fn is_finished(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .map(|handle| handle.is_finished())
            .unwrap_or(true)
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn body_runs_to_completion() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        let worker = Worker::spawn("test", move |_cancel| async move {
            flag.store(true, Ordering::Release);
        });
        worker.join().await;
        assert!(ran.load(Ordering::Acquire));
        assert!(worker.is_finished());
    }

    #[tokio::test]
    async fn join_unblocks_a_pending_body() {
        let worker = Worker::spawn("test", |cancel| async move {
            cancel.cancelled().await;
        });
        timeout(Duration::from_secs(1), worker.join())
            .await
            .expect("join must terminate a blocked worker");
    }

    #[tokio::test]
    async fn cancel_and_join_are_idempotent() {
        let worker = Worker::spawn("test", |cancel| async move {
            cancel.cancelled().await;
        });
        worker.cancel();
        worker.cancel();
        worker.join().await;
        worker.join().await;
        assert!(worker.is_finished());
    }
}
