//! Listener workers: one thread per listener, fed from a bus subscription.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::bus::Subscription;
use crate::event::RoleEvent;

/// Receives role notifications.
///
/// Called on a dedicated worker thread. Errors and panics are logged and do not
/// affect other listeners or the operation that fired the event.
pub trait RoleListener: Send + Sync + 'static {
    fn role_changed(&self, event: &RoleEvent) -> anyhow::Result<()>;
}

impl<F> RoleListener for F
where
    F: Fn(&RoleEvent) -> anyhow::Result<()> + Send + Sync + 'static,
{
    fn role_changed(&self, event: &RoleEvent) -> anyhow::Result<()> {
        self(event)
    }
}

/// Handle to control and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request shutdown and wait for the worker to stop.
    ///
    /// Messages already queued for the worker are handled before it exits.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Generic listener worker loop.
///
/// - Consumes one subscription in order
/// - Isolates handler errors and panics
/// - Drains pending messages on shutdown
#[derive(Debug)]
pub struct ListenerWorker;

impl ListenerWorker {
    /// Spawn a worker thread that feeds every message of `sub` to `handler`.
    pub fn spawn<M, H, E>(name: impl Into<String>, sub: Subscription<M>, mut handler: H) -> WorkerHandle
    where
        M: Send + 'static,
        H: FnMut(M) -> Result<(), E> + Send + 'static,
        E: core::fmt::Debug + Send + 'static,
    {
        let name = name.into();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let join = thread::Builder::new()
            .name(name.clone())
            .spawn(move || worker_loop(&name, sub, shutdown_rx, &mut handler))
            .expect("failed to spawn listener worker thread");

        WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        }
    }
}

fn worker_loop<M, H, E>(
    name: &str,
    sub: Subscription<M>,
    shutdown_rx: mpsc::Receiver<()>,
    handler: &mut H,
) where
    H: FnMut(M) -> Result<(), E>,
    E: core::fmt::Debug,
{
    let tick = Duration::from_millis(50);

    loop {
        if shutdown_rx.try_recv().is_ok() {
            while let Ok(msg) = sub.try_recv() {
                handle_one(name, handler, msg);
            }
            break;
        }

        match sub.recv_timeout(tick) {
            Ok(msg) => handle_one(name, handler, msg),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn handle_one<M, H, E>(name: &str, handler: &mut H, msg: M)
where
    H: FnMut(M) -> Result<(), E>,
    E: core::fmt::Debug,
{
    match catch_unwind(AssertUnwindSafe(|| handler(msg))) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!(worker = name, error = ?err, "listener failed"),
        Err(_) => warn!(worker = name, "listener panicked"),
    }
}
