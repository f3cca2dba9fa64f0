//! Asynchronous delivery of role notifications to registered listeners.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::bus::EventBus;
use crate::event::RoleEvent;
use crate::in_memory_bus::InMemoryEventBus;
use crate::listener::{ListenerWorker, RoleListener, WorkerHandle};

pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Identifies a registered listener.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Fans role events out to listeners without blocking the caller.
///
/// Every listener owns a bounded queue and a worker thread, so each listener
/// sees events in firing order while different listeners proceed
/// independently.
pub struct EventDispatcher {
    bus: InMemoryEventBus<RoleEvent>,
    workers: Mutex<HashMap<ListenerId, WorkerHandle>>,
    next_id: AtomicU64,
}

impl EventDispatcher {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            bus: InMemoryEventBus::with_capacity(queue_capacity),
            workers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn add_listener(&self, listener: Arc<dyn RoleListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let sub = self.bus.subscribe();

        let handle = ListenerWorker::spawn(format!("role-listener-{}", id.0), sub, move |event: RoleEvent| {
            listener.role_changed(&event)
        });

        if let Ok(mut workers) = self.workers.lock() {
            workers.insert(id, handle);
        }
        debug!(listener = id.0, "role listener registered");
        id
    }

    /// Stop delivering to a listener. Events already queued for it are still delivered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let handle = match self.workers.lock() {
            Ok(mut workers) => workers.remove(&id),
            Err(_) => None,
        };
        match handle {
            Some(h) => {
                h.shutdown();
                true
            }
            None => false,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.workers.lock().map(|w| w.len()).unwrap_or(0)
    }

    /// Queue `event` for every listener and return immediately.
    pub fn fire(&self, event: RoleEvent) {
        debug!(role = %event.role(), kind = ?event.kind(), "firing role event");
        if let Err(err) = self.bus.publish(event) {
            warn!(error = ?err, "role event could not be published");
        }
    }

    /// Events dropped because some listener's queue was full.
    pub fn dropped(&self) -> u64 {
        self.bus.dropped()
    }

    /// Deliver everything already queued, then stop all workers.
    pub fn shutdown(&self) {
        let workers: Vec<WorkerHandle> = match self.workers.lock() {
            Ok(mut workers) => workers.drain().map(|(_, h)| h).collect(),
            Err(_) => Vec::new(),
        };
        for handle in workers {
            handle.shutdown();
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl Drop for EventDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl core::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listeners", &self.listener_count())
            .field("dropped", &self.dropped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::Duration;

    use useradmin_core::{RoleKind, RoleName};

    use super::*;

    fn event(name: &str) -> RoleEvent {
        RoleEvent::changed(RoleName::new(name).unwrap(), RoleKind::User)
    }

    fn recording() -> (Arc<dyn RoleListener>, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let listener = move |e: &RoleEvent| -> anyhow::Result<()> {
            sink.lock().unwrap().push(e.role().to_string());
            Ok(())
        };
        (Arc::new(listener), seen)
    }

    #[test]
    fn each_listener_sees_events_in_order() {
        let dispatcher = EventDispatcher::default();
        let (a, seen_a) = recording();
        let (b, seen_b) = recording();
        dispatcher.add_listener(a);
        dispatcher.add_listener(b);

        for name in ["r1", "r2", "r3"] {
            dispatcher.fire(event(name));
        }
        dispatcher.shutdown();

        assert_eq!(*seen_a.lock().unwrap(), vec!["r1", "r2", "r3"]);
        assert_eq!(*seen_b.lock().unwrap(), vec!["r1", "r2", "r3"]);
    }

    #[test]
    fn failing_and_panicking_listeners_are_isolated() {
        let dispatcher = EventDispatcher::default();
        let failing = |_: &RoleEvent| -> anyhow::Result<()> { anyhow::bail!("listener broke") };
        let panicking = |_: &RoleEvent| -> anyhow::Result<()> { panic!("listener exploded") };
        dispatcher.add_listener(Arc::new(failing));
        dispatcher.add_listener(Arc::new(panicking));
        let (ok, seen) = recording();
        dispatcher.add_listener(ok);

        dispatcher.fire(event("r1"));
        dispatcher.fire(event("r2"));
        dispatcher.shutdown();

        assert_eq!(*seen.lock().unwrap(), vec!["r1", "r2"]);
    }

    #[test]
    fn slow_listener_does_not_block_fire() {
        let dispatcher = EventDispatcher::new(1);
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);
        let blocking = move |_: &RoleEvent| -> anyhow::Result<()> {
            let _ = release_rx.lock().unwrap().recv_timeout(Duration::from_secs(5));
            Ok(())
        };
        dispatcher.add_listener(Arc::new(blocking));

        for i in 0..4 {
            dispatcher.fire(event(&format!("r{i}")));
        }

        // One event may be in the listener's hands and one queued; the rest are dropped.
        assert!(dispatcher.dropped() >= 2);
        drop(release_tx);
        dispatcher.shutdown();
    }

    #[test]
    fn removed_listeners_stop_receiving() {
        let dispatcher = EventDispatcher::default();
        let (listener, seen) = recording();
        let id = dispatcher.add_listener(listener);

        dispatcher.fire(event("before"));
        assert!(dispatcher.remove_listener(id));
        assert!(!dispatcher.remove_listener(id));
        dispatcher.fire(event("after"));
        dispatcher.shutdown();

        assert_eq!(*seen.lock().unwrap(), vec!["before"]);
        assert_eq!(dispatcher.listener_count(), 0);
    }
}
