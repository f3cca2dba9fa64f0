//! `useradmin-events`: role change notifications.
//!
//! Notifications are fanned out through an in-memory bus and delivered to each
//! listener on its own worker thread, so a slow listener never holds up the
//! caller that caused the change.

pub mod bus;
pub mod dispatcher;
pub mod event;
pub mod in_memory_bus;
pub mod listener;

pub use bus::{EventBus, Subscription};
pub use dispatcher::{EventDispatcher, ListenerId};
pub use event::{Event, RoleEvent, RoleEventKind};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use listener::{ListenerWorker, RoleListener, WorkerHandle};
