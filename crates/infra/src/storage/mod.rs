//! Role persistence boundary.
//!
//! The facade talks to storage only through [`StorageProvider`] and
//! [`CredentialProvider`]. [`CachingStorageProvider`] is the bundled
//! implementation: an in-memory role table in front of a pluggable [`Backend`].

pub mod backend;
pub mod caching;
pub mod r#trait;

pub use backend::{Backend, InMemoryBackend, Transaction};
pub use caching::CachingStorageProvider;
pub use r#trait::{CredentialProvider, KeyCheck, RoleStore, StorageError, StorageProvider, StorageResult};
