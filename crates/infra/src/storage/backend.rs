//! Durable record stores behind the caching provider.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::debug;

use useradmin_auth::Role;
use useradmin_core::RoleName;

use super::r#trait::{StorageError, StorageResult};

/// One atomic unit of work against a [`Backend`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transaction {
    pub upserts: Vec<Role>,
    pub deletes: Vec<RoleName>,
}

impl Transaction {
    pub fn upsert(role: Role) -> Self {
        Self {
            upserts: vec![role],
            deletes: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.deletes.is_empty()
    }
}

/// Durable record store behind a caching provider.
///
/// `commit` must apply the whole transaction or nothing.
pub trait Backend: Send + Sync {
    fn load_all(&self) -> StorageResult<Vec<Role>>;

    fn commit(&self, tx: Transaction) -> StorageResult<()>;
}

/// Backend keeping JSON-encoded role records in process memory.
///
/// Intended for tests/dev. Failures can be injected with [`InMemoryBackend::set_failing`].
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    records: RwLock<HashMap<String, Vec<u8>>>,
    failing: AtomicBool,
    commits: AtomicU64,
    loads: AtomicU64,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every load and commit fails with [`StorageError::Backend`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of successful commits.
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    /// Number of successful full loads.
    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn record_count(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    fn check_available(&self) -> StorageResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("backend unavailable".to_string()));
        }
        Ok(())
    }
}

impl Backend for InMemoryBackend {
    fn load_all(&self) -> StorageResult<Vec<Role>> {
        self.check_available()?;

        let records = self.records.read().map_err(|_| StorageError::Poisoned)?;
        let roles = records
            .iter()
            .map(|(name, bytes)| {
                serde_json::from_slice::<Role>(bytes)
                    .map_err(|e| StorageError::Backend(format!("corrupt record '{name}': {e}")))
            })
            .collect::<StorageResult<Vec<_>>>()?;

        self.loads.fetch_add(1, Ordering::SeqCst);
        debug!(roles = roles.len(), "loaded role records");
        Ok(roles)
    }

    fn commit(&self, tx: Transaction) -> StorageResult<()> {
        self.check_available()?;

        // Encode everything before touching the map so a bad record aborts the whole batch.
        let encoded = tx
            .upserts
            .iter()
            .map(|role| {
                serde_json::to_vec(role)
                    .map(|bytes| (role.name().to_string(), bytes))
                    .map_err(|e| StorageError::Backend(format!("encode '{}': {e}", role.name())))
            })
            .collect::<StorageResult<Vec<_>>>()?;

        let mut records = self.records.write().map_err(|_| StorageError::Poisoned)?;
        for name in &tx.deletes {
            records.remove(name.as_str());
        }
        for (name, bytes) in encoded {
            records.insert(name, bytes);
        }

        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl<B> Backend for std::sync::Arc<B>
where
    B: Backend + ?Sized,
{
    fn load_all(&self) -> StorageResult<Vec<Role>> {
        (**self).load_all()
    }

    fn commit(&self, tx: Transaction) -> StorageResult<()> {
        (**self).commit(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use useradmin_core::AttributeValue;

    fn user(name: &str) -> Role {
        Role::user(RoleName::new(name).unwrap())
    }

    #[test]
    fn commit_then_load_returns_records() {
        let backend = InMemoryBackend::new();
        let mut alice = user("alice");
        alice.set_attribute("mail", AttributeValue::from("alice@example.org"));

        backend.commit(Transaction::upsert(alice.clone())).unwrap();
        let loaded = backend.load_all().unwrap();

        assert_eq!(loaded, vec![alice]);
        assert_eq!(backend.commit_count(), 1);
    }

    #[test]
    fn deletes_and_upserts_apply_together() {
        let backend = InMemoryBackend::new();
        backend.commit(Transaction::upsert(user("alice"))).unwrap();

        backend
            .commit(Transaction {
                upserts: vec![user("bob")],
                deletes: vec![RoleName::new("alice").unwrap()],
            })
            .unwrap();

        let names: Vec<_> = backend
            .load_all()
            .unwrap()
            .into_iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(names, vec!["bob".to_string()]);
    }

    #[test]
    fn failing_backend_rejects_everything() {
        let backend = InMemoryBackend::new();
        backend.set_failing(true);

        assert!(matches!(backend.load_all(), Err(StorageError::Backend(_))));
        assert!(matches!(
            backend.commit(Transaction::upsert(user("alice"))),
            Err(StorageError::Backend(_))
        ));
        assert_eq!(backend.record_count(), 0);
        assert_eq!(backend.commit_count(), 0);

        backend.set_failing(false);
        backend.commit(Transaction::upsert(user("alice"))).unwrap();
        assert_eq!(backend.record_count(), 1);
    }
}
