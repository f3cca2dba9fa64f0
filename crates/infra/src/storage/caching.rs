//! Write-through role cache over a backend.

use std::sync::{Mutex, MutexGuard};

use tracing::{debug, warn};

use useradmin_auth::{Filter, MembershipKind, Role, RoleArena};
use useradmin_core::{AttributeValue, RoleKind, RoleName};
use useradmin_credentials::{CredentialDecryptor, CredentialEncryptor};

use super::backend::{Backend, Transaction};
use super::r#trait::{CredentialProvider, KeyCheck, StorageError, StorageProvider, StorageResult};

/// Write-through cache over a [`Backend`].
///
/// The whole role table is held in memory and rebuilt lazily from
/// [`Backend::load_all`]. Every mutation is committed to the backend first and
/// applied to the cache only after the commit succeeded. Any backend failure
/// drops the entire cache, so the next call reloads from durable state.
///
/// A single mutex serializes all operations of one provider.
pub struct CachingStorageProvider<B> {
    backend: B,
    cache: Mutex<Option<RoleArena>>,
}

impl<B: Backend> CachingStorageProvider<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            cache: Mutex::new(None),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// True while a loaded cache is present.
    pub fn is_cached(&self) -> bool {
        self.cache.lock().map(|c| c.is_some()).unwrap_or(false)
    }

    /// Drop the cache; the next operation reloads from the backend.
    pub fn invalidate(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            *cache = None;
        }
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Option<RoleArena>>> {
        self.cache.lock().map_err(|_| StorageError::Poisoned)
    }

    /// Run `f` against the loaded arena, loading it first if needed.
    fn with_arena<T>(
        &self,
        f: impl FnOnce(&B, &mut RoleArena) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let mut guard = self.lock()?;
        let mut arena = match guard.take() {
            Some(arena) => arena,
            None => {
                let arena = RoleArena::from_roles(self.backend.load_all()?);
                debug!(roles = arena.len(), "role cache loaded");
                arena
            }
        };

        let result = f(&self.backend, &mut arena);
        match &result {
            Err(err) if err.is_backend() => {
                warn!(error = %err, "backend failure, role cache invalidated");
            }
            _ => *guard = Some(arena),
        }
        result
    }

    fn read<T>(&self, f: impl FnOnce(&RoleArena) -> StorageResult<T>) -> StorageResult<T> {
        self.with_arena(|_, arena| f(arena))
    }

    /// Apply `f` to a copy of `name`, commit the copy if `f` reports a change,
    /// then swap it into the cache.
    fn mutate<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut Role) -> StorageResult<(T, bool)>,
    ) -> StorageResult<T> {
        self.with_arena(|backend, arena| {
            let mut role = arena
                .get(name)
                .cloned()
                .ok_or_else(|| StorageError::NotFound(name.to_string()))?;
            let (out, changed) = f(&mut role)?;
            if changed {
                backend.commit(Transaction::upsert(role.clone()))?;
                arena.upsert(role);
            }
            Ok(out)
        })
    }

    fn create(&self, name: &RoleName, kind: RoleKind) -> StorageResult<Option<Role>> {
        self.with_arena(|backend, arena| {
            if arena.contains(name.as_str()) {
                return Ok(None);
            }
            let role = Role::new(name.clone(), kind)
                .map_err(|e| StorageError::InvalidRole(e.to_string()))?;
            backend.commit(Transaction::upsert(role.clone()))?;
            arena.insert(role.clone());
            Ok(Some(role))
        })
    }

    fn members(&self, group: &str, kind: MembershipKind) -> StorageResult<Vec<RoleName>> {
        self.read(|arena| {
            let role = arena
                .get(group)
                .ok_or_else(|| StorageError::NotFound(group.to_string()))?;
            let members = role
                .members()
                .ok_or_else(|| StorageError::InvalidRole(format!("'{group}' is not a group")))?;
            let set = match kind {
                MembershipKind::Basic => &members.basic,
                MembershipKind::Required => &members.required,
            };
            Ok(set.iter().cloned().collect())
        })
    }
}

fn invalid(err: useradmin_core::UserAdminError) -> StorageError {
    StorageError::InvalidRole(err.to_string())
}

/// Sorted keys, each accepted by `authorize`. The first refusal aborts.
fn authorized_keys<'k>(
    keys: impl Iterator<Item = &'k String>,
    authorize: &KeyCheck<'_>,
) -> StorageResult<Vec<String>> {
    let mut keys: Vec<String> = keys.cloned().collect();
    keys.sort();
    for key in &keys {
        authorize(key).map_err(StorageError::Rejected)?;
    }
    Ok(keys)
}

impl<B: Backend> StorageProvider for CachingStorageProvider<B> {
    fn create_user(&self, name: &RoleName) -> StorageResult<Option<Role>> {
        self.create(name, RoleKind::User)
    }

    fn create_group(&self, name: &RoleName) -> StorageResult<Option<Role>> {
        self.create(name, RoleKind::Group)
    }

    fn get_role(&self, name: &str) -> StorageResult<Option<Role>> {
        self.read(|arena| Ok(arena.get(name).cloned()))
    }

    fn find_roles(&self, filter: Option<&Filter>) -> StorageResult<Vec<Role>> {
        self.read(|arena| {
            let mut roles: Vec<Role> = arena
                .iter()
                .filter(|role| filter.is_none_or(|f| f.matches(role.attributes())))
                .cloned()
                .collect();
            roles.sort_by(|a, b| a.name().cmp(b.name()));
            Ok(roles)
        })
    }

    fn delete_role(&self, name: &str) -> StorageResult<bool> {
        self.with_arena(|backend, arena| {
            let Some(role) = arena.get(name) else {
                return Ok(false);
            };
            if role.name().is_anyone() {
                return Ok(false);
            }

            let upserts: Vec<Role> = arena
                .iter()
                .filter(|r| r.members().is_some_and(|m| m.contains(name)))
                .map(|r| {
                    let mut r = r.clone();
                    r.detach(name);
                    r
                })
                .collect();
            backend.commit(Transaction {
                upserts,
                deletes: vec![role.name().clone()],
            })?;

            if let Some((_, touched)) = arena.remove(name) {
                debug!(role = name, groups = touched.len(), "role deleted");
            }
            Ok(true)
        })
    }

    fn set_role_attribute(
        &self,
        role: &str,
        key: &str,
        value: AttributeValue,
    ) -> StorageResult<Option<AttributeValue>> {
        self.mutate(role, |r| Ok((r.set_attribute(key, value), true)))
    }

    fn remove_role_attribute(&self, role: &str, key: &str) -> StorageResult<Option<AttributeValue>> {
        self.mutate(role, |r| {
            let previous = r.remove_attribute(key);
            let changed = previous.is_some();
            Ok((previous, changed))
        })
    }

    fn clear_role_attributes(&self, role: &str, authorize: &KeyCheck<'_>) -> StorageResult<Vec<String>> {
        self.mutate(role, |r| {
            let keys = authorized_keys(r.attributes().keys(), authorize)?;
            r.clear_attributes();
            let changed = !keys.is_empty();
            Ok((keys, changed))
        })
    }

    fn set_user_credential(
        &self,
        encryptor: &dyn CredentialEncryptor,
        user: &str,
        key: &str,
        value: &AttributeValue,
    ) -> StorageResult<bool> {
        self.mutate(user, |r| {
            if !r.kind().has_credentials() {
                return Err(StorageError::InvalidRole(format!("'{user}' cannot hold credentials")));
            }
            let record = encryptor.encrypt(key, value).map_err(StorageError::Rejected)?;
            Ok((r.set_credential(key, record).is_some(), true))
        })
    }

    fn remove_user_credential(&self, user: &str, key: &str) -> StorageResult<bool> {
        self.mutate(user, |r| {
            let removed = r.remove_credential(key).is_some();
            Ok((removed, removed))
        })
    }

    fn clear_user_credentials(&self, user: &str, authorize: &KeyCheck<'_>) -> StorageResult<Vec<String>> {
        self.mutate(user, |r| {
            let keys = authorized_keys(r.credentials().keys(), authorize)?;
            r.clear_credentials();
            let changed = !keys.is_empty();
            Ok((keys, changed))
        })
    }

    fn get_members(&self, group: &str) -> StorageResult<Vec<RoleName>> {
        self.members(group, MembershipKind::Basic)
    }

    fn get_required_members(&self, group: &str) -> StorageResult<Vec<RoleName>> {
        self.members(group, MembershipKind::Required)
    }

    fn add_member(&self, group: &str, member: &str, kind: MembershipKind) -> StorageResult<bool> {
        self.with_arena(|backend, arena| {
            let member = arena
                .get(member)
                .map(|m| m.name().clone())
                .ok_or_else(|| StorageError::NotFound(member.to_string()))?;
            let mut role = arena
                .get(group)
                .cloned()
                .ok_or_else(|| StorageError::NotFound(group.to_string()))?;

            if !role.add_member(member, kind).map_err(invalid)? {
                return Ok(false);
            }
            backend.commit(Transaction::upsert(role.clone()))?;
            arena.upsert(role);
            Ok(true)
        })
    }

    fn remove_member(&self, group: &str, member: &str) -> StorageResult<bool> {
        self.mutate(group, |r| {
            let removed = r.remove_member(member).map_err(invalid)?;
            Ok((removed, removed))
        })
    }
}

impl<B: Backend> CredentialProvider for CachingStorageProvider<B> {
    fn get_user_credential(
        &self,
        decryptor: &dyn CredentialDecryptor,
        user: &str,
        key: &str,
    ) -> StorageResult<Option<AttributeValue>> {
        self.read(|arena| {
            let role = arena
                .get(user)
                .ok_or_else(|| StorageError::NotFound(user.to_string()))?;
            match role.credential(key) {
                None => Ok(None),
                Some(record) => decryptor
                    .decrypt(key, record)
                    .map(Some)
                    .map_err(StorageError::Rejected),
            }
        })
    }

    fn has_user_credential(
        &self,
        decryptor: &dyn CredentialDecryptor,
        user: &str,
        key: &str,
        candidate: &AttributeValue,
    ) -> StorageResult<bool> {
        self.read(|arena| {
            let role = arena
                .get(user)
                .ok_or_else(|| StorageError::NotFound(user.to_string()))?;
            match role.credential(key) {
                None => Ok(false),
                Some(record) => decryptor
                    .verify(key, candidate, record)
                    .map_err(StorageError::Rejected),
            }
        })
    }

    fn credential_keys(&self, user: &str) -> StorageResult<Vec<String>> {
        self.read(|arena| {
            let role = arena
                .get(user)
                .ok_or_else(|| StorageError::NotFound(user.to_string()))?;
            let mut keys: Vec<String> = role.credentials().keys().cloned().collect();
            keys.sort();
            Ok(keys)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use useradmin_credentials::CredentialVerifier;

    use super::*;
    use crate::storage::InMemoryBackend;

    fn provider() -> CachingStorageProvider<Arc<InMemoryBackend>> {
        CachingStorageProvider::new(Arc::new(InMemoryBackend::new()))
    }

    fn name(s: &str) -> RoleName {
        RoleName::new(s).unwrap()
    }

    #[test]
    fn create_is_idempotent_per_name() {
        let p = provider();
        assert!(p.create_user(&name("alice")).unwrap().is_some());
        assert!(p.create_group(&name("alice")).unwrap().is_none());
        assert_eq!(p.get_role("alice").unwrap().unwrap().kind(), RoleKind::User);
    }

    #[test]
    fn anyone_is_always_present_and_cannot_be_deleted() {
        let p = provider();
        assert!(p.get_role("user.anyone").unwrap().is_some());
        assert!(!p.delete_role("user.anyone").unwrap());
        assert!(p.get_role("user.anyone").unwrap().is_some());
    }

    #[test]
    fn delete_prunes_memberships_in_one_commit() {
        let p = provider();
        p.create_user(&name("bob")).unwrap();
        p.create_group(&name("g1")).unwrap();
        p.create_group(&name("g2")).unwrap();
        p.add_member("g1", "bob", MembershipKind::Basic).unwrap();
        p.add_member("g2", "bob", MembershipKind::Required).unwrap();

        let before = p.backend().commit_count();
        assert!(p.delete_role("bob").unwrap());
        assert_eq!(p.backend().commit_count(), before + 1);

        assert!(p.get_members("g1").unwrap().is_empty());
        assert!(p.get_required_members("g2").unwrap().is_empty());

        // Durable state agrees after a reload.
        p.invalidate();
        assert!(p.get_role("bob").unwrap().is_none());
        assert!(p.get_members("g1").unwrap().is_empty());
    }

    #[test]
    fn add_existing_member_does_not_write() {
        let p = provider();
        p.create_user(&name("bob")).unwrap();
        p.create_group(&name("g")).unwrap();

        assert!(p.add_member("g", "bob", MembershipKind::Basic).unwrap());
        let commits = p.backend().commit_count();
        assert!(!p.add_member("g", "bob", MembershipKind::Basic).unwrap());
        assert_eq!(p.backend().commit_count(), commits);
    }

    #[test]
    fn add_member_validates_both_roles() {
        let p = provider();
        p.create_user(&name("bob")).unwrap();
        p.create_user(&name("carol")).unwrap();
        p.create_group(&name("g")).unwrap();

        assert!(matches!(
            p.add_member("g", "nobody", MembershipKind::Basic),
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            p.add_member("carol", "bob", MembershipKind::Basic),
            Err(StorageError::InvalidRole(_))
        ));
        // A group may list itself.
        assert!(p.add_member("g", "g", MembershipKind::Basic).unwrap());
    }

    #[test]
    fn backend_failure_invalidates_cache_and_keeps_durable_state() {
        let p = provider();
        p.create_user(&name("alice")).unwrap();
        p.set_role_attribute("alice", "mail", AttributeValue::from("a@x"))
            .unwrap();
        assert!(p.is_cached());

        p.backend().set_failing(true);
        let err = p
            .set_role_attribute("alice", "mail", AttributeValue::from("b@x"))
            .unwrap_err();
        assert!(err.is_backend());
        assert!(!p.is_cached());

        // Reads fail while the backend is down since the cache is gone.
        assert!(p.get_role("alice").is_err());

        p.backend().set_failing(false);
        let alice = p.get_role("alice").unwrap().unwrap();
        assert_eq!(alice.attribute("mail"), Some(&AttributeValue::from("a@x")));
        assert_eq!(p.backend().load_count(), 2);
    }

    #[test]
    fn invalid_requests_keep_the_cache() {
        let p = provider();
        p.create_user(&name("alice")).unwrap();
        assert!(p.get_members("alice").is_err());
        assert!(p.set_role_attribute("ghost", "k", AttributeValue::from("v")).is_err());
        assert!(p.is_cached());
        assert_eq!(p.backend().load_count(), 1);
    }

    #[test]
    fn find_roles_applies_filter() {
        let p = provider();
        p.create_user(&name("alice")).unwrap();
        p.create_user(&name("bob")).unwrap();
        p.set_role_attribute("alice", "dept", AttributeValue::from("ops"))
            .unwrap();
        p.set_role_attribute("bob", "dept", AttributeValue::from("dev"))
            .unwrap();

        let filter = Filter::parse("(dept=o*)").unwrap();
        let found: Vec<_> = p
            .find_roles(Some(&filter))
            .unwrap()
            .into_iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(found, vec!["alice".to_string()]);

        // Unfiltered includes the predefined role.
        assert_eq!(p.find_roles(None).unwrap().len(), 3);
    }

    #[test]
    fn credentials_verify_but_never_decrypt() {
        let p = provider();
        let verifier = CredentialVerifier::default();
        p.create_user(&name("alice")).unwrap();

        let secret = AttributeValue::from("secret");
        assert!(!p.set_user_credential(&verifier, "alice", "pwd", &secret).unwrap());
        assert!(p.set_user_credential(&verifier, "alice", "pwd", &secret).unwrap());

        assert!(p.has_user_credential(&verifier, "alice", "pwd", &secret).unwrap());
        assert!(!p
            .has_user_credential(&verifier, "alice", "pwd", &AttributeValue::from("nope"))
            .unwrap());
        assert!(matches!(
            p.get_user_credential(&verifier, "alice", "pwd"),
            Err(StorageError::Rejected(_))
        ));
        assert_eq!(p.get_user_credential(&verifier, "alice", "other").unwrap(), None);
        assert_eq!(p.credential_keys("alice").unwrap(), vec!["pwd".to_string()]);

        assert!(p.remove_user_credential("alice", "pwd").unwrap());
        assert!(!p.has_user_credential(&verifier, "alice", "pwd", &secret).unwrap());
    }
    #[test]
    fn clear_checks_every_key_under_the_lock() {
        let p = provider();
        p.create_user(&name("alice")).unwrap();
        p.set_role_attribute("alice", "mail", AttributeValue::from("a@x"))
            .unwrap();
        p.set_role_attribute("alice", "phone", AttributeValue::from("555"))
            .unwrap();
        let commits = p.backend().commit_count();

        let only_mail = |key: &str| {
            if key == "mail" {
                Ok(())
            } else {
                Err(useradmin_core::UserAdminError::permission_denied(key.to_string()))
            }
        };
        assert!(matches!(
            p.clear_role_attributes("alice", &only_mail),
            Err(StorageError::Rejected(_))
        ));
        assert_eq!(p.backend().commit_count(), commits);
        assert_eq!(p.get_role("alice").unwrap().unwrap().attributes().len(), 2);
        assert!(p.is_cached());

        let cleared = p.clear_role_attributes("alice", &|_: &str| Ok(())).unwrap();
        assert_eq!(cleared, vec!["mail".to_string(), "phone".to_string()]);
        assert!(p.get_role("alice").unwrap().unwrap().attributes().is_empty());

        // Nothing left: no write.
        let commits = p.backend().commit_count();
        assert!(p.clear_role_attributes("alice", &|_: &str| Ok(())).unwrap().is_empty());
        assert_eq!(p.backend().commit_count(), commits);
    }
}
