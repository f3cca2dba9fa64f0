//! Live role handles.
//!
//! A [`RoleHandle`] is a name plus a reference to the owning facade. Every
//! read goes to storage, so two handles for the same role always agree.

use std::fmt;
use std::sync::Arc;

use tracing::error;

use useradmin_auth::{AuthorizationResolver, MembershipKind, Permission};
use useradmin_core::error::ensure_key;
use useradmin_core::{AttributeValue, RoleKind, RoleName, UserAdminError, UserAdminResult};
use useradmin_events::RoleEvent;

use crate::admin::AdminContext;
use crate::storage::{CredentialProvider, StorageError, StorageProvider};

#[derive(Clone)]
pub struct RoleHandle {
    name: RoleName,
    kind: RoleKind,
    ctx: Arc<AdminContext>,
}

impl fmt::Debug for RoleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoleHandle")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

impl PartialEq for RoleHandle {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.kind == other.kind
    }
}

impl Eq for RoleHandle {}

impl RoleHandle {
    pub(crate) fn new(name: RoleName, kind: RoleKind, ctx: Arc<AdminContext>) -> Self {
        Self { name, kind, ctx }
    }

    pub fn name(&self) -> &RoleName {
        &self.name
    }

    pub fn kind(&self) -> RoleKind {
        self.kind
    }

    pub fn is_group(&self) -> bool {
        self.kind == RoleKind::Group
    }

    pub fn attributes(&self) -> Attributes<'_> {
        Attributes { role: self }
    }

    pub fn credentials(&self) -> Credentials<'_> {
        Credentials { role: self }
    }

    /// Verify `value` against the credential stored under `key`.
    pub fn has_credential(&self, key: &str, value: impl Into<AttributeValue>) -> UserAdminResult<bool> {
        self.credentials().has(key, value)
    }

    /// Whether `user` (or, for `None`, an anonymous caller) holds this role.
    pub fn is_implied_by(&self, user: Option<&RoleHandle>) -> UserAdminResult<bool> {
        let arena = self.ctx.snapshot()?;
        let resolver = AuthorizationResolver::new(&arena);
        Ok(resolver.is_implied_by(self.name.as_str(), user.map(|u| u.name.as_str())))
    }

    /// Add `member` as a basic member. `false` if it already was one.
    pub fn add_member(&self, member: &RoleHandle) -> UserAdminResult<bool> {
        self.add(member, MembershipKind::Basic)
    }

    /// Add `member` as a required member. `false` if it already was one.
    pub fn add_required_member(&self, member: &RoleHandle) -> UserAdminResult<bool> {
        self.add(member, MembershipKind::Required)
    }

    /// Remove `member` from both membership sets.
    pub fn remove_member(&self, member: &RoleHandle) -> UserAdminResult<bool> {
        self.ensure_group()?;
        self.ctx.check(Permission::admin())?;
        let removed = self
            .ctx
            .store
            .remove_member(self.name.as_str(), member.name.as_str())?;
        if removed {
            self.changed();
        }
        Ok(removed)
    }

    /// Basic members, or `None` when there are none.
    pub fn members(&self) -> UserAdminResult<Option<Vec<RoleHandle>>> {
        self.ensure_group()?;
        let names = self.ctx.store.get_members(self.name.as_str())?;
        self.resolve(names)
    }

    /// Required members, or `None` when there are none.
    pub fn required_members(&self) -> UserAdminResult<Option<Vec<RoleHandle>>> {
        self.ensure_group()?;
        let names = self.ctx.store.get_required_members(self.name.as_str())?;
        self.resolve(names)
    }

    fn add(&self, member: &RoleHandle, kind: MembershipKind) -> UserAdminResult<bool> {
        self.ensure_group()?;
        self.ctx.check(Permission::admin())?;
        let added = self
            .ctx
            .store
            .add_member(self.name.as_str(), member.name.as_str(), kind)?;
        if added {
            self.changed();
        }
        Ok(added)
    }

    fn resolve(&self, names: Vec<RoleName>) -> UserAdminResult<Option<Vec<RoleHandle>>> {
        if names.is_empty() {
            return Ok(None);
        }
        let mut handles = Vec::with_capacity(names.len());
        for name in names {
            if let Some(role) = self.ctx.store.get_role(name.as_str())? {
                handles.push(RoleHandle::new(name, role.kind(), Arc::clone(&self.ctx)));
            }
        }
        Ok(Some(handles))
    }

    fn ensure_group(&self) -> UserAdminResult<()> {
        if !self.is_group() {
            return Err(UserAdminError::invalid_argument(format!(
                "role '{}' is not a group",
                self.name
            )));
        }
        Ok(())
    }

    fn changed(&self) {
        self.ctx
            .notify(RoleEvent::changed(self.name.clone(), self.kind));
    }
}

/// Log a backend failure during an attribute/credential write and report it
/// as "no previous value". Every other error reaches the caller.
fn swallow<T: Default>(role: &RoleName, op: &str, key: &str, err: StorageError) -> UserAdminResult<T> {
    if err.is_backend() {
        error!(role = %role, op, key, error = %err, "role update not persisted");
        return Ok(T::default());
    }
    Err(err.into())
}

/// Attribute view of a role.
///
/// Writes require `ChangeProperty` on the key. A backend failure during a
/// write is logged and reported as if nothing was there; the role is left
/// unchanged. Writing to a role that no longer exists is `InvalidArgument`.
pub struct Attributes<'a> {
    role: &'a RoleHandle,
}

impl Attributes<'_> {
    pub fn get(&self, key: &str) -> UserAdminResult<Option<AttributeValue>> {
        let role = self.role.ctx.load(&self.role.name)?;
        Ok(role.attribute(key).cloned())
    }

    pub fn keys(&self) -> UserAdminResult<Vec<String>> {
        let role = self.role.ctx.load(&self.role.name)?;
        let mut keys: Vec<String> = role.attributes().keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    pub fn len(&self) -> UserAdminResult<usize> {
        Ok(self.role.ctx.load(&self.role.name)?.attributes().len())
    }

    pub fn is_empty(&self) -> UserAdminResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Store `value` under `key`, returning the previous value.
    pub fn put(
        &self,
        key: &str,
        value: impl Into<AttributeValue>,
    ) -> UserAdminResult<Option<AttributeValue>> {
        ensure_key(key)?;
        let role = self.role;
        role.ctx.check(Permission::change_property(key.to_owned()))?;

        match role
            .ctx
            .store
            .set_role_attribute(role.name.as_str(), key, value.into())
        {
            Ok(previous) => {
                role.changed();
                Ok(previous)
            }
            Err(err) => swallow(&role.name, "put_attribute", key, err),
        }
    }

    pub fn remove(&self, key: &str) -> UserAdminResult<Option<AttributeValue>> {
        ensure_key(key)?;
        let role = self.role;
        role.ctx.check(Permission::change_property(key.to_owned()))?;

        match role.ctx.store.remove_role_attribute(role.name.as_str(), key) {
            Ok(previous) => {
                if previous.is_some() {
                    role.changed();
                }
                Ok(previous)
            }
            Err(err) => swallow(&role.name, "remove_attribute", key, err),
        }
    }

    /// Remove every attribute. Each present key is permission-checked first.
    pub fn clear(&self) -> UserAdminResult<()> {
        let role = self.role;
        let authorize = |key: &str| role.ctx.check(Permission::change_property(key.to_owned()));

        match role.ctx.store.clear_role_attributes(role.name.as_str(), &authorize) {
            Ok(keys) => {
                if !keys.is_empty() {
                    role.changed();
                }
                Ok(())
            }
            Err(err) => swallow(&role.name, "clear_attributes", "*", err),
        }
    }
}

/// Credential view of a user or group.
///
/// Values go through the credential verifier and are never stored in the
/// clear. Reading a stored value back is unsupported; use [`Credentials::has`].
pub struct Credentials<'a> {
    role: &'a RoleHandle,
}

impl Credentials<'_> {
    /// `Ok(None)` for an absent key; `UnsupportedOperation` for a present one.
    pub fn get(&self, key: &str) -> UserAdminResult<Option<AttributeValue>> {
        ensure_key(key)?;
        let role = self.role;
        role.ctx.check(Permission::get_credential(key.to_owned()))?;
        Ok(role
            .ctx
            .store
            .get_user_credential(&role.ctx.verifier, role.name.as_str(), key)?)
    }

    pub fn has(&self, key: &str, value: impl Into<AttributeValue>) -> UserAdminResult<bool> {
        ensure_key(key)?;
        let role = self.role;
        role.ctx.check(Permission::get_credential(key.to_owned()))?;
        Ok(role.ctx.store.has_user_credential(
            &role.ctx.verifier,
            role.name.as_str(),
            key,
            &value.into(),
        )?)
    }

    pub fn keys(&self) -> UserAdminResult<Vec<String>> {
        Ok(self.role.ctx.store.credential_keys(self.role.name.as_str())?)
    }

    /// Store `value` under `key`. Returns `true` if a credential was replaced.
    pub fn put(&self, key: &str, value: impl Into<AttributeValue>) -> UserAdminResult<bool> {
        ensure_key(key)?;
        let role = self.role;
        role.ctx.check(Permission::change_credential(key.to_owned()))?;

        match role.ctx.store.set_user_credential(
            &role.ctx.verifier,
            role.name.as_str(),
            key,
            &value.into(),
        ) {
            Ok(replaced) => {
                role.changed();
                Ok(replaced)
            }
            Err(err) => swallow(&role.name, "put_credential", key, err),
        }
    }

    pub fn remove(&self, key: &str) -> UserAdminResult<bool> {
        ensure_key(key)?;
        let role = self.role;
        role.ctx.check(Permission::change_credential(key.to_owned()))?;

        match role.ctx.store.remove_user_credential(role.name.as_str(), key) {
            Ok(removed) => {
                if removed {
                    role.changed();
                }
                Ok(removed)
            }
            Err(err) => swallow(&role.name, "remove_credential", key, err),
        }
    }

    /// Remove every credential. Each present key is permission-checked first.
    pub fn clear(&self) -> UserAdminResult<()> {
        let role = self.role;
        let authorize = |key: &str| role.ctx.check(Permission::change_credential(key.to_owned()));

        match role.ctx.store.clear_user_credentials(role.name.as_str(), &authorize) {
            Ok(keys) => {
                if !keys.is_empty() {
                    role.changed();
                }
                Ok(())
            }
            Err(err) => swallow(&role.name, "clear_credentials", "*", err),
        }
    }
}

