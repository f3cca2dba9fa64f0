//! Administrative facade over a role store.

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use useradmin_auth::{
    AccessPolicy, AllowAll, Authorization, AuthorizationResolver, Filter, Permission, Role,
    RoleArena,
};
use useradmin_auth::filter::ValuePattern;
use useradmin_core::{RoleKind, RoleName, UserAdminError, UserAdminResult};
use useradmin_credentials::CredentialVerifier;
use useradmin_events::{EventDispatcher, ListenerId, RoleEvent, RoleListener};

use crate::config::UserAdminConfig;
use crate::handle::RoleHandle;
use crate::storage::{CachingStorageProvider, InMemoryBackend, RoleStore, StorageProvider};

/// State shared by the facade and every handle it gives out.
pub(crate) struct AdminContext {
    pub(crate) store: Arc<dyn RoleStore>,
    pub(crate) verifier: CredentialVerifier,
    policy: Arc<dyn AccessPolicy>,
    events: EventDispatcher,
}

impl AdminContext {
    pub(crate) fn check(&self, required: Permission) -> UserAdminResult<()> {
        self.policy.check(&required).inspect_err(|err| {
            warn!(permission = %required, error = %err, "permission denied");
        })
    }

    pub(crate) fn notify(&self, event: RoleEvent) {
        self.events.fire(event);
    }

    /// Current record for `name`; a handle whose role was removed is invalid.
    pub(crate) fn load(&self, name: &RoleName) -> UserAdminResult<Role> {
        self.store.get_role(name.as_str())?.ok_or_else(|| {
            UserAdminError::invalid_argument(format!("role '{name}' no longer exists"))
        })
    }

    /// Detached copy of the whole graph for one resolution.
    pub(crate) fn snapshot(&self) -> UserAdminResult<RoleArena> {
        Ok(RoleArena::from_roles(self.store.find_roles(None)?))
    }
}

/// Entry point for role administration.
///
/// Mutations are permission-checked before storage is touched, and a change
/// notification is queued for listeners only after storage accepted the
/// change. Cloning is cheap; clones share storage and listeners.
#[derive(Clone)]
pub struct UserAdmin {
    ctx: Arc<AdminContext>,
}

impl fmt::Debug for UserAdmin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserAdmin")
            .field("verifier", &self.ctx.verifier)
            .field("listeners", &self.ctx.events.listener_count())
            .finish()
    }
}

impl UserAdmin {
    /// Facade that grants every permission.
    pub fn new<S>(store: S, config: UserAdminConfig) -> UserAdminResult<Self>
    where
        S: RoleStore + 'static,
    {
        Self::with_policy(store, config, Arc::new(AllowAll))
    }

    pub fn with_policy<S>(
        store: S,
        config: UserAdminConfig,
        policy: Arc<dyn AccessPolicy>,
    ) -> UserAdminResult<Self>
    where
        S: RoleStore + 'static,
    {
        config.validate()?;
        let verifier = CredentialVerifier::new(config.credentials.clone())?;
        info!(
            hash_algorithm = %config.credentials.hash_algorithm,
            salt_length = config.credentials.salt_length,
            listener_queue_capacity = config.listener_queue_capacity,
            "user admin started"
        );

        Ok(Self {
            ctx: Arc::new(AdminContext {
                store: Arc::new(store),
                verifier,
                policy,
                events: EventDispatcher::new(config.listener_queue_capacity),
            }),
        })
    }

    /// Facade over a fresh in-memory store with default settings.
    pub fn in_memory() -> UserAdminResult<Self> {
        Self::new(
            CachingStorageProvider::new(InMemoryBackend::new()),
            UserAdminConfig::default(),
        )
    }

    fn handle(&self, role: &Role) -> RoleHandle {
        RoleHandle::new(role.name().clone(), role.kind(), Arc::clone(&self.ctx))
    }

    /// Create a user or group. `None` if a role with that name already exists.
    pub fn create_role(&self, name: &str, kind: RoleKind) -> UserAdminResult<Option<RoleHandle>> {
        let name = RoleName::new(name)?;
        if !kind.is_creatable() {
            return Err(UserAdminError::invalid_argument(format!(
                "roles of kind {kind} cannot be created"
            )));
        }
        self.ctx.check(Permission::admin())?;

        let created = match kind {
            RoleKind::Group => self.ctx.store.create_group(&name)?,
            _ => self.ctx.store.create_user(&name)?,
        };
        let Some(role) = created else {
            return Ok(None);
        };

        info!(role = %name, kind = %kind, "role created");
        self.ctx.notify(RoleEvent::created(name, kind));
        Ok(Some(self.handle(&role)))
    }

    /// Remove a role and every membership edge pointing at it.
    ///
    /// `false` if there is no such role. `user.anyone` is never removed.
    pub fn remove_role(&self, name: &str) -> UserAdminResult<bool> {
        let name = RoleName::new(name)?;
        self.ctx.check(Permission::admin())?;
        if name.is_anyone() {
            warn!(role = %name, "refusing to remove the predefined role");
            return Ok(false);
        }

        let Some(role) = self.ctx.store.get_role(name.as_str())? else {
            return Ok(false);
        };
        if !self.ctx.store.delete_role(name.as_str())? {
            return Ok(false);
        }

        info!(role = %name, "role removed");
        self.ctx.notify(RoleEvent::removed(name, role.kind()));
        Ok(true)
    }

    pub fn get_role(&self, name: &str) -> UserAdminResult<Option<RoleHandle>> {
        Ok(self.ctx.store.get_role(name)?.map(|r| self.handle(&r)))
    }

    /// Roles whose attributes match an LDAP-style filter; all roles for `None`.
    ///
    /// Returns `None` rather than an empty list when nothing matches.
    pub fn find_roles(&self, filter: Option<&str>) -> UserAdminResult<Option<Vec<RoleHandle>>> {
        let filter = filter.map(Filter::parse).transpose()?;
        let roles = self.ctx.store.find_roles(filter.as_ref())?;
        if roles.is_empty() {
            return Ok(None);
        }
        Ok(Some(roles.iter().map(|r| self.handle(r)).collect()))
    }

    /// The one user or group whose text attribute `key` equals `value`.
    ///
    /// `None` when no role or more than one role matches.
    pub fn get_user(&self, key: &str, value: &str) -> UserAdminResult<Option<RoleHandle>> {
        let filter = Filter::Equal {
            key: key.to_owned(),
            pattern: ValuePattern::exact(value),
        };
        let mut users = self
            .ctx
            .store
            .find_roles(Some(&filter))?
            .into_iter()
            .filter(|r| r.kind().has_credentials());

        match (users.next(), users.next()) {
            (Some(user), None) => Ok(Some(self.handle(&user))),
            _ => Ok(None),
        }
    }

    /// Every role implied by `user`, or by an anonymous caller for `None`.
    pub fn get_authorization(&self, user: Option<&RoleHandle>) -> UserAdminResult<Authorization> {
        let arena = self.ctx.snapshot()?;
        let resolver = AuthorizationResolver::new(&arena);
        Ok(resolver.authorization(user.map(RoleHandle::name)))
    }

    /// One membership chain through which `user` holds `role`, or `None`.
    pub fn explain(
        &self,
        role: &str,
        user: Option<&RoleHandle>,
    ) -> UserAdminResult<Option<Vec<RoleName>>> {
        let arena = self.ctx.snapshot()?;
        let resolver = AuthorizationResolver::new(&arena);
        Ok(resolver.explain(role, user.map(|u| u.name().as_str())))
    }

    pub fn add_listener(&self, listener: Arc<dyn RoleListener>) -> ListenerId {
        self.ctx.events.add_listener(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.ctx.events.remove_listener(id)
    }

    /// Notifications dropped because a listener queue was full.
    pub fn dropped_events(&self) -> u64 {
        self.ctx.events.dropped()
    }

    /// Stop all listeners after delivering what is already queued.
    pub fn shutdown(&self) {
        self.ctx.events.shutdown();
    }
}
