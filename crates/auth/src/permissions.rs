//! Administrative and credential-access permissions.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use useradmin_core::{UserAdminError, UserAdminResult};

/// What a permission allows.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PermissionAction {
    /// Create and remove roles, change memberships. Implies every other action.
    Admin,
    ChangeProperty,
    ChangeCredential,
    GetCredential,
}

impl core::fmt::Display for PermissionAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PermissionAction::Admin => f.write_str("admin"),
            PermissionAction::ChangeProperty => f.write_str("changeProperty"),
            PermissionAction::ChangeCredential => f.write_str("changeCredential"),
            PermissionAction::GetCredential => f.write_str("getCredential"),
        }
    }
}

/// An action on a target key.
///
/// Targets are a key name, a `prefix.*` wildcard, or `*` for every key.
/// Admin permissions use the target `admin`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    action: PermissionAction,
    target: Cow<'static, str>,
}

impl Permission {
    pub fn new(action: PermissionAction, target: impl Into<Cow<'static, str>>) -> Self {
        Self {
            action,
            target: target.into(),
        }
    }

    pub fn admin() -> Self {
        Self::new(PermissionAction::Admin, "admin")
    }

    pub fn change_property(key: impl Into<Cow<'static, str>>) -> Self {
        Self::new(PermissionAction::ChangeProperty, key)
    }

    pub fn change_credential(key: impl Into<Cow<'static, str>>) -> Self {
        Self::new(PermissionAction::ChangeCredential, key)
    }

    pub fn get_credential(key: impl Into<Cow<'static, str>>) -> Self {
        Self::new(PermissionAction::GetCredential, key)
    }

    pub fn action(&self) -> PermissionAction {
        self.action
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Whether holding `self` grants `required`.
    pub fn implies(&self, required: &Permission) -> bool {
        if self.action == PermissionAction::Admin {
            return true;
        }
        if self.action != required.action {
            return false;
        }
        match self.target.as_ref() {
            "*" => true,
            t => match t.strip_suffix('*') {
                Some(prefix) => required.target.starts_with(prefix),
                None => t == required.target,
            },
        }
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.action, self.target)
    }
}

/// Permission check run before any storage call.
pub trait AccessPolicy: Send + Sync {
    fn check(&self, required: &Permission) -> UserAdminResult<()>;
}

/// Grants everything. The default when no security integration is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn check(&self, _required: &Permission) -> UserAdminResult<()> {
        Ok(())
    }
}

/// Grants exactly the listed permissions (and whatever they imply).
#[derive(Debug, Clone, Default)]
pub struct GrantedPermissions {
    granted: Vec<Permission>,
}

impl GrantedPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(mut self, permission: Permission) -> Self {
        self.granted.push(permission);
        self
    }
}

impl AccessPolicy for GrantedPermissions {
    fn check(&self, required: &Permission) -> UserAdminResult<()> {
        if self.granted.iter().any(|p| p.implies(required)) {
            Ok(())
        } else {
            Err(UserAdminError::permission_denied(format!("missing permission '{required}'")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_implies_everything() {
        let admin = Permission::admin();
        assert!(admin.implies(&Permission::get_credential("pwd")));
        assert!(admin.implies(&Permission::change_property("mail")));
    }

    #[test]
    fn wildcard_targets() {
        let any = Permission::change_property("*");
        let prefix = Permission::change_property("org.*");

        assert!(any.implies(&Permission::change_property("mail")));
        assert!(prefix.implies(&Permission::change_property("org.unit")));
        assert!(!prefix.implies(&Permission::change_property("mail")));
        assert!(!any.implies(&Permission::change_credential("mail")));
    }

    #[test]
    fn granted_permissions_deny_by_default() {
        let policy = GrantedPermissions::new().grant(Permission::get_credential("pwd"));

        assert!(policy.check(&Permission::get_credential("pwd")).is_ok());
        assert!(matches!(
            policy.check(&Permission::get_credential("pin")),
            Err(UserAdminError::PermissionDenied(_))
        ));
        assert!(policy.check(&Permission::admin()).is_err());
        assert!(AllowAll.check(&Permission::admin()).is_ok());
    }
}
