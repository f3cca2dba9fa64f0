//! The result of resolving a user's roles.

use std::collections::BTreeSet;

use serde::Serialize;

use useradmin_core::RoleName;

/// Everything one user (or the anonymous user) is authorized to act as.
///
/// This is a snapshot: later membership changes are not reflected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Authorization {
    name: Option<RoleName>,
    roles: BTreeSet<RoleName>,
}

impl Authorization {
    pub fn new(name: Option<RoleName>, roles: BTreeSet<RoleName>) -> Self {
        Self { name, roles }
    }

    /// Name of the user, or `None` for the anonymous user.
    pub fn name(&self) -> Option<&RoleName> {
        self.name.as_ref()
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.roles.contains(name)
    }

    /// Sorted names of every implied role, `user.anyone` included.
    pub fn roles(&self) -> Vec<&str> {
        self.roles.iter().map(RoleName::as_str).collect()
    }

    pub fn into_roles(self) -> BTreeSet<RoleName> {
        self.roles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_roles_sorted() {
        let roles = ["user.anyone", "admins", "alice"]
            .into_iter()
            .map(|r| RoleName::new(r).unwrap())
            .collect();
        let auth = Authorization::new(Some(RoleName::new("alice").unwrap()), roles);

        assert_eq!(auth.roles(), vec!["admins", "alice", "user.anyone"]);
        assert!(auth.has_role("admins"));
        assert!(!auth.has_role("root"));
        assert_eq!(auth.name().unwrap().as_str(), "alice");
    }
}
