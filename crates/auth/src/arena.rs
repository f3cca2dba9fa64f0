//! Flat, name-keyed table of roles.
//!
//! Group membership is stored as names pointing back into this table, so a
//! cyclic membership graph is just a set of edges, not a cycle of owners.

use std::collections::HashMap;

use useradmin_core::RoleName;

use crate::role::Role;

/// All roles of one namespace. Always contains `user.anyone`.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleArena {
    roles: HashMap<RoleName, Role>,
}

impl Default for RoleArena {
    fn default() -> Self {
        Self::new()
    }
}

impl RoleArena {
    pub fn new() -> Self {
        let mut roles = HashMap::new();
        roles.insert(RoleName::anyone(), Role::anyone());
        Self { roles }
    }

    /// Build from stored records. `user.anyone` is added when missing.
    pub fn from_roles(roles: impl IntoIterator<Item = Role>) -> Self {
        let mut arena = Self::new();
        for role in roles {
            arena.roles.insert(role.name().clone(), role);
        }
        arena
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.roles.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Role> {
        self.roles.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Role> {
        self.roles.get_mut(name)
    }

    /// Insert a role. Returns `false` (and leaves the arena alone) if the name is taken.
    pub fn insert(&mut self, role: Role) -> bool {
        if self.roles.contains_key(role.name().as_str()) {
            return false;
        }
        self.roles.insert(role.name().clone(), role);
        true
    }

    /// Replace or insert a role record wholesale.
    pub fn upsert(&mut self, role: Role) {
        self.roles.insert(role.name().clone(), role);
    }

    /// Remove a role and prune it from every group.
    ///
    /// Returns the removed role and the names of groups that referenced it.
    /// `user.anyone` can never be removed.
    pub fn remove(&mut self, name: &str) -> Option<(Role, Vec<RoleName>)> {
        if name == useradmin_core::USER_ANYONE {
            return None;
        }
        let removed = self.roles.remove(name)?;

        let mut touched = Vec::new();
        for role in self.roles.values_mut() {
            if role.detach(name) {
                touched.push(role.name().clone());
            }
        }
        Some((removed, touched))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Role> {
        self.roles.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &RoleName> {
        self.roles.keys()
    }

    pub fn into_roles(self) -> impl Iterator<Item = Role> {
        self.roles.into_values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::MembershipKind;

    fn name(s: &str) -> RoleName {
        RoleName::new(s).unwrap()
    }

    #[test]
    fn anyone_always_exists_and_cannot_be_removed() {
        let mut arena = RoleArena::from_roles(vec![]);
        assert!(arena.contains("user.anyone"));
        assert!(arena.remove("user.anyone").is_none());
        assert!(arena.contains("user.anyone"));
    }

    #[test]
    fn insert_refuses_duplicates() {
        let mut arena = RoleArena::new();
        assert!(arena.insert(Role::user(name("alice"))));
        assert!(!arena.insert(Role::group(name("alice"))));
        assert!(!arena.get("alice").unwrap().is_group());
    }

    #[test]
    fn remove_prunes_memberships() {
        let mut arena = RoleArena::new();
        arena.insert(Role::user(name("alice")));
        let mut g1 = Role::group(name("g1"));
        g1.add_member(name("alice"), MembershipKind::Basic).unwrap();
        let mut g2 = Role::group(name("g2"));
        g2.add_member(name("alice"), MembershipKind::Required).unwrap();
        arena.insert(g1);
        arena.insert(g2);

        let (removed, mut touched) = arena.remove("alice").unwrap();
        touched.sort();
        assert_eq!(removed.name().as_str(), "alice");
        assert_eq!(touched, vec![name("g1"), name("g2")]);
        assert!(!arena.get("g1").unwrap().members().unwrap().contains("alice"));
        assert!(!arena.get("g2").unwrap().members().unwrap().contains("alice"));
    }
}
