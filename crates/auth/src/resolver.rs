//! Role implication over a (possibly cyclic) membership graph.
//!
//! A role R is implied by user U when U is authorized to act as R:
//!
//! 1. R is U itself
//! 2. R is `user.anyone`
//! 3. R is a group, at least one basic member implies U, and every required
//!    member implies U
//!
//! The walk carries an explicit visited set. Re-entering a role already on the
//! current path is a loop and counts as "not implied" for that branch only;
//! names are popped on the way back so sibling branches never see each other.
//!
//! Before walking, one linear pass collects the groups from which U or
//! `user.anyone` can be reached over basic-member edges. Any other group can
//! never be implied and is answered without descending into it, which keeps
//! dense cycles the user is not part of cheap.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::trace;

use useradmin_core::{RoleName, USER_ANYONE};

use crate::arena::RoleArena;
use crate::authorization::Authorization;
use crate::role::Role;

/// Outcome of one implication test.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Implication {
    Implied,
    NotImplied,
    /// The role was already on the current path.
    LoopDetected,
}

impl Implication {
    pub fn is_implied(self) -> bool {
        self == Implication::Implied
    }
}

/// Read-only resolver over a snapshot of the role graph.
#[derive(Debug, Clone, Copy)]
pub struct AuthorizationResolver<'a> {
    arena: &'a RoleArena,
}

/// Groups that can reach the user under test over basic-member edges.
type Reach<'a> = HashSet<&'a str>;

impl<'a> AuthorizationResolver<'a> {
    pub fn new(arena: &'a RoleArena) -> Self {
        Self { arena }
    }

    /// Does `user` imply `role`? `None` is the anonymous user, who implies
    /// only `user.anyone`.
    pub fn is_implied_by(&self, role: &str, user: Option<&str>) -> bool {
        match self.arena.get(role) {
            Some(role) => self.implication(role, user, &mut HashSet::new()).is_implied(),
            None => false,
        }
    }

    /// Implication test for one role with a caller-supplied visited set.
    ///
    /// The set is left as it was found when this returns.
    pub fn implication<'r>(
        &'r self,
        role: &'r Role,
        user: Option<&str>,
        visited: &mut HashSet<&'r str>,
    ) -> Implication {
        let reach = self.reaching(user);
        self.walk(role, user, visited, &reach)
    }

    /// Every group with a chain of basic memberships down to `user` or
    /// `user.anyone`. Linear in the number of membership edges.
    fn reaching(&self, user: Option<&str>) -> Reach<'a> {
        let mut parents: HashMap<&'a str, Vec<&'a str>> = HashMap::new();
        for role in self.arena.iter() {
            if let Some(members) = role.members() {
                for member in &members.basic {
                    parents
                        .entry(member.as_str())
                        .or_default()
                        .push(role.name().as_str());
                }
            }
        }

        let mut stack: Vec<&'a str> = Vec::new();
        for seed in [Some(USER_ANYONE), user].into_iter().flatten() {
            if let Some(groups) = parents.get(seed) {
                stack.extend(groups.iter().copied());
            }
        }

        let mut reach = Reach::new();
        while let Some(name) = stack.pop() {
            if reach.insert(name) {
                if let Some(groups) = parents.get(name) {
                    stack.extend(groups.iter().copied());
                }
            }
        }
        reach
    }

    fn walk<'r>(
        &'r self,
        role: &'r Role,
        user: Option<&str>,
        visited: &mut HashSet<&'r str>,
        reach: &Reach<'_>,
    ) -> Implication {
        let name = role.name().as_str();

        if user == Some(name) || name == USER_ANYONE {
            return Implication::Implied;
        }
        // Anonymous callers hold `user.anyone` and nothing derived from it.
        if user.is_none() || !reach.contains(name) {
            return Implication::NotImplied;
        }
        if visited.contains(name) {
            trace!(role = name, "membership loop detected");
            return Implication::LoopDetected;
        }
        let Some(members) = role.members() else {
            return Implication::NotImplied;
        };

        visited.insert(name);

        // Required members first: one failure settles the answer. A dangling
        // required reference cannot imply anyone, so it fails closed.
        let required_ok = members.required.iter().all(|member| {
            self.arena
                .get(member.as_str())
                .is_some_and(|m| self.walk(m, user, visited, reach).is_implied())
        });

        let implied = required_ok
            && members.basic.iter().any(|member| match self.arena.get(member.as_str()) {
                Some(m) => self.walk(m, user, visited, reach).is_implied(),
                None => false,
            });

        visited.remove(name);

        if implied {
            Implication::Implied
        } else {
            Implication::NotImplied
        }
    }

    /// Names of every role `user` implies, `user.anyone` always included.
    ///
    /// Each role is tested independently with a fresh visited set.
    pub fn implied_roles(&self, user: Option<&str>) -> BTreeSet<RoleName> {
        let reach = self.reaching(user);
        self.arena
            .iter()
            .filter(|role| {
                self.walk(role, user, &mut HashSet::new(), &reach)
                    .is_implied()
            })
            .map(|role| role.name().clone())
            .collect()
    }

    pub fn authorization(&self, user: Option<&RoleName>) -> Authorization {
        let roles = self.implied_roles(user.map(RoleName::as_str));
        Authorization::new(user.cloned(), roles)
    }

    /// One chain of role names through which `user` implies `role`, starting
    /// at the role that matched directly and ending at `role`.
    pub fn explain(&self, role: &str, user: Option<&str>) -> Option<Vec<RoleName>> {
        let role = self.arena.get(role)?;
        let reach = self.reaching(user);
        self.trace(role, user, &mut HashSet::new(), &reach)
    }

    fn trace<'r>(
        &'r self,
        role: &'r Role,
        user: Option<&str>,
        visited: &mut HashSet<&'r str>,
        reach: &Reach<'_>,
    ) -> Option<Vec<RoleName>> {
        let name = role.name().as_str();

        if user == Some(name) || name == USER_ANYONE {
            return Some(vec![role.name().clone()]);
        }
        if user.is_none() || !reach.contains(name) || visited.contains(name) {
            return None;
        }
        let members = role.members()?;

        visited.insert(name);

        let required_ok = members.required.iter().all(|member| {
            self.arena
                .get(member.as_str())
                .is_some_and(|m| self.walk(m, user, visited, reach).is_implied())
        });

        let path = if required_ok {
            members.basic.iter().find_map(|member| {
                let m = self.arena.get(member.as_str())?;
                self.trace(m, user, visited, reach)
            })
        } else {
            None
        };

        visited.remove(name);

        path.map(|mut chain| {
            chain.push(role.name().clone());
            chain
        })
    }
}
