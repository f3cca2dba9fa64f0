//! `useradmin-auth`: the role graph and everything computed from it.
//!
//! This crate is intentionally decoupled from storage and threads: it works on
//! in-memory role records and snapshots of the whole graph.

pub mod arena;
pub mod authorization;
pub mod filter;
pub mod permissions;
pub mod resolver;
pub mod role;

pub use arena::RoleArena;
pub use authorization::Authorization;
pub use filter::{Filter, FilterError};
pub use permissions::{AccessPolicy, AllowAll, GrantedPermissions, Permission, PermissionAction};
pub use resolver::{AuthorizationResolver, Implication};
pub use role::{GroupMembers, MembershipKind, Role};
