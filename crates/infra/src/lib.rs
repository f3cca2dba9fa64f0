//! `useradmin-infra`: storage, configuration and the administrative facade.
//!
//! ```no_run
//! use useradmin_core::RoleKind;
//! use useradmin_infra::UserAdmin;
//!
//! # fn main() -> useradmin_core::UserAdminResult<()> {
//! let admin = UserAdmin::in_memory()?;
//! let alice = admin.create_role("alice", RoleKind::User)?.expect("new role");
//! let admins = admin.create_role("admins", RoleKind::Group)?.expect("new role");
//! admins.add_member(&alice)?;
//! assert!(admin.get_authorization(Some(&alice))?.has_role("admins"));
//! # Ok(())
//! # }
//! ```

pub mod admin;
pub mod config;
pub mod handle;
pub mod storage;

pub use admin::UserAdmin;
pub use config::UserAdminConfig;
pub use handle::{Attributes, Credentials, RoleHandle};
pub use storage::{
    Backend, CachingStorageProvider, CredentialProvider, InMemoryBackend, RoleStore,
    StorageError, StorageProvider, StorageResult, Transaction,
};
