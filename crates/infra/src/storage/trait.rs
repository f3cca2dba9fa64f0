//! Storage SPI: the traits role stores implement and their error type.

use std::sync::Arc;

use thiserror::Error;

use useradmin_auth::{Filter, MembershipKind, Role};
use useradmin_core::{AttributeValue, RoleName, UserAdminError, UserAdminResult};
use useradmin_credentials::{CredentialDecryptor, CredentialEncryptor};

pub type StorageResult<T> = Result<T, StorageError>;

/// Per-key access check run by the clear operations.
pub type KeyCheck<'a> = dyn Fn(&str) -> UserAdminResult<()> + 'a;

/// Storage operation error.
///
/// `Backend`, `Conflict` and `Poisoned` are infrastructure failures; after any
/// of them the caller must assume the operation had no effect. `NotFound` and
/// `InvalidRole` reject the request before anything is written.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("backend failure: {0}")]
    Backend(String),

    #[error("transaction conflict: {0}")]
    Conflict(String),

    #[error("lock poisoned")]
    Poisoned,

    #[error("role not found: {0}")]
    NotFound(String),

    #[error("invalid role for operation: {0}")]
    InvalidRole(String),

    /// Raised by a collaborator handed to the provider: the credential
    /// scheme, or the access check run by a clear.
    #[error(transparent)]
    Rejected(UserAdminError),
}

impl StorageError {
    /// True when the backing store itself failed.
    pub fn is_backend(&self) -> bool {
        matches!(
            self,
            StorageError::Backend(_) | StorageError::Conflict(_) | StorageError::Poisoned
        )
    }
}

impl From<StorageError> for UserAdminError {
    fn from(value: StorageError) -> Self {
        match value {
            StorageError::Rejected(err) => err,
            StorageError::NotFound(_) | StorageError::InvalidRole(_) => {
                UserAdminError::invalid_argument(value.to_string())
            }
            StorageError::Backend(_) | StorageError::Conflict(_) | StorageError::Poisoned => {
                UserAdminError::storage(value.to_string())
            }
        }
    }
}

/// Persistence boundary for role records.
///
/// Every method either completes or fails with no partial effect. Providers
/// must serialize operations: at most one mutation in flight per instance.
pub trait StorageProvider: Send + Sync {
    /// Create a user; `None` if a role with that name already exists.
    fn create_user(&self, name: &RoleName) -> StorageResult<Option<Role>>;

    /// Create a group; `None` if a role with that name already exists.
    fn create_group(&self, name: &RoleName) -> StorageResult<Option<Role>>;

    fn get_role(&self, name: &str) -> StorageResult<Option<Role>>;

    /// Roles whose attributes match `filter`, or every role for `None`.
    fn find_roles(&self, filter: Option<&Filter>) -> StorageResult<Vec<Role>>;

    /// Delete a role and detach it from every group. `false` if nothing was deleted.
    fn delete_role(&self, name: &str) -> StorageResult<bool>;

    /// Returns the previous value.
    fn set_role_attribute(
        &self,
        role: &str,
        key: &str,
        value: AttributeValue,
    ) -> StorageResult<Option<AttributeValue>>;

    fn remove_role_attribute(&self, role: &str, key: &str) -> StorageResult<Option<AttributeValue>>;

    /// Remove every attribute once `authorize` accepted each present key.
    ///
    /// The keys are checked under the same lock that clears them, so a key
    /// added concurrently is either checked or left in place. Returns the
    /// removed keys.
    fn clear_role_attributes(&self, role: &str, authorize: &KeyCheck<'_>) -> StorageResult<Vec<String>>;

    /// Encrypt `value` with `encryptor` and store the resulting record.
    /// Returns `true` if a credential was replaced.
    fn set_user_credential(
        &self,
        encryptor: &dyn CredentialEncryptor,
        user: &str,
        key: &str,
        value: &AttributeValue,
    ) -> StorageResult<bool>;

    fn remove_user_credential(&self, user: &str, key: &str) -> StorageResult<bool>;

    /// Credential counterpart of [`StorageProvider::clear_role_attributes`].
    fn clear_user_credentials(&self, user: &str, authorize: &KeyCheck<'_>) -> StorageResult<Vec<String>>;

    fn get_members(&self, group: &str) -> StorageResult<Vec<RoleName>>;

    fn get_required_members(&self, group: &str) -> StorageResult<Vec<RoleName>>;

    /// Returns `true` iff the membership set changed. Unchanged sets are not written.
    fn add_member(&self, group: &str, member: &str, kind: MembershipKind) -> StorageResult<bool>;

    /// Remove from both membership sets. Returns `true` iff either changed.
    fn remove_member(&self, group: &str, member: &str) -> StorageResult<bool>;
}

/// Read access to stored credentials, routed through the credential scheme.
pub trait CredentialProvider: Send + Sync {
    fn get_user_credential(
        &self,
        decryptor: &dyn CredentialDecryptor,
        user: &str,
        key: &str,
    ) -> StorageResult<Option<AttributeValue>>;

    fn has_user_credential(
        &self,
        decryptor: &dyn CredentialDecryptor,
        user: &str,
        key: &str,
        candidate: &AttributeValue,
    ) -> StorageResult<bool>;

    /// Keys of the credentials stored for `user`.
    fn credential_keys(&self, user: &str) -> StorageResult<Vec<String>>;
}

/// Everything the administrative facade needs from storage.
pub trait RoleStore: StorageProvider + CredentialProvider {}

impl<T> RoleStore for T where T: StorageProvider + CredentialProvider {}

impl<S> StorageProvider for Arc<S>
where
    S: StorageProvider + ?Sized,
{
    fn create_user(&self, name: &RoleName) -> StorageResult<Option<Role>> {
        (**self).create_user(name)
    }

    fn create_group(&self, name: &RoleName) -> StorageResult<Option<Role>> {
        (**self).create_group(name)
    }

    fn get_role(&self, name: &str) -> StorageResult<Option<Role>> {
        (**self).get_role(name)
    }

    fn find_roles(&self, filter: Option<&Filter>) -> StorageResult<Vec<Role>> {
        (**self).find_roles(filter)
    }

    fn delete_role(&self, name: &str) -> StorageResult<bool> {
        (**self).delete_role(name)
    }

    fn set_role_attribute(
        &self,
        role: &str,
        key: &str,
        value: AttributeValue,
    ) -> StorageResult<Option<AttributeValue>> {
        (**self).set_role_attribute(role, key, value)
    }

    fn remove_role_attribute(&self, role: &str, key: &str) -> StorageResult<Option<AttributeValue>> {
        (**self).remove_role_attribute(role, key)
    }

    fn clear_role_attributes(&self, role: &str, authorize: &KeyCheck<'_>) -> StorageResult<Vec<String>> {
        (**self).clear_role_attributes(role, authorize)
    }

    fn set_user_credential(
        &self,
        encryptor: &dyn CredentialEncryptor,
        user: &str,
        key: &str,
        value: &AttributeValue,
    ) -> StorageResult<bool> {
        (**self).set_user_credential(encryptor, user, key, value)
    }

    fn remove_user_credential(&self, user: &str, key: &str) -> StorageResult<bool> {
        (**self).remove_user_credential(user, key)
    }

    fn clear_user_credentials(&self, user: &str, authorize: &KeyCheck<'_>) -> StorageResult<Vec<String>> {
        (**self).clear_user_credentials(user, authorize)
    }

    fn get_members(&self, group: &str) -> StorageResult<Vec<RoleName>> {
        (**self).get_members(group)
    }

    fn get_required_members(&self, group: &str) -> StorageResult<Vec<RoleName>> {
        (**self).get_required_members(group)
    }

    fn add_member(&self, group: &str, member: &str, kind: MembershipKind) -> StorageResult<bool> {
        (**self).add_member(group, member, kind)
    }

    fn remove_member(&self, group: &str, member: &str) -> StorageResult<bool> {
        (**self).remove_member(group, member)
    }
}

impl<S> CredentialProvider for Arc<S>
where
    S: CredentialProvider + ?Sized,
{
    fn get_user_credential(
        &self,
        decryptor: &dyn CredentialDecryptor,
        user: &str,
        key: &str,
    ) -> StorageResult<Option<AttributeValue>> {
        (**self).get_user_credential(decryptor, user, key)
    }

    fn has_user_credential(
        &self,
        decryptor: &dyn CredentialDecryptor,
        user: &str,
        key: &str,
        candidate: &AttributeValue,
    ) -> StorageResult<bool> {
        (**self).has_user_credential(decryptor, user, key, candidate)
    }

    fn credential_keys(&self, user: &str) -> StorageResult<Vec<String>> {
        (**self).credential_keys(user)
    }
}
