//! Error taxonomy shared by every layer of the role administration core.

use thiserror::Error;

/// Result type used across the role administration layers.
pub type UserAdminResult<T> = Result<T, UserAdminError>;

/// Role administration error.
///
/// Variants are the failure *kinds* callers branch on. Messages are for
/// operators and carry no stable meaning.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UserAdminError {
    /// Bad input shape (empty key, empty name, wrong role kind for the call).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The storage backend failed; the operation had no effect.
    #[error("storage failure: {0}")]
    StorageFailure(String),

    /// An administrative or credential-access check failed before any storage call.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The requested operation is deliberately not provided.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Unknown algorithm names, malformed parameters or settings.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl UserAdminError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::StorageFailure(msg.into())
    }

    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedOperation(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// True for failures that came from the storage backend.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::StorageFailure(_))
    }
}

/// Reject an empty key before any work is done.
pub fn ensure_key(key: &str) -> UserAdminResult<()> {
    if key.is_empty() {
        return Err(UserAdminError::invalid_argument("key must not be empty"));
    }
    Ok(())
}
