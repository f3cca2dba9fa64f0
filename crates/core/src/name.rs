//! Role names.

use core::str::FromStr;
use std::borrow::Borrow;

use serde::{Deserialize, Serialize};

use crate::error::UserAdminError;

/// Name of the predefined role every user implies. It always exists and is
/// always a User.
pub const USER_ANYONE: &str = "user.anyone";

/// Unique, immutable name of a role within one role namespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoleName(String);

impl RoleName {
    /// Validate and wrap a role name.
    pub fn new(name: impl Into<String>) -> Result<Self, UserAdminError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(UserAdminError::invalid_argument("role name must not be empty"));
        }
        Ok(Self(name))
    }

    pub fn anyone() -> Self {
        Self(USER_ANYONE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_anyone(&self) -> bool {
        self.0 == USER_ANYONE
    }
}

impl core::fmt::Display for RoleName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for RoleName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for RoleName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for RoleName {
    type Err = UserAdminError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RoleName {
    type Error = UserAdminError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for RoleName {
    type Error = UserAdminError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RoleName> for String {
    fn from(value: RoleName) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_names() {
        assert!(RoleName::new("").is_err());
        assert!(RoleName::new("   ").is_err());
        assert!(matches!(
            "".parse::<RoleName>(),
            Err(UserAdminError::InvalidArgument(_))
        ));
    }

    #[test]
    fn anyone_is_recognised() {
        assert!(RoleName::anyone().is_anyone());
        assert!(RoleName::new("user.anyone").unwrap().is_anyone());
        assert!(!RoleName::new("alice").unwrap().is_anyone());
    }

    #[test]
    fn deserialization_validates() {
        let ok: RoleName = serde_json::from_str("\"admins\"").unwrap();
        assert_eq!(ok.as_str(), "admins");
        assert!(serde_json::from_str::<RoleName>("\"\"").is_err());
    }
}
