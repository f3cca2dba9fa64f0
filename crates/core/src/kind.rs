//! Role kinds.

use serde::{Deserialize, Serialize};

use crate::error::UserAdminError;

/// Discriminant of a role.
///
/// `Role` is an abstract marker: it shows up in type checks and filters but a
/// role of that kind can never be created.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleKind {
    Role,
    User,
    Group,
}

impl RoleKind {
    pub fn code(self) -> i32 {
        match self {
            RoleKind::Role => 0,
            RoleKind::User => 1,
            RoleKind::Group => 2,
        }
    }

    pub fn from_code(code: i32) -> Result<Self, UserAdminError> {
        match code {
            0 => Ok(RoleKind::Role),
            1 => Ok(RoleKind::User),
            2 => Ok(RoleKind::Group),
            other => Err(UserAdminError::invalid_argument(format!(
                "unknown role kind code {other}"
            ))),
        }
    }

    /// Whether roles of this kind can be created.
    pub fn is_creatable(self) -> bool {
        !matches!(self, RoleKind::Role)
    }

    /// Users and groups both carry credentials.
    pub fn has_credentials(self) -> bool {
        matches!(self, RoleKind::User | RoleKind::Group)
    }
}

impl core::fmt::Display for RoleKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RoleKind::Role => write!(f, "Role"),
            RoleKind::User => write!(f, "User"),
            RoleKind::Group => write!(f, "Group"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_kinds() {
        for kind in [RoleKind::Role, RoleKind::User, RoleKind::Group] {
            assert_eq!(RoleKind::from_code(kind.code()).unwrap(), kind);
        }
        assert!(RoleKind::from_code(7).is_err());
    }

    #[test]
    fn abstract_role_is_not_creatable() {
        assert!(!RoleKind::Role.is_creatable());
        assert!(RoleKind::User.is_creatable());
        assert!(RoleKind::Group.is_creatable());
    }
}
