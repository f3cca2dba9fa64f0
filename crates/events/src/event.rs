use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use useradmin_core::{RoleKind, RoleName};

/// A domain-agnostic event.
///
/// Events are immutable facts with a stable type name and schema version.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name/type identifier (e.g. "useradmin.role.created").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the event occurred.
    fn occurred_at(&self) -> DateTime<Utc>;
}

/// What happened to a role.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleEventKind {
    RoleCreated,
    RoleChanged,
    RoleRemoved,
}

impl RoleEventKind {
    /// Numeric codes are bit flags so listeners can filter with a mask.
    pub fn code(self) -> u32 {
        match self {
            RoleEventKind::RoleCreated => 1,
            RoleEventKind::RoleChanged => 2,
            RoleEventKind::RoleRemoved => 4,
        }
    }
}

/// Notification that a role was created, changed or removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleEvent {
    event_id: Uuid,
    kind: RoleEventKind,
    role: RoleName,
    role_kind: RoleKind,
    occurred_at: DateTime<Utc>,
}

impl RoleEvent {
    pub fn new(kind: RoleEventKind, role: RoleName, role_kind: RoleKind) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            kind,
            role,
            role_kind,
            occurred_at: Utc::now(),
        }
    }

    pub fn created(role: RoleName, role_kind: RoleKind) -> Self {
        Self::new(RoleEventKind::RoleCreated, role, role_kind)
    }

    pub fn changed(role: RoleName, role_kind: RoleKind) -> Self {
        Self::new(RoleEventKind::RoleChanged, role, role_kind)
    }

    pub fn removed(role: RoleName, role_kind: RoleKind) -> Self {
        Self::new(RoleEventKind::RoleRemoved, role, role_kind)
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn kind(&self) -> RoleEventKind {
        self.kind
    }

    pub fn role(&self) -> &RoleName {
        &self.role
    }

    pub fn role_kind(&self) -> RoleKind {
        self.role_kind
    }
}

impl Event for RoleEvent {
    fn event_type(&self) -> &'static str {
        match self.kind {
            RoleEventKind::RoleCreated => "useradmin.role.created",
            RoleEventKind::RoleChanged => "useradmin.role.changed",
            RoleEventKind::RoleRemoved => "useradmin.role.removed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_types_follow_kind() {
        let name = RoleName::new("alice").unwrap();
        let created = RoleEvent::created(name.clone(), RoleKind::User);
        let removed = RoleEvent::removed(name, RoleKind::User);

        assert_eq!(created.event_type(), "useradmin.role.created");
        assert_eq!(removed.event_type(), "useradmin.role.removed");
        assert_ne!(created.event_id(), removed.event_id());
        assert_eq!(RoleEventKind::RoleChanged.code(), 2);
    }

    #[test]
    fn serializes_with_role_name() {
        let event = RoleEvent::changed(RoleName::new("admins").unwrap(), RoleKind::Group);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["role"], "admins");
        assert_eq!(json["kind"], "RoleChanged");
    }
}
