//! In-memory role record.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use useradmin_core::{AttributeValue, RoleKind, RoleName, UserAdminError, UserAdminResult};
use useradmin_credentials::StoredCredentialRecord;

/// Which membership set of a group a reference lives in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MembershipKind {
    /// Any one basic member implying a user is enough.
    Basic,
    /// Every required member must imply the user as well.
    Required,
}

/// Membership sets of a group.
///
/// Members are referenced by name, never owned, so groups may contain each
/// other (directly or indirectly) without creating reference cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembers {
    pub basic: BTreeSet<RoleName>,
    pub required: BTreeSet<RoleName>,
}

impl GroupMembers {
    fn set_mut(&mut self, kind: MembershipKind) -> &mut BTreeSet<RoleName> {
        match kind {
            MembershipKind::Basic => &mut self.basic,
            MembershipKind::Required => &mut self.required,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.basic.contains(name) || self.required.contains(name)
    }
}

/// One role: identity, kind, attributes, credentials and, for groups, members.
///
/// Users and groups carry credentials; only groups carry members. Group-only
/// operations on a user fail with `InvalidArgument`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    name: RoleName,
    kind: RoleKind,
    #[serde(default)]
    attributes: HashMap<String, AttributeValue>,
    #[serde(default)]
    credentials: HashMap<String, StoredCredentialRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    members: Option<GroupMembers>,
}

impl Role {
    /// Build an empty role of a creatable kind.
    pub fn new(name: RoleName, kind: RoleKind) -> UserAdminResult<Self> {
        if !kind.is_creatable() {
            return Err(UserAdminError::invalid_argument(format!(
                "roles of kind {kind} cannot be created"
            )));
        }
        let members = (kind == RoleKind::Group).then(GroupMembers::default);
        Ok(Self {
            name,
            kind,
            attributes: HashMap::new(),
            credentials: HashMap::new(),
            members,
        })
    }

    pub fn user(name: RoleName) -> Self {
        Self {
            name,
            kind: RoleKind::User,
            attributes: HashMap::new(),
            credentials: HashMap::new(),
            members: None,
        }
    }

    pub fn group(name: RoleName) -> Self {
        Self {
            members: Some(GroupMembers::default()),
            kind: RoleKind::Group,
            ..Self::user(name)
        }
    }

    /// The predefined `user.anyone` role.
    pub fn anyone() -> Self {
        Self::user(RoleName::anyone())
    }

    pub fn name(&self) -> &RoleName {
        &self.name
    }

    pub fn kind(&self) -> RoleKind {
        self.kind
    }

    pub fn is_group(&self) -> bool {
        self.kind == RoleKind::Group
    }

    // ── attributes ──────────────────────────────────────────────────────────

    pub fn attributes(&self) -> &HashMap<String, AttributeValue> {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: AttributeValue) -> Option<AttributeValue> {
        self.attributes.insert(key.into(), value)
    }

    pub fn remove_attribute(&mut self, key: &str) -> Option<AttributeValue> {
        self.attributes.remove(key)
    }

    pub fn clear_attributes(&mut self) {
        self.attributes.clear();
    }

    // ── credentials ─────────────────────────────────────────────────────────

    pub fn credentials(&self) -> &HashMap<String, StoredCredentialRecord> {
        &self.credentials
    }

    pub fn credential(&self, key: &str) -> Option<&StoredCredentialRecord> {
        self.credentials.get(key)
    }

    pub fn set_credential(
        &mut self,
        key: impl Into<String>,
        record: StoredCredentialRecord,
    ) -> Option<StoredCredentialRecord> {
        self.credentials.insert(key.into(), record)
    }

    pub fn remove_credential(&mut self, key: &str) -> Option<StoredCredentialRecord> {
        self.credentials.remove(key)
    }

    pub fn clear_credentials(&mut self) {
        self.credentials.clear();
    }

    // ── membership ──────────────────────────────────────────────────────────

    pub fn members(&self) -> Option<&GroupMembers> {
        self.members.as_ref()
    }

    fn members_mut(&mut self) -> UserAdminResult<&mut GroupMembers> {
        let name = &self.name;
        self.members.as_mut().ok_or_else(|| {
            UserAdminError::invalid_argument(format!("role '{name}' is not a group"))
        })
    }

    /// Add `member` to one membership set. Returns `true` iff the set changed.
    pub fn add_member(&mut self, member: RoleName, kind: MembershipKind) -> UserAdminResult<bool> {
        Ok(self.members_mut()?.set_mut(kind).insert(member))
    }

    /// Remove `member` from both membership sets. Returns `true` iff either changed.
    pub fn remove_member(&mut self, member: &str) -> UserAdminResult<bool> {
        let members = self.members_mut()?;
        let basic = members.basic.remove(member);
        let required = members.required.remove(member);
        Ok(basic || required)
    }

    /// Drop every reference to `member`; a no-op for users.
    pub fn detach(&mut self, member: &str) -> bool {
        match self.members.as_mut() {
            Some(members) => {
                let basic = members.basic.remove(member);
                let required = members.required.remove(member);
                basic || required
            }
            None => false,
        }
    }
}
