//! Source and target identity records plus the typed partial updates the
//! reconcilers emit.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// The two resource collections a SCIM target exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    User,
    Group,
}

impl ResourceKind {
    /// SCIM endpoint segment for this kind.
    #[must_use]
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::User => "Users",
            Self::Group => "Groups",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint())
    }
}

/// A user as reported by the identity source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUser {
    /// Stable source identifier.
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub first_name: String,
    pub last_name: String,
    pub active: bool,
    /// Source group identifiers this user belongs to.
    pub groups: Vec<String>,
}

/// A group as reported by the identity source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceGroup {
    /// Stable source identifier.
    pub id: String,
    pub name: String,
}

/// A user provisioned in the SCIM target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetUser {
    /// Identifier assigned by the target.
    pub id: String,
    /// Source identifier this record is correlated with.
    pub external_id: Option<String>,
    pub email: String,
    pub full_name: String,
    pub first_name: String,
    pub last_name: String,
    pub active: bool,
    /// Target group identifiers the user currently belongs to.
    pub groups: BTreeSet<String>,
}

impl TargetUser {
    /// Whether a prior sync provisioned or adopted this user.
    #[must_use]
    pub fn is_scim_controlled(&self) -> bool {
        has_external_id(self.external_id.as_deref())
    }
}

/// A group provisioned in the SCIM target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetGroup {
    /// Identifier assigned by the target.
    pub id: String,
    /// Source identifier this record is correlated with.
    pub external_id: Option<String>,
    pub name: String,
}

impl TargetGroup {
    /// Whether a prior sync provisioned or adopted this group.
    #[must_use]
    pub fn is_scim_controlled(&self) -> bool {
        has_external_id(self.external_id.as_deref())
    }
}

fn has_external_id(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.is_empty())
}

/// Either kind of target record, as returned by a single-record lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetRecord {
    User(TargetUser),
    Group(TargetGroup),
}

/// Payload for creating a target user from a source user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub external_id: String,
    pub full_name: String,
    pub first_name: String,
    pub last_name: String,
    pub active: bool,
}

impl From<&SourceUser> for NewUser {
    fn from(user: &SourceUser) -> Self {
        Self {
            email: user.email.clone(),
            external_id: user.id.clone(),
            full_name: user.full_name.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            active: user.active,
        }
    }
}

/// Payload for creating a target group from a source group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGroup {
    pub display_name: String,
    pub external_id: String,
}

impl From<&SourceGroup> for NewGroup {
    fn from(group: &SourceGroup) -> Self {
        Self {
            display_name: group.name.clone(),
            external_id: group.id.clone(),
        }
    }
}

/// Changed group attributes. `None` means "leave as is".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupPatch {
    pub external_id: Option<String>,
    pub display_name: Option<String>,
}

impl GroupPatch {
    /// Attributes of `target` that differ from `source`.
    #[must_use]
    pub fn diff(target: &TargetGroup, source: &SourceGroup) -> Self {
        Self {
            external_id: (target.external_id.as_deref() != Some(source.id.as_str()))
                .then(|| source.id.clone()),
            display_name: (target.name != source.name).then(|| source.name.clone()),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.external_id.is_none() && self.display_name.is_none()
    }

    /// Mirror a successfully applied patch onto the in-memory record.
    pub fn apply_to(&self, group: &mut TargetGroup) {
        if let Some(ref external_id) = self.external_id {
            group.external_id = Some(external_id.clone());
        }
        if let Some(ref name) = self.display_name {
            group.name = name.clone();
        }
    }
}

/// Changed user attributes. `None` means "leave as is".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub external_id: Option<String>,
    pub display_name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub active: Option<bool>,
}

impl UserPatch {
    /// Attributes of `target` that differ from `source`.
    #[must_use]
    pub fn diff(target: &TargetUser, source: &SourceUser) -> Self {
        Self {
            external_id: (target.external_id.as_deref() != Some(source.id.as_str()))
                .then(|| source.id.clone()),
            display_name: (target.full_name != source.full_name)
                .then(|| source.full_name.clone()),
            given_name: (target.first_name != source.first_name)
                .then(|| source.first_name.clone()),
            family_name: (target.last_name != source.last_name).then(|| source.last_name.clone()),
            active: (target.active != source.active).then_some(source.active),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.external_id.is_none()
            && self.display_name.is_none()
            && self.given_name.is_none()
            && self.family_name.is_none()
            && self.active.is_none()
    }

    /// Mirror a successfully applied patch onto the in-memory record.
    pub fn apply_to(&self, user: &mut TargetUser) {
        if let Some(ref external_id) = self.external_id {
            user.external_id = Some(external_id.clone());
        }
        if let Some(ref name) = self.display_name {
            user.full_name = name.clone();
        }
        if let Some(ref name) = self.given_name {
            user.first_name = name.clone();
        }
        if let Some(ref name) = self.family_name {
            user.last_name = name.clone();
        }
        if let Some(active) = self.active {
            user.active = active;
        }
    }
}

/// Group membership changes for one user, sent as a single request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipPatch {
    /// Target group ids to add.
    pub add: Vec<String>,
    /// Target group ids to remove.
    pub remove: Vec<String>,
}

impl MembershipPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }

    /// Mirror a successfully applied patch onto the in-memory record.
    pub fn apply_to(&self, user: &mut TargetUser) {
        for id in &self.remove {
            user.groups.remove(id);
        }
        user.groups.extend(self.add.iter().cloned());
    }
}
