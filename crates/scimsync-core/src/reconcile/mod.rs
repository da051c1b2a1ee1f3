//! The three reconciliation phases and the target state they share.
//!
//! Phases run strictly in order: groups, users, membership. Each phase
//! mutates [`TargetState`] as its writes succeed so the next phase sees the
//! correlations the previous one established without re-fetching.

pub mod groups;
pub mod membership;
pub mod users;

use std::collections::{BTreeMap, HashMap};

use crate::error::{SyncError, SyncResult};
use crate::fold::fold;
use crate::model::{ResourceKind, TargetGroup, TargetUser};

pub use groups::reconcile_groups;
pub use membership::reconcile_membership;
pub use users::reconcile_users;

/// Target records known to the current run, keyed by target id.
///
/// A collection that was never loaded is `None`; phases that need it fail
/// with [`SyncError::Precondition`].
#[derive(Debug, Clone, Default)]
pub struct TargetState {
    users: Option<BTreeMap<String, TargetUser>>,
    groups: Option<BTreeMap<String, TargetGroup>>,
}

impl TargetState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the user collection with a fresh load.
    pub fn set_users(&mut self, users: impl IntoIterator<Item = TargetUser>) {
        self.users = Some(users.into_iter().map(|u| (u.id.clone(), u)).collect());
    }

    /// Replace the group collection with a fresh load.
    pub fn set_groups(&mut self, groups: impl IntoIterator<Item = TargetGroup>) {
        self.groups = Some(groups.into_iter().map(|g| (g.id.clone(), g)).collect());
    }

    #[must_use]
    pub fn users(&self) -> Option<&BTreeMap<String, TargetUser>> {
        self.users.as_ref()
    }

    #[must_use]
    pub fn groups(&self) -> Option<&BTreeMap<String, TargetGroup>> {
        self.groups.as_ref()
    }

    /// Drop a deleted group and every user's membership in it.
    pub fn forget_group(&mut self, group_id: &str) {
        if let Some(groups) = self.groups.as_mut() {
            groups.remove(group_id);
        }
        if let Some(users) = self.users.as_mut() {
            for user in users.values_mut() {
                user.groups.remove(group_id);
            }
        }
    }

    pub(crate) fn users_mut(&mut self) -> SyncResult<&mut BTreeMap<String, TargetUser>> {
        self.users
            .as_mut()
            .ok_or_else(|| SyncError::Precondition("SCIM users were not populated".to_string()))
    }

    pub(crate) fn groups_mut(&mut self) -> SyncResult<&mut BTreeMap<String, TargetGroup>> {
        self.groups
            .as_mut()
            .ok_or_else(|| SyncError::Precondition("SCIM groups were not populated".to_string()))
    }

    /// Mutable users alongside read-only groups, for the membership phase.
    #[allow(clippy::type_complexity)]
    pub(crate) fn membership_view(
        &mut self,
    ) -> SyncResult<(
        &mut BTreeMap<String, TargetUser>,
        &BTreeMap<String, TargetGroup>,
    )> {
        let groups = self
            .groups
            .as_ref()
            .ok_or_else(|| SyncError::Precondition("SCIM groups were not populated".to_string()))?;
        let users = self
            .users
            .as_mut()
            .ok_or_else(|| SyncError::Precondition("SCIM users were not populated".to_string()))?;
        Ok((users, groups))
    }
}

/// Case-folded email to target user id. On duplicate emails the lowest id
/// wins and the others stay unmatched.
pub(crate) fn email_lookup(users: &BTreeMap<String, TargetUser>) -> HashMap<String, String> {
    let mut lookup = HashMap::with_capacity(users.len());
    for user in users.values() {
        lookup
            .entry(fold(&user.email))
            .or_insert_with(|| user.id.clone());
    }
    lookup
}

/// Fail when two target groups claim the same source identity.
pub(crate) fn ensure_unique_group_external_ids(
    groups: &BTreeMap<String, TargetGroup>,
) -> SyncResult<()> {
    let mut seen: HashMap<&str, &str> = HashMap::with_capacity(groups.len());
    for group in groups.values() {
        let Some(external_id) = group.external_id.as_deref().filter(|e| !e.is_empty()) else {
            continue;
        };
        if seen.insert(external_id, group.id.as_str()).is_some() {
            return Err(SyncError::DuplicateExternalId {
                kind: ResourceKind::Group,
                external_id: external_id.to_string(),
            });
        }
    }
    Ok(())
}
