//! Membership phase: bring each matched user's target groups in line with
//! the source, one combined add/remove request per user.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::{debug, info, warn};

use crate::error::SyncResult;
use crate::fold::fold;
use crate::model::{MembershipPatch, SourceUser, TargetGroup, TargetUser};
use crate::policy::SyncSettings;
use crate::reconcile::{email_lookup, TargetState};
use crate::stat::PhaseLog;
use crate::traits::TargetDirectory;

/// Membership difference for one user before policy is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct MembershipDelta {
    /// Target group ids the user should join, in source order.
    pub to_add: Vec<String>,
    /// Target group ids the user holds but the source does not list.
    pub candidate_remove: Vec<String>,
}

impl MembershipDelta {
    /// Compare `user`'s target groups with the source groups of `source`.
    ///
    /// Source group ids without a controlled target counterpart are
    /// ignored.
    pub(crate) fn compute(
        source: &SourceUser,
        user: &TargetUser,
        external_to_target: &HashMap<&str, &str>,
    ) -> Self {
        let mut desired = BTreeSet::new();
        let mut to_add = Vec::new();
        for group_id in &source.groups {
            let Some(&target_id) = external_to_target.get(group_id.as_str()) else {
                continue;
            };
            if desired.insert(target_id) && !user.groups.contains(target_id) {
                to_add.push(target_id.to_string());
            }
        }
        let candidate_remove = user
            .groups
            .iter()
            .filter(|id| !desired.contains(id.as_str()))
            .cloned()
            .collect();
        Self {
            to_add,
            candidate_remove,
        }
    }
}

fn external_id_index(groups: &BTreeMap<String, TargetGroup>) -> HashMap<&str, &str> {
    let mut index = HashMap::with_capacity(groups.len());
    for group in groups.values() {
        if let Some(external_id) = group.external_id.as_deref().filter(|e| !e.is_empty()) {
            index.entry(external_id).or_insert(group.id.as_str());
        }
    }
    index
}

/// Reconcile group memberships of every source user with a target match.
pub async fn reconcile_membership<'s, T>(
    target: &T,
    source_users: impl IntoIterator<Item = &'s SourceUser>,
    state: &mut TargetState,
    settings: &SyncSettings,
) -> SyncResult<PhaseLog>
where
    T: TargetDirectory + ?Sized,
{
    let (users, groups) = state.membership_view()?;

    let mut sources: BTreeMap<&str, &SourceUser> = BTreeMap::new();
    for user in source_users {
        sources.entry(user.id.as_str()).or_insert(user);
    }
    let index = external_id_index(groups);
    let lookup = email_lookup(users);

    info!(
        users = sources.len(),
        groups = index.len(),
        mode = %settings.destructive,
        "Reconciling membership"
    );

    let mut log = PhaseLog::default();
    let mut claimed = BTreeSet::new();

    for source in sources.into_values() {
        let Some(user_id) = lookup.get(&fold(&source.email)) else {
            continue;
        };
        if !claimed.insert(user_id.as_str()) {
            continue;
        }
        let Some(user) = users.get_mut(user_id) else {
            continue;
        };

        let delta = MembershipDelta::compute(source, user, &index);
        let mut remove = Vec::with_capacity(delta.candidate_remove.len());
        for group_id in delta.candidate_remove {
            let group = groups.get(&group_id);
            if settings.destructive.may_remove_membership(group) {
                remove.push(group_id);
            } else if settings.verbose {
                log.failure(match group {
                    Some(g) => format!(
                        "Remove group \"{}\" from user \"{}\" skipped. Group is not controlled by SCIM",
                        g.name, source.email
                    ),
                    None => format!(
                        "Remove group Id \"{group_id}\" from user \"{}\" skipped. Group is outside of SCIM node",
                        source.email
                    ),
                });
            }
        }

        if settings.destructive.is_safe() && !remove.is_empty() {
            log.failure(format!(
                "REMOVE membership for user \"{}\" skipped since the \"Safe Mode\" is enforced",
                source.email
            ));
            remove.clear();
        }

        let patch = MembershipPatch {
            add: delta.to_add,
            remove,
        };
        if patch.is_empty() {
            continue;
        }

        match target.patch_membership(&user.id, &patch).await {
            Ok(()) => {
                debug!(
                    id = %user.id,
                    added = patch.add.len(),
                    removed = patch.remove.len(),
                    "Membership changed"
                );
                patch.apply_to(user);
                log.success(format!(
                    "SCIM changed user \"{}\" membership: {} added; {} removed",
                    user.email,
                    patch.add.len(),
                    patch.remove.len()
                ));
            }
            Err(e) => {
                warn!(id = %user.id, error = %e, "Membership change failed");
                log.failure(format!(
                    "PATCH user \"{}\" membership error: {e}",
                    user.email
                ));
            }
        }
    }

    info!(
        successes = log.successes.len(),
        failures = log.failures.len(),
        "Membership reconciliation finished"
    );
    Ok(log)
}
