//! Group phase: correlate source groups with target groups, then patch,
//! create or delete.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::{debug, info, warn};

use crate::error::SyncResult;
use crate::fold::fold;
use crate::model::{GroupPatch, NewGroup, ResourceKind, SourceGroup, TargetGroup};
use crate::policy::{DestructiveMode, SyncSettings};
use crate::reconcile::{ensure_unique_group_external_ids, TargetState};
use crate::stat::PhaseLog;
use crate::traits::TargetDirectory;

/// Source groups not matched yet, by source id.
type SourceSet<'s> = BTreeMap<&'s str, &'s SourceGroup>;

/// Target group ids not matched yet.
type TargetSet = BTreeSet<String>;

/// The three correlation strategies, tried in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchRound {
    ExternalId,
    Name,
    Positional,
}

impl MatchRound {
    const ALL: [Self; 3] = [Self::ExternalId, Self::Name, Self::Positional];

    /// Pair remaining sources with remaining targets. Each target is paired
    /// at most once.
    fn pair<'s>(
        self,
        sources: &SourceSet<'s>,
        targets: &TargetSet,
        groups: &BTreeMap<String, TargetGroup>,
    ) -> Vec<(&'s SourceGroup, String)> {
        match self {
            Self::ExternalId => pair_by_key(
                sources,
                targets,
                groups,
                |g| g.external_id.clone().filter(|e| !e.is_empty()),
                |s| s.id.clone(),
            ),
            Self::Name => pair_by_key(
                sources,
                targets,
                groups,
                |g| Some(fold(&g.name)),
                |s| fold(&s.name),
            ),
            Self::Positional => pair_positionally(sources, targets, groups),
        }
    }
}

fn pair_by_key<'s>(
    sources: &SourceSet<'s>,
    targets: &TargetSet,
    groups: &BTreeMap<String, TargetGroup>,
    target_key: impl Fn(&TargetGroup) -> Option<String>,
    source_key: impl Fn(&SourceGroup) -> String,
) -> Vec<(&'s SourceGroup, String)> {
    let mut index: HashMap<String, &str> = HashMap::with_capacity(targets.len());
    for id in targets {
        if let Some(key) = groups.get(id).and_then(&target_key) {
            index.entry(key).or_insert(id.as_str());
        }
    }

    let mut claimed = BTreeSet::new();
    let mut pairs = Vec::new();
    for source in sources.values() {
        if let Some(&target_id) = index.get(&source_key(source)) {
            if claimed.insert(target_id) {
                pairs.push((*source, target_id.to_string()));
            }
        }
    }
    pairs
}

/// Last resort: the n-th remaining source takes the n-th remaining target
/// that already carries a source identifier. Such a target was provisioned
/// for a source group that has since disappeared or been recreated.
fn pair_positionally<'s>(
    sources: &SourceSet<'s>,
    targets: &TargetSet,
    groups: &BTreeMap<String, TargetGroup>,
) -> Vec<(&'s SourceGroup, String)> {
    let reusable = targets
        .iter()
        .filter(|id| groups.get(*id).is_some_and(TargetGroup::is_scim_controlled));
    sources
        .values()
        .copied()
        .zip(reusable.cloned())
        .collect()
}

/// Reconcile target groups against `source_groups`.
///
/// Newly created groups are inserted into `state`, deleted ones removed
/// along with every user's membership in them, so later phases observe the
/// outcome.
pub async fn reconcile_groups<'s, T>(
    target: &T,
    source_groups: impl IntoIterator<Item = &'s SourceGroup>,
    state: &mut TargetState,
    settings: &SyncSettings,
) -> SyncResult<PhaseLog>
where
    T: TargetDirectory + ?Sized,
{
    let groups = state.groups_mut()?;
    ensure_unique_group_external_ids(groups)?;

    let mut sources: SourceSet<'s> = BTreeMap::new();
    for group in source_groups {
        sources.entry(group.id.as_str()).or_insert(group);
    }
    let mut targets: TargetSet = groups.keys().cloned().collect();

    info!(
        source = sources.len(),
        target = targets.len(),
        mode = %settings.destructive,
        "Reconciling groups"
    );

    let mut log = PhaseLog::default();

    for round in MatchRound::ALL {
        if sources.is_empty() || targets.is_empty() {
            break;
        }
        let pairs = round.pair(&sources, &targets, groups);
        debug!(round = ?round, matched = pairs.len(), "Group match round");

        for (source, target_id) in pairs {
            sources.remove(source.id.as_str());
            targets.remove(&target_id);
            if let Some(record) = groups.get_mut(&target_id) {
                update_group(target, source, record, &mut log).await;
            }
        }
    }

    for source in sources.into_values() {
        create_group(target, source, groups, &mut log).await;
    }

    let mut deleted = Vec::new();
    for target_id in targets {
        if delete_group(target, &target_id, groups, settings, &mut log).await {
            deleted.push(target_id);
        }
    }
    for id in &deleted {
        state.forget_group(id);
    }

    info!(
        successes = log.successes.len(),
        failures = log.failures.len(),
        "Group reconciliation finished"
    );
    Ok(log)
}

async fn update_group<T: TargetDirectory + ?Sized>(
    target: &T,
    source: &SourceGroup,
    record: &mut TargetGroup,
    log: &mut PhaseLog,
) {
    let patch = GroupPatch::diff(record, source);
    if patch.is_empty() {
        return;
    }
    match target.patch_group(&record.id, &patch).await {
        Ok(()) => {
            debug!(id = %record.id, name = %source.name, "Group updated");
            patch.apply_to(record);
            log.success(format!("SCIM updated group \"{}\"", source.name));
        }
        Err(e) => {
            warn!(id = %record.id, name = %source.name, error = %e, "Group update failed");
            log.failure(format!("PATCH group \"{}\" error: {e}", source.name));
        }
    }
}

async fn create_group<T: TargetDirectory + ?Sized>(
    target: &T,
    source: &SourceGroup,
    groups: &mut BTreeMap<String, TargetGroup>,
    log: &mut PhaseLog,
) {
    match target.create_group(&NewGroup::from(source)).await {
        Ok(created) => {
            debug!(id = %created.id, name = %source.name, "Group created");
            groups.insert(created.id.clone(), created);
            log.success(format!("SCIM added group \"{}\"", source.name));
        }
        Err(e) => {
            warn!(name = %source.name, error = %e, "Group creation failed");
            log.failure(format!("POST group \"{}\" error: {e}", source.name));
        }
    }
}

async fn delete_group<T: TargetDirectory + ?Sized>(
    target: &T,
    target_id: &str,
    groups: &mut BTreeMap<String, TargetGroup>,
    settings: &SyncSettings,
    log: &mut PhaseLog,
) -> bool {
    let Some(group) = groups.get(target_id) else {
        return false;
    };
    let name = group.name.clone();

    if settings.destructive == DestructiveMode::Safe {
        log.failure(format!(
            "DELETE group \"{name}\": delete skipped since the \"Safe Mode\" is enforced"
        ));
        return false;
    }
    if !settings.destructive.may_delete_group(group) {
        if settings.verbose {
            log.failure(format!(
                "DELETE group \"{name}\": delete skipped since the group is not controlled by SCIM"
            ));
        }
        return false;
    }

    match target.delete(ResourceKind::Group, target_id).await {
        Ok(()) => {
            debug!(id = %target_id, name = %name, "Group deleted");
            groups.remove(target_id);
            log.success(format!("SCIM deleted group \"{name}\""));
            true
        }
        Err(e) => {
            warn!(id = %target_id, name = %name, error = %e, "Group deletion failed");
            log.failure(format!("DELETE group \"{name}\" error: {e}"));
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(id: &str, name: &str) -> SourceGroup {
        SourceGroup {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    fn target(id: &str, external_id: Option<&str>, name: &str) -> TargetGroup {
        TargetGroup {
            id: id.to_string(),
            external_id: external_id.map(str::to_string),
            name: name.to_string(),
        }
    }

    fn fixtures(
        sources: &[SourceGroup],
        targets: Vec<TargetGroup>,
    ) -> (SourceSet<'_>, TargetSet, BTreeMap<String, TargetGroup>) {
        let source_set = sources.iter().map(|s| (s.id.as_str(), s)).collect();
        let groups: BTreeMap<String, TargetGroup> =
            targets.into_iter().map(|t| (t.id.clone(), t)).collect();
        let target_set = groups.keys().cloned().collect();
        (source_set, target_set, groups)
    }

    #[test]
    fn test_external_id_round_ignores_names() {
        let sources = vec![source("g-1", "Engineering")];
        let (s, t, groups) = fixtures(&sources, vec![target("t-1", Some("g-1"), "Eng")]);

        let pairs = MatchRound::ExternalId.pair(&s, &t, &groups);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].1, "t-1");
    }

    #[test]
    fn test_name_round_is_case_folded() {
        let sources = vec![source("g-1", "ENGINEERING")];
        let (s, t, groups) = fixtures(&sources, vec![target("t-1", None, "engineering")]);

        let pairs = MatchRound::Name.pair(&s, &t, &groups);
        assert_eq!(pairs.len(), 1);
    }

    #[test]
    fn test_target_claimed_once_per_round() {
        let sources = vec![source("g-1", "Ops"), source("g-2", "OPS")];
        let (s, t, groups) = fixtures(&sources, vec![target("t-1", None, "ops")]);

        let pairs = MatchRound::Name.pair(&s, &t, &groups);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0.id, "g-1");
    }

    #[test]
    fn test_positional_round_skips_uncontrolled_targets() {
        let sources = vec![source("g-2", "B"), source("g-1", "A")];
        let (s, t, groups) = fixtures(
            &sources,
            vec![
                target("t-1", None, "X"),
                target("t-2", Some("old-1"), "Y"),
                target("t-3", Some("old-2"), "Z"),
            ],
        );

        let pairs = MatchRound::Positional.pair(&s, &t, &groups);
        let ids: Vec<(&str, &str)> = pairs
            .iter()
            .map(|(s, t)| (s.id.as_str(), t.as_str()))
            .collect();
        assert_eq!(ids, vec![("g-1", "t-2"), ("g-2", "t-3")]);
    }
}
