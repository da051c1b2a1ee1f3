//! User phase: match by case-folded email, then patch, create or delete.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use crate::error::SyncResult;
use crate::fold::fold;
use crate::model::{NewUser, ResourceKind, SourceUser, TargetUser, UserPatch};
use crate::policy::{DestructiveMode, SyncSettings};
use crate::reconcile::{email_lookup, TargetState};
use crate::stat::PhaseLog;
use crate::traits::TargetDirectory;

/// Reconcile target users against `source_users`.
///
/// Inactive source users are never created and inactive unmatched target
/// users are left alone. Deletion is governed by the destructive mode alone;
/// Partial and Full behave the same for users.
pub async fn reconcile_users<'s, T>(
    target: &T,
    source_users: impl IntoIterator<Item = &'s SourceUser>,
    state: &mut TargetState,
    settings: &SyncSettings,
) -> SyncResult<PhaseLog>
where
    T: TargetDirectory + ?Sized,
{
    let users = state.users_mut()?;

    let mut sources: BTreeMap<&str, &SourceUser> = BTreeMap::new();
    for user in source_users {
        sources.entry(user.id.as_str()).or_insert(user);
    }
    let lookup = email_lookup(users);
    let mut remaining: BTreeSet<String> = users.keys().cloned().collect();

    info!(
        source = sources.len(),
        target = remaining.len(),
        mode = %settings.destructive,
        "Reconciling users"
    );

    let mut log = PhaseLog::default();
    let mut unmatched = Vec::new();

    for source in sources.into_values() {
        let matched = lookup
            .get(&fold(&source.email))
            .filter(|id| remaining.remove(id.as_str()))
            .and_then(|id| users.get_mut(id));
        match matched {
            Some(record) => update_user(target, source, record, &mut log).await,
            None => unmatched.push(source),
        }
    }

    for source in unmatched {
        if !source.active {
            debug!(email = %source.email, "Skipping inactive source user");
            continue;
        }
        create_user(target, source, users, &mut log).await;
    }

    for target_id in remaining {
        delete_user(target, &target_id, users, settings, &mut log).await;
    }

    info!(
        successes = log.successes.len(),
        failures = log.failures.len(),
        "User reconciliation finished"
    );
    Ok(log)
}

async fn update_user<T: TargetDirectory + ?Sized>(
    target: &T,
    source: &SourceUser,
    record: &mut TargetUser,
    log: &mut PhaseLog,
) {
    let patch = UserPatch::diff(record, source);
    if patch.is_empty() {
        return;
    }
    match target.patch_user(&record.id, &patch).await {
        Ok(()) => {
            debug!(id = %record.id, email = %source.email, "User updated");
            patch.apply_to(record);
            log.success(format!("SCIM updated user \"{}\"", source.email));
        }
        Err(e) => {
            warn!(id = %record.id, email = %source.email, error = %e, "User update failed");
            log.failure(format!("PATCH user \"{}\" error: {e}", source.email));
        }
    }
}

async fn create_user<T: TargetDirectory + ?Sized>(
    target: &T,
    source: &SourceUser,
    users: &mut BTreeMap<String, TargetUser>,
    log: &mut PhaseLog,
) {
    match target.create_user(&NewUser::from(source)).await {
        Ok(created) => {
            debug!(id = %created.id, email = %source.email, "User created");
            users.insert(created.id.clone(), created);
            log.success(format!("SCIM added user \"{}\"", source.email));
        }
        Err(e) => {
            warn!(email = %source.email, error = %e, "User creation failed");
            log.failure(format!("POST user \"{}\" error: {e}", source.email));
        }
    }
}

async fn delete_user<T: TargetDirectory + ?Sized>(
    target: &T,
    target_id: &str,
    users: &mut BTreeMap<String, TargetUser>,
    settings: &SyncSettings,
    log: &mut PhaseLog,
) {
    let Some(user) = users.get(target_id) else {
        return;
    };
    if !user.active {
        return;
    }
    let email = user.email.clone();

    if settings.destructive == DestructiveMode::Safe {
        log.failure(format!(
            "DELETE user \"{email}\": delete skipped since the \"Safe Mode\" is enforced"
        ));
        return;
    }

    match target.delete(ResourceKind::User, target_id).await {
        Ok(()) => {
            debug!(id = %target_id, email = %email, "User deleted");
            users.remove(target_id);
            log.success(format!("SCIM deleted user \"{email}\""));
        }
        Err(e) => {
            warn!(id = %target_id, email = %email, error = %e, "User deletion failed");
            log.failure(format!("DELETE user \"{email}\" error: {e}"));
        }
    }
}
