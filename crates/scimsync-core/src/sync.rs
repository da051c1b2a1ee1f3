//! Orchestrator: one full reconciliation run.

use tracing::{info, warn};

use crate::error::SyncResult;
use crate::policy::{DestructiveMode, SyncSettings};
use crate::reconcile::{reconcile_groups, reconcile_membership, reconcile_users, TargetState};
use crate::stat::SyncStat;
use crate::traits::{IdentitySource, TargetDirectory};

/// Converges a SCIM target to an identity source.
pub struct ScimSync<S, T> {
    source: S,
    target: T,
    settings: SyncSettings,
}

impl<S, T> ScimSync<S, T>
where
    S: IdentitySource,
    T: TargetDirectory,
{
    pub fn new(source: S, target: T, settings: SyncSettings) -> Self {
        Self {
            source,
            target,
            settings,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Settings the next run would actually use. Safe mode is forced when the
    /// source snapshot is known to be incomplete.
    fn effective_settings(&self) -> SyncSettings {
        let mut settings = self.settings;
        if self.source.had_partial_errors() && !settings.destructive.is_safe() {
            warn!(
                configured = %settings.destructive,
                "Identity source reported partial errors, forcing safe mode for this run"
            );
            settings.destructive = DestructiveMode::Safe;
        }
        settings
    }

    /// Populate the source, load the target and run all phases.
    ///
    /// Source or target load failures abort before any mutation. Failures of
    /// individual requests are reported in the returned [`SyncStat`].
    pub async fn sync(&mut self) -> SyncResult<SyncStat> {
        info!("Populating identity source");
        self.source.populate().await?;
        let settings = self.effective_settings();

        let mut state = TargetState::new();
        state.set_groups(self.target.load_groups().await?);
        state.set_users(self.target.load_users().await?);

        let mut stat = SyncStat::default();
        stat.groups =
            reconcile_groups(&self.target, self.source.groups(), &mut state, &settings).await?;
        if settings.update_users {
            stat.users =
                reconcile_users(&self.target, self.source.users(), &mut state, &settings).await?;
        } else {
            info!("User updates disabled, skipping user phase");
        }
        stat.membership =
            reconcile_membership(&self.target, self.source.users(), &mut state, &settings)
                .await?;

        info!(
            failures = stat.failure_count(),
            mode = %settings.destructive,
            "Sync finished"
        );
        Ok(stat)
    }
}
