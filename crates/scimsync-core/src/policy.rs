//! Deletion policy and run settings.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::TargetGroup;

/// How aggressively unmatched target records may be deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestructiveMode {
    /// Never delete anything.
    Safe,
    /// Delete only records a prior sync provisioned (non-empty `externalId`).
    #[default]
    Partial,
    /// Delete every unmatched record.
    Full,
}

impl DestructiveMode {
    /// Map the integer configuration level: negative, zero or positive.
    #[must_use]
    pub fn from_level(level: i32) -> Self {
        match level {
            l if l < 0 => Self::Safe,
            0 => Self::Partial,
            _ => Self::Full,
        }
    }

    /// The canonical integer level for this mode.
    #[must_use]
    pub fn level(&self) -> i32 {
        match self {
            Self::Safe => -1,
            Self::Partial => 0,
            Self::Full => 1,
        }
    }

    #[must_use]
    pub fn is_safe(&self) -> bool {
        *self == Self::Safe
    }

    /// Whether an unmatched target group may be deleted.
    #[must_use]
    pub fn may_delete_group(&self, group: &TargetGroup) -> bool {
        match self {
            Self::Safe => false,
            Self::Partial => group.is_scim_controlled(),
            Self::Full => true,
        }
    }

    /// Whether a user may be removed from a group they hold in the target but
    /// not in the source. `None` means the group id has no target record.
    ///
    /// Safe mode is not considered here; the membership reconciler suppresses
    /// the whole remove list afterwards so the suppression is reported once.
    #[must_use]
    pub fn may_remove_membership(&self, group: Option<&TargetGroup>) -> bool {
        match self {
            Self::Full => true,
            Self::Safe | Self::Partial => group.is_some_and(TargetGroup::is_scim_controlled),
        }
    }
}

impl fmt::Display for DestructiveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Safe => write!(f, "safe"),
            Self::Partial => write!(f, "partial"),
            Self::Full => write!(f, "full"),
        }
    }
}

/// Settings for one sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Record skipped/no-op decisions as failure entries.
    pub verbose: bool,
    /// Run the user phase. Membership runs regardless.
    pub update_users: bool,
    pub destructive: DestructiveMode,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            verbose: false,
            update_users: true,
            destructive: DestructiveMode::Partial,
        }
    }
}
