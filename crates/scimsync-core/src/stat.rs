//! Per-run outcome report.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Success and failure descriptions for one phase, in the order they happened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseLog {
    pub successes: Vec<String>,
    pub failures: Vec<String>,
}

impl PhaseLog {
    pub fn success(&mut self, entry: String) {
        self.successes.push(entry);
    }

    pub fn failure(&mut self, entry: String) {
        self.failures.push(entry);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.successes.is_empty() && self.failures.is_empty()
    }
}

/// Everything a completed run did, grouped by phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStat {
    pub groups: PhaseLog,
    pub users: PhaseLog,
    pub membership: PhaseLog,
}

impl SyncStat {
    /// True when the run changed nothing and reported nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.users.is_empty() && self.membership.is_empty()
    }

    /// Total number of failure entries across phases.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.groups.failures.len() + self.users.failures.len() + self.membership.failures.len()
    }
}

fn write_section(f: &mut fmt::Formatter<'_>, title: &str, entries: &[String]) -> fmt::Result {
    if entries.is_empty() {
        return Ok(());
    }
    writeln!(f, "{title}:")?;
    for entry in entries {
        writeln!(f, "\t{entry}")?;
    }
    Ok(())
}

impl fmt::Display for SyncStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_section(f, "Group Success", &self.groups.successes)?;
        write_section(f, "Group Failure", &self.groups.failures)?;
        write_section(f, "User Success", &self.users.successes)?;
        write_section(f, "User Failure", &self.users.failures)?;
        write_section(f, "Membership Success", &self.membership.successes)?;
        write_section(f, "Membership Failure", &self.membership.failures)
    }
}
