//! Google Workspace as the identity source of a sync run.
//!
//! The configured "SCIM groups" entries select what gets synchronized. Each
//! entry is a group email, a user email or a group name. Selected groups are
//! expanded through nested groups; every user reached that way belongs to the
//! selected group it was reached from.

use async_trait::async_trait;
use scimsync_core::{IdentitySource, SourceGroup, SourceUser, SyncError, SyncResult};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::models::GoogleUser;
use crate::{DirectoryClient, GoogleCredentials, GoogleResult, TokenCache};

const MAX_EMAIL_LENGTH: usize = 254;

/// Split the configured entries on newlines and commas. Entries are trimmed,
/// empties dropped, and duplicates removed keeping first occurrence.
#[must_use]
pub fn parse_scim_groups<S: AsRef<str>>(entries: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    entries
        .iter()
        .flat_map(|entry| entry.as_ref().split(['\n', ',']))
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter(|entry| seen.insert(entry.to_string()))
        .map(str::to_string)
        .collect()
}

/// The address of an entry written as `addr@domain` or `Name <addr@domain>`.
#[must_use]
pub fn email_address(entry: &str) -> Option<&str> {
    let entry = entry.trim();
    let address = match (entry.rfind('<'), entry.strip_suffix('>')) {
        (Some(open), Some(rest)) => rest[open + 1..].trim(),
        (None, None) => entry,
        _ => return None,
    };
    is_email(address).then_some(address)
}

fn is_email(address: &str) -> bool {
    if address.is_empty() || address.len() > MAX_EMAIL_LENGTH {
        return false;
    }
    if address.contains(char::is_whitespace) || address.contains(['<', '>', ',']) {
        return false;
    }
    let Some((local, domain)) = address.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with(['.', '-'])
        && !domain.ends_with(['.', '-'])
}

/// Users and groups selected from one Workspace customer.
pub struct GoogleEndpoint {
    client: DirectoryClient,
    scim_groups: Vec<String>,
    users: BTreeMap<String, SourceUser>,
    groups: BTreeMap<String, SourceGroup>,
    partial_errors: bool,
}

impl GoogleEndpoint {
    #[must_use]
    pub fn new(client: DirectoryClient, scim_groups: Vec<String>) -> Self {
        Self {
            client,
            scim_groups,
            users: BTreeMap::new(),
            groups: BTreeMap::new(),
            partial_errors: false,
        }
    }

    /// Build the token cache and Directory client from a service account key.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn from_credentials(
        credentials: GoogleCredentials,
        admin_account: impl Into<String>,
        scim_groups: Vec<String>,
        timeout: Duration,
    ) -> GoogleResult<Self> {
        let token_cache = Arc::new(TokenCache::new(credentials, admin_account));
        let client = DirectoryClient::new(token_cache, timeout)?;
        Ok(Self::new(client, scim_groups))
    }

    /// Resolve one entry into `groups` or `direct_users`. False when nothing matched.
    async fn resolve_entry(
        &mut self,
        entry: &str,
        direct_users: &mut BTreeSet<String>,
        directly_resolved: &mut HashMap<String, GoogleUser>,
    ) -> bool {
        if let Some(address) = email_address(entry) {
            let query = format!("email={address}");
            match self.client.list_groups(Some(&query)).await {
                Ok(groups) if !groups.is_empty() => {
                    for group in groups {
                        debug!(
                            "Found Google group \"{}\" for email \"{}\"",
                            group.name, group.email
                        );
                        self.add_group(group.id, group.name);
                    }
                    return true;
                }
                Ok(_) => {}
                Err(e) => warn!(entry, error = %e, "Group lookup by email failed"),
            }
            match self.client.list_users(Some(&query)).await {
                Ok(users) if !users.is_empty() => {
                    for user in users {
                        debug!("Found Google user for email \"{}\"", user.primary_email);
                        direct_users.insert(user.id.clone());
                        directly_resolved.insert(user.id.clone(), user);
                    }
                    return true;
                }
                Ok(_) => {}
                Err(e) => warn!(entry, error = %e, "User lookup by email failed"),
            }
            warn!(
                "An email \"{}\" could not be resolved as either Google User or Group",
                address
            );
            return false;
        }

        let query = format!("name='{entry}'");
        match self.client.list_groups(Some(&query)).await {
            Ok(groups) if !groups.is_empty() => {
                for group in groups {
                    debug!("Found Google group \"{}\" by name", group.name);
                    self.add_group(group.id, group.name);
                }
                true
            }
            Ok(_) => {
                warn!(
                    "A name \"{}\" could not be resolved to Google Group. Names are case sensitive",
                    entry
                );
                false
            }
            Err(e) => {
                warn!(entry, error = %e, "Group lookup by name failed");
                false
            }
        }
    }

    fn add_group(&mut self, id: String, name: String) {
        self.groups
            .entry(id.clone())
            .or_insert(SourceGroup { id, name });
    }

    /// Breadth-first walk below every selected group. Members that are known
    /// users join the root group; anything else is treated as a nested group.
    async fn expand_memberships(&mut self, lookup: &mut BTreeMap<String, SourceUser>) {
        let mut membership_cache: HashMap<String, Vec<String>> = HashMap::new();
        let roots: Vec<(String, String)> = self
            .groups
            .values()
            .map(|g| (g.id.clone(), g.name.clone()))
            .collect();

        for (root_id, root_name) in roots {
            let mut queue = VecDeque::from([root_id.clone()]);
            let mut queued: HashSet<String> = HashSet::from([root_id.clone()]);

            while let Some(group_id) = queue.pop_front() {
                if !membership_cache.contains_key(&group_id) {
                    let member_ids = match self.client.list_members(&group_id).await {
                        Ok(members) => members.into_iter().map(|m| m.id).collect(),
                        Err(e) => {
                            warn!(
                                "Loaded group \"{}\" membership failed: {}",
                                root_name, e
                            );
                            self.partial_errors = true;
                            Vec::new()
                        }
                    };
                    membership_cache.insert(group_id.clone(), member_ids);
                }
                let Some(member_ids) = membership_cache.get(&group_id) else {
                    continue;
                };

                for member_id in member_ids {
                    if let Some(user) = lookup.get_mut(member_id) {
                        if !user.groups.contains(&root_id) {
                            user.groups.push(root_id.clone());
                        }
                        self.users
                            .entry(member_id.clone())
                            .or_insert_with(|| user.clone())
                            .groups
                            .clone_from(&user.groups);
                    } else if queued.insert(member_id.clone()) {
                        queue.push_back(member_id.clone());
                    }
                }
            }
        }
    }
}

#[async_trait]
impl IdentitySource for GoogleEndpoint {
    #[instrument(skip(self))]
    async fn populate(&mut self) -> SyncResult<()> {
        self.partial_errors = false;
        self.users.clear();
        self.groups.clear();

        let entries = parse_scim_groups(&self.scim_groups);
        if entries.is_empty() {
            return Err(SyncError::Load(
                "could not resolve \"SCIM Group\" content to groups".into(),
            ));
        }

        info!(entries = entries.len(), "Resolving \"SCIM Group\" content");
        let mut direct_users = BTreeSet::new();
        let mut directly_resolved = HashMap::new();
        for entry in &entries {
            if !self
                .resolve_entry(entry, &mut direct_users, &mut directly_resolved)
                .await
            {
                self.partial_errors = true;
            }
        }

        if self.groups.is_empty() && direct_users.is_empty() {
            return Err(SyncError::Load(
                "no Google Workspace groups could be resolved".into(),
            ));
        }

        info!("Loading all users");
        let all_users = self.client.list_users(None).await.map_err(|e| {
            SyncError::Load(format!("google directory API: error querying users: {e}"))
        })?;
        let mut lookup: BTreeMap<String, SourceUser> = all_users
            .iter()
            .map(|u| (u.id.clone(), u.to_source_user()))
            .collect();
        info!(count = lookup.len(), "Google users loaded");

        for id in &direct_users {
            let user = lookup
                .get(id)
                .cloned()
                .or_else(|| directly_resolved.get(id).map(GoogleUser::to_source_user));
            if let Some(user) = user {
                self.users.insert(id.clone(), user);
            }
        }

        self.expand_memberships(&mut lookup).await;

        info!(
            users = self.users.len(),
            groups = self.groups.len(),
            partial = self.partial_errors,
            "Google Workspace populated"
        );
        Ok(())
    }

    fn users(&self) -> Box<dyn Iterator<Item = &SourceUser> + Send + '_> {
        Box::new(self.users.values())
    }

    fn groups(&self) -> Box<dyn Iterator<Item = &SourceGroup> + Send + '_> {
        Box::new(self.groups.values())
    }

    fn had_partial_errors(&self) -> bool {
        self.partial_errors
    }

    async fn test_connection(&self) -> SyncResult<()> {
        self.client.first_users(1).await.map_err(|e| {
            SyncError::Load(format!("failed to connect to Google Workspace API: {e}"))
        })?;
        info!("Successful connection to Google Endpoint");
        Ok(())
    }
}
