//! In-memory collaborators for exercising the reconciliation engine.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use scimsync_core::{
    GroupPatch, IdentitySource, MembershipPatch, NewGroup, NewUser, RequestError, ResourceKind,
    SourceGroup, SourceUser, SyncError, SyncResult, TargetDirectory, TargetGroup, TargetRecord,
    TargetUser, UserPatch,
};

// =============================================================================
// Identity source
// =============================================================================

/// A source that serves a fixed snapshot.
#[derive(Debug, Default)]
pub struct StaticSource {
    pub users: Vec<SourceUser>,
    pub groups: Vec<SourceGroup>,
    pub partial: bool,
    pub fail_populate: bool,
    pub populate_calls: usize,
}

impl StaticSource {
    pub fn new(groups: Vec<SourceGroup>, users: Vec<SourceUser>) -> Self {
        Self {
            users,
            groups,
            ..Default::default()
        }
    }

    pub fn with_partial_errors(mut self) -> Self {
        self.partial = true;
        self
    }
}

#[async_trait]
impl IdentitySource for StaticSource {
    async fn populate(&mut self) -> SyncResult<()> {
        self.populate_calls += 1;
        if self.fail_populate {
            return Err(SyncError::Load("directory unreachable".to_string()));
        }
        Ok(())
    }

    fn users(&self) -> Box<dyn Iterator<Item = &SourceUser> + Send + '_> {
        Box::new(self.users.iter())
    }

    fn groups(&self) -> Box<dyn Iterator<Item = &SourceGroup> + Send + '_> {
        Box::new(self.groups.iter())
    }

    fn had_partial_errors(&self) -> bool {
        self.partial
    }
}

// =============================================================================
// Target directory
// =============================================================================

/// A mutation the engine issued against the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateUser(String),
    CreateGroup(String),
    PatchUser(String, UserPatch),
    PatchGroup(String, GroupPatch),
    PatchMembership(String, MembershipPatch),
    Delete(ResourceKind, String),
}

#[derive(Debug, Default)]
struct Store {
    users: BTreeMap<String, TargetUser>,
    groups: BTreeMap<String, TargetGroup>,
    calls: Vec<Call>,
    next_id: u64,
    failing: HashSet<String>,
    fail_loads: bool,
}

impl Store {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-new-{}", self.next_id)
    }

    fn check(&self, key: &str) -> Result<(), RequestError> {
        if self.failing.contains(key) {
            return Err(RequestError::with_status(500, "injected failure"));
        }
        Ok(())
    }
}

/// A SCIM store held in memory that records every mutation.
#[derive(Debug, Default)]
pub struct MemoryTarget {
    store: Mutex<Store>,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(self, group: TargetGroup) -> Self {
        self.store
            .lock()
            .unwrap()
            .groups
            .insert(group.id.clone(), group);
        self
    }

    pub fn with_user(self, user: TargetUser) -> Self {
        self.store
            .lock()
            .unwrap()
            .users
            .insert(user.id.clone(), user);
        self
    }

    /// Make every mutation whose subject (id, email or name) equals `key` fail.
    pub fn fail_on(self, key: &str) -> Self {
        self.store.lock().unwrap().failing.insert(key.to_string());
        self
    }

    pub fn fail_loads(self) -> Self {
        self.store.lock().unwrap().fail_loads = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.store.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.store.lock().unwrap().calls.clear();
    }

    pub fn deletes(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Delete(..)))
            .count()
    }

    pub fn group(&self, id: &str) -> Option<TargetGroup> {
        self.store.lock().unwrap().groups.get(id).cloned()
    }

    pub fn user(&self, id: &str) -> Option<TargetUser> {
        self.store.lock().unwrap().users.get(id).cloned()
    }

    pub fn group_by_name(&self, name: &str) -> Option<TargetGroup> {
        self.store
            .lock()
            .unwrap()
            .groups
            .values()
            .find(|g| g.name == name)
            .cloned()
    }

    pub fn user_by_email(&self, email: &str) -> Option<TargetUser> {
        self.store
            .lock()
            .unwrap()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
    }

    pub fn group_count(&self) -> usize {
        self.store.lock().unwrap().groups.len()
    }

    pub fn user_count(&self) -> usize {
        self.store.lock().unwrap().users.len()
    }
}

#[async_trait]
impl TargetDirectory for MemoryTarget {
    async fn load_users(&self) -> SyncResult<Vec<TargetUser>> {
        let store = self.store.lock().unwrap();
        if store.fail_loads {
            return Err(SyncError::Load("GET Users: 503".to_string()));
        }
        Ok(store.users.values().cloned().collect())
    }

    async fn load_groups(&self) -> SyncResult<Vec<TargetGroup>> {
        let store = self.store.lock().unwrap();
        if store.fail_loads {
            return Err(SyncError::Load("GET Groups: 503".to_string()));
        }
        Ok(store.groups.values().cloned().collect())
    }

    async fn get(&self, kind: ResourceKind, id: &str) -> Result<TargetRecord, RequestError> {
        let store = self.store.lock().unwrap();
        let record = match kind {
            ResourceKind::User => store.users.get(id).cloned().map(TargetRecord::User),
            ResourceKind::Group => store.groups.get(id).cloned().map(TargetRecord::Group),
        };
        record.ok_or_else(|| RequestError::with_status(404, "not found"))
    }

    async fn create_user(&self, user: &NewUser) -> Result<TargetUser, RequestError> {
        let mut store = self.store.lock().unwrap();
        store.calls.push(Call::CreateUser(user.email.clone()));
        store.check(&user.email)?;
        let created = TargetUser {
            id: store.next_id("u"),
            external_id: Some(user.external_id.clone()),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            active: user.active,
            groups: BTreeSet::new(),
        };
        store.users.insert(created.id.clone(), created.clone());
        Ok(created)
    }

    async fn create_group(&self, group: &NewGroup) -> Result<TargetGroup, RequestError> {
        let mut store = self.store.lock().unwrap();
        store.calls.push(Call::CreateGroup(group.display_name.clone()));
        store.check(&group.display_name)?;
        let created = TargetGroup {
            id: store.next_id("g"),
            external_id: Some(group.external_id.clone()),
            name: group.display_name.clone(),
        };
        store.groups.insert(created.id.clone(), created.clone());
        Ok(created)
    }

    async fn patch_user(&self, id: &str, patch: &UserPatch) -> Result<(), RequestError> {
        let mut store = self.store.lock().unwrap();
        store.calls.push(Call::PatchUser(id.to_string(), patch.clone()));
        store.check(id)?;
        let user = store
            .users
            .get_mut(id)
            .ok_or_else(|| RequestError::with_status(404, "not found"))?;
        patch.apply_to(user);
        Ok(())
    }

    async fn patch_group(&self, id: &str, patch: &GroupPatch) -> Result<(), RequestError> {
        let mut store = self.store.lock().unwrap();
        store.calls.push(Call::PatchGroup(id.to_string(), patch.clone()));
        store.check(id)?;
        let group = store
            .groups
            .get_mut(id)
            .ok_or_else(|| RequestError::with_status(404, "not found"))?;
        patch.apply_to(group);
        Ok(())
    }

    async fn patch_membership(
        &self,
        user_id: &str,
        patch: &MembershipPatch,
    ) -> Result<(), RequestError> {
        let mut store = self.store.lock().unwrap();
        store
            .calls
            .push(Call::PatchMembership(user_id.to_string(), patch.clone()));
        store.check(user_id)?;
        let user = store
            .users
            .get_mut(user_id)
            .ok_or_else(|| RequestError::with_status(404, "not found"))?;
        patch.apply_to(user);
        Ok(())
    }

    async fn delete(&self, kind: ResourceKind, id: &str) -> Result<(), RequestError> {
        let mut store = self.store.lock().unwrap();
        store.calls.push(Call::Delete(kind, id.to_string()));
        store.check(id)?;
        match kind {
            ResourceKind::User => {
                store.users.remove(id);
            }
            ResourceKind::Group => {
                store.groups.remove(id);
                for user in store.users.values_mut() {
                    user.groups.remove(id);
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// Builders
// =============================================================================

pub fn source_group(id: &str, name: &str) -> SourceGroup {
    SourceGroup {
        id: id.to_string(),
        name: name.to_string(),
    }
}

pub fn source_user(id: &str, email: &str, groups: &[&str]) -> SourceUser {
    SourceUser {
        id: id.to_string(),
        email: email.to_string(),
        full_name: "Test User".to_string(),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        active: true,
        groups: groups.iter().map(|g| g.to_string()).collect(),
    }
}

pub fn target_group(id: &str, external_id: Option<&str>, name: &str) -> TargetGroup {
    TargetGroup {
        id: id.to_string(),
        external_id: external_id.map(str::to_string),
        name: name.to_string(),
    }
}

/// A target user whose attributes already equal `source_user(external_id, email, ..)`.
pub fn target_user(id: &str, external_id: Option<&str>, email: &str, groups: &[&str]) -> TargetUser {
    TargetUser {
        id: id.to_string(),
        external_id: external_id.map(str::to_string),
        email: email.to_string(),
        full_name: "Test User".to_string(),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        active: true,
        groups: groups.iter().map(|g| g.to_string()).collect(),
    }
}
