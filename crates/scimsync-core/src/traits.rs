//! Collaborator seams: where identities come from and where they are
//! provisioned.

use async_trait::async_trait;

use crate::error::{RequestError, SyncResult};
use crate::model::{
    GroupPatch, MembershipPatch, NewGroup, NewUser, ResourceKind, SourceGroup, SourceUser,
    TargetGroup, TargetRecord, TargetUser, UserPatch,
};

/// A directory treated as ground truth.
///
/// `populate` takes one snapshot; the iterators replay that snapshot and
/// may be called any number of times.
#[async_trait]
pub trait IdentitySource: Send + Sync {
    /// Crawl the directory. Fails with [`crate::SyncError::Load`] when the
    /// configuration cannot be resolved at all.
    async fn populate(&mut self) -> SyncResult<()>;

    /// Users of the last populated snapshot.
    fn users(&self) -> Box<dyn Iterator<Item = &SourceUser> + Send + '_>;

    /// Groups of the last populated snapshot.
    fn groups(&self) -> Box<dyn Iterator<Item = &SourceGroup> + Send + '_>;

    /// Some configured entries could not be resolved; the snapshot may be
    /// incomplete and deletions must not be trusted.
    fn had_partial_errors(&self) -> bool;

    /// Lightweight credential check.
    async fn test_connection(&self) -> SyncResult<()> {
        Ok(())
    }
}

/// The SCIM store being converged to the source.
#[async_trait]
pub trait TargetDirectory: Send + Sync {
    /// Fetch every provisioned user.
    async fn load_users(&self) -> SyncResult<Vec<TargetUser>>;

    /// Fetch every provisioned group.
    async fn load_groups(&self) -> SyncResult<Vec<TargetGroup>>;

    /// Fetch a single record.
    async fn get(&self, kind: ResourceKind, id: &str) -> Result<TargetRecord, RequestError>;

    async fn create_user(&self, user: &NewUser) -> Result<TargetUser, RequestError>;

    async fn create_group(&self, group: &NewGroup) -> Result<TargetGroup, RequestError>;

    async fn patch_user(&self, id: &str, patch: &UserPatch) -> Result<(), RequestError>;

    async fn patch_group(&self, id: &str, patch: &GroupPatch) -> Result<(), RequestError>;

    /// Add and remove group memberships of one user in a single request.
    async fn patch_membership(
        &self,
        user_id: &str,
        patch: &MembershipPatch,
    ) -> Result<(), RequestError>;

    async fn delete(&self, kind: ResourceKind, id: &str) -> Result<(), RequestError>;

    /// Lightweight reachability check.
    async fn test_connection(&self) -> SyncResult<()> {
        Ok(())
    }
}
