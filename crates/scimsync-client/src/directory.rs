//! [`TargetDirectory`] over a SCIM 2.0 endpoint.

use async_trait::async_trait;
use scimsync_core::{
    GroupPatch, MembershipPatch, NewGroup, NewUser, RequestError, ResourceKind, SyncError,
    SyncResult, TargetDirectory, TargetGroup, TargetRecord, TargetUser, UserPatch,
};

use crate::client::ScimClient;
use crate::mapper::ScimMapper;

#[async_trait]
impl TargetDirectory for ScimClient {
    async fn load_users(&self) -> SyncResult<Vec<TargetUser>> {
        let users = self.list_users().await?;
        Ok(users.into_iter().map(ScimMapper::to_target_user).collect())
    }

    async fn load_groups(&self) -> SyncResult<Vec<TargetGroup>> {
        let groups = self.list_groups().await?;
        Ok(groups.into_iter().map(ScimMapper::to_target_group).collect())
    }

    async fn get(&self, kind: ResourceKind, id: &str) -> Result<TargetRecord, RequestError> {
        Ok(match kind {
            ResourceKind::User => {
                TargetRecord::User(ScimMapper::to_target_user(self.get_user(id).await?))
            }
            ResourceKind::Group => {
                TargetRecord::Group(ScimMapper::to_target_group(self.get_group(id).await?))
            }
        })
    }

    async fn create_user(&self, user: &NewUser) -> Result<TargetUser, RequestError> {
        let created = ScimClient::create_user(self, &ScimMapper::user_payload(user)).await?;
        Ok(ScimMapper::to_target_user(created))
    }

    async fn create_group(&self, group: &NewGroup) -> Result<TargetGroup, RequestError> {
        let created = ScimClient::create_group(self, &ScimMapper::group_payload(group)).await?;
        Ok(ScimMapper::to_target_group(created))
    }

    async fn patch_user(&self, id: &str, patch: &UserPatch) -> Result<(), RequestError> {
        ScimClient::patch_user(self, id, &ScimMapper::user_patch(patch)).await?;
        Ok(())
    }

    async fn patch_group(&self, id: &str, patch: &GroupPatch) -> Result<(), RequestError> {
        ScimClient::patch_group(self, id, &ScimMapper::group_patch(patch)).await?;
        Ok(())
    }

    async fn patch_membership(
        &self,
        user_id: &str,
        patch: &MembershipPatch,
    ) -> Result<(), RequestError> {
        ScimClient::patch_user(self, user_id, &ScimMapper::membership_patch(patch)).await?;
        Ok(())
    }

    async fn delete(&self, kind: ResourceKind, id: &str) -> Result<(), RequestError> {
        match kind {
            ResourceKind::User => self.delete_user(id).await?,
            ResourceKind::Group => self.delete_group(id).await?,
        }
        Ok(())
    }

    async fn test_connection(&self) -> SyncResult<()> {
        let health = self.health_check().await;
        if health.healthy {
            Ok(())
        } else {
            Err(SyncError::Load(format!(
                "SCIM endpoint {} is not reachable: {}",
                self.base_url(),
                health.error.unwrap_or_default()
            )))
        }
    }
}
