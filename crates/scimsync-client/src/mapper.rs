//! Translation between sync records and SCIM wire resources.

use scimsync_core::{
    GroupPatch, MembershipPatch, NewGroup, NewUser, TargetGroup, TargetUser, UserPatch,
};
use serde_json::{json, Map, Value};

use crate::models::{
    ScimGroup, ScimName, ScimPatchOp, ScimPatchRequest, ScimUser, ENTERPRISE_USER_SCHEMA,
    GROUP_SCHEMA, USER_SCHEMA,
};

/// Maps sync records to SCIM payloads and SCIM resources back to records.
pub struct ScimMapper;

impl ScimMapper {
    /// POST /Users body. `userName` is the email and `externalId` the source id.
    #[must_use]
    pub fn user_payload(user: &NewUser) -> ScimUser {
        ScimUser {
            schemas: vec![USER_SCHEMA.to_string(), ENTERPRISE_USER_SCHEMA.to_string()],
            external_id: Some(user.external_id.clone()),
            user_name: user.email.clone(),
            display_name: Some(user.full_name.clone()),
            name: Some(ScimName {
                given_name: Some(user.first_name.clone()),
                family_name: Some(user.last_name.clone()),
            }),
            active: user.active,
            ..Default::default()
        }
    }

    /// POST /Groups body.
    #[must_use]
    pub fn group_payload(group: &NewGroup) -> ScimGroup {
        ScimGroup {
            schemas: vec![GROUP_SCHEMA.to_string()],
            external_id: Some(group.external_id.clone()),
            display_name: group.display_name.clone(),
            ..Default::default()
        }
    }

    /// A single `replace` operation carrying only the changed group attributes.
    #[must_use]
    pub fn group_patch(patch: &GroupPatch) -> ScimPatchRequest {
        let mut value = Map::new();
        if let Some(ref external_id) = patch.external_id {
            value.insert("externalId".into(), json!(external_id));
        }
        if let Some(ref name) = patch.display_name {
            value.insert("displayName".into(), json!(name));
        }
        replace(value)
    }

    /// A single `replace` operation carrying only the changed user attributes.
    #[must_use]
    pub fn user_patch(patch: &UserPatch) -> ScimPatchRequest {
        let mut value = Map::new();
        if let Some(ref external_id) = patch.external_id {
            value.insert("externalId".into(), json!(external_id));
        }
        if let Some(ref name) = patch.display_name {
            value.insert("displayName".into(), json!(name));
        }
        if let Some(ref name) = patch.given_name {
            value.insert("name.givenName".into(), json!(name));
        }
        if let Some(ref name) = patch.family_name {
            value.insert("name.familyName".into(), json!(name));
        }
        if let Some(active) = patch.active {
            value.insert("active".into(), json!(active));
        }
        replace(value)
    }

    /// `add` and `remove` operations on the user's `groups` attribute.
    /// Empty lists produce no operation.
    #[must_use]
    pub fn membership_patch(patch: &MembershipPatch) -> ScimPatchRequest {
        let mut operations = Vec::with_capacity(2);
        for (op, ids) in [("add", &patch.add), ("remove", &patch.remove)] {
            if ids.is_empty() {
                continue;
            }
            operations.push(ScimPatchOp {
                op: op.to_string(),
                path: Some("groups".to_string()),
                value: Value::Array(ids.iter().map(|id| json!({ "value": id })).collect()),
            });
        }
        ScimPatchRequest::new(operations)
    }

    /// Email comes from `userName`, falling back to the primary email.
    #[must_use]
    pub fn to_target_user(user: ScimUser) -> TargetUser {
        let email = if user.user_name.is_empty() {
            user.primary_email().unwrap_or_default().to_string()
        } else {
            user.user_name.clone()
        };
        let name = user.name.unwrap_or_default();
        TargetUser {
            id: user.id,
            external_id: user.external_id,
            email,
            full_name: user.display_name.unwrap_or_default(),
            first_name: name.given_name.unwrap_or_default(),
            last_name: name.family_name.unwrap_or_default(),
            active: user.active,
            groups: user.groups.into_iter().map(|g| g.value).collect(),
        }
    }

    #[must_use]
    pub fn to_target_group(group: ScimGroup) -> TargetGroup {
        TargetGroup {
            id: group.id,
            external_id: group.external_id,
            name: group.display_name,
        }
    }
}

fn replace(value: Map<String, Value>) -> ScimPatchRequest {
    ScimPatchRequest::new(vec![ScimPatchOp {
        op: "replace".to_string(),
        path: None,
        value: Value::Object(value),
    }])
}
