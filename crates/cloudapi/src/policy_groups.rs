//! Policy groups: the stacks or accounts a set of policy packs applies to.

use reconcile::CallContext;
use serde::{Deserialize, Serialize};

use crate::client::{Client, path};
use crate::error::{Error, Result};

/// A stack enrolled in a policy group
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StackReference {
    pub name: String,
    pub routing_project: String,
}

/// A policy pack applied by a policy group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyPackMetadata {
    pub name: String,
    pub display_name: String,
    pub version: i64,
    pub version_tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Map<String, serde_json::Value>>,
}

/// A policy group as returned by the service
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyGroup {
    pub name: String,
    pub is_org_default: bool,
    pub entity_type: String,
    pub mode: String,
    pub stacks: Vec<StackReference>,
    pub applied_policy_packs: Vec<PolicyPackMetadata>,
    pub accounts: Vec<String>,
}

/// One edit of a policy group; the service accepts a single action per call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PolicyGroupEdit {
    NewName(String),
    AddStack(StackReference),
    RemoveStack(StackReference),
    AddPolicyPack(PolicyPackMetadata),
    RemovePolicyPack(PolicyPackMetadata),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewPolicyGroup<'a> {
    name: &'a str,
    entity_type: &'a str,
    mode: &'a str,
}

/// Policy group operations.
pub trait PolicyGroupClient: Send + Sync + std::fmt::Debug {
    fn create_policy_group(
        &self,
        ctx: &CallContext,
        org: &str,
        name: &str,
        entity_type: &str,
        mode: &str,
    ) -> Result<()>;

    /// `None` when the group no longer exists.
    fn get_policy_group(&self, ctx: &CallContext, org: &str, name: &str)
    -> Result<Option<PolicyGroup>>;

    fn update_policy_group(
        &self,
        ctx: &CallContext,
        org: &str,
        name: &str,
        edit: &PolicyGroupEdit,
    ) -> Result<()>;

    fn delete_policy_group(&self, ctx: &CallContext, org: &str, name: &str) -> Result<()>;
}

fn group_path(org: &str, name: &str) -> Result<String> {
    path(&["orgs", org, "policygroups", name])
}

impl PolicyGroupClient for Client {
    fn create_policy_group(
        &self,
        ctx: &CallContext,
        org: &str,
        name: &str,
        entity_type: &str,
        mode: &str,
    ) -> Result<()> {
        Error::require("orgName", org)?;
        Error::require("policyGroupName", name)?;
        self.post_unit(
            ctx,
            &path(&["orgs", org, "policygroups"])?,
            &NewPolicyGroup {
                name,
                entity_type,
                mode,
            },
        )
    }

    fn get_policy_group(
        &self,
        ctx: &CallContext,
        org: &str,
        name: &str,
    ) -> Result<Option<PolicyGroup>> {
        Error::require("orgName", org)?;
        Error::require("policyGroupName", name)?;
        self.get_optional(ctx, &group_path(org, name)?)
    }

    fn update_policy_group(
        &self,
        ctx: &CallContext,
        org: &str,
        name: &str,
        edit: &PolicyGroupEdit,
    ) -> Result<()> {
        Error::require("orgName", org)?;
        Error::require("policyGroupName", name)?;
        self.patch_unit(ctx, &group_path(org, name)?, edit)
    }

    fn delete_policy_group(&self, ctx: &CallContext, org: &str, name: &str) -> Result<()> {
        Error::require("orgName", org)?;
        Error::require("policyGroupName", name)?;
        self.delete(ctx, &group_path(org, name)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{Method, MockTransport};
    use serde_json::json;

    #[test]
    fn test_edit_shapes() {
        let stack = StackReference {
            name: "prod".into(),
            routing_project: "web".into(),
        };
        assert_eq!(
            serde_json::to_value(PolicyGroupEdit::AddStack(stack)).unwrap(),
            json!({"addStack": {"name": "prod", "routingProject": "web"}})
        );
        assert_eq!(
            serde_json::to_value(PolicyGroupEdit::NewName("g2".into())).unwrap(),
            json!({"newName": "g2"})
        );
    }

    #[test]
    fn test_create_body() {
        let mock = MockTransport::new();
        mock.route(Method::Post, "orgs/acme/policygroups", 204, serde_json::Value::Null);
        let client = Client::new(mock.clone());
        client
            .create_policy_group(&CallContext::new(), "acme", "prod-guard", "stacks", "audit")
            .unwrap();
        assert_eq!(
            mock.requests()[0].body,
            Some(json!({"name": "prod-guard", "entityType": "stacks", "mode": "audit"}))
        );
    }

    #[test]
    fn test_get_policy_group() {
        let mock = MockTransport::new();
        mock.route(
            Method::Get,
            "orgs/acme/policygroups/prod-guard",
            200,
            json!({
                "name": "prod-guard",
                "entityType": "stacks",
                "mode": "preventative",
                "stacks": [{"name": "prod", "routingProject": "web"}],
                "appliedPolicyPacks": [{"name": "aws", "displayName": "AWS", "version": 3, "versionTag": "1.2.0", "config": {"all": "mandatory"}}]
            }),
        );
        let client = Client::new(mock);
        let ctx = CallContext::new();

        let group = client
            .get_policy_group(&ctx, "acme", "prod-guard")
            .unwrap()
            .unwrap();
        assert_eq!(group.mode, "preventative");
        assert_eq!(group.applied_policy_packs[0].version, 3);
        assert!(group.applied_policy_packs[0].config.is_some());
        assert!(client.get_policy_group(&ctx, "acme", "nope").unwrap().is_none());
    }
}
