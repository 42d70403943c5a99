//! Self-hosted deployment agent pools.

use reconcile::CallContext;
use serde::{Deserialize, Serialize};

use crate::client::{Client, path};
use crate::error::{Error, Result};

/// An agent pool; `token_value` is only filled right after creation
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentPool {
    pub id: String,
    pub name: String,
    pub description: String,
    pub token_value: String,
}

#[derive(Serialize)]
struct PoolBody<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "is_blank")]
    description: &'a str,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_blank(s: &&str) -> bool {
    s.is_empty()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedPool {
    id: String,
    #[serde(default)]
    token_value: String,
}

/// Agent pool operations.
pub trait AgentPoolClient: Send + Sync + std::fmt::Debug {
    fn create_agent_pool(
        &self,
        ctx: &CallContext,
        org: &str,
        name: &str,
        description: &str,
    ) -> Result<AgentPool>;

    fn update_agent_pool(
        &self,
        ctx: &CallContext,
        org: &str,
        pool_id: &str,
        name: &str,
        description: &str,
    ) -> Result<()>;

    /// With `force` the pool is deleted even while stacks still use it.
    fn delete_agent_pool(&self, ctx: &CallContext, org: &str, pool_id: &str, force: bool)
    -> Result<()>;

    /// `None` when the pool no longer exists.
    fn get_agent_pool(&self, ctx: &CallContext, org: &str, pool_id: &str)
    -> Result<Option<AgentPool>>;
}

fn pool_path(org: &str, pool_id: &str) -> Result<String> {
    path(&["orgs", org, "agent-pools", pool_id])
}

impl AgentPoolClient for Client {
    fn create_agent_pool(
        &self,
        ctx: &CallContext,
        org: &str,
        name: &str,
        description: &str,
    ) -> Result<AgentPool> {
        Error::require("orgName", org)?;
        Error::require("name", name)?;
        let created: CreatedPool = self.post_json(
            ctx,
            &path(&["orgs", org, "agent-pools"])?,
            &PoolBody { name, description },
        )?;
        Ok(AgentPool {
            id: created.id,
            name: name.to_string(),
            description: description.to_string(),
            token_value: created.token_value,
        })
    }

    fn update_agent_pool(
        &self,
        ctx: &CallContext,
        org: &str,
        pool_id: &str,
        name: &str,
        description: &str,
    ) -> Result<()> {
        Error::require("orgName", org)?;
        Error::require("agentPoolId", pool_id)?;
        Error::require("name", name)?;
        self.patch_unit(ctx, &pool_path(org, pool_id)?, &PoolBody { name, description })
    }

    fn delete_agent_pool(
        &self,
        ctx: &CallContext,
        org: &str,
        pool_id: &str,
        force: bool,
    ) -> Result<()> {
        Error::require("orgName", org)?;
        Error::require("agentPoolId", pool_id)?;
        let mut target = pool_path(org, pool_id)?;
        if force {
            target.push_str("?force=true");
        }
        self.delete(ctx, &target)
    }

    fn get_agent_pool(
        &self,
        ctx: &CallContext,
        org: &str,
        pool_id: &str,
    ) -> Result<Option<AgentPool>> {
        Error::require("orgName", org)?;
        Error::require("agentPoolId", pool_id)?;
        self.get_optional(ctx, &pool_path(org, pool_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{Method, MockTransport};
    use serde_json::json;

    #[test]
    fn test_create_returns_token() {
        let mock = MockTransport::new();
        mock.route(
            Method::Post,
            "orgs/acme/agent-pools",
            200,
            json!({"id": "pool-1", "tokenValue": "pul-agent"}),
        );
        let client = Client::new(mock.clone());

        let pool = client
            .create_agent_pool(&CallContext::new(), "acme", "runners", "")
            .unwrap();
        assert_eq!(pool.id, "pool-1");
        assert_eq!(pool.token_value, "pul-agent");
        assert_eq!(pool.name, "runners");
        assert_eq!(mock.requests()[0].body, Some(json!({"name": "runners"})));
    }

    #[test]
    fn test_force_delete_adds_query() {
        let mock = MockTransport::new();
        mock.route(
            Method::Delete,
            "orgs/acme/agent-pools/pool-1?force=true",
            204,
            serde_json::Value::Null,
        );
        let client = Client::new(mock);
        let ctx = CallContext::new();

        client.delete_agent_pool(&ctx, "acme", "pool-1", true).unwrap();
        let err = client
            .delete_agent_pool(&ctx, "acme", "pool-1", false)
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_get_pool() {
        let mock = MockTransport::new();
        mock.route(
            Method::Get,
            "orgs/acme/agent-pools/pool-1",
            200,
            json!({"id": "pool-1", "name": "runners", "description": "ci"}),
        );
        let client = Client::new(mock);
        let pool = client
            .get_agent_pool(&CallContext::new(), "acme", "pool-1")
            .unwrap()
            .unwrap();
        assert_eq!(pool.description, "ci");
        assert!(pool.token_value.is_empty());
    }
}
