//! Organization, stack and environment webhooks.

use reconcile::CallContext;
use serde::{Deserialize, Serialize};

use crate::client::{Client, path};
use crate::error::{Error, Result};

/// What a webhook is attached to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookTarget {
    Organization {
        org: String,
    },
    Stack {
        org: String,
        project: String,
        stack: String,
    },
    Environment {
        org: String,
        project: String,
        environment: String,
    },
}

impl WebhookTarget {
    pub fn org(&self) -> &str {
        match self {
            Self::Organization { org } | Self::Stack { org, .. } | Self::Environment { org, .. } => {
                org
            }
        }
    }

    /// Collection path the webhooks of this target live under
    fn base_path(&self) -> Result<String> {
        match self {
            Self::Organization { org } => path(&["orgs", org, "hooks"]),
            Self::Stack {
                org,
                project,
                stack,
            } => path(&["stacks", org, project, stack, "hooks"]),
            Self::Environment {
                org,
                project,
                environment,
            } => path(&["esc", "environments", org, project, environment, "hooks"]),
        }
    }
}

/// Body for creating or updating a webhook
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRequest {
    pub organization_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_name: Option<String>,
    #[serde(rename = "envName", skip_serializing_if = "Option::is_none")]
    pub environment_name: Option<String>,
    pub display_name: String,
    pub payload_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    /// Set on update only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A webhook as returned by the service
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Webhook {
    pub active: bool,
    pub display_name: String,
    pub payload_url: String,
    pub name: String,
    pub format: String,
    pub filters: Vec<String>,
    pub groups: Vec<String>,
    pub has_secret: bool,
    pub secret_ciphertext: String,
}

/// Webhook operations.
pub trait WebhookClient: Send + Sync + std::fmt::Debug {
    fn create_webhook(
        &self,
        ctx: &CallContext,
        target: &WebhookTarget,
        req: &WebhookRequest,
    ) -> Result<Webhook>;

    /// `None` when the webhook no longer exists.
    fn get_webhook(
        &self,
        ctx: &CallContext,
        target: &WebhookTarget,
        name: &str,
    ) -> Result<Option<Webhook>>;

    /// `req.name` selects the webhook.
    fn update_webhook(
        &self,
        ctx: &CallContext,
        target: &WebhookTarget,
        req: &WebhookRequest,
    ) -> Result<Webhook>;

    fn delete_webhook(&self, ctx: &CallContext, target: &WebhookTarget, name: &str) -> Result<()>;
}

impl WebhookClient for Client {
    fn create_webhook(
        &self,
        ctx: &CallContext,
        target: &WebhookTarget,
        req: &WebhookRequest,
    ) -> Result<Webhook> {
        Error::require("orgName", target.org())?;
        Error::require("displayName", &req.display_name)?;
        Error::require("payloadUrl", &req.payload_url)?;
        self.post_json(ctx, &target.base_path()?, req)
    }

    fn get_webhook(
        &self,
        ctx: &CallContext,
        target: &WebhookTarget,
        name: &str,
    ) -> Result<Option<Webhook>> {
        Error::require("orgName", target.org())?;
        Error::require("webhookName", name)?;
        self.get_optional(ctx, &format!("{}/{}", target.base_path()?, path(&[name])?))
    }

    fn update_webhook(
        &self,
        ctx: &CallContext,
        target: &WebhookTarget,
        req: &WebhookRequest,
    ) -> Result<Webhook> {
        let name = req.name.as_deref().unwrap_or_default();
        Error::require("orgName", target.org())?;
        Error::require("name", name)?;
        Error::require("displayName", &req.display_name)?;
        Error::require("payloadUrl", &req.payload_url)?;
        self.patch_json(ctx, &format!("{}/{}", target.base_path()?, path(&[name])?), req)
    }

    fn delete_webhook(&self, ctx: &CallContext, target: &WebhookTarget, name: &str) -> Result<()> {
        Error::require("orgName", target.org())?;
        Error::require("name", name)?;
        self.delete(ctx, &format!("{}/{}", target.base_path()?, path(&[name])?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{Method, MockTransport};
    use serde_json::json;

    fn stack_target() -> WebhookTarget {
        WebhookTarget::Stack {
            org: "acme".into(),
            project: "web".into(),
            stack: "prod".into(),
        }
    }

    #[test]
    fn test_base_paths() {
        assert_eq!(
            WebhookTarget::Organization { org: "acme".into() }.base_path().unwrap(),
            "orgs/acme/hooks"
        );
        assert_eq!(stack_target().base_path().unwrap(), "stacks/acme/web/prod/hooks");
        assert_eq!(
            WebhookTarget::Environment {
                org: "acme".into(),
                project: "p".into(),
                environment: "dev".into(),
            }
            .base_path().unwrap(),
            "esc/environments/acme/p/dev/hooks"
        );
    }

    #[test]
    fn test_create_webhook_body() {
        let mock = MockTransport::new();
        mock.route(
            Method::Post,
            "stacks/acme/web/prod/hooks",
            201,
            json!({"name": "hook-1", "displayName": "Hook", "payloadUrl": "https://x", "active": true, "hasSecret": true, "secretCiphertext": "c1"}),
        );
        let client = Client::new(mock.clone());
        let req = WebhookRequest {
            organization_name: "acme".into(),
            project_name: Some("web".into()),
            stack_name: Some("prod".into()),
            display_name: "Hook".into(),
            payload_url: "https://x".into(),
            secret: Some("hunter2".into()),
            active: true,
            format: Some("raw".into()),
            groups: vec!["stacks".into()],
            ..WebhookRequest::default()
        };

        let hook = client
            .create_webhook(&CallContext::new(), &stack_target(), &req)
            .unwrap();
        assert_eq!(hook.name, "hook-1");
        assert_eq!(hook.secret_ciphertext, "c1");

        let sent = &mock.requests()[0];
        let body = sent.body.as_ref().unwrap();
        assert_eq!(body["stackName"], "prod");
        assert_eq!(body["groups"], json!(["stacks"]));
        assert!(body.get("envName").is_none());
        assert!(body.get("filters").is_none());
    }

    #[test]
    fn test_get_missing_webhook() {
        let client = Client::new(MockTransport::new());
        let hook = client
            .get_webhook(&CallContext::new(), &stack_target(), "nope")
            .unwrap();
        assert!(hook.is_none());
    }

    #[test]
    fn test_update_requires_name() {
        let client = Client::new(MockTransport::new());
        let req = WebhookRequest {
            display_name: "d".into(),
            payload_url: "u".into(),
            ..WebhookRequest::default()
        };
        let err = client
            .update_webhook(&CallContext::new(), &stack_target(), &req)
            .unwrap_err();
        assert_eq!(err.to_string(), "name must not be empty");
    }
}
