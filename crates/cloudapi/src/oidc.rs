//! OIDC issuers and the auth policies attached to them.

use std::collections::BTreeMap;

use reconcile::CallContext;
use serde::{Deserialize, Serialize};

use crate::client::{Client, path};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuerRegistration {
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub thumbprints: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_expiration: Option<i64>,
}

/// Partial update; `None` fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuerUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbprints: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_expiration: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OidcIssuer {
    pub id: String,
    pub name: String,
    pub url: String,
    pub issuer: String,
    pub thumbprints: Vec<String>,
    pub max_expiration: Option<i64>,
}

/// The policy document attached to an issuer
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthPolicy {
    pub id: String,
    pub version: i64,
    pub created: Option<String>,
    pub modified: Option<String>,
    pub policies: Vec<AuthPolicyDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthPolicyDefinition {
    pub decision: String,
    pub token_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_login: Option<String>,
    #[serde(rename = "runnerID", skip_serializing_if = "Option::is_none")]
    pub runner_id: Option<String>,
    pub authorized_permissions: Vec<String>,
    pub rules: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct PolicyUpdate<'a> {
    policies: &'a [AuthPolicyDefinition],
}

/// OIDC issuer and auth policy operations.
pub trait OidcIssuerClient: Send + Sync + std::fmt::Debug {
    fn register_oidc_issuer(
        &self,
        ctx: &CallContext,
        org: &str,
        req: &IssuerRegistration,
    ) -> Result<OidcIssuer>;

    fn update_oidc_issuer(
        &self,
        ctx: &CallContext,
        org: &str,
        issuer_id: &str,
        req: &IssuerUpdate,
    ) -> Result<OidcIssuer>;

    /// `None` when the issuer no longer exists.
    fn get_oidc_issuer(
        &self,
        ctx: &CallContext,
        org: &str,
        issuer_id: &str,
    ) -> Result<Option<OidcIssuer>>;

    fn delete_oidc_issuer(&self, ctx: &CallContext, org: &str, issuer_id: &str) -> Result<()>;

    fn get_auth_policy(&self, ctx: &CallContext, org: &str, issuer_id: &str)
    -> Result<AuthPolicy>;

    fn update_auth_policy(
        &self,
        ctx: &CallContext,
        org: &str,
        policy_id: &str,
        policies: &[AuthPolicyDefinition],
    ) -> Result<AuthPolicy>;
}

fn issuer_path(org: &str, issuer_id: &str) -> Result<String> {
    path(&["orgs", org, "oidc", "issuers", issuer_id])
}

impl OidcIssuerClient for Client {
    fn register_oidc_issuer(
        &self,
        ctx: &CallContext,
        org: &str,
        req: &IssuerRegistration,
    ) -> Result<OidcIssuer> {
        Error::require("orgName", org)?;
        Error::require("name", &req.name)?;
        Error::require("url", &req.url)?;
        self.post_json(ctx, &path(&["orgs", org, "oidc", "issuers"])?, req)
    }

    fn update_oidc_issuer(
        &self,
        ctx: &CallContext,
        org: &str,
        issuer_id: &str,
        req: &IssuerUpdate,
    ) -> Result<OidcIssuer> {
        Error::require("orgName", org)?;
        Error::require("issuerId", issuer_id)?;
        self.patch_json(ctx, &issuer_path(org, issuer_id)?, req)
    }

    fn get_oidc_issuer(
        &self,
        ctx: &CallContext,
        org: &str,
        issuer_id: &str,
    ) -> Result<Option<OidcIssuer>> {
        Error::require("orgName", org)?;
        Error::require("issuerId", issuer_id)?;
        self.get_optional(ctx, &issuer_path(org, issuer_id)?)
    }

    fn delete_oidc_issuer(&self, ctx: &CallContext, org: &str, issuer_id: &str) -> Result<()> {
        Error::require("orgName", org)?;
        Error::require("issuerId", issuer_id)?;
        self.delete(ctx, &issuer_path(org, issuer_id)?)
    }

    fn get_auth_policy(&self, ctx: &CallContext, org: &str, issuer_id: &str) -> Result<AuthPolicy> {
        Error::require("orgName", org)?;
        Error::require("issuerId", issuer_id)?;
        self.get_json(
            ctx,
            &path(&["orgs", org, "auth", "policies", "oidcissuers", issuer_id])?,
        )
    }

    fn update_auth_policy(
        &self,
        ctx: &CallContext,
        org: &str,
        policy_id: &str,
        policies: &[AuthPolicyDefinition],
    ) -> Result<AuthPolicy> {
        Error::require("orgName", org)?;
        Error::require("policyId", policy_id)?;
        self.patch_json(
            ctx,
            &path(&["orgs", org, "auth", "policies", policy_id])?,
            &PolicyUpdate { policies },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{Method, MockTransport};
    use serde_json::json;

    #[test]
    fn test_register_issuer() {
        let mock = MockTransport::new();
        mock.route(
            Method::Post,
            "orgs/acme/oidc/issuers",
            201,
            json!({"id": "iss-1", "name": "gh", "url": "https://token.actions.githubusercontent.com", "thumbprints": ["abc"]}),
        );
        let client = Client::new(mock.clone());
        let req = IssuerRegistration {
            name: "gh".into(),
            url: "https://token.actions.githubusercontent.com".into(),
            thumbprints: vec![],
            max_expiration: Some(3600),
        };

        let issuer = client
            .register_oidc_issuer(&CallContext::new(), "acme", &req)
            .unwrap();
        assert_eq!(issuer.id, "iss-1");
        assert_eq!(issuer.thumbprints, vec!["abc"]);

        let body = mock.requests()[0].body.clone().unwrap();
        assert!(body.get("thumbprints").is_none());
        assert_eq!(body["maxExpiration"], 3600);
    }

    #[test]
    fn test_auth_policy_round_trip_paths() {
        let mock = MockTransport::new();
        mock.route(
            Method::Get,
            "orgs/acme/auth/policies/oidcissuers/iss-1",
            200,
            json!({"id": "pol-1", "version": 1, "policies": []}),
        );
        mock.route(
            Method::Patch,
            "orgs/acme/auth/policies/pol-1",
            200,
            json!({"id": "pol-1", "version": 2, "policies": [{"decision": "allow", "tokenType": "organization", "authorizedPermissions": [], "rules": {"aud": "acme"}}]}),
        );
        let client = Client::new(mock.clone());
        let ctx = CallContext::new();

        let policy = client.get_auth_policy(&ctx, "acme", "iss-1").unwrap();
        assert_eq!(policy.id, "pol-1");

        let definitions = vec![AuthPolicyDefinition {
            decision: "allow".into(),
            token_type: "organization".into(),
            rules: BTreeMap::from([("aud".to_string(), "acme".to_string())]),
            ..AuthPolicyDefinition::default()
        }];
        let updated = client
            .update_auth_policy(&ctx, "acme", &policy.id, &definitions)
            .unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.policies, definitions);

        let sent = mock.requests_to(Method::Patch, "orgs/acme/auth/policies/pol-1");
        assert!(sent[0].body.as_ref().unwrap()["policies"][0].get("teamName").is_none());
    }

    #[test]
    fn test_missing_issuer() {
        let client = Client::new(MockTransport::new());
        assert!(
            client
                .get_oidc_issuer(&CallContext::new(), "acme", "gone")
                .unwrap()
                .is_none()
        );
    }
}
