//! Personal, organization and team access tokens.

use reconcile::CallContext;
use serde::{Deserialize, Serialize};

use crate::client::{Client, path};
use crate::error::{Error, Result};

/// A freshly created token; the value is only ever returned here
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedToken {
    pub id: String,
    pub token_value: String,
}

/// A token as listed by the service
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub last_used: i64,
    pub admin: bool,
}

#[derive(Debug, Deserialize)]
struct TokenList {
    #[serde(default)]
    tokens: Vec<TokenInfo>,
}

impl TokenList {
    fn find(self, token_id: &str) -> Option<TokenInfo> {
        self.tokens.into_iter().find(|t| t.id == token_id)
    }
}

/// Personal access tokens of the calling user.
pub trait AccessTokenClient: Send + Sync + std::fmt::Debug {
    fn create_access_token(&self, ctx: &CallContext, description: &str) -> Result<CreatedToken>;

    /// `None` when the token no longer exists.
    fn get_access_token(&self, ctx: &CallContext, token_id: &str) -> Result<Option<TokenInfo>>;

    fn delete_access_token(&self, ctx: &CallContext, token_id: &str) -> Result<()>;
}

/// Organization access tokens.
pub trait OrgAccessTokenClient: Send + Sync + std::fmt::Debug {
    fn create_org_access_token(
        &self,
        ctx: &CallContext,
        org: &str,
        name: &str,
        description: &str,
        admin: bool,
    ) -> Result<CreatedToken>;

    fn get_org_access_token(
        &self,
        ctx: &CallContext,
        org: &str,
        token_id: &str,
    ) -> Result<Option<TokenInfo>>;

    fn delete_org_access_token(&self, ctx: &CallContext, org: &str, token_id: &str) -> Result<()>;
}

/// Team access tokens.
pub trait TeamAccessTokenClient: Send + Sync + std::fmt::Debug {
    fn create_team_access_token(
        &self,
        ctx: &CallContext,
        org: &str,
        team: &str,
        name: &str,
        description: &str,
    ) -> Result<CreatedToken>;

    fn get_team_access_token(
        &self,
        ctx: &CallContext,
        org: &str,
        team: &str,
        token_id: &str,
    ) -> Result<Option<TokenInfo>>;

    fn delete_team_access_token(
        &self,
        ctx: &CallContext,
        org: &str,
        team: &str,
        token_id: &str,
    ) -> Result<()>;
}

#[derive(Serialize)]
struct CreateUserToken<'a> {
    description: &'a str,
}

#[derive(Serialize)]
struct CreateNamedToken<'a> {
    name: &'a str,
    description: &'a str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    admin: bool,
}

impl AccessTokenClient for Client {
    fn create_access_token(&self, ctx: &CallContext, description: &str) -> Result<CreatedToken> {
        self.post_json(ctx, "user/tokens", &CreateUserToken { description })
    }

    fn get_access_token(&self, ctx: &CallContext, token_id: &str) -> Result<Option<TokenInfo>> {
        Error::require("tokenId", token_id)?;
        let list: Option<TokenList> = self.get_optional(ctx, "user/tokens")?;
        Ok(list.and_then(|l| l.find(token_id)))
    }

    fn delete_access_token(&self, ctx: &CallContext, token_id: &str) -> Result<()> {
        Error::require("tokenId", token_id)?;
        self.delete(ctx, &path(&["user", "tokens", token_id])?)
    }
}

impl OrgAccessTokenClient for Client {
    fn create_org_access_token(
        &self,
        ctx: &CallContext,
        org: &str,
        name: &str,
        description: &str,
        admin: bool,
    ) -> Result<CreatedToken> {
        Error::require("orgName", org)?;
        Error::require("name", name)?;
        self.post_json(
            ctx,
            &path(&["orgs", org, "tokens"])?,
            &CreateNamedToken {
                name,
                description,
                admin,
            },
        )
    }

    fn get_org_access_token(
        &self,
        ctx: &CallContext,
        org: &str,
        token_id: &str,
    ) -> Result<Option<TokenInfo>> {
        Error::require("orgName", org)?;
        Error::require("tokenId", token_id)?;
        let list: Option<TokenList> = self.get_optional(ctx, &path(&["orgs", org, "tokens"])?)?;
        Ok(list.and_then(|l| l.find(token_id)))
    }

    fn delete_org_access_token(&self, ctx: &CallContext, org: &str, token_id: &str) -> Result<()> {
        Error::require("orgName", org)?;
        Error::require("tokenId", token_id)?;
        self.delete(ctx, &path(&["orgs", org, "tokens", token_id])?)
    }
}

impl TeamAccessTokenClient for Client {
    fn create_team_access_token(
        &self,
        ctx: &CallContext,
        org: &str,
        team: &str,
        name: &str,
        description: &str,
    ) -> Result<CreatedToken> {
        Error::require("orgName", org)?;
        Error::require("teamName", team)?;
        Error::require("name", name)?;
        self.post_json(
            ctx,
            &path(&["orgs", org, "teams", team, "tokens"])?,
            &CreateNamedToken {
                name,
                description,
                admin: false,
            },
        )
    }

    fn get_team_access_token(
        &self,
        ctx: &CallContext,
        org: &str,
        team: &str,
        token_id: &str,
    ) -> Result<Option<TokenInfo>> {
        Error::require("orgName", org)?;
        Error::require("teamName", team)?;
        Error::require("tokenId", token_id)?;
        let list: Option<TokenList> =
            self.get_optional(ctx, &path(&["orgs", org, "teams", team, "tokens"])?)?;
        Ok(list.and_then(|l| l.find(token_id)))
    }

    fn delete_team_access_token(
        &self,
        ctx: &CallContext,
        org: &str,
        team: &str,
        token_id: &str,
    ) -> Result<()> {
        Error::require("orgName", org)?;
        Error::require("teamName", team)?;
        Error::require("tokenId", token_id)?;
        self.delete(ctx, &path(&["orgs", org, "teams", team, "tokens", token_id])?)
    }
}
