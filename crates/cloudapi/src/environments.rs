//! Version tags on ESC environments.

use reconcile::CallContext;
use serde::{Deserialize, Serialize};

use crate::client::{Client, path};
use crate::error::{Error, Result};

/// Project used by environments created before projects existed
pub const DEFAULT_PROJECT: &str = "default";

/// Fully qualified environment name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentName {
    pub organization: String,
    pub project: String,
    pub environment: String,
}

impl EnvironmentName {
    pub fn new(
        organization: impl Into<String>,
        project: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            organization: organization.into(),
            project: project.into(),
            environment: environment.into(),
        }
    }

    fn tags_path(&self) -> Result<String> {
        Error::require("orgName", &self.organization)?;
        Error::require("projectName", &self.project)?;
        Error::require("envName", &self.environment)?;
        Ok(format!(
            "{}/versions/tags",
            path(&[
                "esc",
                "environments",
                &self.organization,
                &self.project,
                &self.environment
            ])?
        ))
    }
}

/// A named pointer at one environment revision
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvironmentTag {
    pub name: String,
    pub revision: i64,
    pub created: String,
    pub modified: String,
    pub editor_login: String,
}

#[derive(Serialize)]
struct NewTag<'a> {
    name: &'a str,
    revision: i64,
}

#[derive(Serialize)]
struct MoveTag {
    revision: i64,
}

/// Environment version tag operations.
pub trait EnvironmentTagClient: Send + Sync + std::fmt::Debug {
    fn create_environment_tag(
        &self,
        ctx: &CallContext,
        env: &EnvironmentName,
        tag: &str,
        revision: i64,
    ) -> Result<()>;

    /// `None` when the tag no longer exists.
    fn get_environment_tag(
        &self,
        ctx: &CallContext,
        env: &EnvironmentName,
        tag: &str,
    ) -> Result<Option<EnvironmentTag>>;

    /// Point an existing tag at another revision.
    fn update_environment_tag(
        &self,
        ctx: &CallContext,
        env: &EnvironmentName,
        tag: &str,
        revision: i64,
    ) -> Result<()>;

    fn delete_environment_tag(&self, ctx: &CallContext, env: &EnvironmentName, tag: &str)
    -> Result<()>;
}

impl EnvironmentTagClient for Client {
    fn create_environment_tag(
        &self,
        ctx: &CallContext,
        env: &EnvironmentName,
        tag: &str,
        revision: i64,
    ) -> Result<()> {
        Error::require("tagName", tag)?;
        self.post_unit(ctx, &env.tags_path()?, &NewTag { name: tag, revision })
    }

    fn get_environment_tag(
        &self,
        ctx: &CallContext,
        env: &EnvironmentName,
        tag: &str,
    ) -> Result<Option<EnvironmentTag>> {
        Error::require("tagName", tag)?;
        self.get_optional(ctx, &format!("{}/{}", env.tags_path()?, path(&[tag])?))
    }

    fn update_environment_tag(
        &self,
        ctx: &CallContext,
        env: &EnvironmentName,
        tag: &str,
        revision: i64,
    ) -> Result<()> {
        Error::require("tagName", tag)?;
        self.patch_unit(
            ctx,
            &format!("{}/{}", env.tags_path()?, path(&[tag])?),
            &MoveTag { revision },
        )
    }

    fn delete_environment_tag(
        &self,
        ctx: &CallContext,
        env: &EnvironmentName,
        tag: &str,
    ) -> Result<()> {
        Error::require("tagName", tag)?;
        self.delete(ctx, &format!("{}/{}", env.tags_path()?, path(&[tag])?))
    }
}
