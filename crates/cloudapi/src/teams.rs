//! Teams, team membership and the stack and environment grants a team holds.
//!
//! Membership and grants are all edits of the team entity itself: each is a
//! `PATCH orgs/{org}/teams/{team}` carrying a single action object.

use reconcile::CallContext;
use serde::{Deserialize, Serialize};

use crate::client::{Client, path};
use crate::error::{Error, Result};
use crate::stack_tags::StackName;

/// Accepted team types
pub const TEAM_TYPES: [&str; 2] = ["github", "pulumi"];

/// A team as returned by the service
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Team {
    #[serde(rename = "kind")]
    pub team_type: String,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub members: Vec<TeamMember>,
    pub stacks: Vec<StackGrant>,
    pub environments: Vec<EnvironmentGrant>,
}

impl Team {
    /// Member logins, sorted. Falls back to the display name for members
    /// without a login.
    pub fn member_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .members
            .iter()
            .map(|m| {
                if m.github_login.is_empty() {
                    m.name.clone()
                } else {
                    m.github_login.clone()
                }
            })
            .collect();
        names.sort();
        names
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeamMember {
    pub name: String,
    pub github_login: String,
    #[serde(alias = "avatarURL")]
    pub avatar_url: String,
    pub role: String,
}

/// A team's permission on one stack
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StackGrant {
    pub project_name: String,
    pub stack_name: String,
    pub permission: i64,
}

/// A team's permission on one environment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvironmentGrant {
    #[serde(rename = "envName")]
    pub environment: String,
    #[serde(rename = "projectName")]
    pub project: String,
    pub permission: String,
    /// Go-style duration string such as `1h30m0s`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_open_duration: Option<String>,
}

/// Arguments for creating a team
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTeam {
    pub organization: String,
    pub team_type: String,
    pub name: String,
    pub display_name: String,
    pub description: String,
    #[serde(rename = "githubTeamID", skip_serializing_if = "is_zero")]
    pub github_team_id: i64,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_zero(n: &i64) -> bool {
    *n == 0
}

/// Selects one environment grant of a team
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentGrantKey {
    pub organization: String,
    pub team: String,
    pub project: String,
    pub environment: String,
}

impl EnvironmentGrantKey {
    fn validate(&self) -> Result<()> {
        Error::require("organization", &self.organization)?;
        Error::require("team", &self.team)?;
        Error::require("environment", &self.environment)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
enum TeamPatch<'a> {
    AddStackPermission(StackGrant),
    #[serde(rename = "removeStack")]
    RemoveStackPermission {
        #[serde(rename = "projectName")]
        project: &'a str,
        #[serde(rename = "stackName")]
        stack: &'a str,
    },
    AddEnvironmentPermission(EnvironmentGrant),
    RemoveEnvironment {
        #[serde(rename = "envName")]
        environment: &'a str,
        #[serde(rename = "projectName")]
        project: &'a str,
    },
    #[serde(untagged)]
    Details {
        #[serde(rename = "newDisplayName")]
        display_name: &'a str,
        #[serde(rename = "newDescription")]
        description: &'a str,
    },
    #[serde(untagged)]
    Membership {
        #[serde(rename = "memberAction")]
        action: &'a str,
        member: &'a str,
    },
}

/// Team lifecycle and membership.
pub trait TeamClient: Send + Sync + std::fmt::Debug {
    /// `None` when the team no longer exists.
    fn get_team(&self, ctx: &CallContext, org: &str, name: &str) -> Result<Option<Team>>;

    fn create_team(&self, ctx: &CallContext, team: &NewTeam) -> Result<Team>;

    fn update_team(
        &self,
        ctx: &CallContext,
        org: &str,
        name: &str,
        display_name: &str,
        description: &str,
    ) -> Result<()>;

    fn delete_team(&self, ctx: &CallContext, org: &str, name: &str) -> Result<()>;

    /// Adding an existing member succeeds.
    fn add_team_member(&self, ctx: &CallContext, org: &str, team: &str, user: &str)
    -> Result<()>;

    fn remove_team_member(
        &self,
        ctx: &CallContext,
        org: &str,
        team: &str,
        user: &str,
    ) -> Result<()>;
}

/// Stack permissions granted to a team.
pub trait TeamStackPermissionClient: Send + Sync + std::fmt::Debug {
    fn add_stack_permission(
        &self,
        ctx: &CallContext,
        stack: &StackName,
        team: &str,
        permission: i64,
    ) -> Result<()>;

    fn remove_stack_permission(&self, ctx: &CallContext, stack: &StackName, team: &str)
    -> Result<()>;

    /// `None` when the team is gone or no longer grants the stack.
    fn get_stack_permission(
        &self,
        ctx: &CallContext,
        stack: &StackName,
        team: &str,
    ) -> Result<Option<i64>>;
}

/// Environment permissions granted to a team.
pub trait TeamEnvironmentPermissionClient: Send + Sync + std::fmt::Debug {
    fn add_environment_permission(
        &self,
        ctx: &CallContext,
        key: &EnvironmentGrantKey,
        permission: &str,
        max_open_duration: Option<&str>,
    ) -> Result<()>;

    fn remove_environment_permission(&self, ctx: &CallContext, key: &EnvironmentGrantKey)
    -> Result<()>;

    /// `None` when the team is gone or no longer grants the environment.
    fn get_environment_permission(
        &self,
        ctx: &CallContext,
        key: &EnvironmentGrantKey,
    ) -> Result<Option<EnvironmentGrant>>;
}

fn team_path(org: &str, team: &str) -> Result<String> {
    path(&["orgs", org, "teams", team])
}

impl Client {
    fn patch_team(&self, ctx: &CallContext, org: &str, team: &str, patch: &TeamPatch<'_>) -> Result<()> {
        Error::require("orgName", org)?;
        Error::require("teamName", team)?;
        self.patch_unit(ctx, &team_path(org, team)?, patch)
    }
}

impl TeamClient for Client {
    fn get_team(&self, ctx: &CallContext, org: &str, name: &str) -> Result<Option<Team>> {
        Error::require("orgName", org)?;
        Error::require("teamName", name)?;
        self.get_optional(ctx, &team_path(org, name)?)
    }

    fn create_team(&self, ctx: &CallContext, team: &NewTeam) -> Result<Team> {
        if !TEAM_TYPES.contains(&team.team_type.as_str()) {
            return Err(Error::InvalidArgument(format!(
                "teamType must be one of {TEAM_TYPES:?}, got {:?}",
                team.team_type
            )));
        }
        Error::require("orgName", &team.organization)?;
        if team.team_type == "github" {
            if team.github_team_id == 0 {
                return Err(Error::InvalidArgument(
                    "github teams require a githubTeamId".to_string(),
                ));
            }
        } else {
            Error::require("teamName", &team.name)?;
        }
        self.post_json(
            ctx,
            &path(&["orgs", &team.organization, "teams", &team.team_type])?,
            team,
        )
    }

    fn update_team(
        &self,
        ctx: &CallContext,
        org: &str,
        name: &str,
        display_name: &str,
        description: &str,
    ) -> Result<()> {
        self.patch_team(
            ctx,
            org,
            name,
            &TeamPatch::Details {
                display_name,
                description,
            },
        )
    }

    fn delete_team(&self, ctx: &CallContext, org: &str, name: &str) -> Result<()> {
        Error::require("orgName", org)?;
        Error::require("teamName", name)?;
        self.delete(ctx, &team_path(org, name)?)
    }

    fn add_team_member(&self, ctx: &CallContext, org: &str, team: &str, user: &str) -> Result<()> {
        Error::require("userName", user)?;
        let patch = TeamPatch::Membership {
            action: "add",
            member: user,
        };
        match self.patch_team(ctx, org, team, &patch) {
            Err(e) if e.status() == Some(409) => {
                log::debug!("{user} is already a member of {org}/{team}");
                Ok(())
            }
            other => other,
        }
    }

    fn remove_team_member(
        &self,
        ctx: &CallContext,
        org: &str,
        team: &str,
        user: &str,
    ) -> Result<()> {
        Error::require("userName", user)?;
        let patch = TeamPatch::Membership {
            action: "remove",
            member: user,
        };
        self.patch_team(ctx, org, team, &patch)
    }
}

impl TeamStackPermissionClient for Client {
    fn add_stack_permission(
        &self,
        ctx: &CallContext,
        stack: &StackName,
        team: &str,
        permission: i64,
    ) -> Result<()> {
        let patch = TeamPatch::AddStackPermission(StackGrant {
            project_name: stack.project.clone(),
            stack_name: stack.stack.clone(),
            permission,
        });
        self.patch_team(ctx, &stack.organization, team, &patch)
    }

    fn remove_stack_permission(
        &self,
        ctx: &CallContext,
        stack: &StackName,
        team: &str,
    ) -> Result<()> {
        let patch = TeamPatch::RemoveStackPermission {
            project: &stack.project,
            stack: &stack.stack,
        };
        self.patch_team(ctx, &stack.organization, team, &patch)
    }

    fn get_stack_permission(
        &self,
        ctx: &CallContext,
        stack: &StackName,
        team: &str,
    ) -> Result<Option<i64>> {
        let found = self.get_team(ctx, &stack.organization, team)?;
        Ok(found.and_then(|t| {
            t.stacks
                .into_iter()
                .find(|g| g.project_name == stack.project && g.stack_name == stack.stack)
                .map(|g| g.permission)
        }))
    }
}

impl TeamEnvironmentPermissionClient for Client {
    fn add_environment_permission(
        &self,
        ctx: &CallContext,
        key: &EnvironmentGrantKey,
        permission: &str,
        max_open_duration: Option<&str>,
    ) -> Result<()> {
        key.validate()?;
        let patch = TeamPatch::AddEnvironmentPermission(EnvironmentGrant {
            environment: key.environment.clone(),
            project: key.project.clone(),
            permission: permission.to_string(),
            max_open_duration: max_open_duration.map(str::to_string),
        });
        self.patch_team(ctx, &key.organization, &key.team, &patch)
    }

    fn remove_environment_permission(
        &self,
        ctx: &CallContext,
        key: &EnvironmentGrantKey,
    ) -> Result<()> {
        key.validate()?;
        let patch = TeamPatch::RemoveEnvironment {
            environment: &key.environment,
            project: &key.project,
        };
        self.patch_team(ctx, &key.organization, &key.team, &patch)
    }

    fn get_environment_permission(
        &self,
        ctx: &CallContext,
        key: &EnvironmentGrantKey,
    ) -> Result<Option<EnvironmentGrant>> {
        key.validate()?;
        let found = self.get_team(ctx, &key.organization, &key.team)?;
        Ok(found.and_then(|t| {
            t.environments.into_iter().find(|g| {
                g.environment == key.environment && (g.project.is_empty() || g.project == key.project)
            })
        }))
    }
}
