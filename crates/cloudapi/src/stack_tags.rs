//! Stack identity and stack tags.

use std::collections::BTreeMap;
use std::fmt;

use reconcile::CallContext;
use serde::{Deserialize, Serialize};

use crate::client::{Client, path};
use crate::error::{Error, Result};

/// Fully qualified stack name
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackName {
    #[serde(rename = "orgName")]
    pub organization: String,
    #[serde(rename = "projectName")]
    pub project: String,
    #[serde(rename = "stackName")]
    pub stack: String,
}

impl StackName {
    pub fn new(
        organization: impl Into<String>,
        project: impl Into<String>,
        stack: impl Into<String>,
    ) -> Self {
        Self {
            organization: organization.into(),
            project: project.into(),
            stack: stack.into(),
        }
    }

    fn validate(&self) -> Result<()> {
        Error::require("orgName", &self.organization)?;
        Error::require("projectName", &self.project)?;
        Error::require("stackName", &self.stack)
    }

    pub(crate) fn path(&self) -> Result<String> {
        path(&["stacks", &self.organization, &self.project, &self.stack])
    }
}

impl fmt::Display for StackName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.organization, self.project, self.stack)
    }
}

/// A single tag on a stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackTag {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Default, Deserialize)]
struct StackTags {
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

/// Stack tag operations.
pub trait StackTagClient: Send + Sync + std::fmt::Debug {
    fn create_stack_tag(&self, ctx: &CallContext, stack: &StackName, tag: &StackTag) -> Result<()>;

    /// `None` when the stack or the tag no longer exists.
    fn get_stack_tag(
        &self,
        ctx: &CallContext,
        stack: &StackName,
        name: &str,
    ) -> Result<Option<StackTag>>;

    fn delete_stack_tag(&self, ctx: &CallContext, stack: &StackName, name: &str) -> Result<()>;
}

impl StackTagClient for Client {
    fn create_stack_tag(&self, ctx: &CallContext, stack: &StackName, tag: &StackTag) -> Result<()> {
        stack.validate()?;
        Error::require("tagName", &tag.name)?;
        self.post_unit(ctx, &format!("{}/tags", stack.path()?), tag)
    }

    fn get_stack_tag(
        &self,
        ctx: &CallContext,
        stack: &StackName,
        name: &str,
    ) -> Result<Option<StackTag>> {
        stack.validate()?;
        Error::require("tagName", name)?;
        let found: Option<StackTags> = self.get_optional(ctx, &stack.path()?)?;
        Ok(found
            .and_then(|s| s.tags.get(name).cloned())
            .map(|value| StackTag {
                name: name.to_string(),
                value,
            }))
    }

    fn delete_stack_tag(&self, ctx: &CallContext, stack: &StackName, name: &str) -> Result<()> {
        stack.validate()?;
        Error::require("tagName", name)?;
        self.delete(ctx, &format!("{}/tags/{}", stack.path()?, path(&[name])?))
    }
}
