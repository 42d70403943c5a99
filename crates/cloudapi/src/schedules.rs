//! Deployment, drift detection and time-to-live schedules on a stack.
//!
//! All three kinds share one read and one delete endpoint; creation and
//! update go through a collection per kind.

use reconcile::CallContext;
use serde::{Deserialize, Serialize};

use crate::client::{Client, path};
use crate::error::{Error, Result};
use crate::stack_tags::StackName;

/// Schedule collections under `deployments/`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleKind {
    Deployment,
    Drift,
    Ttl,
}

impl ScheduleKind {
    fn collection(self, stack: &StackName) -> Result<String> {
        let base = format!("{}/deployments", stack.path()?);
        Ok(match self {
            Self::Deployment => format!("{base}/schedules"),
            Self::Drift => format!("{base}/drift/schedules"),
            Self::Ttl => format!("{base}/ttl/schedules"),
        })
    }
}

/// Body for a deployment schedule; exactly one of cron or once is set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentScheduleRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_cron: Option<String>,
    /// RFC 3339 timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_once: Option<String>,
    pub request: DeploymentRequest,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeploymentRequest {
    #[serde(rename = "operation", skip_serializing_if = "String::is_empty")]
    pub pulumi_operation: String,
    pub operation_context: OperationContext,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationContext {
    pub options: OperationOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OperationOptions {
    #[serde(rename = "remediateIfDriftDetected", skip_serializing_if = "std::ops::Not::not")]
    pub auto_remediate: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub delete_after_destroy: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftScheduleRequest {
    pub schedule_cron: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub auto_remediate: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TtlScheduleRequest {
    /// RFC 3339 timestamp
    pub timestamp: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub delete_after_destroy: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScheduleDefinition {
    pub request: DeploymentRequest,
}

/// A schedule of any kind as returned by the service
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StackSchedule {
    pub id: String,
    pub schedule_once: Option<String>,
    pub schedule_cron: Option<String>,
    pub definition: ScheduleDefinition,
}

impl StackSchedule {
    pub fn options(&self) -> &OperationOptions {
        &self.definition.request.operation_context.options
    }
}

/// Stack schedule operations. Create and update return the schedule id.
pub trait StackScheduleClient: Send + Sync + std::fmt::Debug {
    fn create_deployment_schedule(
        &self,
        ctx: &CallContext,
        stack: &StackName,
        req: &DeploymentScheduleRequest,
    ) -> Result<String>;

    fn create_drift_schedule(
        &self,
        ctx: &CallContext,
        stack: &StackName,
        req: &DriftScheduleRequest,
    ) -> Result<String>;

    fn create_ttl_schedule(
        &self,
        ctx: &CallContext,
        stack: &StackName,
        req: &TtlScheduleRequest,
    ) -> Result<String>;

    /// `None` when the schedule no longer exists.
    fn get_stack_schedule(
        &self,
        ctx: &CallContext,
        stack: &StackName,
        schedule_id: &str,
    ) -> Result<Option<StackSchedule>>;

    fn update_deployment_schedule(
        &self,
        ctx: &CallContext,
        stack: &StackName,
        schedule_id: &str,
        req: &DeploymentScheduleRequest,
    ) -> Result<String>;

    fn update_drift_schedule(
        &self,
        ctx: &CallContext,
        stack: &StackName,
        schedule_id: &str,
        req: &DriftScheduleRequest,
    ) -> Result<String>;

    fn update_ttl_schedule(
        &self,
        ctx: &CallContext,
        stack: &StackName,
        schedule_id: &str,
        req: &TtlScheduleRequest,
    ) -> Result<String>;

    fn delete_stack_schedule(
        &self,
        ctx: &CallContext,
        stack: &StackName,
        schedule_id: &str,
    ) -> Result<()>;
}

impl Client {
    fn upsert_schedule<B: Serialize>(
        &self,
        ctx: &CallContext,
        kind: ScheduleKind,
        stack: &StackName,
        schedule_id: Option<&str>,
        body: &B,
    ) -> Result<String> {
        let mut target = kind.collection(stack)?;
        if let Some(id) = schedule_id {
            Error::require("scheduleId", id)?;
            target = format!("{target}/{}", path(&[id])?);
        }
        let created: StackSchedule = self.post_json(ctx, &target, body)?;
        if created.id.is_empty() {
            return Err(Error::InvalidResponse(
                "schedule response carried no id".to_string(),
            ));
        }
        Ok(created.id)
    }
}

impl StackScheduleClient for Client {
    fn create_deployment_schedule(
        &self,
        ctx: &CallContext,
        stack: &StackName,
        req: &DeploymentScheduleRequest,
    ) -> Result<String> {
        self.upsert_schedule(ctx, ScheduleKind::Deployment, stack, None, req)
    }

    fn create_drift_schedule(
        &self,
        ctx: &CallContext,
        stack: &StackName,
        req: &DriftScheduleRequest,
    ) -> Result<String> {
        self.upsert_schedule(ctx, ScheduleKind::Drift, stack, None, req)
    }

    fn create_ttl_schedule(
        &self,
        ctx: &CallContext,
        stack: &StackName,
        req: &TtlScheduleRequest,
    ) -> Result<String> {
        self.upsert_schedule(ctx, ScheduleKind::Ttl, stack, None, req)
    }

    fn get_stack_schedule(
        &self,
        ctx: &CallContext,
        stack: &StackName,
        schedule_id: &str,
    ) -> Result<Option<StackSchedule>> {
        Error::require("scheduleId", schedule_id)?;
        let target = format!(
            "{}/{}",
            ScheduleKind::Deployment.collection(stack)?,
            path(&[schedule_id])?
        );
        self.get_optional(ctx, &target)
    }

    fn update_deployment_schedule(
        &self,
        ctx: &CallContext,
        stack: &StackName,
        schedule_id: &str,
        req: &DeploymentScheduleRequest,
    ) -> Result<String> {
        self.upsert_schedule(ctx, ScheduleKind::Deployment, stack, Some(schedule_id), req)
    }

    fn update_drift_schedule(
        &self,
        ctx: &CallContext,
        stack: &StackName,
        schedule_id: &str,
        req: &DriftScheduleRequest,
    ) -> Result<String> {
        self.upsert_schedule(ctx, ScheduleKind::Drift, stack, Some(schedule_id), req)
    }

    fn update_ttl_schedule(
        &self,
        ctx: &CallContext,
        stack: &StackName,
        schedule_id: &str,
        req: &TtlScheduleRequest,
    ) -> Result<String> {
        self.upsert_schedule(ctx, ScheduleKind::Ttl, stack, Some(schedule_id), req)
    }

    fn delete_stack_schedule(
        &self,
        ctx: &CallContext,
        stack: &StackName,
        schedule_id: &str,
    ) -> Result<()> {
        Error::require("scheduleId", schedule_id)?;
        let target = format!(
            "{}/{}",
            ScheduleKind::Deployment.collection(stack)?,
            path(&[schedule_id])?
        );
        self.delete(ctx, &target)
    }
}
