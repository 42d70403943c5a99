//! Deployment, drift detection and time-to-live schedules on a stack
//!
//! The three kinds share stack identity, read, diff and delete. Their ids
//! differ only in a literal kind segment before the schedule id.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat};
use cloudapi::{
    DeploymentRequest, DeploymentScheduleRequest, DriftScheduleRequest, OperationContext,
    StackName, StackSchedule, StackScheduleClient, TtlScheduleRequest,
};
use reconcile::{
    CallContext, CheckFailure, CheckRequest, CheckResponse, CreateRequest, CreateResponse,
    DeleteBeforeReplace, DeleteRequest, DiffRequest, DiffResult, Differ, IdLayout, Operation,
    PropertyMap, ReadRequest, ReadResponse, RemoteResultExt, ReplaceSet, Resource, Result,
    UpdateRequest, UpdateResponse, Value, lift_inputs, require,
};

use super::{absent, deleted, optional_text, text};

/// Output holding the service-assigned schedule id
const SCHEDULE_ID: &str = "scheduleId";

const STACK_FIELDS: [&str; 3] = ["organization", "project", "stack"];

const DEPLOYMENT: IdLayout = IdLayout::new(
    "DeploymentSchedule",
    "{organization}/{project}/{stack}/{scheduleId}",
);
const DRIFT: IdLayout = IdLayout::new(
    "DriftSchedule",
    "{organization}/{project}/{stack}/drift/{scheduleId}",
);
const TTL: IdLayout = IdLayout::new(
    "TtlSchedule",
    "{organization}/{project}/{stack}/ttl/{scheduleId}",
);

pub(crate) const DEPLOYMENT_ID_LAYOUTS: &[IdLayout] = &[DEPLOYMENT];
pub(crate) const DRIFT_ID_LAYOUTS: &[IdLayout] = &[DRIFT];
pub(crate) const TTL_ID_LAYOUTS: &[IdLayout] = &[TTL];

// ============================================================================
// Shared
// ============================================================================

fn stack_of(props: &PropertyMap) -> StackName {
    StackName::new(
        text(props, "organization"),
        text(props, "project"),
        text(props, "stack"),
    )
}

fn stack_properties(stack: &StackName) -> PropertyMap {
    PropertyMap::new()
        .with("organization", stack.organization.as_str())
        .with("project", stack.project.as_str())
        .with("stack", stack.stack.as_str())
}

fn split_id(layout: &IdLayout, id: &str) -> Result<(StackName, String)> {
    let [org, project, stack, schedule_id] = layout.decode_n(id)?;
    Ok((StackName::new(org, project, stack), schedule_id))
}

fn encode_id(layout: &IdLayout, stack: &StackName, schedule_id: &str) -> Result<String> {
    layout.encode(&[
        &stack.organization,
        &stack.project,
        &stack.stack,
        schedule_id,
    ])
}

fn with_schedule_id(inputs: &PropertyMap, schedule_id: &str) -> PropertyMap {
    inputs.clone().with(SCHEDULE_ID, schedule_id)
}

/// Canonical RFC 3339 form: whole seconds, `Z` for UTC
fn normalize_timestamp(raw: &str) -> std::result::Result<String, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
}

fn check_timestamp(news: &mut PropertyMap, failures: &mut Vec<CheckFailure>) {
    let Some(raw) = news.get_str("timestamp").map(str::to_string) else {
        return;
    };
    match normalize_timestamp(&raw) {
        Ok(canonical) => {
            news.insert("timestamp", canonical);
        }
        Err(e) => failures.push(CheckFailure::new(
            "timestamp",
            format!("timestamp failed to parse due to: {e}"),
        )),
    }
}

/// Optional boolean input; absent means false
fn check_flag(news: &mut PropertyMap, key: &str, failures: &mut Vec<CheckFailure>) {
    let parsed = news
        .get(key)
        .filter(|value| value.has_value())
        .map(|value| value.as_bool().is_some());
    match parsed {
        Some(true) => {}
        Some(false) => failures.push(CheckFailure::new(
            key,
            format!("{key} property is present but can't be parsed as bool"),
        )),
        None => {
            news.insert(key, false);
        }
    }
}

/// Diff shared by all three kinds; stack identity always replaces
fn schedule_diff(req: &DiffRequest, extra_replace: &[&str], defaults: &[&str]) -> DiffResult {
    let mut olds = lift_inputs(&req.old_inputs);
    olds.remove(SCHEDULE_ID);
    let mut news = req.news.clone();
    for key in defaults {
        if !news.has_value(key) {
            news.insert(*key, false);
        }
    }

    let replace: Vec<&str> = STACK_FIELDS.iter().chain(extra_replace).copied().collect();
    Differ::new(ReplaceSet::of(replace))
        .delete_before_replace(DeleteBeforeReplace::WhenReplacing)
        .diff(&olds, &news)
}

fn read_schedule(
    client: &dyn StackScheduleClient,
    ctx: &CallContext,
    layout: &IdLayout,
    id: &str,
) -> Result<Option<(StackName, StackSchedule)>> {
    let (stack, schedule_id) = split_id(layout, id)?;
    let found = client
        .get_stack_schedule(ctx, &stack, &schedule_id)
        .remote(layout.kind(), Operation::Read)?;
    Ok(found.map(|schedule| (stack, schedule)))
}

fn read_response(id: String, inputs: PropertyMap, schedule_id: &str) -> ReadResponse {
    ReadResponse {
        id,
        properties: with_schedule_id(&inputs, schedule_id),
        inputs,
    }
}

fn delete_schedule(
    client: &dyn StackScheduleClient,
    ctx: &CallContext,
    layout: &IdLayout,
    id: &str,
) -> Result<()> {
    let (stack, schedule_id) = split_id(layout, id)?;
    deleted(
        layout.kind(),
        id,
        client.delete_stack_schedule(ctx, &stack, &schedule_id),
    )
}

// ============================================================================
// Deployment schedules
// ============================================================================

/// Runs a Pulumi operation on a cron schedule or once at a timestamp
#[derive(Debug)]
pub struct DeploymentSchedule {
    client: Arc<dyn StackScheduleClient>,
}

impl DeploymentSchedule {
    pub fn new(client: Arc<dyn StackScheduleClient>) -> Self {
        Self { client }
    }
}

fn deployment_request(props: &PropertyMap) -> DeploymentScheduleRequest {
    DeploymentScheduleRequest {
        schedule_cron: optional_text(props, "scheduleCron"),
        schedule_once: optional_text(props, "timestamp"),
        request: DeploymentRequest {
            pulumi_operation: text(props, "pulumiOperation"),
            operation_context: OperationContext::default(),
        },
    }
}

fn deployment_inputs(
    stack: &StackName,
    schedule: &StackSchedule,
    state: &PropertyMap,
) -> PropertyMap {
    let mut inputs = stack_properties(stack);
    if let Some(cron) = &schedule.schedule_cron {
        inputs.insert("scheduleCron", cron.as_str());
    }
    if let Some(once) = &schedule.schedule_once {
        let once = normalize_timestamp(once).unwrap_or_else(|_| once.clone());
        inputs.insert("timestamp", once);
    }
    let operation = &schedule.definition.request.pulumi_operation;
    let operation = if operation.is_empty() {
        text(state, "pulumiOperation")
    } else {
        operation.clone()
    };
    inputs.insert("pulumiOperation", operation);
    inputs
}

impl Resource for DeploymentSchedule {
    fn type_token(&self) -> &'static str {
        "pulumiservice:index:DeploymentSchedule"
    }

    fn check(&self, req: CheckRequest) -> Result<CheckResponse> {
        let mut news = req.news;
        let mut failures = require(
            &news,
            &["organization", "project", "stack", "pulumiOperation"],
        );
        if news.has_value("scheduleCron") == news.has_value("timestamp") {
            failures.push(CheckFailure::new(
                "scheduleCron",
                "One of scheduleCron or timestamp must be specified but not both",
            ));
        }
        check_timestamp(&mut news, &mut failures);
        Ok(CheckResponse {
            inputs: news,
            failures,
        })
    }

    fn diff(&self, req: DiffRequest) -> Result<DiffResult> {
        Ok(schedule_diff(&req, &["timestamp"], &[]))
    }

    fn create(&self, ctx: &CallContext, req: CreateRequest) -> Result<CreateResponse> {
        let stack = stack_of(&req.properties);
        let schedule_id = self
            .client
            .create_deployment_schedule(ctx, &stack, &deployment_request(&req.properties))
            .remote(DEPLOYMENT.kind(), Operation::Create)?;
        let id = encode_id(&DEPLOYMENT, &stack, &schedule_id)?;
        log::info!("Created {} {id}", DEPLOYMENT.kind());

        Ok(CreateResponse {
            id,
            properties: with_schedule_id(&req.properties, &schedule_id),
        })
    }

    fn read(&self, ctx: &CallContext, req: ReadRequest) -> Result<ReadResponse> {
        let Some((stack, schedule)) = read_schedule(&*self.client, ctx, &DEPLOYMENT, &req.id)?
        else {
            return Ok(absent(DEPLOYMENT.kind(), &req.id));
        };
        let inputs = deployment_inputs(&stack, &schedule, &req.properties);
        Ok(read_response(req.id, inputs, &schedule.id))
    }

    fn update(&self, ctx: &CallContext, req: UpdateRequest) -> Result<UpdateResponse> {
        let (stack, schedule_id) = split_id(&DEPLOYMENT, &req.id)?;
        let schedule_id = self
            .client
            .update_deployment_schedule(ctx, &stack, &schedule_id, &deployment_request(&req.news))
            .remote(DEPLOYMENT.kind(), Operation::Update)?;
        log::info!("Updated {} {}", DEPLOYMENT.kind(), req.id);

        Ok(UpdateResponse {
            properties: with_schedule_id(&req.news, &schedule_id),
        })
    }

    fn delete(&self, ctx: &CallContext, req: DeleteRequest) -> Result<()> {
        delete_schedule(&*self.client, ctx, &DEPLOYMENT, &req.id)
    }
}

// ============================================================================
// Drift schedules
// ============================================================================

/// Periodic drift detection, optionally remediating what it finds
#[derive(Debug)]
pub struct DriftSchedule {
    client: Arc<dyn StackScheduleClient>,
}

impl DriftSchedule {
    pub fn new(client: Arc<dyn StackScheduleClient>) -> Self {
        Self { client }
    }
}

fn drift_request(props: &PropertyMap) -> DriftScheduleRequest {
    DriftScheduleRequest {
        schedule_cron: text(props, "scheduleCron"),
        auto_remediate: props.get_bool("autoRemediate").unwrap_or(false),
    }
}

impl Resource for DriftSchedule {
    fn type_token(&self) -> &'static str {
        "pulumiservice:index:DriftSchedule"
    }

    fn check(&self, req: CheckRequest) -> Result<CheckResponse> {
        let mut news = req.news;
        let mut failures = require(&news, &["organization", "project", "stack", "scheduleCron"]);
        check_flag(&mut news, "autoRemediate", &mut failures);
        Ok(CheckResponse {
            inputs: news,
            failures,
        })
    }

    fn diff(&self, req: DiffRequest) -> Result<DiffResult> {
        Ok(schedule_diff(&req, &[], &["autoRemediate"]))
    }

    fn create(&self, ctx: &CallContext, req: CreateRequest) -> Result<CreateResponse> {
        let stack = stack_of(&req.properties);
        let body = drift_request(&req.properties);
        let schedule_id = self
            .client
            .create_drift_schedule(ctx, &stack, &body)
            .remote(DRIFT.kind(), Operation::Create)?;
        let id = encode_id(&DRIFT, &stack, &schedule_id)?;
        log::info!("Created {} {id}", DRIFT.kind());

        let inputs = stack_properties(&stack)
            .with("scheduleCron", body.schedule_cron)
            .with("autoRemediate", body.auto_remediate);
        Ok(CreateResponse {
            id,
            properties: with_schedule_id(&inputs, &schedule_id),
        })
    }

    fn read(&self, ctx: &CallContext, req: ReadRequest) -> Result<ReadResponse> {
        let Some((stack, schedule)) = read_schedule(&*self.client, ctx, &DRIFT, &req.id)? else {
            return Ok(absent(DRIFT.kind(), &req.id));
        };
        let inputs = stack_properties(&stack)
            .with("scheduleCron", schedule.schedule_cron.clone().unwrap_or_default())
            .with("autoRemediate", schedule.options().auto_remediate);
        Ok(read_response(req.id, inputs, &schedule.id))
    }

    fn update(&self, ctx: &CallContext, req: UpdateRequest) -> Result<UpdateResponse> {
        let (stack, schedule_id) = split_id(&DRIFT, &req.id)?;
        let body = drift_request(&req.news);
        let schedule_id = self
            .client
            .update_drift_schedule(ctx, &stack, &schedule_id, &body)
            .remote(DRIFT.kind(), Operation::Update)?;
        log::info!("Updated {} {}", DRIFT.kind(), req.id);

        let inputs = stack_properties(&stack)
            .with("scheduleCron", body.schedule_cron)
            .with("autoRemediate", body.auto_remediate);
        Ok(UpdateResponse {
            properties: with_schedule_id(&inputs, &schedule_id),
        })
    }

    fn delete(&self, ctx: &CallContext, req: DeleteRequest) -> Result<()> {
        delete_schedule(&*self.client, ctx, &DRIFT, &req.id)
    }
}

// ============================================================================
// TTL schedules
// ============================================================================

/// Destroys a stack at a point in time
#[derive(Debug)]
pub struct TtlSchedule {
    client: Arc<dyn StackScheduleClient>,
}

impl TtlSchedule {
    pub fn new(client: Arc<dyn StackScheduleClient>) -> Self {
        Self { client }
    }
}

fn ttl_request(props: &PropertyMap) -> TtlScheduleRequest {
    TtlScheduleRequest {
        timestamp: text(props, "timestamp"),
        delete_after_destroy: props.get_bool("deleteAfterDestroy").unwrap_or(false),
    }
}

fn ttl_inputs(stack: &StackName, body: &TtlScheduleRequest) -> PropertyMap {
    stack_properties(stack)
        .with("timestamp", body.timestamp.as_str())
        .with("deleteAfterDestroy", body.delete_after_destroy)
}

impl Resource for TtlSchedule {
    fn type_token(&self) -> &'static str {
        "pulumiservice:index:TtlSchedule"
    }

    fn check(&self, req: CheckRequest) -> Result<CheckResponse> {
        let mut news = req.news;
        let mut failures = require(&news, &["organization", "project", "stack", "timestamp"]);
        check_timestamp(&mut news, &mut failures);
        check_flag(&mut news, "deleteAfterDestroy", &mut failures);
        Ok(CheckResponse {
            inputs: news,
            failures,
        })
    }

    fn diff(&self, req: DiffRequest) -> Result<DiffResult> {
        Ok(schedule_diff(&req, &[], &["deleteAfterDestroy"]))
    }

    fn create(&self, ctx: &CallContext, req: CreateRequest) -> Result<CreateResponse> {
        let stack = stack_of(&req.properties);
        let body = ttl_request(&req.properties);
        let schedule_id = self
            .client
            .create_ttl_schedule(ctx, &stack, &body)
            .remote(TTL.kind(), Operation::Create)?;
        let id = encode_id(&TTL, &stack, &schedule_id)?;
        log::info!("Created {} {id}", TTL.kind());

        Ok(CreateResponse {
            id,
            properties: with_schedule_id(&ttl_inputs(&stack, &body), &schedule_id),
        })
    }

    fn read(&self, ctx: &CallContext, req: ReadRequest) -> Result<ReadResponse> {
        let Some((stack, schedule)) = read_schedule(&*self.client, ctx, &TTL, &req.id)? else {
            return Ok(absent(TTL.kind(), &req.id));
        };
        let once = schedule.schedule_once.clone().unwrap_or_default();
        let mut inputs = stack_properties(&stack)
            .with("deleteAfterDestroy", schedule.options().delete_after_destroy);
        inputs.insert(
            "timestamp",
            normalize_timestamp(&once).map_or(Value::from(once.as_str()), Value::from),
        );
        Ok(read_response(req.id, inputs, &schedule.id))
    }

    fn update(&self, ctx: &CallContext, req: UpdateRequest) -> Result<UpdateResponse> {
        let (stack, schedule_id) = split_id(&TTL, &req.id)?;
        let body = ttl_request(&req.news);
        let schedule_id = self
            .client
            .update_ttl_schedule(ctx, &stack, &schedule_id, &body)
            .remote(TTL.kind(), Operation::Update)?;
        log::info!("Updated {} {}", TTL.kind(), req.id);

        Ok(UpdateResponse {
            properties: with_schedule_id(&ttl_inputs(&stack, &body), &schedule_id),
        })
    }

    fn delete(&self, ctx: &CallContext, req: DeleteRequest) -> Result<()> {
        delete_schedule(&*self.client, ctx, &TTL, &req.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::testing::not_found;
    use cloudapi::{OperationOptions, ScheduleDefinition};
    use reconcile::{DiffKind, Error};
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// Keeps every schedule keyed by id regardless of stack
    #[derive(Debug, Default)]
    struct FakeSchedules {
        schedules: Mutex<BTreeMap<String, StackSchedule>>,
    }

    impl FakeSchedules {
        fn store(
            &self,
            id: Option<&str>,
            cron: Option<String>,
            once: Option<String>,
            definition: DeploymentRequest,
        ) -> String {
            let mut schedules = self.schedules.lock().unwrap();
            let id = id.map_or_else(|| format!("sched-{}", schedules.len() + 1), str::to_string);
            schedules.insert(
                id.clone(),
                StackSchedule {
                    id: id.clone(),
                    schedule_cron: cron,
                    schedule_once: once,
                    definition: ScheduleDefinition {
                        request: definition,
                    },
                },
            );
            id
        }

        fn with_options(options: OperationOptions) -> DeploymentRequest {
            DeploymentRequest {
                pulumi_operation: String::new(),
                operation_context: OperationContext { options },
            }
        }
    }

    impl StackScheduleClient for FakeSchedules {
        fn create_deployment_schedule(
            &self,
            _ctx: &CallContext,
            _stack: &StackName,
            req: &DeploymentScheduleRequest,
        ) -> cloudapi::Result<String> {
            Ok(self.store(
                None,
                req.schedule_cron.clone(),
                req.schedule_once.clone(),
                req.request.clone(),
            ))
        }

        fn create_drift_schedule(
            &self,
            _ctx: &CallContext,
            _stack: &StackName,
            req: &DriftScheduleRequest,
        ) -> cloudapi::Result<String> {
            Ok(self.store(
                None,
                Some(req.schedule_cron.clone()),
                None,
                Self::with_options(OperationOptions {
                    auto_remediate: req.auto_remediate,
                    ..OperationOptions::default()
                }),
            ))
        }

        fn create_ttl_schedule(
            &self,
            _ctx: &CallContext,
            _stack: &StackName,
            req: &TtlScheduleRequest,
        ) -> cloudapi::Result<String> {
            Ok(self.store(
                None,
                None,
                Some(req.timestamp.clone()),
                Self::with_options(OperationOptions {
                    delete_after_destroy: req.delete_after_destroy,
                    ..OperationOptions::default()
                }),
            ))
        }

        fn get_stack_schedule(
            &self,
            _ctx: &CallContext,
            _stack: &StackName,
            schedule_id: &str,
        ) -> cloudapi::Result<Option<StackSchedule>> {
            Ok(self.schedules.lock().unwrap().get(schedule_id).cloned())
        }

        fn update_deployment_schedule(
            &self,
            _ctx: &CallContext,
            _stack: &StackName,
            schedule_id: &str,
            req: &DeploymentScheduleRequest,
        ) -> cloudapi::Result<String> {
            Ok(self.store(
                Some(schedule_id),
                req.schedule_cron.clone(),
                req.schedule_once.clone(),
                req.request.clone(),
            ))
        }

        fn update_drift_schedule(
            &self,
            _ctx: &CallContext,
            _stack: &StackName,
            schedule_id: &str,
            req: &DriftScheduleRequest,
        ) -> cloudapi::Result<String> {
            Ok(self.store(
                Some(schedule_id),
                Some(req.schedule_cron.clone()),
                None,
                Self::with_options(OperationOptions {
                    auto_remediate: req.auto_remediate,
                    ..OperationOptions::default()
                }),
            ))
        }

        fn update_ttl_schedule(
            &self,
            _ctx: &CallContext,
            _stack: &StackName,
            schedule_id: &str,
            req: &TtlScheduleRequest,
        ) -> cloudapi::Result<String> {
            Ok(self.store(
                Some(schedule_id),
                None,
                Some(req.timestamp.clone()),
                Self::with_options(OperationOptions {
                    delete_after_destroy: req.delete_after_destroy,
                    ..OperationOptions::default()
                }),
            ))
        }

        fn delete_stack_schedule(
            &self,
            _ctx: &CallContext,
            _stack: &StackName,
            schedule_id: &str,
        ) -> cloudapi::Result<()> {
            match self.schedules.lock().unwrap().remove(schedule_id) {
                Some(_) => Ok(()),
                None => Err(not_found()),
            }
        }
    }

    fn stack_inputs() -> PropertyMap {
        stack_properties(&StackName::new("acme", "web", "prod"))
    }

    fn check<R: Resource>(resource: &R, news: PropertyMap) -> CheckResponse {
        resource
            .check(CheckRequest {
                news,
                ..CheckRequest::default()
            })
            .unwrap()
    }

    fn failed_properties(response: &CheckResponse) -> Vec<&str> {
        response
            .failures
            .iter()
            .map(|f| f.property.as_str())
            .collect()
    }

    #[test]
    fn test_normalize_timestamp() {
        assert_eq!(
            normalize_timestamp("2026-03-01T10:00:00.500+00:00").unwrap(),
            "2026-03-01T10:00:00Z"
        );
        assert_eq!(
            normalize_timestamp("2026-03-01T10:00:00+02:00").unwrap(),
            "2026-03-01T10:00:00+02:00"
        );
        assert!(normalize_timestamp("tomorrow").is_err());
    }

    #[test]
    fn test_deployment_check_needs_exactly_one_trigger() {
        let schedules = DeploymentSchedule::new(Arc::new(FakeSchedules::default()));
        let base = stack_inputs().with("pulumiOperation", "update");

        assert!(check(&schedules, base.clone().with("scheduleCron", "0 * * * *")).is_valid());

        let neither = check(&schedules, base.clone());
        assert_eq!(failed_properties(&neither), vec!["scheduleCron"]);

        let both = check(
            &schedules,
            base.clone()
                .with("scheduleCron", "0 * * * *")
                .with("timestamp", "2026-03-01T10:00:00Z"),
        );
        assert_eq!(
            both.failures[0].reason,
            "One of scheduleCron or timestamp must be specified but not both"
        );

        let bad = check(&schedules, base.with("timestamp", "noon"));
        assert_eq!(failed_properties(&bad), vec!["timestamp"]);
        assert!(bad.failures[0].reason.starts_with("timestamp failed to parse due to:"));
    }

    #[test]
    fn test_deployment_lifecycle() {
        let fake = Arc::new(FakeSchedules::default());
        let schedules = DeploymentSchedule::new(fake);
        let ctx = CallContext::new();
        let inputs = stack_inputs()
            .with("pulumiOperation", "refresh")
            .with("scheduleCron", "0 0 * * *");

        let created = schedules
            .create(
                &ctx,
                CreateRequest {
                    properties: inputs.clone(),
                    ..CreateRequest::default()
                },
            )
            .unwrap();
        assert_eq!(created.id, "acme/web/prod/sched-1");
        assert_eq!(created.properties.get_str(SCHEDULE_ID), Some("sched-1"));

        let read = schedules
            .read(
                &ctx,
                ReadRequest {
                    id: created.id.clone(),
                    properties: created.properties.clone(),
                    ..ReadRequest::default()
                },
            )
            .unwrap();
        assert_eq!(read.inputs, inputs);
        assert_eq!(read.properties, created.properties);

        let updated = schedules
            .update(
                &ctx,
                UpdateRequest {
                    id: created.id.clone(),
                    news: inputs.clone().with("scheduleCron", "0 12 * * *"),
                    ..UpdateRequest::default()
                },
            )
            .unwrap();
        assert_eq!(updated.properties.get_str("scheduleCron"), Some("0 12 * * *"));

        let delete = DeleteRequest {
            id: created.id,
            ..DeleteRequest::default()
        };
        schedules.delete(&ctx, delete.clone()).unwrap();
        schedules.delete(&ctx, delete).unwrap();
    }

    #[test]
    fn test_deployment_diff_replaces_on_timestamp() {
        let schedules = DeploymentSchedule::new(Arc::new(FakeSchedules::default()));
        let olds = stack_inputs()
            .with("pulumiOperation", "destroy")
            .with("timestamp", "2026-03-01T10:00:00Z");

        let diff = schedules
            .diff(DiffRequest {
                old_inputs: olds.clone(),
                news: olds.clone().with("timestamp", "2026-04-01T10:00:00Z"),
                ..DiffRequest::default()
            })
            .unwrap();
        assert_eq!(diff.replaces, vec!["timestamp"]);
        assert!(diff.delete_before_replace);

        let diff = schedules
            .diff(DiffRequest {
                old_inputs: olds.clone(),
                news: olds.with("pulumiOperation", "refresh"),
                ..DiffRequest::default()
            })
            .unwrap();
        assert_eq!(diff.detailed_diff["pulumiOperation"], DiffKind::Update);
        assert!(diff.replaces.is_empty());
        assert!(!diff.delete_before_replace);
    }

    #[test]
    fn test_drift_defaults_and_id() {
        let schedules = DriftSchedule::new(Arc::new(FakeSchedules::default()));
        let ctx = CallContext::new();

        let checked = check(&schedules, stack_inputs().with("scheduleCron", "0 * * * *"));
        assert!(checked.is_valid());
        assert_eq!(checked.inputs.get_bool("autoRemediate"), Some(false));

        let invalid = check(
            &schedules,
            stack_inputs()
                .with("scheduleCron", "0 * * * *")
                .with("autoRemediate", "yes"),
        );
        assert_eq!(failed_properties(&invalid), vec!["autoRemediate"]);

        let created = schedules
            .create(
                &ctx,
                CreateRequest {
                    properties: checked.inputs.clone(),
                    ..CreateRequest::default()
                },
            )
            .unwrap();
        assert_eq!(created.id, "acme/web/prod/drift/sched-1");

        let read = schedules
            .read(
                &ctx,
                ReadRequest {
                    id: created.id.clone(),
                    ..ReadRequest::default()
                },
            )
            .unwrap();
        assert_eq!(read.inputs, checked.inputs);

        let wrong_kind = schedules
            .read(
                &ctx,
                ReadRequest {
                    id: "acme/web/prod/ttl/sched-1".into(),
                    ..ReadRequest::default()
                },
            )
            .unwrap_err();
        assert!(matches!(wrong_kind, Error::InvalidId { .. }));
    }

    #[test]
    fn test_drift_diff_treats_missing_flag_as_false() {
        let schedules = DriftSchedule::new(Arc::new(FakeSchedules::default()));
        let olds = stack_inputs()
            .with("scheduleCron", "0 * * * *")
            .with("autoRemediate", false);
        let diff = schedules
            .diff(DiffRequest {
                old_inputs: olds.clone().with(SCHEDULE_ID, "sched-1"),
                news: stack_inputs().with("scheduleCron", "0 * * * *"),
                ..DiffRequest::default()
            })
            .unwrap();
        assert!(!diff.has_changes());

        let moved = schedules
            .diff(DiffRequest {
                old_inputs: olds.clone(),
                news: olds.with("stack", "staging"),
                ..DiffRequest::default()
            })
            .unwrap();
        assert_eq!(moved.replaces, vec!["stack"]);
    }

    #[test]
    fn test_ttl_lifecycle() {
        let schedules = TtlSchedule::new(Arc::new(FakeSchedules::default()));
        let ctx = CallContext::new();

        let checked = check(
            &schedules,
            stack_inputs().with("timestamp", "2026-06-30T00:00:00.000Z"),
        );
        assert!(checked.is_valid());
        assert_eq!(checked.inputs.get_str("timestamp"), Some("2026-06-30T00:00:00Z"));
        assert_eq!(checked.inputs.get_bool("deleteAfterDestroy"), Some(false));

        let missing = check(&schedules, stack_inputs());
        assert_eq!(failed_properties(&missing), vec!["timestamp"]);

        let created = schedules
            .create(
                &ctx,
                CreateRequest {
                    properties: checked.inputs.clone().with("deleteAfterDestroy", true),
                    ..CreateRequest::default()
                },
            )
            .unwrap();
        assert_eq!(created.id, "acme/web/prod/ttl/sched-1");

        let read = schedules
            .read(
                &ctx,
                ReadRequest {
                    id: created.id.clone(),
                    ..ReadRequest::default()
                },
            )
            .unwrap();
        assert_eq!(read.inputs.get_bool("deleteAfterDestroy"), Some(true));
        assert_eq!(read.inputs.get_str("timestamp"), Some("2026-06-30T00:00:00Z"));

        schedules
            .delete(
                &ctx,
                DeleteRequest {
                    id: created.id.clone(),
                    ..DeleteRequest::default()
                },
            )
            .unwrap();
        let gone = schedules
            .read(
                &ctx,
                ReadRequest {
                    id: created.id,
                    ..ReadRequest::default()
                },
            )
            .unwrap();
        assert!(gone.is_absent());
    }
}
