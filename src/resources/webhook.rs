//! Organization, stack and environment webhooks
//!
//! The `secret` input is plaintext; the service only ever returns it
//! encrypted, so the `secret` output holds the ciphertext and reads
//! reconcile the two with [`SecretMerge`].

use std::sync::Arc;

use cloudapi::{WebhookClient, WebhookRequest, WebhookTarget};
use reconcile::{
    CallContext, CheckFailure, CheckRequest, CheckResponse, CreateRequest, CreateResponse,
    DeleteBeforeReplace, DeleteRequest, DiffRequest, DiffResult, Differ, IdLayout, Operation,
    PropertyMap, ReadRequest, ReadResponse, RemoteResultExt, ReplaceSet, Resource, Result,
    SecretMerge, UpdateRequest, UpdateResponse, decode_any, lift_inputs, require,
};

use super::{absent, deleted, optional_text, text};

const KIND: &str = "Webhook";

const ORG_ID: IdLayout = IdLayout::new(KIND, "{organization}/{name}");
const STACK_ID: IdLayout = IdLayout::new(KIND, "{organization}/{project}/{stack}/{name}");
const ENVIRONMENT_ID: IdLayout = IdLayout::new(
    KIND,
    "{organization}/environment/{project}/{environment}/{name}",
);

pub(crate) const ID_LAYOUTS: &[IdLayout] = &[ORG_ID, STACK_ID, ENVIRONMENT_ID];

const REPLACE_ON_CHANGE: [&str; 4] = [
    "organizationName",
    "projectName",
    "stackName",
    "environmentName",
];

/// What a webhook is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookScope {
    Organization,
    Stack,
    Environment,
}

/// Event groups subscribed to when neither `filters` nor `groups` is declared
pub const DEFAULT_WEBHOOK_GROUPS: [(WebhookScope, &[&str]); 3] = [
    (
        WebhookScope::Organization,
        &["deployments", "environments", "stacks"],
    ),
    (WebhookScope::Stack, &["deployments", "stacks"]),
    (WebhookScope::Environment, &["environments"]),
];

impl WebhookScope {
    fn of(inputs: &PropertyMap) -> Self {
        if inputs.has_value("stackName") {
            Self::Stack
        } else if inputs.has_value("environmentName") {
            Self::Environment
        } else {
            Self::Organization
        }
    }

    pub fn default_groups(self) -> &'static [&'static str] {
        DEFAULT_WEBHOOK_GROUPS
            .iter()
            .find(|(scope, _)| *scope == self)
            .map_or(&[], |(_, groups)| *groups)
    }
}

#[derive(Debug)]
pub struct Webhook {
    client: Arc<dyn WebhookClient>,
}

impl Webhook {
    pub fn new(client: Arc<dyn WebhookClient>) -> Self {
        Self { client }
    }
}

fn target_of(inputs: &PropertyMap) -> WebhookTarget {
    let org = text(inputs, "organizationName");
    let project = text(inputs, "projectName");
    match WebhookScope::of(inputs) {
        WebhookScope::Stack => WebhookTarget::Stack {
            org,
            project,
            stack: text(inputs, "stackName"),
        },
        WebhookScope::Environment => WebhookTarget::Environment {
            org,
            project,
            environment: text(inputs, "environmentName"),
        },
        WebhookScope::Organization => WebhookTarget::Organization { org },
    }
}

/// Decode any of the three id shapes into a target and the webhook name
fn split_id(id: &str) -> Result<(WebhookTarget, String)> {
    let (layout, mut fields) = decode_any(ID_LAYOUTS, id)?;
    let name = fields.pop().unwrap_or_default();
    let mut fields = fields.into_iter();
    let mut next = || fields.next().unwrap_or_default();
    let target = match layout {
        0 => WebhookTarget::Organization { org: next() },
        1 => WebhookTarget::Stack {
            org: next(),
            project: next(),
            stack: next(),
        },
        _ => WebhookTarget::Environment {
            org: next(),
            project: next(),
            environment: next(),
        },
    };
    Ok((target, name))
}

fn encode_id(target: &WebhookTarget, name: &str) -> Result<String> {
    match target {
        WebhookTarget::Organization { org } => ORG_ID.encode(&[org, name]),
        WebhookTarget::Stack {
            org,
            project,
            stack,
        } => STACK_ID.encode(&[org, project, stack, name]),
        WebhookTarget::Environment {
            org,
            project,
            environment,
        } => ENVIRONMENT_ID.encode(&[org, project, environment, name]),
    }
}

fn request_of(inputs: &PropertyMap, name: Option<String>) -> WebhookRequest {
    WebhookRequest {
        organization_name: text(inputs, "organizationName"),
        project_name: optional_text(inputs, "projectName"),
        stack_name: optional_text(inputs, "stackName"),
        environment_name: optional_text(inputs, "environmentName"),
        display_name: text(inputs, "displayName"),
        payload_url: text(inputs, "payloadUrl"),
        secret: optional_text(inputs, "secret"),
        active: inputs.get_bool("active").unwrap_or(false),
        format: optional_text(inputs, "format"),
        filters: inputs.get_strings("filters"),
        groups: inputs.get_strings("groups"),
        name,
    }
}

/// Outputs after a write: the inputs, the webhook name, and the ciphertext
/// in place of the plaintext secret
fn written_state(inputs: &PropertyMap, hook: &cloudapi::Webhook) -> PropertyMap {
    let mut state = inputs.clone();
    state.remove("secret");
    state.insert("name", hook.name.as_str());
    if hook.has_secret && inputs.has_value("secret") {
        state.insert("secret", hook.secret_ciphertext.as_str());
    }
    state
}

/// Inputs as the service reports them, before any secret is added
fn observed_inputs(target: &WebhookTarget, hook: &cloudapi::Webhook) -> PropertyMap {
    let mut inputs = PropertyMap::new()
        .with("active", hook.active)
        .with("displayName", hook.display_name.as_str())
        .with("payloadUrl", hook.payload_url.as_str())
        .with("format", hook.format.as_str())
        .with("organizationName", target.org());
    if !hook.filters.is_empty() {
        inputs.insert("filters", hook.filters.clone());
    }
    if !hook.groups.is_empty() {
        inputs.insert("groups", hook.groups.clone());
    }
    match target {
        WebhookTarget::Organization { .. } => {}
        WebhookTarget::Stack { project, stack, .. } => {
            inputs.insert("projectName", project.as_str());
            inputs.insert("stackName", stack.as_str());
        }
        WebhookTarget::Environment {
            project,
            environment,
            ..
        } => {
            inputs.insert("projectName", project.as_str());
            inputs.insert("environmentName", environment.as_str());
        }
    }
    inputs
}

impl Resource for Webhook {
    fn type_token(&self) -> &'static str {
        "pulumiservice:index:Webhook"
    }

    fn check(&self, req: CheckRequest) -> Result<CheckResponse> {
        let mut news = req.news;
        let mut failures = require(
            &news,
            &["organizationName", "payloadUrl", "displayName", "active"],
        );

        let project = news.has_value("projectName");
        let stack = news.has_value("stackName");
        let environment = news.has_value("environmentName");
        if stack && !project {
            failures.push(CheckFailure::new(
                "projectName",
                "projectName and stackName must both be specified for stack webhooks",
            ));
        }
        if environment && !project {
            failures.push(CheckFailure::new(
                "projectName",
                "projectName and environmentName must both be specified for environment webhooks",
            ));
        }
        if environment && stack {
            failures.push(CheckFailure::new(
                "stackName",
                "stackName needs to be empty if this is meant to be an environment webhook; \
                 environmentName needs to be empty if this is meant to be a stack webhook",
            ));
        }
        if project && !stack && !environment {
            failures.push(CheckFailure::new(
                "projectName",
                "projectName needs to be empty if this is meant to be an organization webhook; \
                 otherwise provide stackName for stack webhook or environmentName for environment webhook",
            ));
        }

        if !news.has_value("format") {
            news.insert("format", "raw");
        }
        if !news.has_value("filters") && !news.has_value("groups") {
            let groups = WebhookScope::of(&news).default_groups().to_vec();
            news.insert("groups", groups);
        }

        Ok(CheckResponse {
            inputs: news,
            failures,
        })
    }

    fn diff(&self, req: DiffRequest) -> Result<DiffResult> {
        let olds = lift_inputs(&req.old_inputs);
        Ok(Differ::new(ReplaceSet::of(REPLACE_ON_CHANGE))
            .without_replace_list()
            .delete_before_replace(DeleteBeforeReplace::WhenReplacing)
            .diff(&olds, &req.news))
    }

    fn create(&self, ctx: &CallContext, req: CreateRequest) -> Result<CreateResponse> {
        let target = target_of(&req.properties);
        let hook = self
            .client
            .create_webhook(ctx, &target, &request_of(&req.properties, None))
            .remote(KIND, Operation::Create)?;
        let id = encode_id(&target, &hook.name)?;
        log::info!("Created {KIND} {id}");

        Ok(CreateResponse {
            id,
            properties: written_state(&req.properties, &hook),
        })
    }

    fn read(&self, ctx: &CallContext, req: ReadRequest) -> Result<ReadResponse> {
        let (target, name) = split_id(&req.id)?;
        let Some(hook) = self
            .client
            .get_webhook(ctx, &target, &name)
            .remote(KIND, Operation::Read)?
        else {
            return Ok(absent(KIND, &req.id));
        };

        let mut inputs = observed_inputs(&target, &hook);
        let mut properties = inputs.clone();
        properties.insert("name", hook.name.as_str());

        if hook.has_secret {
            // Without a stored ciphertext there is nothing to merge against.
            let merge = if req.properties.has_value("secret") {
                SecretMerge::from_state(&req.inputs, "secret", &req.properties, "secret")
            } else {
                SecretMerge::new(None, None)
            };
            log::debug!("{KIND} {}: secret in {:?} mode", req.id, merge.mode());
            merge.apply(
                &mut inputs,
                "secret",
                &mut properties,
                "secret",
                &hook.secret_ciphertext,
            );
        }

        Ok(ReadResponse {
            id: req.id,
            properties,
            inputs,
        })
    }

    fn update(&self, ctx: &CallContext, req: UpdateRequest) -> Result<UpdateResponse> {
        let (_, name) = split_id(&req.id)?;
        let target = target_of(&req.news);
        let hook = self
            .client
            .update_webhook(ctx, &target, &request_of(&req.news, Some(name)))
            .remote(KIND, Operation::Update)?;
        log::info!("Updated {KIND} {}", req.id);

        Ok(UpdateResponse {
            properties: written_state(&req.news, &hook),
        })
    }

    fn delete(&self, ctx: &CallContext, req: DeleteRequest) -> Result<()> {
        let (target, name) = split_id(&req.id)?;
        deleted(KIND, &req.id, self.client.delete_webhook(ctx, &target, &name))
    }
}
