//! Deployment agent pools.
//!
//! The service hands out the pool's token only once, at creation. Later
//! reads keep the token recorded in state.

use std::sync::Arc;

use cloudapi::AgentPoolClient;
use reconcile::{
    CallContext, CheckRequest, CheckResponse, CreateRequest, CreateResponse, DeleteBeforeReplace,
    DeleteRequest, DiffRequest, DiffResult, Differ, IdLayout, Operation, PropertyMap, ReadRequest,
    ReadResponse, RemoteResultExt, ReplaceSet, Resource, Result, UpdateRequest, UpdateResponse,
    Value, require,
};

use super::{absent, deleted, text};

const KIND: &str = "AgentPool";

const ID: IdLayout = IdLayout::new(KIND, "{organization}/{name}/{agentPoolId}");

pub(crate) const ID_LAYOUTS: &[IdLayout] = &[ID];

#[derive(Debug)]
pub struct AgentPool {
    client: Arc<dyn AgentPoolClient>,
}

impl AgentPool {
    pub fn new(client: Arc<dyn AgentPoolClient>) -> Self {
        Self { client }
    }
}

/// Declared inputs as recorded; empty fields are left out
fn inputs_of(org: &str, name: &str, description: &str, force_destroy: bool) -> PropertyMap {
    let mut inputs = PropertyMap::new()
        .with("organizationName", org)
        .with("name", name);
    if !description.is_empty() {
        inputs.insert("description", description);
    }
    if force_destroy {
        inputs.insert("forceDestroy", true);
    }
    inputs
}

fn state_of(inputs: &PropertyMap, pool_id: &str, token: Value) -> PropertyMap {
    let mut state = inputs.clone();
    state.insert("agentPoolId", pool_id);
    state.insert("tokenValue", token);
    state
}

impl Resource for AgentPool {
    fn type_token(&self) -> &'static str {
        "pulumiservice:index:AgentPool"
    }

    fn check(&self, req: CheckRequest) -> Result<CheckResponse> {
        let failures = require(&req.news, &["organizationName", "name"]);
        Ok(CheckResponse {
            inputs: req.news,
            failures,
        })
    }

    fn diff(&self, req: DiffRequest) -> Result<DiffResult> {
        Ok(Differ::new(ReplaceSet::of(["organizationName"]))
            .without_replace_list()
            .delete_before_replace(DeleteBeforeReplace::Never)
            .diff(&req.old_inputs, &req.news.without_nulls()))
    }

    fn create(&self, ctx: &CallContext, req: CreateRequest) -> Result<CreateResponse> {
        let props = &req.properties;
        let org = text(props, "organizationName");
        let name = text(props, "name");
        let description = text(props, "description");
        let pool = self
            .client
            .create_agent_pool(ctx, &org, &name, &description)
            .remote(KIND, Operation::Create)?;

        let id = ID.encode(&[&org, &name, &pool.id])?;
        log::info!("Created {KIND} {id}");

        let inputs = inputs_of(
            &org,
            &name,
            &description,
            props.get_bool("forceDestroy").unwrap_or_default(),
        );
        Ok(CreateResponse {
            id,
            properties: state_of(&inputs, &pool.id, Value::secret(pool.token_value)),
        })
    }

    fn read(&self, ctx: &CallContext, req: ReadRequest) -> Result<ReadResponse> {
        let [org, _, pool_id] = ID.decode_n(&req.id)?;
        let Some(pool) = self
            .client
            .get_agent_pool(ctx, &org, &pool_id)
            .remote(KIND, Operation::Read)?
        else {
            return Ok(absent(KIND, &req.id));
        };

        let token = match req.properties.get("tokenValue") {
            Some(recorded) if recorded.has_value() => Value::secret(recorded.clone()),
            _ => Value::secret(pool.token_value),
        };
        let inputs = inputs_of(
            &org,
            &pool.name,
            &pool.description,
            req.properties.get_bool("forceDestroy").unwrap_or_default(),
        );
        Ok(ReadResponse {
            id: req.id,
            properties: state_of(&inputs, &pool.id, token),
            inputs,
        })
    }

    fn update(&self, ctx: &CallContext, req: UpdateRequest) -> Result<UpdateResponse> {
        let [org, _, pool_id] = ID.decode_n(&req.id)?;
        let news = &req.news;
        let name = text(news, "name");
        let description = text(news, "description");
        self.client
            .update_agent_pool(ctx, &org, &pool_id, &name, &description)
            .remote(KIND, Operation::Update)?;
        log::info!("Updated {KIND} {}", req.id);

        let inputs = inputs_of(
            &org,
            &name,
            &description,
            news.get_bool("forceDestroy").unwrap_or_default(),
        );
        let token = Value::secret(req.olds.get("tokenValue").cloned().unwrap_or(Value::Null));
        Ok(UpdateResponse {
            properties: state_of(&inputs, &pool_id, token),
        })
    }

    fn delete(&self, ctx: &CallContext, req: DeleteRequest) -> Result<()> {
        let [org, _, pool_id] = ID.decode_n(&req.id)?;
        let force = req.properties.get_bool("forceDestroy").unwrap_or_default();
        if force {
            log::debug!("{KIND} {}: deleting even if stacks still use it", req.id);
        }
        deleted(
            KIND,
            &req.id,
            self.client.delete_agent_pool(ctx, &org, &pool_id, force),
        )
    }
}
