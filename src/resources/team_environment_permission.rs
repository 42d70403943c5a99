//! A team's permission on one environment.
//!
//! The id packs project and environment into its last segment as
//! `project+environment`. Ids written before environments had projects carry
//! only the environment name and belong to the `default` project.

use std::sync::Arc;

use cloudapi::{
    DEFAULT_PROJECT, EnvironmentGrant, EnvironmentGrantKey, TeamEnvironmentPermissionClient,
};
use reconcile::{
    CallContext, CheckFailure, CheckRequest, CheckResponse, CreateRequest, CreateResponse,
    DeleteRequest, DiffRequest, DiffResult, Differ, Error, IdLayout, Operation, PropertyMap,
    ReadRequest, ReadResponse, RemoteResultExt, Resource, Result, UpdateRequest, UpdateResponse,
    require,
};

use super::{absent, deleted, duration, optional_text, text};

const KIND: &str = "TeamEnvironmentPermission";

const ID: IdLayout = IdLayout::new(KIND, "{organization}/{team}/{environment}");

pub(crate) const ID_LAYOUTS: &[IdLayout] = &[ID];

const PROJECT_SEPARATOR: char = '+';

#[derive(Debug)]
pub struct TeamEnvironmentPermission {
    client: Arc<dyn TeamEnvironmentPermissionClient>,
}

impl TeamEnvironmentPermission {
    pub fn new(client: Arc<dyn TeamEnvironmentPermissionClient>) -> Self {
        Self { client }
    }
}

fn key_of(props: &PropertyMap) -> EnvironmentGrantKey {
    EnvironmentGrantKey {
        organization: text(props, "organization"),
        team: text(props, "team"),
        project: optional_text(props, "project").unwrap_or_else(|| DEFAULT_PROJECT.to_string()),
        environment: text(props, "environment"),
    }
}

fn split_id(id: &str) -> Result<EnvironmentGrantKey> {
    let [organization, team, last] = ID.decode_n(id)?;
    let (project, environment) = match last.split_once(PROJECT_SEPARATOR) {
        Some((project, environment)) => (project.to_string(), environment.to_string()),
        None => (DEFAULT_PROJECT.to_string(), last),
    };
    if project.is_empty() || environment.is_empty() {
        return Err(Error::invalid_id(
            KIND,
            id,
            "expected project+environment as the last segment",
        ));
    }
    Ok(EnvironmentGrantKey {
        organization,
        team,
        project,
        environment,
    })
}

fn encode_id(key: &EnvironmentGrantKey) -> Result<String> {
    let last = format!("{}{PROJECT_SEPARATOR}{}", key.project, key.environment);
    ID.encode(&[&key.organization, &key.team, &last])
}

fn properties(key: &EnvironmentGrantKey, grant: &EnvironmentGrant) -> PropertyMap {
    let mut props = PropertyMap::new()
        .with("organization", key.organization.as_str())
        .with("team", key.team.as_str())
        .with("project", key.project.as_str())
        .with("environment", key.environment.as_str())
        .with("permission", grant.permission.as_str());
    if let Some(max_open_duration) = &grant.max_open_duration {
        // Older service versions return durations as given
        let canonical =
            duration::normalize(max_open_duration).unwrap_or_else(|_| max_open_duration.clone());
        props.insert("maxOpenDuration", canonical);
    }
    props
}

impl Resource for TeamEnvironmentPermission {
    fn type_token(&self) -> &'static str {
        "pulumiservice:index:TeamEnvironmentPermission"
    }

    fn check(&self, req: CheckRequest) -> Result<CheckResponse> {
        let mut inputs = req.news;
        let mut failures = require(
            &inputs,
            &["organization", "team", "environment", "permission"],
        );

        if !inputs.has_value("project") {
            inputs.insert("project", DEFAULT_PROJECT);
        }

        if let Some(given) = inputs.get_str("maxOpenDuration").map(str::to_string) {
            match duration::normalize(&given) {
                Ok(canonical) => {
                    inputs.insert("maxOpenDuration", canonical);
                }
                Err(err) => failures.push(CheckFailure::new("maxOpenDuration", err.to_string())),
            }
        }

        Ok(CheckResponse { inputs, failures })
    }

    fn diff(&self, req: DiffRequest) -> Result<DiffResult> {
        Ok(Differ::replace_on_any_change().diff(&req.olds, &req.news))
    }

    fn create(&self, ctx: &CallContext, req: CreateRequest) -> Result<CreateResponse> {
        let key = key_of(&req.properties);
        let permission = text(&req.properties, "permission");
        let max_open_duration = optional_text(&req.properties, "maxOpenDuration");
        self.client
            .add_environment_permission(ctx, &key, &permission, max_open_duration.as_deref())
            .remote(KIND, Operation::Create)?;

        let id = encode_id(&key)?;
        log::info!("Created {KIND} {id}");
        Ok(CreateResponse {
            id,
            properties: req.properties,
        })
    }

    fn read(&self, ctx: &CallContext, req: ReadRequest) -> Result<ReadResponse> {
        let key = split_id(&req.id)?;
        let Some(grant) = self
            .client
            .get_environment_permission(ctx, &key)
            .remote(KIND, Operation::Read)?
        else {
            return Ok(absent(KIND, &req.id));
        };

        let props = properties(&key, &grant);
        Ok(ReadResponse {
            id: req.id,
            properties: props.clone(),
            inputs: props,
        })
    }

    fn update(&self, _ctx: &CallContext, _req: UpdateRequest) -> Result<UpdateResponse> {
        Err(Error::update_not_supported(KIND))
    }

    fn delete(&self, ctx: &CallContext, req: DeleteRequest) -> Result<()> {
        let key = split_id(&req.id)?;
        deleted(
            KIND,
            &req.id,
            self.client.remove_environment_permission(ctx, &key),
        )
    }
}
