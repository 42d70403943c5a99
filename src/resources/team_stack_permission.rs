//! A team's permission on one stack.

use std::sync::Arc;

use cloudapi::{StackName, TeamStackPermissionClient};
use reconcile::{
    CallContext, CheckFailure, CheckRequest, CheckResponse, CreateRequest, CreateResponse,
    DeleteBeforeReplace, DeleteRequest, DiffRequest, DiffResult, Differ, Error, IdLayout,
    Operation, PropertyMap, ReadRequest, ReadResponse, RemoteResultExt, Resource, Result,
    UpdateRequest, UpdateResponse, require,
};

use super::{absent, deleted, text};

const KIND: &str = "TeamStackPermission";

const ID: IdLayout = IdLayout::new(KIND, "{organization}/{project}/{stack}/{team}");

pub(crate) const ID_LAYOUTS: &[IdLayout] = &[ID];

#[derive(Debug)]
pub struct TeamStackPermission {
    client: Arc<dyn TeamStackPermissionClient>,
}

impl TeamStackPermission {
    pub fn new(client: Arc<dyn TeamStackPermissionClient>) -> Self {
        Self { client }
    }
}

struct Grant {
    stack: StackName,
    team: String,
}

impl Grant {
    fn from_properties(props: &PropertyMap) -> Self {
        Self {
            stack: StackName::new(
                text(props, "organization"),
                text(props, "project"),
                text(props, "stack"),
            ),
            team: text(props, "team"),
        }
    }

    fn from_id(id: &str) -> Result<Self> {
        let [org, project, stack, team] = ID.decode_n(id)?;
        Ok(Self {
            stack: StackName::new(org, project, stack),
            team,
        })
    }

    fn id(&self) -> Result<String> {
        ID.encode(&[
            &self.stack.organization,
            &self.stack.project,
            &self.stack.stack,
            &self.team,
        ])
    }

    fn properties(&self, permission: i64) -> PropertyMap {
        PropertyMap::new()
            .with("organization", self.stack.organization.as_str())
            .with("project", self.stack.project.as_str())
            .with("stack", self.stack.stack.as_str())
            .with("team", self.team.as_str())
            .with("permission", permission)
    }
}

impl Resource for TeamStackPermission {
    fn type_token(&self) -> &'static str {
        "pulumiservice:index:TeamStackPermission"
    }

    fn check(&self, req: CheckRequest) -> Result<CheckResponse> {
        let mut failures = require(&req.news, &["organization", "project", "stack", "team"]);
        if req.news.get_i64("permission").is_none() {
            failures.push(CheckFailure::new(
                "permission",
                "permission must be an integer",
            ));
        }
        Ok(CheckResponse {
            inputs: req.news,
            failures,
        })
    }

    fn diff(&self, req: DiffRequest) -> Result<DiffResult> {
        Ok(Differ::replace_on_any_change()
            .delete_before_replace(DeleteBeforeReplace::WhenReplacing)
            .diff(&req.olds, &req.news))
    }

    fn create(&self, ctx: &CallContext, req: CreateRequest) -> Result<CreateResponse> {
        let grant = Grant::from_properties(&req.properties);
        let permission = req.properties.get_i64("permission").unwrap_or_default();
        self.client
            .add_stack_permission(ctx, &grant.stack, &grant.team, permission)
            .remote(KIND, Operation::Create)?;

        let id = grant.id()?;
        log::info!("Created {KIND} {id}");
        Ok(CreateResponse {
            id,
            properties: req.properties,
        })
    }

    fn read(&self, ctx: &CallContext, req: ReadRequest) -> Result<ReadResponse> {
        // Ids written before the team was part of the id cannot be read back
        let grant = match Grant::from_id(&req.id) {
            Ok(grant) => grant,
            Err(err) => {
                log::warn!("{KIND} {} has a legacy id, dropping it: {err}", req.id);
                return Ok(ReadResponse::absent());
            }
        };

        let Some(permission) = self
            .client
            .get_stack_permission(ctx, &grant.stack, &grant.team)
            .remote(KIND, Operation::Read)?
        else {
            return Ok(absent(KIND, &req.id));
        };

        let props = grant.properties(permission);
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
        let grant = Grant::from_id(&req.id)
            .unwrap_or_else(|_| Grant::from_properties(&req.properties));
        deleted(
            KIND,
            &req.id,
            self.client
                .remove_stack_permission(ctx, &grant.stack, &grant.team),
        )
    }
}
