//! Team access tokens.

use std::sync::Arc;

use cloudapi::TeamAccessTokenClient;
use reconcile::{
    CallContext, CreateRequest, CreateResponse, DeleteRequest, DiffRequest, DiffResult, Error,
    IdLayout, Operation, PropertyMap, ReadRequest, ReadResponse, RemoteResultExt, Resource,
    Result, UpdateRequest, UpdateResponse,
};

use super::{absent, deleted, text, token_diff, token_state};

const KIND: &str = "TeamAccessToken";

const ID: IdLayout = IdLayout::new(KIND, "{organization}/{team}/{tokenName}/{tokenId}");

pub(crate) const ID_LAYOUTS: &[IdLayout] = &[ID];

#[derive(Debug)]
pub struct TeamAccessToken {
    client: Arc<dyn TeamAccessTokenClient>,
}

impl TeamAccessToken {
    pub fn new(client: Arc<dyn TeamAccessTokenClient>) -> Self {
        Self { client }
    }
}

fn inputs(org: &str, team: &str, name: &str, description: &str) -> PropertyMap {
    PropertyMap::new()
        .with("organizationName", org)
        .with("teamName", team)
        .with("name", name)
        .with("description", description)
}

impl Resource for TeamAccessToken {
    fn type_token(&self) -> &'static str {
        "pulumiservice:index:TeamAccessToken"
    }

    fn diff(&self, req: DiffRequest) -> Result<DiffResult> {
        token_diff(
            &req.olds,
            &req.news,
            &["name", "organizationName", "teamName", "description"],
        )
    }

    fn create(&self, ctx: &CallContext, req: CreateRequest) -> Result<CreateResponse> {
        let props = &req.properties;
        let org = text(props, "organizationName");
        let team = text(props, "teamName");
        let name = text(props, "name");
        let description = text(props, "description");

        let token = self
            .client
            .create_team_access_token(ctx, &org, &team, &name, &description)
            .remote(KIND, Operation::Create)?;
        let id = ID.encode(&[&org, &team, &name, &token.id])?;
        log::info!("Created {KIND} {id}");

        Ok(CreateResponse {
            id,
            properties: token_state(&inputs(&org, &team, &name, &description), &token.token_value),
        })
    }

    fn read(&self, ctx: &CallContext, req: ReadRequest) -> Result<ReadResponse> {
        let [org, team, name, token_id] = ID.decode_n(&req.id)?;
        let Some(token) = self
            .client
            .get_team_access_token(ctx, &org, &team, &token_id)
            .remote(KIND, Operation::Read)?
        else {
            return Ok(absent(KIND, &req.id));
        };

        let inputs = inputs(&org, &team, &name, &token.description);
        Ok(ReadResponse {
            properties: token_state(&inputs, &text(&req.properties, "value")),
            id: req.id,
            inputs,
        })
    }

    fn update(&self, _ctx: &CallContext, _req: UpdateRequest) -> Result<UpdateResponse> {
        Err(Error::update_not_supported(KIND))
    }

    fn delete(&self, ctx: &CallContext, req: DeleteRequest) -> Result<()> {
        let [org, team, _name, token_id] = ID.decode_n(&req.id)?;
        deleted(
            KIND,
            &req.id,
            self.client.delete_team_access_token(ctx, &org, &team, &token_id),
        )
    }
}
