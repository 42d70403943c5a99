//! Personal access tokens of the calling user.

use std::sync::Arc;

use cloudapi::AccessTokenClient;
use reconcile::{
    CallContext, CreateRequest, CreateResponse, DeleteRequest, DiffRequest, DiffResult, Error,
    IdLayout, Operation, PropertyMap, ReadRequest, ReadResponse, RemoteResultExt, Resource,
    Result, UpdateRequest, UpdateResponse,
};

use super::{absent, deleted, text, token_diff, token_state};

const KIND: &str = "AccessToken";

pub(crate) const ID_LAYOUTS: &[IdLayout] = &[IdLayout::new(KIND, "{tokenId}")];

#[derive(Debug)]
pub struct AccessToken {
    client: Arc<dyn AccessTokenClient>,
}

impl AccessToken {
    pub fn new(client: Arc<dyn AccessTokenClient>) -> Self {
        Self { client }
    }
}

impl Resource for AccessToken {
    fn type_token(&self) -> &'static str {
        "pulumiservice:index:AccessToken"
    }

    fn diff(&self, req: DiffRequest) -> Result<DiffResult> {
        token_diff(&req.olds, &req.news, &["description"])
    }

    fn create(&self, ctx: &CallContext, req: CreateRequest) -> Result<CreateResponse> {
        let description = text(&req.properties, "description");
        let token = self
            .client
            .create_access_token(ctx, &description)
            .remote(KIND, Operation::Create)?;
        log::info!("Created {KIND} {}", token.id);

        let inputs = PropertyMap::new().with("description", description);
        Ok(CreateResponse {
            properties: token_state(&inputs, &token.token_value),
            id: token.id,
        })
    }

    fn read(&self, ctx: &CallContext, req: ReadRequest) -> Result<ReadResponse> {
        let Some(token) = self
            .client
            .get_access_token(ctx, &req.id)
            .remote(KIND, Operation::Read)?
        else {
            return Ok(absent(KIND, &req.id));
        };

        // The value is only handed out at creation; keep what state has.
        let value = text(&req.properties, "value");
        let inputs = PropertyMap::new().with("description", token.description);
        Ok(ReadResponse {
            id: token.id,
            properties: token_state(&inputs, &value),
            inputs,
        })
    }

    fn update(&self, _ctx: &CallContext, _req: UpdateRequest) -> Result<UpdateResponse> {
        Err(Error::update_not_supported(KIND))
    }

    fn delete(&self, ctx: &CallContext, req: DeleteRequest) -> Result<()> {
        deleted(KIND, &req.id, self.client.delete_access_token(ctx, &req.id))
    }
}
