//! Organization access tokens.
//!
//! The token name may contain `/`, so the id keeps it as a free-form middle
//! field between the organization and the token id.

use std::sync::Arc;

use cloudapi::OrgAccessTokenClient;
use reconcile::{
    CallContext, CreateRequest, CreateResponse, DeleteRequest, DiffRequest, DiffResult, Error,
    IdLayout, Operation, PropertyMap, ReadRequest, ReadResponse, RemoteResultExt, Resource,
    Result, UpdateRequest, UpdateResponse,
};

use super::{absent, deleted, text, token_diff, token_state};

const KIND: &str = "OrgAccessToken";

const ID: IdLayout = IdLayout::new(KIND, "{organization}/{name...}/{tokenId}");

pub(crate) const ID_LAYOUTS: &[IdLayout] = &[ID];

#[derive(Debug)]
pub struct OrgAccessToken {
    client: Arc<dyn OrgAccessTokenClient>,
}

impl OrgAccessToken {
    pub fn new(client: Arc<dyn OrgAccessTokenClient>) -> Self {
        Self { client }
    }
}

fn inputs(org: &str, name: &str, description: &str, admin: bool) -> PropertyMap {
    PropertyMap::new()
        .with("organizationName", org)
        .with("name", name)
        .with("description", description)
        .with("admin", admin)
}

impl Resource for OrgAccessToken {
    fn type_token(&self) -> &'static str {
        "pulumiservice:index:OrgAccessToken"
    }

    fn diff(&self, req: DiffRequest) -> Result<DiffResult> {
        token_diff(
            &req.olds,
            &req.news,
            &["name", "organizationName", "description", "admin"],
        )
    }

    fn create(&self, ctx: &CallContext, req: CreateRequest) -> Result<CreateResponse> {
        let props = &req.properties;
        let org = text(props, "organizationName");
        let name = text(props, "name");
        let description = text(props, "description");
        let admin = props.get_bool("admin").unwrap_or(false);

        let token = self
            .client
            .create_org_access_token(ctx, &org, &name, &description, admin)
            .remote(KIND, Operation::Create)?;
        let id = ID.encode(&[&org, &name, &token.id])?;
        log::info!("Created {KIND} {id}");

        Ok(CreateResponse {
            id,
            properties: token_state(&inputs(&org, &name, &description, admin), &token.token_value),
        })
    }

    fn read(&self, ctx: &CallContext, req: ReadRequest) -> Result<ReadResponse> {
        let [org, _name, token_id] = ID.decode_n(&req.id)?;
        let Some(token) = self
            .client
            .get_org_access_token(ctx, &org, &token_id)
            .remote(KIND, Operation::Read)?
        else {
            return Ok(absent(KIND, &req.id));
        };

        let inputs = inputs(&org, &token.name, &token.description, token.admin);
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
        let [org, _name, token_id] = ID.decode_n(&req.id)?;
        deleted(
            KIND,
            &req.id,
            self.client.delete_org_access_token(ctx, &org, &token_id),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::testing::not_found;
    use cloudapi::{CreatedToken, TokenInfo};
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct FakeOrgTokens {
        tokens: Mutex<Vec<(String, TokenInfo)>>,
    }

    impl OrgAccessTokenClient for FakeOrgTokens {
        fn create_org_access_token(
            &self,
            _ctx: &CallContext,
            org: &str,
            name: &str,
            description: &str,
            admin: bool,
        ) -> cloudapi::Result<CreatedToken> {
            let mut tokens = self.tokens.lock().unwrap();
            let id = format!("ot-{}", tokens.len() + 1);
            tokens.push((
                org.to_string(),
                TokenInfo {
                    id: id.clone(),
                    name: name.to_string(),
                    description: description.to_string(),
                    admin,
                    ..TokenInfo::default()
                },
            ));
            Ok(CreatedToken {
                id,
                token_value: "pul-org".to_string(),
            })
        }

        fn get_org_access_token(
            &self,
            _ctx: &CallContext,
            org: &str,
            token_id: &str,
        ) -> cloudapi::Result<Option<TokenInfo>> {
            let tokens = self.tokens.lock().unwrap();
            Ok(tokens
                .iter()
                .find(|(o, t)| o == org && t.id == token_id)
                .map(|(_, t)| t.clone()))
        }

        fn delete_org_access_token(
            &self,
            _ctx: &CallContext,
            org: &str,
            token_id: &str,
        ) -> cloudapi::Result<()> {
            let mut tokens = self.tokens.lock().unwrap();
            let before = tokens.len();
            tokens.retain(|(o, t)| !(o == org && t.id == token_id));
            if tokens.len() == before {
                return Err(not_found());
            }
            Ok(())
        }
    }

    #[test]
    fn test_name_with_slashes_survives_the_id() {
        let resource = OrgAccessToken::new(Arc::new(FakeOrgTokens::default()));
        let ctx = CallContext::new();
        let created = resource
            .create(
                &ctx,
                CreateRequest {
                    properties: PropertyMap::new()
                        .with("organizationName", "acme")
                        .with("name", "ci/deploy/prod")
                        .with("admin", true),
                    ..CreateRequest::default()
                },
            )
            .unwrap();
        assert_eq!(created.id, "acme/ci/deploy/prod/ot-1");

        let read = resource
            .read(
                &ctx,
                ReadRequest {
                    id: created.id.clone(),
                    properties: created.properties,
                    ..ReadRequest::default()
                },
            )
            .unwrap();
        assert_eq!(read.inputs.get_str("name"), Some("ci/deploy/prod"));
        assert_eq!(read.inputs.get_bool("admin"), Some(true));
        assert_eq!(read.properties.get_str("value"), Some("pul-org"));

        resource
            .delete(
                &ctx,
                DeleteRequest {
                    id: created.id.clone(),
                    ..DeleteRequest::default()
                },
            )
            .unwrap();
        let gone = resource
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

    #[test]
    fn test_short_id_is_rejected_before_any_call() {
        let resource = OrgAccessToken::new(Arc::new(FakeOrgTokens::default()));
        let err = resource
            .read(
                &CallContext::new(),
                ReadRequest {
                    id: "acme/ot-1".into(),
                    ..ReadRequest::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidId { .. }));
    }

    #[test]
    fn test_admin_change_replaces() {
        let resource = OrgAccessToken::new(Arc::new(FakeOrgTokens::default()));
        let olds = token_state(&inputs("acme", "ci", "", false), "v");
        let diff = resource
            .diff(DiffRequest {
                olds,
                news: inputs("acme", "ci", "", true),
                ..DiffRequest::default()
            })
            .unwrap();
        assert_eq!(diff.replaces, vec!["admin"]);
    }
}
