//! OIDC issuers and the auth policy attached to each
//!
//! Registering an issuer also creates a default auth policy for it. Declared
//! policies replace the default right after registration.

use std::sync::Arc;

use cloudapi::{
    AuthPolicy, AuthPolicyDefinition, IssuerRegistration, IssuerUpdate, OidcIssuerClient,
};
use reconcile::{
    CallContext, CheckFailure, CheckRequest, CheckResponse, CreateRequest, CreateResponse,
    DeleteRequest, DiffRequest, DiffResult, Error, IdLayout, Operation, PropertyMap, ReadRequest,
    ReadResponse, RemoteResultExt, Resource, Result, UpdateRequest, UpdateResponse, compensate,
    require, standard_diff,
};
use serde::{Deserialize, Serialize};

use super::{absent, deleted};

const KIND: &str = "OidcIssuer";

const ID: IdLayout = IdLayout::new(KIND, "{organization}/{issuerId}");

pub(crate) const ID_LAYOUTS: &[IdLayout] = &[ID];

const REPLACE_ON_CHANGE: [&str; 2] = ["organization", "url"];

#[derive(Debug)]
pub struct OidcIssuer {
    client: Arc<dyn OidcIssuerClient>,
}

impl OidcIssuer {
    pub fn new(client: Arc<dyn OidcIssuerClient>) -> Self {
        Self { client }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct IssuerInputs {
    organization: String,
    name: String,
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_expiration_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    thumbprints: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    policies: Vec<AuthPolicyDefinition>,
}

impl IssuerInputs {
    fn from_properties(props: &PropertyMap) -> Result<Self> {
        props
            .without_nulls()
            .to_typed()
            .map_err(|e| Error::InvalidInput(format!("malformed {KIND} properties: {e}")))
    }

    fn observed(organization: &str, issuer: &cloudapi::OidcIssuer, policy: &AuthPolicy) -> Self {
        Self {
            organization: organization.to_string(),
            name: issuer.name.clone(),
            url: issuer.url.clone(),
            max_expiration_seconds: issuer.max_expiration,
            thumbprints: issuer.thumbprints.clone(),
            policies: policy.policies.clone(),
        }
    }

    fn to_properties(&self) -> Result<PropertyMap> {
        PropertyMap::from_typed(self)
            .map_err(|e| Error::InvalidInput(format!("unencodable {KIND} state: {e}")))
    }

    fn registration(&self) -> IssuerRegistration {
        IssuerRegistration {
            name: self.name.clone(),
            url: self.url.clone(),
            thumbprints: self.thumbprints.clone(),
            max_expiration: self.max_expiration_seconds,
        }
    }

    /// Outputs: the inputs, with thumbprints and policies as the service
    /// reports them
    fn state(&self, issuer: &cloudapi::OidcIssuer, policy: &AuthPolicy) -> Result<PropertyMap> {
        Self {
            thumbprints: issuer.thumbprints.clone(),
            policies: policy.policies.clone(),
            ..self.clone()
        }
        .to_properties()
    }
}

/// The first input that fails to decode on its own
fn malformed_property(props: &PropertyMap) -> String {
    props
        .without_nulls()
        .iter()
        .find(|(key, value)| {
            let alone = PropertyMap::new().with(key.as_str(), (*value).clone());
            IssuerInputs::from_properties(&alone).is_err()
        })
        .map_or_else(|| "properties".to_string(), |(key, _)| key.clone())
}

fn split_id(id: &str) -> Result<(String, String)> {
    let [org, issuer_id] = ID.decode_n(id)?;
    Ok((org, issuer_id))
}

impl Resource for OidcIssuer {
    fn type_token(&self) -> &'static str {
        "pulumiservice:index:OidcIssuer"
    }

    fn check(&self, req: CheckRequest) -> Result<CheckResponse> {
        let failures = require(&req.news, &["organization", "name", "url"]);
        if !failures.is_empty() || req.news.contains_unknowns() {
            return Ok(CheckResponse {
                inputs: req.news,
                failures,
            });
        }
        match IssuerInputs::from_properties(&req.news) {
            Ok(inputs) => Ok(CheckResponse::ok(inputs.to_properties()?)),
            Err(err) => {
                let property = malformed_property(&req.news);
                let failures = vec![CheckFailure::new(property, err.to_string())];
                Ok(CheckResponse {
                    inputs: req.news,
                    failures,
                })
            }
        }
    }

    fn diff(&self, req: DiffRequest) -> Result<DiffResult> {
        let olds = if req.old_inputs.is_empty() {
            &req.olds
        } else {
            &req.old_inputs
        };
        Ok(standard_diff(olds, &req.news, &REPLACE_ON_CHANGE))
    }

    fn create(&self, ctx: &CallContext, req: CreateRequest) -> Result<CreateResponse> {
        let inputs = IssuerInputs::from_properties(&req.properties)?;
        let org = inputs.organization.as_str();
        let issuer = self
            .client
            .register_oidc_issuer(ctx, org, &inputs.registration())
            .remote(KIND, Operation::Create)?;
        let id = ID.encode(&[org, &issuer.id])?;
        log::info!("Created {KIND} {id}");

        let declared = inputs.to_properties()?;
        let mut policy = match self
            .client
            .get_auth_policy(ctx, org, &issuer.id)
            .remote(KIND, Operation::Create)
        {
            Ok(policy) => policy,
            Err(e) => {
                let state = inputs.state(&issuer, &AuthPolicy::default())?;
                return Err(e.partial(Operation::Create, id, state, declared));
            }
        };

        if !inputs.policies.is_empty() {
            match self
                .client
                .update_auth_policy(ctx, org, &policy.id, &inputs.policies)
                .remote(KIND, Operation::Create)
            {
                Ok(updated) => policy = updated,
                Err(e) => {
                    let removed = compensate(KIND, "delete issuer", || {
                        self.client.delete_oidc_issuer(ctx, org, &issuer.id)
                    });
                    if removed {
                        return Err(e);
                    }
                    let state = inputs.state(&issuer, &policy)?;
                    return Err(e.partial(Operation::Create, id, state, declared));
                }
            }
        }

        Ok(CreateResponse {
            properties: inputs.state(&issuer, &policy)?,
            id,
        })
    }

    fn read(&self, ctx: &CallContext, req: ReadRequest) -> Result<ReadResponse> {
        let (org, issuer_id) = split_id(&req.id)?;
        let Some(issuer) = self
            .client
            .get_oidc_issuer(ctx, &org, &issuer_id)
            .remote(KIND, Operation::Read)?
        else {
            return Ok(absent(KIND, &req.id));
        };
        let policy = self
            .client
            .get_auth_policy(ctx, &org, &issuer_id)
            .remote(KIND, Operation::Read)?;

        let observed = IssuerInputs::observed(&org, &issuer, &policy);
        Ok(ReadResponse {
            id: req.id,
            properties: observed.state(&issuer, &policy)?,
            inputs: observed.to_properties()?,
        })
    }

    fn update(&self, ctx: &CallContext, req: UpdateRequest) -> Result<UpdateResponse> {
        let (_, issuer_id) = split_id(&req.id)?;
        let inputs = IssuerInputs::from_properties(&req.news)?;
        let org = inputs.organization.as_str();

        let issuer = self
            .client
            .update_oidc_issuer(
                ctx,
                org,
                &issuer_id,
                &IssuerUpdate {
                    name: Some(inputs.name.clone()),
                    thumbprints: Some(inputs.thumbprints.clone()),
                    max_expiration: inputs.max_expiration_seconds,
                },
            )
            .remote(KIND, Operation::Update)?;

        let mut policy = self
            .client
            .get_auth_policy(ctx, org, &issuer_id)
            .remote(KIND, Operation::Update)?;
        if !inputs.policies.is_empty() {
            policy = self
                .client
                .update_auth_policy(ctx, org, &policy.id, &inputs.policies)
                .remote(KIND, Operation::Update)?;
        }
        log::info!("Updated {KIND} {}", req.id);

        Ok(UpdateResponse {
            properties: inputs.state(&issuer, &policy)?,
        })
    }

    fn delete(&self, ctx: &CallContext, req: DeleteRequest) -> Result<()> {
        let (org, issuer_id) = split_id(&req.id)?;
        deleted(
            KIND,
            &req.id,
            self.client.delete_oidc_issuer(ctx, &org, &issuer_id),
        )
    }
}
