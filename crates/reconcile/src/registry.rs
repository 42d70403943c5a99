//! Resource registry and request dispatch

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::context::CallContext;
use crate::diff::DiffResult;
use crate::error::{Error, Result};
use crate::resource::{
    BoxedResource, CheckRequest, CheckResponse, CreateRequest, CreateResponse, DeleteRequest,
    DiffRequest, Operation, ReadRequest, ReadResponse, Resource, UpdateRequest, UpdateResponse,
};

/// Extract the type token from a resource URN
///
/// URNs look like `urn:pulumi:<stack>::<project>::<qualified type>::<name>`,
/// where the qualified type may be prefixed with parent types joined by `$`.
pub fn type_from_urn(urn: &str) -> Option<&str> {
    let rest = urn.strip_prefix("urn:pulumi:")?;
    let qualified = rest.split("::").nth(2)?;
    qualified.rsplit('$').next().filter(|t| !t.is_empty())
}

/// A lifecycle request tagged by operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum LifecycleRequest {
    Check(CheckRequest),
    Diff(DiffRequest),
    Create(CreateRequest),
    Read(ReadRequest),
    Update(UpdateRequest),
    Delete(DeleteRequest),
}

impl LifecycleRequest {
    pub const fn operation(&self) -> Operation {
        match self {
            Self::Check(_) => Operation::Check,
            Self::Diff(_) => Operation::Diff,
            Self::Create(_) => Operation::Create,
            Self::Read(_) => Operation::Read,
            Self::Update(_) => Operation::Update,
            Self::Delete(_) => Operation::Delete,
        }
    }

    pub fn urn(&self) -> &str {
        match self {
            Self::Check(r) => &r.urn,
            Self::Diff(r) => &r.urn,
            Self::Create(r) => &r.urn,
            Self::Read(r) => &r.urn,
            Self::Update(r) => &r.urn,
            Self::Delete(r) => &r.urn,
        }
    }
}

/// A request plus the type it targets
///
/// The type may be given directly or derived from the request's URN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_token: Option<String>,
    #[serde(flatten)]
    pub request: LifecycleRequest,
}

impl Envelope {
    pub const fn new(type_token: Option<String>, request: LifecycleRequest) -> Self {
        Self {
            type_token,
            request,
        }
    }

    /// The explicit type, or the one embedded in the URN
    pub fn resolved_type(&self) -> Option<&str> {
        self.type_token
            .as_deref()
            .or_else(|| type_from_urn(self.request.urn()))
    }
}

/// A lifecycle response tagged by operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum LifecycleResponse {
    Check(CheckResponse),
    Diff(DiffResult),
    Create(CreateResponse),
    Read(ReadResponse),
    Update(UpdateResponse),
    Delete,
}

/// Registered resource kinds, keyed by type token
#[derive(Debug, Default)]
pub struct Registry {
    resources: BTreeMap<&'static str, BoxedResource>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource; a later registration for the same type wins
    pub fn register(&mut self, resource: BoxedResource) {
        let token = resource.type_token();
        log::debug!("Registered resource type {token}");
        self.resources.insert(token, resource);
    }

    pub fn get(&self, type_token: &str) -> Result<&dyn Resource> {
        self.resources
            .get(type_token)
            .map(|r| &**r)
            .ok_or_else(|| Error::UnknownResourceType(type_token.to_string()))
    }

    pub fn types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.resources.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Route one request to its resource
    pub fn dispatch(&self, ctx: &CallContext, envelope: Envelope) -> Result<LifecycleResponse> {
        let type_token = envelope
            .resolved_type()
            .ok_or_else(|| Error::InvalidInput("request has neither a type nor a urn".into()))?
            .to_string();
        let resource = self.get(&type_token)?;
        let operation = envelope.request.operation();
        log::debug!("{operation} {type_token}");

        if operation.is_remote() {
            ctx.check(resource.kind(), operation)?;
        }

        Ok(match envelope.request {
            LifecycleRequest::Check(req) => LifecycleResponse::Check(resource.check(req)?),
            LifecycleRequest::Diff(req) => LifecycleResponse::Diff(resource.diff(req)?),
            LifecycleRequest::Create(req) => {
                LifecycleResponse::Create(resource.create(ctx, req)?)
            }
            LifecycleRequest::Read(req) => LifecycleResponse::Read(resource.read(ctx, req)?),
            LifecycleRequest::Update(req) => {
                LifecycleResponse::Update(resource.update(ctx, req)?)
            }
            LifecycleRequest::Delete(req) => {
                resource.delete(ctx, req)?;
                LifecycleResponse::Delete
            }
        })
    }
}
