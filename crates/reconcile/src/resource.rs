//! The resource lifecycle contract
//!
//! Every managed kind implements [`Resource`]: six operations the engine
//! drives in a fixed order.
//!
//! ```text
//! Check -> Diff -> Create | Update | Delete
//!             \-> Read (refresh / import)
//! ```
//!
//! Check and Diff are pure. The other four talk to the remote service and
//! receive a [`CallContext`] they must pass to every remote call.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::context::CallContext;
use crate::diff::DiffResult;
use crate::error::Result;
use crate::value::PropertyMap;

/// Key under which legacy state stored the declared inputs
pub const INPUTS_KEY: &str = "__inputs";

/// The six lifecycle operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Check,
    Diff,
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Self; 6] = [
        Self::Check,
        Self::Diff,
        Self::Create,
        Self::Read,
        Self::Update,
        Self::Delete,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Check => "check",
            Self::Diff => "diff",
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// Whether the operation reaches the remote service
    pub const fn is_remote(self) -> bool {
        !matches!(self, Self::Check | Self::Diff)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single input validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckFailure {
    pub property: String,
    pub reason: String,
}

impl CheckFailure {
    pub fn new(property: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            reason: reason.into(),
        }
    }

    /// Failure for a required property with no value
    pub fn missing(property: &str) -> Self {
        Self::new(property, format!("missing required property '{property}'"))
    }
}

/// Failures for each listed property that has no value
pub fn require(news: &PropertyMap, properties: &[&str]) -> Vec<CheckFailure> {
    properties
        .iter()
        .filter(|p| !news.has_value(p))
        .map(|p| CheckFailure::missing(p))
        .collect()
}

// ============================================================================
// Requests and responses
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckRequest {
    pub urn: String,
    pub olds: PropertyMap,
    pub news: PropertyMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckResponse {
    /// Normalized inputs, with defaults applied
    pub inputs: PropertyMap,
    pub failures: Vec<CheckFailure>,
}

impl CheckResponse {
    pub fn ok(inputs: PropertyMap) -> Self {
        Self {
            inputs,
            failures: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiffRequest {
    pub id: String,
    pub urn: String,
    /// Recorded output state
    pub olds: PropertyMap,
    /// Recorded inputs; empty for state written before inputs were tracked
    pub old_inputs: PropertyMap,
    pub news: PropertyMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateRequest {
    pub urn: String,
    pub properties: PropertyMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateResponse {
    pub id: String,
    pub properties: PropertyMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReadRequest {
    pub id: String,
    pub urn: String,
    /// Recorded output state; empty on import
    pub properties: PropertyMap,
    /// Recorded inputs; empty on import
    pub inputs: PropertyMap,
}

/// Result of a read; an empty id means the entity no longer exists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReadResponse {
    pub id: String,
    pub properties: PropertyMap,
    pub inputs: PropertyMap,
}

impl ReadResponse {
    /// The entity is gone; the engine drops it from state
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn is_absent(&self) -> bool {
        self.id.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateRequest {
    pub id: String,
    pub urn: String,
    pub olds: PropertyMap,
    pub old_inputs: PropertyMap,
    pub news: PropertyMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateResponse {
    pub properties: PropertyMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeleteRequest {
    pub id: String,
    pub urn: String,
    pub properties: PropertyMap,
}

// ============================================================================
// Resource trait
// ============================================================================

/// Core trait for managed remote entities
///
/// Implementations hold only their narrow client; they keep no state
/// between calls.
pub trait Resource: Send + Sync + fmt::Debug {
    /// Fully qualified type token, e.g. `pulumiservice:index:Webhook`
    fn type_token(&self) -> &'static str;

    /// Short kind name used in messages
    ///
    /// Defaults to the last segment of the type token.
    fn kind(&self) -> &'static str {
        let token = self.type_token();
        token.rsplit(':').next().unwrap_or(token)
    }

    /// Validate and normalize declared inputs
    ///
    /// Failures are returned in the response, never as an error.
    fn check(&self, req: CheckRequest) -> Result<CheckResponse> {
        Ok(CheckResponse::ok(req.news))
    }

    /// Classify the change between recorded state and declared inputs
    fn diff(&self, req: DiffRequest) -> Result<DiffResult>;

    /// Create the entity and return its id and output state
    fn create(&self, ctx: &CallContext, req: CreateRequest) -> Result<CreateResponse>;

    /// Fetch live state
    ///
    /// Must return [`ReadResponse::absent`] when the entity no longer exists.
    fn read(&self, ctx: &CallContext, req: ReadRequest) -> Result<ReadResponse>;

    /// Apply in-place changes
    fn update(&self, ctx: &CallContext, req: UpdateRequest) -> Result<UpdateResponse>;

    /// Delete the entity; deleting something already gone succeeds
    fn delete(&self, ctx: &CallContext, req: DeleteRequest) -> Result<()>;
}

/// A boxed resource for type-erased storage
pub type BoxedResource = Box<dyn Resource>;

/// Run a named compensation step after a failed multi-step operation
///
/// A failing step is logged and otherwise ignored; the caller still
/// reports the original failure. Returns whether the step succeeded.
pub fn compensate<E, F>(resource: &str, step: &str, action: F) -> bool
where
    E: fmt::Display,
    F: FnOnce() -> std::result::Result<(), E>,
{
    log::info!("{resource}: compensating with step '{step}'");
    match action() {
        Ok(()) => true,
        Err(e) => {
            log::error!("{resource}: compensation step '{step}' failed: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_operation_display_and_remote() {
        assert_eq!(Operation::Create.to_string(), "create");
        assert!(Operation::Delete.is_remote());
        assert!(!Operation::Diff.is_remote());
        assert_eq!(Operation::ALL.len(), 6);
    }

    #[test]
    fn test_require() {
        let news = PropertyMap::new()
            .with("organizationName", "acme")
            .with("name", Value::Null);
        let failures = require(&news, &["organizationName", "name", "description"]);

        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].property, "name");
        assert_eq!(failures[0].reason, "missing required property 'name'");
        assert_eq!(failures[1].property, "description");
    }

    #[test]
    fn test_read_response_absent() {
        let absent = ReadResponse::absent();
        assert!(absent.is_absent());
        assert!(absent.properties.is_empty());
        assert!(absent.inputs.is_empty());
    }

    #[test]
    fn test_compensate_reports_outcome() {
        assert!(compensate("OidcIssuer", "delete issuer", || Ok::<(), String>(())));
        assert!(!compensate("OidcIssuer", "delete issuer", || Err("boom".to_string())));
    }

    #[test]
    fn test_requests_deserialize_with_defaults() {
        let req: ReadRequest = serde_json::from_str(r#"{"id": "acme/hook"}"#).unwrap();
        assert_eq!(req.id, "acme/hook");
        assert!(req.properties.is_empty());

        let req: DiffRequest =
            serde_json::from_str(r#"{"id": "x", "oldInputs": {"name": "a"}}"#).unwrap();
        assert_eq!(req.old_inputs.get_str("name"), Some("a"));
    }

    #[derive(Debug)]
    struct Named;

    impl Resource for Named {
        fn type_token(&self) -> &'static str {
            "pulumiservice:index:Named"
        }

        fn diff(&self, _req: DiffRequest) -> Result<DiffResult> {
            Ok(DiffResult::none())
        }

        fn create(&self, _ctx: &CallContext, req: CreateRequest) -> Result<CreateResponse> {
            Ok(CreateResponse {
                id: "named".into(),
                properties: req.properties,
            })
        }

        fn read(&self, _ctx: &CallContext, _req: ReadRequest) -> Result<ReadResponse> {
            Ok(ReadResponse::absent())
        }

        fn update(&self, _ctx: &CallContext, _req: UpdateRequest) -> Result<UpdateResponse> {
            Err(crate::error::Error::update_not_supported(self.kind()))
        }

        fn delete(&self, _ctx: &CallContext, _req: DeleteRequest) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_resource_defaults() {
        let r = Named;
        assert_eq!(r.kind(), "Named");

        let news = PropertyMap::new().with("a", 1);
        let resp = r
            .check(CheckRequest {
                news: news.clone(),
                ..CheckRequest::default()
            })
            .unwrap();
        assert!(resp.is_valid());
        assert_eq!(resp.inputs, news);
    }
}
