//! # Reconcile
//!
//! The core of a declarative resource provider.
//!
//! An infrastructure engine keeps recorded state for every managed entity
//! and asks a provider to converge remote reality toward declared inputs.
//! This crate holds everything that is independent of any particular
//! remote service.
//!
//! ## Core Concepts
//!
//! - **Value / PropertyMap**: structured data with secret and unknown markers
//! - **Differ**: classifies changes per property path, including replacements
//! - **IdLayout**: strict codecs for `/`-joined composite identifiers
//! - **SecretMerge**: keeps write-only secrets stable across refreshes
//! - **Resource**: the Check / Diff / Create / Read / Update / Delete contract
//! - **Registry**: routes lifecycle requests to resources by type token
//!
//! ## Example
//!
//! ```ignore
//! use reconcile::{CallContext, Registry, Envelope};
//!
//! let mut registry = Registry::new();
//! registry.register(Box::new(MyResource::new(client)));
//!
//! let envelope: Envelope = serde_json::from_str(input)?;
//! let response = registry.dispatch(&CallContext::with_timeout(timeout), envelope)?;
//! ```
//!
//! ## Provider Traits
//!
//! - [`Resource`]: one managed kind
//! - [`RemoteError`]: classification a client error must expose so the
//!   core can tell not-found and cancellation apart from other failures

pub mod batch;
pub mod context;
pub mod diff;
pub mod error;
pub mod id;
pub mod path;
pub mod registry;
pub mod resource;
pub mod secret;
pub mod value;
pub mod wire;

pub use batch::{BatchOptions, BatchSummary, Failure, Outcome, PartialState};
pub use context::{CallContext, CancelToken, Interrupt};
pub use diff::{
    Changes, DeleteBeforeReplace, DiffKind, DiffResult, DiffSummary, Differ, ReplaceSet,
    changed_keys, lift_inputs, normalize_array, recorded_inputs, standard_diff,
};
pub use error::{BoxError, Error, ErrorCategory, RemoteError, RemoteResultExt, Result};
pub use id::{IdLayout, decode_any};
pub use path::PropertyPath;
pub use registry::{Envelope, LifecycleRequest, LifecycleResponse, Registry, type_from_urn};
pub use resource::{
    BoxedResource, CheckFailure, CheckRequest, CheckResponse, CreateRequest, CreateResponse,
    DeleteRequest, DiffRequest, INPUTS_KEY, Operation, ReadRequest, ReadResponse, Resource,
    UpdateRequest, UpdateResponse, compensate, require,
};
pub use secret::{IMPORT_PLACEHOLDER, SecretMerge, SecretMode};
pub use value::{PropertyMap, Value};
