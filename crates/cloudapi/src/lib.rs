//! # cloudapi
//!
//! Blocking client for the Pulumi Cloud REST API.
//!
//! Every entity the provider manages gets its own narrow trait
//! ([`WebhookClient`], [`TeamClient`], ...). A single [`Client`] implements
//! all of them, so a resource can hold exactly the capability it needs and
//! tests can substitute a small fake.
//!
//! ## Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use cloudapi::{Client, StackName, StackTagClient};
//! use reconcile::CallContext;
//!
//! let client = Client::http("https://api.pulumi.com", "pul-...", Duration::from_secs(60));
//! let ctx = CallContext::with_timeout(Duration::from_secs(30));
//!
//! let stack = StackName::new("acme", "web", "prod");
//! if let Some(tag) = client.get_stack_tag(&ctx, &stack, "owner").unwrap() {
//!     println!("{} = {}", tag.name, tag.value);
//! }
//! ```
//!
//! ## Lookups
//!
//! `get_*` methods return `Ok(None)` when the service answers 404. Every
//! other failure is an [`Error`] whose [`ErrorCategory`] says whether a
//! retry might help.

#![warn(clippy::all)]

pub mod agent_pools;
pub mod client;
pub mod environments;
pub mod error;
pub mod oidc;
pub mod policy_groups;
pub mod schedules;
pub mod stack_tags;
pub mod teams;
pub mod tokens;
pub mod transport;
pub mod webhooks;

pub use agent_pools::{AgentPool, AgentPoolClient};
pub use client::Client;
pub use environments::{DEFAULT_PROJECT, EnvironmentName, EnvironmentTag, EnvironmentTagClient};
pub use error::{Error, ErrorCategory, ErrorResponse, Result};
pub use oidc::{
    AuthPolicy, AuthPolicyDefinition, IssuerRegistration, IssuerUpdate, OidcIssuer,
    OidcIssuerClient,
};
pub use policy_groups::{
    PolicyGroup, PolicyGroupClient, PolicyGroupEdit, PolicyPackMetadata, StackReference,
};
pub use schedules::{
    DeploymentRequest, DeploymentScheduleRequest, DriftScheduleRequest, OperationContext,
    OperationOptions, ScheduleDefinition, StackSchedule, StackScheduleClient, TtlScheduleRequest,
};
pub use stack_tags::{StackName, StackTag, StackTagClient};
pub use teams::{
    EnvironmentGrant, EnvironmentGrantKey, NewTeam, StackGrant, TEAM_TYPES, Team, TeamClient,
    TeamEnvironmentPermissionClient, TeamMember, TeamStackPermissionClient,
};
pub use tokens::{
    AccessTokenClient, CreatedToken, OrgAccessTokenClient, TeamAccessTokenClient, TokenInfo,
};
pub use transport::http::{DEFAULT_SERVICE_URL, HttpTransport};
pub use transport::{MockTransport, Transport};
pub use webhooks::{Webhook, WebhookClient, WebhookRequest, WebhookTarget};
