//! Concrete Pulumi Cloud resource kinds
//!
//! Each kind composes the reconcile core around the one narrow client trait
//! it needs. Kinds hold nothing but that client; every call is independent.

mod access_token;
mod agent_pool;
mod duration;
mod environment_version_tag;
mod oidc_issuer;
mod org_access_token;
mod policy_group;
mod schedules;
mod stack_tag;
mod team;
mod team_access_token;
mod team_environment_permission;
mod team_stack_permission;
mod webhook;

use std::sync::Arc;

use cloudapi::Client;
use reconcile::{
    DiffResult, IdLayout, INPUTS_KEY, Operation, PropertyMap, ReadResponse, RemoteResultExt,
    Registry, Result, Value, changed_keys, recorded_inputs,
};

pub use access_token::AccessToken;
pub use agent_pool::AgentPool;
pub use environment_version_tag::EnvironmentVersionTag;
pub use oidc_issuer::OidcIssuer;
pub use org_access_token::OrgAccessToken;
pub use policy_group::PolicyGroup;
pub use schedules::{DeploymentSchedule, DriftSchedule, TtlSchedule};
pub use stack_tag::StackTag;
pub use team::Team;
pub use team_access_token::TeamAccessToken;
pub use team_environment_permission::TeamEnvironmentPermission;
pub use team_stack_permission::TeamStackPermission;
pub use webhook::{DEFAULT_WEBHOOK_GROUPS, Webhook, WebhookScope};

/// Every supported kind, sharing one client
pub fn registry(client: &Arc<Client>) -> Registry {
    let mut registry = Registry::new();
    registry.register(Box::new(AccessToken::new(client.clone())));
    registry.register(Box::new(OrgAccessToken::new(client.clone())));
    registry.register(Box::new(TeamAccessToken::new(client.clone())));
    registry.register(Box::new(Webhook::new(client.clone())));
    registry.register(Box::new(StackTag::new(client.clone())));
    registry.register(Box::new(DeploymentSchedule::new(client.clone())));
    registry.register(Box::new(DriftSchedule::new(client.clone())));
    registry.register(Box::new(TtlSchedule::new(client.clone())));
    registry.register(Box::new(Team::new(client.clone())));
    registry.register(Box::new(TeamStackPermission::new(client.clone())));
    registry.register(Box::new(TeamEnvironmentPermission::new(client.clone())));
    registry.register(Box::new(PolicyGroup::new(client.clone())));
    registry.register(Box::new(OidcIssuer::new(client.clone())));
    registry.register(Box::new(AgentPool::new(client.clone())));
    registry.register(Box::new(EnvironmentVersionTag::new(client.clone())));
    registry
}

/// Identifier layouts per type token, in the order they are tried
pub const ID_LAYOUTS: &[(&str, &[IdLayout])] = &[
    ("pulumiservice:index:AccessToken", access_token::ID_LAYOUTS),
    ("pulumiservice:index:OrgAccessToken", org_access_token::ID_LAYOUTS),
    ("pulumiservice:index:TeamAccessToken", team_access_token::ID_LAYOUTS),
    ("pulumiservice:index:Webhook", webhook::ID_LAYOUTS),
    ("pulumiservice:index:StackTag", stack_tag::ID_LAYOUTS),
    ("pulumiservice:index:DeploymentSchedule", schedules::DEPLOYMENT_ID_LAYOUTS),
    ("pulumiservice:index:DriftSchedule", schedules::DRIFT_ID_LAYOUTS),
    ("pulumiservice:index:TtlSchedule", schedules::TTL_ID_LAYOUTS),
    ("pulumiservice:index:Team", team::ID_LAYOUTS),
    ("pulumiservice:index:TeamStackPermission", team_stack_permission::ID_LAYOUTS),
    (
        "pulumiservice:index:TeamEnvironmentPermission",
        team_environment_permission::ID_LAYOUTS,
    ),
    ("pulumiservice:index:PolicyGroup", policy_group::ID_LAYOUTS),
    ("pulumiservice:index:OidcIssuer", oidc_issuer::ID_LAYOUTS),
    ("pulumiservice:index:AgentPool", agent_pool::ID_LAYOUTS),
    (
        "pulumiservice:index:EnvironmentVersionTag",
        environment_version_tag::ID_LAYOUTS,
    ),
];

/// Identifier layouts accepted by a type
pub fn id_layouts(type_token: &str) -> Option<&'static [IdLayout]> {
    ID_LAYOUTS
        .iter()
        .find(|(token, _)| *token == type_token)
        .map(|(_, layouts)| *layouts)
}

// ============================================================================
// Shared helpers
// ============================================================================

/// String field, empty when unset
pub(crate) fn text(map: &PropertyMap, key: &str) -> String {
    map.get_str(key).unwrap_or_default().to_string()
}

/// String field, `None` when unset or empty
pub(crate) fn optional_text(map: &PropertyMap, key: &str) -> Option<String> {
    map.get_str(key)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// The entity is gone; the engine drops it from state
pub(crate) fn absent(kind: &str, id: &str) -> ReadResponse {
    log::warn!("{kind} {id} no longer exists");
    ReadResponse::absent()
}

/// Finish a delete; an entity that is already gone counts as deleted
pub(crate) fn deleted(
    kind: &'static str,
    id: &str,
    result: cloudapi::Result<()>,
) -> Result<()> {
    match result.or_absent(kind, Operation::Delete)? {
        Some(()) => log::info!("Deleted {kind} {id}"),
        None => log::warn!("{kind} {id} was already deleted"),
    }
    Ok(())
}

/// Diff of the token kinds
///
/// Compares the inputs recorded under `__inputs` with the declared ones and
/// only reports the listed fields, each as a replacement.
pub(crate) fn token_diff(
    olds: &PropertyMap,
    news: &PropertyMap,
    replace: &[&str],
) -> Result<DiffResult> {
    let inputs = recorded_inputs(olds)?;
    let replaces: Vec<String> = changed_keys(&inputs, news)
        .into_iter()
        .filter(|key| replace.contains(&key.as_str()))
        .collect();
    Ok(DiffResult::replacing(replaces, false))
}

/// Output state of the token kinds: the inputs, a copy of them under
/// `__inputs`, and the token value as a secret
pub(crate) fn token_state(inputs: &PropertyMap, token_value: &str) -> PropertyMap {
    let mut state = inputs.clone();
    state.insert(INPUTS_KEY, inputs.clone());
    state.insert("value", Value::secret(token_value));
    state
}
