//! Policy groups: which policy packs apply to which stacks
//!
//! Stacks and policy packs are sets. Their order in the program never
//! matters, and changes to them are applied as add/remove edits.

use std::sync::Arc;

use cloudapi::{PolicyGroupClient, PolicyGroupEdit, PolicyPackMetadata, StackReference};
use reconcile::{
    CallContext, CheckFailure, CheckRequest, CheckResponse, CreateRequest, CreateResponse,
    DeleteRequest, DiffRequest, DiffResult, Differ, Error, IdLayout, Operation, PropertyMap,
    ReadRequest, ReadResponse, RemoteResultExt, ReplaceSet, Resource, Result, UpdateRequest,
    UpdateResponse, require,
};
use serde::{Deserialize, Serialize};

use super::{absent, deleted};

const KIND: &str = "PolicyGroup";

const ID: IdLayout = IdLayout::new(KIND, "{organization}/{name}");

pub(crate) const ID_LAYOUTS: &[IdLayout] = &[ID];

const REPLACE_ON_CHANGE: [&str; 3] = ["name", "entityType", "mode"];

const ENTITY_TYPES: [&str; 2] = ["stacks", "accounts"];
const MODES: [&str; 2] = ["audit", "preventative"];

#[derive(Debug)]
pub struct PolicyGroup {
    client: Arc<dyn PolicyGroupClient>,
}

impl PolicyGroup {
    pub fn new(client: Arc<dyn PolicyGroupClient>) -> Self {
        Self { client }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PolicyGroupInputs {
    name: String,
    organization_name: String,
    entity_type: String,
    mode: String,
    stacks: Vec<StackReference>,
    policy_packs: Vec<PolicyPackMetadata>,
}

impl PolicyGroupInputs {
    fn from_properties(props: &PropertyMap) -> Result<Self> {
        let mut inputs: Self = props
            .without_nulls()
            .to_typed()
            .map_err(|e| Error::InvalidInput(format!("malformed {KIND} properties: {e}")))?;
        inputs.normalize();
        Ok(inputs)
    }

    fn observed(organization: &str, group: &cloudapi::PolicyGroup) -> Self {
        let mut observed = Self {
            name: group.name.clone(),
            organization_name: organization.to_string(),
            entity_type: group.entity_type.clone(),
            mode: group.mode.clone(),
            stacks: group.stacks.clone(),
            policy_packs: group.applied_policy_packs.clone(),
        };
        observed.normalize();
        observed
    }

    fn normalize(&mut self) {
        self.stacks.sort_by(|a, b| {
            (&a.routing_project, &a.name).cmp(&(&b.routing_project, &b.name))
        });
        self.stacks.dedup();
        self.policy_packs
            .sort_by(|a, b| (&a.name, a.version).cmp(&(&b.name, b.version)));
    }

    fn to_properties(&self) -> Result<PropertyMap> {
        PropertyMap::from_typed(self)
            .map_err(|e| Error::InvalidInput(format!("unencodable {KIND} state: {e}")))
    }

    fn identity(&self) -> PropertyMap {
        PropertyMap::new()
            .with("organizationName", self.organization_name.as_str())
            .with("name", self.name.as_str())
    }
}

/// State to record after a partial create; falls back to the group's
/// identity when the progress cannot be encoded
fn recorded_state(
    id: &str,
    inputs: &PolicyGroupInputs,
    encoded: Result<PropertyMap>,
) -> PropertyMap {
    encoded.unwrap_or_else(|err| {
        log::error!("{KIND} {id}: recording identity only, {err}");
        inputs.identity()
    })
}

/// Packs are identified by name and version
fn same_pack(a: &PolicyPackMetadata, b: &PolicyPackMetadata) -> bool {
    a.name == b.name && a.version == b.version
}

fn split_id(id: &str) -> Result<(String, String)> {
    let [org, name] = ID.decode_n(id)?;
    Ok((org, name))
}

impl PolicyGroup {
    fn edit(
        &self,
        ctx: &CallContext,
        group: &PolicyGroupInputs,
        edit: &PolicyGroupEdit,
        operation: Operation,
    ) -> Result<()> {
        log::debug!(
            "{KIND} {}/{}: {edit:?}",
            group.organization_name,
            group.name
        );
        self.client
            .update_policy_group(ctx, &group.organization_name, &group.name, edit)
            .remote(KIND, operation)
    }
}

impl Resource for PolicyGroup {
    fn type_token(&self) -> &'static str {
        "pulumiservice:index:PolicyGroup"
    }

    fn check(&self, req: CheckRequest) -> Result<CheckResponse> {
        let mut news = req.news.without_nulls();
        let mut failures = require(&news, &["name", "organizationName"]);

        if !news.has_value("entityType") {
            news.insert("entityType", "stacks");
        }
        if !news.has_value("mode") {
            news.insert("mode", "audit");
        }

        if let Some(entity_type) = news.get_str("entityType")
            && !ENTITY_TYPES.contains(&entity_type)
        {
            failures.push(CheckFailure::new(
                "entityType",
                "entityType must be either 'stacks' or 'accounts'",
            ));
        }
        if let Some(mode) = news.get_str("mode")
            && !MODES.contains(&mode)
        {
            failures.push(CheckFailure::new(
                "mode",
                "mode must be either 'audit' or 'preventative'",
            ));
        }

        Ok(CheckResponse {
            inputs: news,
            failures,
        })
    }

    fn diff(&self, req: DiffRequest) -> Result<DiffResult> {
        let olds = if req.old_inputs.is_empty() {
            &req.olds
        } else {
            &req.old_inputs
        };
        let differ = Differ::new(ReplaceSet::of(REPLACE_ON_CHANGE));

        // Unknown values have no typed form yet
        if req.news.contains_unknowns() {
            return Ok(differ.diff(olds, &req.news));
        }

        let olds = PolicyGroupInputs::from_properties(olds)?;
        let news = PolicyGroupInputs::from_properties(&req.news)?;
        if olds == news {
            return Ok(DiffResult::none());
        }
        Ok(differ.diff(&olds.to_properties()?, &news.to_properties()?))
    }

    fn create(&self, ctx: &CallContext, req: CreateRequest) -> Result<CreateResponse> {
        let inputs = PolicyGroupInputs::from_properties(&req.properties)?;
        let org = inputs.organization_name.clone();
        self.client
            .create_policy_group(ctx, &org, &inputs.name, &inputs.entity_type, &inputs.mode)
            .remote(KIND, Operation::Create)?;

        let id = ID.encode(&[&org, &inputs.name])?;
        log::info!("Created {KIND} {id}");

        let mut progress = PolicyGroupInputs {
            stacks: Vec::new(),
            policy_packs: Vec::new(),
            ..inputs.clone()
        };
        let partial = |err: Error, progress: &PolicyGroupInputs| -> Error {
            let state = recorded_state(&id, &inputs, progress.to_properties());
            let declared = inputs
                .to_properties()
                .unwrap_or_else(|_| req.properties.clone());
            err.partial(Operation::Create, id.clone(), state, declared)
        };

        for stack in &inputs.stacks {
            let edit = PolicyGroupEdit::AddStack(stack.clone());
            if let Err(e) = self.edit(ctx, &inputs, &edit, Operation::Create) {
                log::warn!("{KIND} {id}: adding stack {} failed", stack.name);
                return Err(partial(e, &progress));
            }
            progress.stacks.push(stack.clone());
        }
        for pack in &inputs.policy_packs {
            let edit = PolicyGroupEdit::AddPolicyPack(pack.clone());
            if let Err(e) = self.edit(ctx, &inputs, &edit, Operation::Create) {
                log::warn!("{KIND} {id}: adding policy pack {} failed", pack.name);
                return Err(partial(e, &progress));
            }
            progress.policy_packs.push(pack.clone());
        }

        let observed = match self
            .client
            .get_policy_group(ctx, &org, &inputs.name)
            .remote(KIND, Operation::Create)
        {
            Ok(Some(found)) => PolicyGroupInputs::observed(&org, &found),
            Ok(None) => progress,
            Err(e) => return Err(partial(e, &progress)),
        };

        Ok(CreateResponse {
            id,
            properties: observed.to_properties()?,
        })
    }

    fn read(&self, ctx: &CallContext, req: ReadRequest) -> Result<ReadResponse> {
        let (org, name) = split_id(&req.id)?;
        let Some(group) = self
            .client
            .get_policy_group(ctx, &org, &name)
            .remote(KIND, Operation::Read)?
        else {
            return Ok(absent(KIND, &req.id));
        };

        let props = PolicyGroupInputs::observed(&org, &group).to_properties()?;
        Ok(ReadResponse {
            id: req.id,
            properties: props.clone(),
            inputs: props,
        })
    }

    fn update(&self, ctx: &CallContext, req: UpdateRequest) -> Result<UpdateResponse> {
        let olds = PolicyGroupInputs::from_properties(&req.olds)?;
        let news = PolicyGroupInputs::from_properties(&req.news)?;

        for stack in olds.stacks.iter().filter(|s| !news.stacks.contains(s)) {
            let edit = PolicyGroupEdit::RemoveStack(stack.clone());
            self.edit(ctx, &news, &edit, Operation::Update)?;
        }
        for stack in news.stacks.iter().filter(|s| !olds.stacks.contains(s)) {
            let edit = PolicyGroupEdit::AddStack(stack.clone());
            self.edit(ctx, &news, &edit, Operation::Update)?;
        }

        for pack in olds
            .policy_packs
            .iter()
            .filter(|p| !news.policy_packs.iter().any(|n| same_pack(p, n)))
        {
            let edit = PolicyGroupEdit::RemovePolicyPack(pack.clone());
            self.edit(ctx, &news, &edit, Operation::Update)?;
        }
        for pack in news
            .policy_packs
            .iter()
            .filter(|p| !olds.policy_packs.iter().any(|o| same_pack(p, o)))
        {
            let edit = PolicyGroupEdit::AddPolicyPack(pack.clone());
            self.edit(ctx, &news, &edit, Operation::Update)?;
        }
        log::info!("Updated {KIND} {}", req.id);

        Ok(UpdateResponse {
            properties: news.to_properties()?,
        })
    }

    fn delete(&self, ctx: &CallContext, req: DeleteRequest) -> Result<()> {
        let (org, name) = split_id(&req.id)?;
        deleted(
            KIND,
            &req.id,
            self.client.delete_policy_group(ctx, &org, &name),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::testing::{not_found, rejected};
    use reconcile::{DiffKind, Value};
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct FakeGroups {
        groups: Mutex<BTreeMap<(String, String), cloudapi::PolicyGroup>>,
        edits: Mutex<Vec<PolicyGroupEdit>>,
        /// Adding a policy pack with this name fails
        refuse_pack: Option<String>,
    }

    impl PolicyGroupClient for FakeGroups {
        fn create_policy_group(
            &self,
            _ctx: &CallContext,
            org: &str,
            name: &str,
            entity_type: &str,
            mode: &str,
        ) -> cloudapi::Result<()> {
            self.groups.lock().unwrap().insert(
                (org.to_string(), name.to_string()),
                cloudapi::PolicyGroup {
                    name: name.to_string(),
                    entity_type: entity_type.to_string(),
                    mode: mode.to_string(),
                    ..cloudapi::PolicyGroup::default()
                },
            );
            Ok(())
        }

        fn get_policy_group(
            &self,
            _ctx: &CallContext,
            org: &str,
            name: &str,
        ) -> cloudapi::Result<Option<cloudapi::PolicyGroup>> {
            let groups = self.groups.lock().unwrap();
            Ok(groups.get(&(org.to_string(), name.to_string())).cloned())
        }

        fn update_policy_group(
            &self,
            _ctx: &CallContext,
            org: &str,
            name: &str,
            edit: &PolicyGroupEdit,
        ) -> cloudapi::Result<()> {
            if let PolicyGroupEdit::AddPolicyPack(pack) = edit
                && self.refuse_pack.as_deref() == Some(pack.name.as_str())
            {
                return Err(rejected("policy pack not found"));
            }
            let mut groups = self.groups.lock().unwrap();
            let group = groups
                .get_mut(&(org.to_string(), name.to_string()))
                .ok_or_else(not_found)?;
            match edit {
                PolicyGroupEdit::AddStack(stack) => group.stacks.push(stack.clone()),
                PolicyGroupEdit::RemoveStack(stack) => group.stacks.retain(|s| s != stack),
                PolicyGroupEdit::AddPolicyPack(pack) => {
                    group.applied_policy_packs.push(pack.clone());
                }
                PolicyGroupEdit::RemovePolicyPack(pack) => {
                    group.applied_policy_packs.retain(|p| !same_pack(p, pack));
                }
                PolicyGroupEdit::NewName(new_name) => group.name.clone_from(new_name),
            }
            self.edits.lock().unwrap().push(edit.clone());
            Ok(())
        }

        fn delete_policy_group(
            &self,
            _ctx: &CallContext,
            org: &str,
            name: &str,
        ) -> cloudapi::Result<()> {
            match self
                .groups
                .lock()
                .unwrap()
                .remove(&(org.to_string(), name.to_string()))
            {
                Some(_) => Ok(()),
                None => Err(not_found()),
            }
        }
    }

    fn stack(project: &str, name: &str) -> Value {
        Value::from(
            PropertyMap::new()
                .with("name", name)
                .with("routingProject", project),
        )
    }

    fn pack(name: &str, version: i64) -> Value {
        Value::from(
            PropertyMap::new()
                .with("name", name)
                .with("displayName", name.to_uppercase())
                .with("version", version)
                .with("versionTag", format!("{version}.0.0")),
        )
    }

    fn inputs(stacks: Vec<Value>, packs: Vec<Value>) -> PropertyMap {
        PropertyMap::new()
            .with("name", "prod-guard")
            .with("organizationName", "acme")
            .with("entityType", "stacks")
            .with("mode", "audit")
            .with("stacks", stacks)
            .with("policyPacks", packs)
    }

    #[test]
    fn test_check_defaults_and_enums() {
        let groups = PolicyGroup::new(Arc::new(FakeGroups::default()));
        let checked = groups
            .check(CheckRequest {
                news: PropertyMap::new()
                    .with("name", "prod-guard")
                    .with("organizationName", "acme"),
                ..CheckRequest::default()
            })
            .unwrap();
        assert!(checked.is_valid());
        assert_eq!(checked.inputs.get_str("entityType"), Some("stacks"));
        assert_eq!(checked.inputs.get_str("mode"), Some("audit"));

        let checked = groups
            .check(CheckRequest {
                news: inputs(vec![], vec![])
                    .with("entityType", "teams")
                    .with("mode", "strict"),
                ..CheckRequest::default()
            })
            .unwrap();
        let reasons: Vec<&str> = checked.failures.iter().map(|f| f.reason.as_str()).collect();
        assert_eq!(
            reasons,
            vec![
                "entityType must be either 'stacks' or 'accounts'",
                "mode must be either 'audit' or 'preventative'",
            ]
        );
    }

    #[test]
    fn test_diff_ignores_order() {
        let groups = PolicyGroup::new(Arc::new(FakeGroups::default()));
        let diff = groups
            .diff(DiffRequest {
                old_inputs: inputs(
                    vec![stack("web", "prod"), stack("api", "prod")],
                    vec![pack("aws", 1), pack("k8s", 2)],
                ),
                news: inputs(
                    vec![stack("api", "prod"), stack("web", "prod")],
                    vec![pack("k8s", 2), pack("aws", 1)],
                ),
                ..DiffRequest::default()
            })
            .unwrap();
        assert!(!diff.has_changes());
    }

    #[test]
    fn test_diff_replaces_on_mode() {
        let groups = PolicyGroup::new(Arc::new(FakeGroups::default()));
        let diff = groups
            .diff(DiffRequest {
                old_inputs: inputs(vec![stack("web", "prod")], vec![]),
                news: inputs(vec![stack("web", "dev")], vec![]).with("mode", "preventative"),
                ..DiffRequest::default()
            })
            .unwrap();
        assert_eq!(diff.replaces, vec!["mode"]);
        assert_eq!(diff.detailed_diff["mode"], DiffKind::UpdateReplace);
        assert!(diff.has_changes());
        assert!(diff.delete_before_replace);
    }

    #[test]
    fn test_create_attaches_everything() {
        let fake = Arc::new(FakeGroups::default());
        let groups = PolicyGroup::new(fake.clone());
        let created = groups
            .create(
                &CallContext::new(),
                CreateRequest {
                    properties: inputs(vec![stack("web", "prod")], vec![pack("aws", 1)]),
                    ..CreateRequest::default()
                },
            )
            .unwrap();
        assert_eq!(created.id, "acme/prod-guard");
        assert_eq!(created.properties.get_array("stacks").map(<[Value]>::len), Some(1));
        assert_eq!(
            created.properties.get_array("policyPacks").map(<[Value]>::len),
            Some(1)
        );
        assert_eq!(fake.edits.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_create_reports_partial_failure() {
        let fake = Arc::new(FakeGroups {
            refuse_pack: Some("k8s".into()),
            ..FakeGroups::default()
        });
        let groups = PolicyGroup::new(fake);
        let err = groups
            .create(
                &CallContext::new(),
                CreateRequest {
                    properties: inputs(
                        vec![stack("web", "prod")],
                        vec![pack("aws", 1), pack("k8s", 2)],
                    ),
                    ..CreateRequest::default()
                },
            )
            .unwrap_err();

        match err {
            Error::PartialFailure { id, state, .. } => {
                assert_eq!(id, "acme/prod-guard");
                assert_eq!(state.get_array("stacks").map(<[Value]>::len), Some(1));
                assert_eq!(state.get_array("policyPacks").map(<[Value]>::len), Some(1));
            }
            other => panic!("expected a partial failure, got {other:?}"),
        }
    }

    #[test]
    fn test_unencodable_progress_keeps_identity() {
        let group = PolicyGroupInputs::from_properties(&inputs(vec![], vec![])).unwrap();
        let state = recorded_state(
            "acme/prod-guard",
            &group,
            Err(Error::InvalidInput("unencodable".into())),
        );
        assert_eq!(state.len(), 2);
        assert_eq!(state.get_str("organizationName"), Some("acme"));
        assert_eq!(state.get_str("name"), Some("prod-guard"));

        let encoded = group.to_properties().unwrap();
        assert_eq!(recorded_state("acme/prod-guard", &group, Ok(encoded.clone())), encoded);
    }

    #[test]
    fn test_update_applies_deltas() {
        let fake = Arc::new(FakeGroups::default());
        let groups = PolicyGroup::new(fake.clone());
        let ctx = CallContext::new();
        let olds = inputs(vec![stack("web", "prod")], vec![pack("aws", 1)]);
        groups
            .create(
                &ctx,
                CreateRequest {
                    properties: olds.clone(),
                    ..CreateRequest::default()
                },
            )
            .unwrap();
        fake.edits.lock().unwrap().clear();

        groups
            .update(
                &ctx,
                UpdateRequest {
                    id: "acme/prod-guard".into(),
                    olds,
                    news: inputs(
                        vec![stack("web", "prod"), stack("api", "prod")],
                        vec![pack("aws", 2)],
                    ),
                    ..UpdateRequest::default()
                },
            )
            .unwrap();

        let edits = fake.edits.lock().unwrap();
        assert_eq!(edits.len(), 3);
        assert!(matches!(&edits[0], PolicyGroupEdit::AddStack(s) if s.routing_project == "api"));
        assert!(matches!(&edits[1], PolicyGroupEdit::RemovePolicyPack(p) if p.version == 1));
        assert!(matches!(&edits[2], PolicyGroupEdit::AddPolicyPack(p) if p.version == 2));
    }

    #[test]
    fn test_read_and_delete() {
        let groups = PolicyGroup::new(Arc::new(FakeGroups::default()));
        let ctx = CallContext::new();
        let read = |id: &str| {
            groups
                .read(
                    &ctx,
                    ReadRequest {
                        id: id.to_string(),
                        ..ReadRequest::default()
                    },
                )
                .unwrap()
        };
        assert!(read("acme/missing").is_absent());

        groups
            .delete(
                &ctx,
                DeleteRequest {
                    id: "acme/missing".into(),
                    ..DeleteRequest::default()
                },
            )
            .unwrap();
    }
}
