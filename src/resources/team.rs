//! Teams and their membership
//!
//! Membership of `github` teams is synced from GitHub; only `pulumi` teams
//! have their members managed here.

use std::sync::Arc;

use cloudapi::{NewTeam, TEAM_TYPES, TeamClient};
use reconcile::{
    CallContext, CheckFailure, CheckRequest, CheckResponse, CreateRequest, CreateResponse,
    DeleteBeforeReplace, DeleteRequest, DiffRequest, DiffResult, Differ, Error, IdLayout,
    Operation, PropertyMap, ReadRequest, ReadResponse, RemoteResultExt, ReplaceSet, Resource,
    Result, UpdateRequest, UpdateResponse, Value, normalize_array,
};
use serde::Deserialize;

use super::{absent, deleted};

const KIND: &str = "Team";

const ID: IdLayout = IdLayout::new(KIND, "{organization}/{name}");

pub(crate) const ID_LAYOUTS: &[IdLayout] = &[ID];

const REPLACE_ON_CHANGE: [&str; 4] = ["organizationName", "teamType", "name", "githubTeamId"];

#[derive(Debug)]
pub struct Team {
    client: Arc<dyn TeamClient>,
}

impl Team {
    pub fn new(client: Arc<dyn TeamClient>) -> Self {
        Self { client }
    }
}

/// Declared shape of a team
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct TeamInputs {
    organization_name: String,
    team_type: String,
    name: String,
    display_name: String,
    description: String,
    members: Vec<String>,
    github_team_id: Option<i64>,
}

impl TeamInputs {
    fn from_properties(props: &PropertyMap) -> Result<Self> {
        let mut inputs: Self = props
            .without_nulls()
            .to_typed()
            .map_err(|e| Error::InvalidInput(format!("malformed {KIND} properties: {e}")))?;
        inputs.members.sort();
        inputs.members.dedup();
        Ok(inputs)
    }

    /// What the service reports, keeping what it does not return
    fn observed(
        organization: &str,
        team: &cloudapi::Team,
        github_team_id: Option<i64>,
    ) -> Self {
        Self {
            organization_name: organization.to_string(),
            team_type: team.team_type.clone(),
            name: team.name.clone(),
            display_name: team.display_name.clone(),
            description: team.description.clone(),
            members: team.member_names(),
            github_team_id,
        }
    }

    fn to_properties(&self) -> PropertyMap {
        let mut props = PropertyMap::new()
            .with("organizationName", self.organization_name.as_str())
            .with("teamType", self.team_type.as_str())
            .with("name", self.name.as_str())
            .with("members", self.members.clone());
        if !self.display_name.is_empty() {
            props.insert("displayName", self.display_name.as_str());
        }
        if !self.description.is_empty() {
            props.insert("description", self.description.as_str());
        }
        if let Some(id) = self.github_team_id {
            props.insert("githubTeamId", id);
        }
        props
    }

    fn is_github(&self) -> bool {
        self.team_type == "github"
    }
}

fn by_text(a: &Value, b: &Value) -> std::cmp::Ordering {
    a.as_str().cmp(&b.as_str())
}

impl Resource for Team {
    fn type_token(&self) -> &'static str {
        "pulumiservice:index:Team"
    }

    fn check(&self, req: CheckRequest) -> Result<CheckResponse> {
        let mut news = req.news;
        let mut failures = Vec::new();

        if !news.has_value("organizationName") {
            failures.push(CheckFailure::missing("organizationName"));
        }

        let team_type = news.get_str("teamType").unwrap_or_default().to_string();
        let type_known = !news.get("teamType").is_some_and(Value::is_unknown);
        if type_known && !TEAM_TYPES.contains(&team_type.as_str()) {
            failures.push(CheckFailure::new(
                "teamType",
                format!("found {team_type:?} instead of 'pulumi' or 'github'"),
            ));
        }
        if team_type == "github" && !news.has_value("githubTeamId") {
            failures.push(CheckFailure::new(
                "githubTeamId",
                "teams with teamType 'github' require a githubTeamId",
            ));
        }
        if team_type == "pulumi" && !news.has_value("name") {
            failures.push(CheckFailure::new(
                "name",
                "teams with teamType 'pulumi' require a name",
            ));
        }

        if !news.has_value("displayName")
            && let Some(name) = news.get("name").cloned()
        {
            news.insert("displayName", name);
        }
        normalize_array(&mut news, "members", by_text);

        Ok(CheckResponse {
            inputs: news,
            failures,
        })
    }

    fn diff(&self, req: DiffRequest) -> Result<DiffResult> {
        let mut olds = req.olds;
        let mut news = req.news;
        normalize_array(&mut olds, "members", by_text);
        normalize_array(&mut news, "members", by_text);

        Ok(Differ::new(ReplaceSet::of(REPLACE_ON_CHANGE))
            .delete_before_replace(DeleteBeforeReplace::Never)
            .diff(&olds, &news))
    }

    fn create(&self, ctx: &CallContext, req: CreateRequest) -> Result<CreateResponse> {
        let inputs = TeamInputs::from_properties(&req.properties)?;
        let org = inputs.organization_name.clone();
        let team = self
            .client
            .create_team(
                ctx,
                &NewTeam {
                    organization: org.clone(),
                    team_type: inputs.team_type.clone(),
                    name: inputs.name.clone(),
                    display_name: inputs.display_name.clone(),
                    description: inputs.description.clone(),
                    github_team_id: inputs.github_team_id.unwrap_or_default(),
                },
            )
            .remote(KIND, Operation::Create)?;

        // GitHub teams are named by the service.
        let name = if team.name.is_empty() {
            inputs.name.clone()
        } else {
            team.name.clone()
        };
        let id = ID.encode(&[&org, &name])?;
        log::info!("Created {KIND} {id}");

        let mut progress = TeamInputs {
            name: name.clone(),
            members: Vec::new(),
            ..inputs.clone()
        };
        let partial = |err: Error, progress: &TeamInputs| {
            err.partial(
                Operation::Create,
                id.clone(),
                progress.to_properties(),
                inputs.to_properties(),
            )
        };

        if inputs.is_github() {
            progress.members = team.member_names();
        } else {
            for member in &inputs.members {
                if let Err(e) = self
                    .client
                    .add_team_member(ctx, &org, &name, member)
                    .remote(KIND, Operation::Create)
                {
                    log::warn!("{KIND} {id}: adding member {member} failed");
                    return Err(partial(e, &progress));
                }
                progress.members.push(member.clone());
            }
        }

        let properties = match self
            .client
            .get_team(ctx, &org, &name)
            .remote(KIND, Operation::Create)
        {
            Ok(Some(found)) => {
                TeamInputs::observed(&org, &found, inputs.github_team_id).to_properties()
            }
            Ok(None) => progress.to_properties(),
            Err(e) => return Err(partial(e, &progress)),
        };

        Ok(CreateResponse { id, properties })
    }

    fn read(&self, ctx: &CallContext, req: ReadRequest) -> Result<ReadResponse> {
        let [org, name] = ID.decode_n(&req.id)?;
        let Some(team) = self
            .client
            .get_team(ctx, &org, &name)
            .remote(KIND, Operation::Read)?
        else {
            return Ok(absent(KIND, &req.id));
        };

        let github_team_id = req.properties.get_i64("githubTeamId");
        let props = TeamInputs::observed(&org, &team, github_team_id).to_properties();
        Ok(ReadResponse {
            id: req.id,
            properties: props.clone(),
            inputs: props,
        })
    }

    fn update(&self, ctx: &CallContext, req: UpdateRequest) -> Result<UpdateResponse> {
        let [org, name] = ID.decode_n(&req.id)?;
        let olds = TeamInputs::from_properties(&req.olds)?;
        let news = TeamInputs::from_properties(&req.news)?;

        if olds.display_name != news.display_name || olds.description != news.description {
            self.client
                .update_team(ctx, &org, &name, &news.display_name, &news.description)
                .remote(KIND, Operation::Update)?;
        }

        if !news.is_github() && olds.members != news.members {
            for user in olds.members.iter().filter(|m| !news.members.contains(m)) {
                log::debug!("{KIND} {}: removing {user}", req.id);
                self.client
                    .remove_team_member(ctx, &org, &name, user)
                    .remote(KIND, Operation::Update)?;
            }
            for user in news.members.iter().filter(|m| !olds.members.contains(m)) {
                log::debug!("{KIND} {}: adding {user}", req.id);
                self.client
                    .add_team_member(ctx, &org, &name, user)
                    .remote(KIND, Operation::Update)?;
            }
        }
        log::info!("Updated {KIND} {}", req.id);

        Ok(UpdateResponse {
            properties: news.to_properties(),
        })
    }

    fn delete(&self, ctx: &CallContext, req: DeleteRequest) -> Result<()> {
        let [org, name] = ID.decode_n(&req.id)?;
        deleted(KIND, &req.id, self.client.delete_team(ctx, &org, &name))
    }
}
