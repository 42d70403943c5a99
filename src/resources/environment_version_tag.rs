//! Named tags pointing at a revision of an ESC environment.

use std::sync::Arc;

use cloudapi::{DEFAULT_PROJECT, EnvironmentName, EnvironmentTagClient};
use reconcile::{
    CallContext, CheckRequest, CheckResponse, CreateRequest, CreateResponse, DeleteBeforeReplace,
    DeleteRequest, DiffRequest, DiffResult, Differ, Error, IdLayout, Operation, PropertyMap,
    ReadRequest, ReadResponse, RemoteResultExt, ReplaceSet, Resource, Result, UpdateRequest,
    UpdateResponse, decode_any, require,
};

use super::{absent, deleted, optional_text, text};

const KIND: &str = "EnvironmentVersionTag";

const ID: IdLayout = IdLayout::new(KIND, "{organization}/{project}/{environment}/{tagName}");

/// Ids written before environments had projects
const LEGACY_ID: IdLayout = IdLayout::new(KIND, "{organization}/{environment}/{tagName}");

pub(crate) const ID_LAYOUTS: &[IdLayout] = &[ID, LEGACY_ID];

const REPLACE_ON_CHANGE: [&str; 4] = ["organization", "project", "environment", "tagName"];

#[derive(Debug)]
pub struct EnvironmentVersionTag {
    client: Arc<dyn EnvironmentTagClient>,
}

impl EnvironmentVersionTag {
    pub fn new(client: Arc<dyn EnvironmentTagClient>) -> Self {
        Self { client }
    }
}

fn split_id(id: &str) -> Result<(EnvironmentName, String)> {
    let (layout, mut fields) = decode_any(ID_LAYOUTS, id)?;
    if layout == 1 {
        fields.insert(1, DEFAULT_PROJECT.to_string());
    }
    let [org, project, env, tag] = <[String; 4]>::try_from(fields)
        .map_err(|_| Error::invalid_id(KIND, id, "unexpected field count"))?;
    Ok((EnvironmentName::new(org, project, env), tag))
}

fn target_of(props: &PropertyMap) -> (EnvironmentName, String) {
    let project = optional_text(props, "project").unwrap_or_else(|| DEFAULT_PROJECT.into());
    (
        EnvironmentName::new(text(props, "organization"), project, text(props, "environment")),
        text(props, "tagName"),
    )
}

fn properties(env: &EnvironmentName, tag: &str, revision: i64) -> PropertyMap {
    PropertyMap::new()
        .with("organization", env.organization.as_str())
        .with("project", env.project.as_str())
        .with("environment", env.environment.as_str())
        .with("tagName", tag)
        .with("revision", revision)
}

impl Resource for EnvironmentVersionTag {
    fn type_token(&self) -> &'static str {
        "pulumiservice:index:EnvironmentVersionTag"
    }

    fn check(&self, req: CheckRequest) -> Result<CheckResponse> {
        let mut inputs = req.news;
        if !inputs.has_value("project") {
            inputs.insert("project", DEFAULT_PROJECT);
        }
        let failures = require(
            &inputs,
            &["organization", "environment", "tagName", "revision"],
        );
        Ok(CheckResponse { inputs, failures })
    }

    fn diff(&self, req: DiffRequest) -> Result<DiffResult> {
        Ok(Differ::new(ReplaceSet::of(REPLACE_ON_CHANGE))
            .delete_before_replace(DeleteBeforeReplace::WhenReplacing)
            .diff(&req.old_inputs, &req.news))
    }

    fn create(&self, ctx: &CallContext, req: CreateRequest) -> Result<CreateResponse> {
        let (env, tag) = target_of(&req.properties);
        let revision = req.properties.get_i64("revision").unwrap_or_default();
        self.client
            .create_environment_tag(ctx, &env, &tag, revision)
            .remote(KIND, Operation::Create)?;

        let id = ID.encode(&[&env.organization, &env.project, &env.environment, &tag])?;
        log::info!("Created {KIND} {id} at revision {revision}");
        Ok(CreateResponse {
            id,
            properties: req.properties,
        })
    }

    fn read(&self, ctx: &CallContext, req: ReadRequest) -> Result<ReadResponse> {
        let (env, tag) = split_id(&req.id)?;
        let found = self
            .client
            .get_environment_tag(ctx, &env, &tag)
            .or_absent(KIND, Operation::Read)?
            .flatten();
        let Some(found) = found else {
            return Ok(absent(KIND, &req.id));
        };

        let props = properties(&env, &tag, found.revision);
        Ok(ReadResponse {
            id: req.id,
            properties: props.clone(),
            inputs: props,
        })
    }

    fn update(&self, ctx: &CallContext, req: UpdateRequest) -> Result<UpdateResponse> {
        let (env, tag) = target_of(&req.news);
        let revision = req.news.get_i64("revision").unwrap_or_default();
        self.client
            .update_environment_tag(ctx, &env, &tag, revision)
            .remote(KIND, Operation::Update)?;
        log::info!("Updated {KIND} {} to revision {revision}", req.id);

        Ok(UpdateResponse {
            properties: req.news,
        })
    }

    fn delete(&self, ctx: &CallContext, req: DeleteRequest) -> Result<()> {
        let (env, tag) = split_id(&req.id)?;
        deleted(
            KIND,
            &req.id,
            self.client.delete_environment_tag(ctx, &env, &tag),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::testing::not_found;
    use cloudapi::EnvironmentTag;
    use reconcile::DiffKind;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    type TagKey = (String, String, String, String);

    #[derive(Debug, Default)]
    struct FakeTags {
        tags: Mutex<BTreeMap<TagKey, i64>>,
    }

    fn key(env: &EnvironmentName, tag: &str) -> TagKey {
        (
            env.organization.clone(),
            env.project.clone(),
            env.environment.clone(),
            tag.to_string(),
        )
    }

    impl EnvironmentTagClient for FakeTags {
        fn create_environment_tag(
            &self,
            _ctx: &CallContext,
            env: &EnvironmentName,
            tag: &str,
            revision: i64,
        ) -> cloudapi::Result<()> {
            self.tags.lock().unwrap().insert(key(env, tag), revision);
            Ok(())
        }

        fn get_environment_tag(
            &self,
            _ctx: &CallContext,
            env: &EnvironmentName,
            tag: &str,
        ) -> cloudapi::Result<Option<EnvironmentTag>> {
            let tags = self.tags.lock().unwrap();
            let revision = tags.get(&key(env, tag)).ok_or_else(not_found)?;
            Ok(Some(EnvironmentTag {
                name: tag.to_string(),
                revision: *revision,
                ..EnvironmentTag::default()
            }))
        }

        fn update_environment_tag(
            &self,
            _ctx: &CallContext,
            env: &EnvironmentName,
            tag: &str,
            revision: i64,
        ) -> cloudapi::Result<()> {
            let mut tags = self.tags.lock().unwrap();
            let current = tags.get_mut(&key(env, tag)).ok_or_else(not_found)?;
            *current = revision;
            Ok(())
        }

        fn delete_environment_tag(
            &self,
            _ctx: &CallContext,
            env: &EnvironmentName,
            tag: &str,
        ) -> cloudapi::Result<()> {
            match self.tags.lock().unwrap().remove(&key(env, tag)) {
                Some(_) => Ok(()),
                None => Err(not_found()),
            }
        }
    }

    fn declared(revision: i64) -> PropertyMap {
        properties(
            &EnvironmentName::new("acme", "infra", "prod"),
            "stable",
            revision,
        )
    }

    #[test]
    fn test_id_shapes() {
        let (env, tag) = split_id("acme/infra/prod/stable").unwrap();
        assert_eq!(env, EnvironmentName::new("acme", "infra", "prod"));
        assert_eq!(tag, "stable");

        let (env, tag) = split_id("acme/prod/stable").unwrap();
        assert_eq!(env, EnvironmentName::new("acme", "default", "prod"));
        assert_eq!(tag, "stable");

        assert!(split_id("acme/stable").is_err());
    }

    #[test]
    fn test_check_defaults_project() {
        let tags = EnvironmentVersionTag::new(Arc::new(FakeTags::default()));
        let mut news = declared(3);
        news.remove("project");
        let checked = tags
            .check(CheckRequest {
                news,
                ..CheckRequest::default()
            })
            .unwrap();
        assert!(checked.is_valid());
        assert_eq!(checked.inputs.get_str("project"), Some("default"));
    }

    #[test]
    fn test_revision_moves_in_place() {
        let tags = EnvironmentVersionTag::new(Arc::new(FakeTags::default()));
        let diff = tags
            .diff(DiffRequest {
                old_inputs: declared(3),
                news: declared(4),
                ..DiffRequest::default()
            })
            .unwrap();
        assert_eq!(diff.detailed_diff["revision"], DiffKind::Update);
        assert!(!diff.requires_replace());
        assert!(!diff.delete_before_replace);

        let renamed = tags
            .diff(DiffRequest {
                old_inputs: declared(3),
                news: declared(3).with("tagName", "latest"),
                ..DiffRequest::default()
            })
            .unwrap();
        assert_eq!(renamed.replaces, vec!["tagName"]);
        assert!(renamed.delete_before_replace);
    }

    #[test]
    fn test_lifecycle() {
        let tags = EnvironmentVersionTag::new(Arc::new(FakeTags::default()));
        let ctx = CallContext::new();
        let read = |id: &str| {
            tags.read(
                &ctx,
                ReadRequest {
                    id: id.to_string(),
                    ..ReadRequest::default()
                },
            )
            .unwrap()
        };

        let created = tags
            .create(
                &ctx,
                CreateRequest {
                    properties: declared(3),
                    ..CreateRequest::default()
                },
            )
            .unwrap();
        assert_eq!(created.id, "acme/infra/prod/stable");

        tags.update(
            &ctx,
            UpdateRequest {
                id: created.id.clone(),
                olds: declared(3),
                news: declared(4),
                ..UpdateRequest::default()
            },
        )
        .unwrap();
        assert_eq!(read(&created.id).inputs, declared(4));

        let delete = || {
            tags.delete(
                &ctx,
                DeleteRequest {
                    id: created.id.clone(),
                    ..DeleteRequest::default()
                },
            )
        };
        delete().unwrap();
        delete().unwrap();
        assert!(read(&created.id).is_absent());
    }
}
