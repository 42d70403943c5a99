//! Tags on a stack.

use std::sync::Arc;

use cloudapi::{StackName, StackTagClient};
use reconcile::{
    CallContext, CheckRequest, CheckResponse, CreateRequest, CreateResponse, DeleteBeforeReplace,
    DeleteRequest, DiffRequest, DiffResult, Differ, Error, IdLayout, Operation, PropertyMap,
    ReadRequest, ReadResponse, RemoteResultExt, Resource, Result, UpdateRequest, UpdateResponse,
    require,
};

use super::{absent, deleted, text};

const KIND: &str = "StackTag";

const ID: IdLayout = IdLayout::new(KIND, "{organization}/{project}/{stack}/{tagName}");

pub(crate) const ID_LAYOUTS: &[IdLayout] = &[ID];

#[derive(Debug)]
pub struct StackTag {
    client: Arc<dyn StackTagClient>,
}

impl StackTag {
    pub fn new(client: Arc<dyn StackTagClient>) -> Self {
        Self { client }
    }
}

fn properties(stack: &StackName, name: &str, value: &str) -> PropertyMap {
    PropertyMap::new()
        .with("organization", stack.organization.as_str())
        .with("project", stack.project.as_str())
        .with("stack", stack.stack.as_str())
        .with("name", name)
        .with("value", value)
}

fn split_id(id: &str) -> Result<(StackName, String)> {
    let [org, project, stack, name] = ID.decode_n(id)?;
    Ok((StackName::new(org, project, stack), name))
}

impl Resource for StackTag {
    fn type_token(&self) -> &'static str {
        "pulumiservice:index:StackTag"
    }

    fn check(&self, req: CheckRequest) -> Result<CheckResponse> {
        let failures = require(&req.news, &["organization", "project", "stack", "name"]);
        Ok(CheckResponse {
            inputs: req.news,
            failures,
        })
    }

    fn diff(&self, req: DiffRequest) -> Result<DiffResult> {
        Ok(Differ::replace_on_any_change()
            .delete_before_replace(DeleteBeforeReplace::WhenReplacing)
            .diff(&req.old_inputs, &req.news))
    }

    fn create(&self, ctx: &CallContext, req: CreateRequest) -> Result<CreateResponse> {
        let props = &req.properties;
        let stack = StackName::new(
            text(props, "organization"),
            text(props, "project"),
            text(props, "stack"),
        );
        let tag = cloudapi::StackTag {
            name: text(props, "name"),
            value: text(props, "value"),
        };
        self.client
            .create_stack_tag(ctx, &stack, &tag)
            .remote(KIND, Operation::Create)?;

        let id = ID.encode(&[&stack.organization, &stack.project, &stack.stack, &tag.name])?;
        log::info!("Created {KIND} {id}");
        Ok(CreateResponse {
            id,
            properties: req.properties,
        })
    }

    fn read(&self, ctx: &CallContext, req: ReadRequest) -> Result<ReadResponse> {
        let (stack, name) = split_id(&req.id)?;
        let Some(tag) = self
            .client
            .get_stack_tag(ctx, &stack, &name)
            .remote(KIND, Operation::Read)?
        else {
            return Ok(absent(KIND, &req.id));
        };

        let props = properties(&stack, &tag.name, &tag.value);
        Ok(ReadResponse {
            id: req.id,
            properties: props.clone(),
            inputs: props,
        })
    }

    fn update(&self, _ctx: &CallContext, _req: UpdateRequest) -> Result<UpdateResponse> {
        Err(Error::update_not_supported(KIND))
    }

    fn delete(&self, ctx: &CallContext, req: DeleteRequest) -> Result<()> {
        let (stack, name) = split_id(&req.id)?;
        deleted(KIND, &req.id, self.client.delete_stack_tag(ctx, &stack, &name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::testing::not_found;
    use reconcile::DiffKind;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct FakeTags {
        tags: Mutex<HashMap<(StackName, String), String>>,
    }

    impl StackTagClient for FakeTags {
        fn create_stack_tag(
            &self,
            _ctx: &CallContext,
            stack: &StackName,
            tag: &cloudapi::StackTag,
        ) -> cloudapi::Result<()> {
            self.tags
                .lock()
                .unwrap()
                .insert((stack.clone(), tag.name.clone()), tag.value.clone());
            Ok(())
        }

        fn get_stack_tag(
            &self,
            _ctx: &CallContext,
            stack: &StackName,
            name: &str,
        ) -> cloudapi::Result<Option<cloudapi::StackTag>> {
            let tags = self.tags.lock().unwrap();
            Ok(tags
                .get(&(stack.clone(), name.to_string()))
                .map(|value| cloudapi::StackTag {
                    name: name.to_string(),
                    value: value.clone(),
                }))
        }

        fn delete_stack_tag(
            &self,
            _ctx: &CallContext,
            stack: &StackName,
            name: &str,
        ) -> cloudapi::Result<()> {
            match self.tags.lock().unwrap().remove(&(stack.clone(), name.to_string())) {
                Some(_) => Ok(()),
                None => Err(not_found()),
            }
        }
    }

    fn tag_inputs(value: &str) -> PropertyMap {
        properties(&StackName::new("acme", "web", "prod"), "owner", value)
    }

    #[test]
    fn test_lifecycle() {
        let tags = StackTag::new(Arc::new(FakeTags::default()));
        let ctx = CallContext::new();

        let created = tags
            .create(
                &ctx,
                CreateRequest {
                    properties: tag_inputs("platform"),
                    ..CreateRequest::default()
                },
            )
            .unwrap();
        assert_eq!(created.id, "acme/web/prod/owner");

        let read = tags
            .read(
                &ctx,
                ReadRequest {
                    id: created.id.clone(),
                    ..ReadRequest::default()
                },
            )
            .unwrap();
        assert_eq!(read.inputs, tag_inputs("platform"));

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

        let gone = tags
            .read(
                &ctx,
                ReadRequest {
                    id: created.id.clone(),
                    ..ReadRequest::default()
                },
            )
            .unwrap();
        assert!(gone.is_absent());
    }

    #[test]
    fn test_every_change_replaces() {
        let tags = StackTag::new(Arc::new(FakeTags::default()));
        let diff = tags
            .diff(DiffRequest {
                old_inputs: tag_inputs("platform"),
                news: tag_inputs("security"),
                ..DiffRequest::default()
            })
            .unwrap();
        assert_eq!(diff.detailed_diff["value"], DiffKind::UpdateReplace);
        assert_eq!(diff.replaces, vec!["value"]);
        assert!(diff.delete_before_replace);

        let same = tags
            .diff(DiffRequest {
                old_inputs: tag_inputs("platform"),
                news: tag_inputs("platform"),
                ..DiffRequest::default()
            })
            .unwrap();
        assert!(!same.has_changes());
        assert!(!same.delete_before_replace);
    }

    #[test]
    fn test_malformed_id() {
        let tags = StackTag::new(Arc::new(FakeTags::default()));
        let err = tags
            .read(
                &CallContext::new(),
                ReadRequest {
                    id: "acme/web/owner".into(),
                    ..ReadRequest::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidId { .. }));
        assert!(tags.update(&CallContext::new(), UpdateRequest::default()).is_err());
    }
}
