//! Batch execution - runs independent lifecycle requests in parallel

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::context::CallContext;
use crate::error::{Error, Result};
use crate::registry::{Envelope, LifecycleResponse, Registry};
use crate::value::PropertyMap;

/// Options for batch execution
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Number of worker threads
    pub jobs: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            jobs: std::thread::available_parallelism().map_or(4, |n| n.get()),
        }
    }
}

/// State the engine must record after a partial failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialState {
    pub id: String,
    #[serde(rename = "properties")]
    pub state: PropertyMap,
    pub inputs: PropertyMap,
}

/// Serializable form of a failed request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    pub error: String,
    pub category: String,
    pub retryable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial: Option<PartialState>,
}

impl From<&Error> for Failure {
    fn from(err: &Error) -> Self {
        let partial = match err {
            Error::PartialFailure {
                id, state, inputs, ..
            } => Some(PartialState {
                id: id.clone(),
                state: state.clone(),
                inputs: inputs.clone(),
            }),
            _ => None,
        };
        Self {
            error: err.to_string(),
            category: err.category().description().to_string(),
            retryable: err.is_retryable(),
            partial,
        }
    }
}

/// Outcome of one request in a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Outcome {
    Ok(LifecycleResponse),
    Failed(Failure),
}

impl Outcome {
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }
}

/// Batch summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[Outcome]) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.is_ok()).count();
        Self {
            succeeded,
            failed: outcomes.len() - succeeded,
        }
    }

    pub const fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    pub const fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Dispatch every request, `jobs` at a time
///
/// Outcomes come back in request order. Requests in one batch must be
/// independent; ordering between dependent resources is the engine's job.
pub fn execute(
    registry: &Registry,
    ctx: &CallContext,
    requests: Vec<Envelope>,
    opts: &BatchOptions,
) -> Result<Vec<Outcome>> {
    if requests.is_empty() {
        return Ok(Vec::new());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.jobs.max(1))
        .build()
        .map_err(|e| Error::WorkerPool(e.to_string()))?;

    log::info!(
        "Running {} request(s) with {} worker(s)",
        requests.len(),
        opts.jobs.max(1)
    );

    let outcomes: Vec<Outcome> = pool.install(|| {
        requests
            .into_par_iter()
            .map(|envelope| match registry.dispatch(ctx, envelope) {
                Ok(response) => Outcome::Ok(response),
                Err(e) => {
                    log::warn!("Request failed: {e}");
                    Outcome::Failed(Failure::from(&e))
                }
            })
            .collect()
    });

    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CallContext;
    use crate::diff::DiffResult;
    use crate::registry::LifecycleRequest;
    use crate::resource::{
        CreateRequest, CreateResponse, DeleteRequest, DiffRequest, Operation, ReadRequest,
        ReadResponse, Resource, UpdateRequest, UpdateResponse,
    };

    #[derive(Debug)]
    struct Flaky;

    impl Resource for Flaky {
        fn type_token(&self) -> &'static str {
            "test:index:Flaky"
        }

        fn diff(&self, _req: DiffRequest) -> crate::Result<DiffResult> {
            Ok(DiffResult::none())
        }

        fn create(&self, _ctx: &CallContext, req: CreateRequest) -> crate::Result<CreateResponse> {
            if req.properties.get_bool("fail") == Some(true) {
                let source = Error::InvalidInput("second step failed".into());
                return Err(source.partial(
                    Operation::Create,
                    "flaky-1",
                    req.properties.clone(),
                    req.properties,
                ));
            }
            Ok(CreateResponse {
                id: "flaky-1".into(),
                properties: req.properties,
            })
        }

        fn read(&self, _ctx: &CallContext, _req: ReadRequest) -> crate::Result<ReadResponse> {
            Ok(ReadResponse::absent())
        }

        fn update(&self, _ctx: &CallContext, _req: UpdateRequest) -> crate::Result<UpdateResponse> {
            Err(Error::update_not_supported(self.kind()))
        }

        fn delete(&self, _ctx: &CallContext, _req: DeleteRequest) -> crate::Result<()> {
            Ok(())
        }
    }

    fn create(fail: bool) -> Envelope {
        Envelope::new(
            Some("test:index:Flaky".into()),
            LifecycleRequest::Create(CreateRequest {
                urn: String::new(),
                properties: PropertyMap::new().with("fail", fail),
            }),
        )
    }

    #[test]
    fn test_execute_empty_batch() {
        let registry = Registry::new();
        let outcomes =
            execute(&registry, &CallContext::new(), Vec::new(), &BatchOptions::default()).unwrap();
        assert!(outcomes.is_empty());
    }

    #[test]
    fn test_execute_preserves_order_and_partial_state() {
        let mut registry = Registry::new();
        registry.register(Box::new(Flaky));

        let outcomes = execute(
            &registry,
            &CallContext::new(),
            vec![create(false), create(true), create(false)],
            &BatchOptions { jobs: 2 },
        )
        .unwrap();

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_ok());
        assert!(outcomes[2].is_ok());
        match &outcomes[1] {
            Outcome::Failed(failure) => {
                let partial = failure.partial.as_ref().unwrap();
                assert_eq!(partial.id, "flaky-1");
                assert!(!failure.retryable);
            }
            Outcome::Ok(other) => panic!("expected failure, got {other:?}"),
        }

        let summary = BatchSummary::from_outcomes(&outcomes);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert!(!summary.is_success());
    }
}
