//! # Orchestration Engine
//!
//! Drives a fixed, ordered chain of feature extraction stages over large sets of
//! building identifiers.
//!
//! ## Architecture
//!
//! ```text
//! IdentifierSource -> BatchSplitter -> PipelineBuilder -> PipelineQueue -> WorkerPool
//!                                                                             |
//!                                                   StageExecutor (per Job) <-+
//! ```
//!
//! - Batches and pipelines are built once, before any worker starts, and never change.
//! - Jobs inside a pipeline run sequentially; pipelines run in parallel across workers.
//! - A failing job fails only its own pipeline. The run is reported as failed after every
//!   worker has stopped.
//!
//! ## Core Components
//!
//! - **PipelineBuilder**: binds each batch to the stage chain
//! - **PipelineQueue**: mutex-guarded FIFO drained by the workers
//! - **WorkerPool**: fixed set of tokio tasks executing pipelines
//! - **FeatureExtractionOrchestrator**: wires sourcing, building and execution for a run
//! - **RetryPolicy**: optional per-job retries, off by default

pub mod builder;
pub mod job;
pub mod orchestrator;
pub mod pipeline;
pub mod queue;
pub mod result;
pub mod retry;
pub mod stage;
pub mod traits;
pub mod worker_pool;

pub use builder::{BuiltQueue, PipelineBuilder};
pub use job::Job;
pub use orchestrator::FeatureExtractionOrchestrator;
pub use pipeline::Pipeline;
pub use queue::PipelineQueue;
pub use result::{PipelineOutcome, PipelineStatus, RunResult};
pub use retry::{AttemptCounter, RetryPolicy};
pub use stage::{ParameterBindings, Stage, StageChain, StageParameters};
pub use traits::{IdentifierSource, StageExecutor};
pub use worker_pool::{IntakeHandle, WorkerPool};

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::batching::BatchSplitter;
    use crate::config::ExtractionConfig;
    use crate::constants::LodLevel;
    use crate::error::{StageErrorKind, StageExecutionError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    pub(crate) fn bindings() -> ParameterBindings {
        let mut config = ExtractionConfig::default();
        config.country = "germany".to_string();
        config.citydb.srid = "25832".to_string();
        ParameterBindings::from_config(&config)
    }

    /// Chain of `len` stages named `01_stage.sql`, `02_stage.sql`, ...
    pub(crate) fn chain(len: usize) -> StageChain {
        let stages = (1..=len)
            .map(|i| {
                let name = format!("{i:02}_stage.sql");
                Stage::new(name.clone(), format!("sql/scripts/main/{name}"))
            })
            .collect();
        StageChain::new(stages).unwrap()
    }

    /// `count` LOD2 pipelines of 10 buildings each, `jobs_per_pipeline` stages each
    pub(crate) fn pipelines(count: usize, jobs_per_pipeline: usize) -> Vec<Pipeline> {
        let ids: Vec<i64> = (1..=(count as i64 * 10)).collect();
        let batches = BatchSplitter::new(10).unwrap().split(LodLevel::Lod2, &ids);
        PipelineBuilder::new(chain(jobs_per_pipeline), bindings())
            .build(&[(LodLevel::Lod2, batches)])
            .unwrap()
    }

    #[derive(Debug, Clone, Copy)]
    enum Behavior {
        Fail,
        Panic,
        /// Fail this many times, then succeed
        Flaky(u32),
    }

    /// Records every job name it executes; misbehaves on configured stages
    #[derive(Debug, Default)]
    pub(crate) struct RecordingExecutor {
        calls: Mutex<Vec<String>>,
        behaviors: HashMap<String, Behavior>,
        failures_so_far: Mutex<HashMap<uuid::Uuid, u32>>,
    }

    impl RecordingExecutor {
        fn with(stage: &str, behavior: Behavior) -> Self {
            Self {
                behaviors: HashMap::from([(stage.to_string(), behavior)]),
                ..Self::default()
            }
        }

        pub(crate) fn failing_on(stage: &str) -> Self {
            Self::with(stage, Behavior::Fail)
        }

        pub(crate) fn panicking_on(stage: &str) -> Self {
            Self::with(stage, Behavior::Panic)
        }

        pub(crate) fn flaky_on(stage: &str, failures: u32) -> Self {
            Self::with(stage, Behavior::Flaky(failures))
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl StageExecutor for RecordingExecutor {
        async fn execute(&self, job: &Job) -> Result<(), StageExecutionError> {
            self.calls.lock().push(job.name().to_string());

            match self.behaviors.get(job.name()) {
                None => Ok(()),
                Some(Behavior::Fail) => Err(StageExecutionError::database(job.name(), "boom")),
                Some(Behavior::Panic) => panic!("executor blew up on {}", job.name()),
                Some(Behavior::Flaky(failures)) => {
                    let mut seen = self.failures_so_far.lock();
                    let count = seen.entry(job.job_id()).or_insert(0);
                    if *count < *failures {
                        *count += 1;
                        Err(StageExecutionError::new(
                            job.name(),
                            StageErrorKind::Database,
                            "transient",
                        ))
                    } else {
                        Ok(())
                    }
                }
            }
        }
    }
}
