//! # Feature Extraction Orchestrator
//!
//! Runs one extraction over every configured level:
//!
//! 1. list each level's building identifiers (a failing level is recorded and skipped)
//! 2. split them into batches
//! 3. build every pipeline and fill the queue
//! 4. drain the queue with the worker pool
//!
//! All construction checks happen in [`FeatureExtractionOrchestrator::new`] and while
//! building, before any worker starts.

use crate::batching::{Batch, BatchSplitter};
use crate::config::ExtractionConfig;
use crate::constants::LodLevel;
use crate::error::{Result, SourcingError};
use crate::logging::log_error;
use crate::orchestration::builder::PipelineBuilder;
use crate::orchestration::result::RunResult;
use crate::orchestration::retry::RetryPolicy;
use crate::orchestration::stage::{ParameterBindings, StageChain};
use crate::orchestration::traits::{IdentifierSource, StageExecutor};
use crate::orchestration::worker_pool::{IntakeHandle, WorkerPool};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct FeatureExtractionOrchestrator {
    levels: Vec<LodLevel>,
    splitter: BatchSplitter,
    builder: PipelineBuilder,
    pool: WorkerPool,
    source: Arc<dyn IdentifierSource>,
}

impl FeatureExtractionOrchestrator {
    /// Validate `config` and assemble the orchestrator.
    ///
    /// A non-positive batch size or worker count is a [`ConstructionError`]; every other
    /// invalid setting is reported as a configuration error.
    ///
    /// [`ConstructionError`]: crate::error::ConstructionError
    pub fn new(
        config: &ExtractionConfig,
        chain: StageChain,
        source: Arc<dyn IdentifierSource>,
        executor: Arc<dyn StageExecutor>,
    ) -> Result<Self> {
        let splitter = BatchSplitter::new(config.batch.size)?;
        let pool = WorkerPool::new(config.batch.workers, executor)?
            .with_retry_policy(RetryPolicy::from_config(&config.retry));
        config.validate()?;

        let builder = PipelineBuilder::new(chain, ParameterBindings::from_config(config));

        Ok(Self::from_parts(
            config.levels.clone(),
            splitter,
            builder,
            pool,
            source,
        ))
    }

    pub fn from_parts(
        levels: Vec<LodLevel>,
        splitter: BatchSplitter,
        builder: PipelineBuilder,
        pool: WorkerPool,
        source: Arc<dyn IdentifierSource>,
    ) -> Self {
        Self {
            levels,
            splitter,
            builder,
            pool,
            source,
        }
    }

    pub fn levels(&self) -> &[LodLevel] {
        &self.levels
    }

    pub fn worker_count(&self) -> usize {
        self.pool.worker_count()
    }

    /// Handle for stopping pipeline intake while a run is in progress
    pub fn intake_handle(&self) -> IntakeHandle {
        self.pool.intake_handle()
    }

    /// Execute one full run.
    ///
    /// Returns `Err` only for construction failures, in which case nothing was executed.
    /// Pipeline and level failures are reported in the [`RunResult`].
    #[instrument(skip(self), fields(levels = ?self.levels, workers = self.pool.worker_count()))]
    pub async fn run(&self) -> Result<RunResult> {
        let started_at = Utc::now();
        let (level_batches, level_failures) = self.source_batches().await;

        let built = self.builder.build_queue(&level_batches)?;

        info!(
            pipelines = built.total_pipelines,
            jobs_per_pipeline = built.jobs_per_pipeline,
            workers = self.pool.worker_count(),
            "📦 ORCHESTRATOR: Queue ready"
        );

        let mut result = self.pool.run(built.queue).await;
        result.started_at = started_at;
        result.total_pipelines = built.total_pipelines;
        result.jobs_per_pipeline = built.jobs_per_pipeline;
        result.pipelines_per_level = built.pipelines_per_level;
        result.level_failures = level_failures;

        Ok(result)
    }

    async fn source_batches(&self) -> (Vec<(LodLevel, Vec<Batch>)>, Vec<SourcingError>) {
        let mut level_batches = Vec::with_capacity(self.levels.len());
        let mut level_failures = Vec::new();

        for &level in &self.levels {
            match self.source.list(level).await {
                Ok(ids) => {
                    if ids.is_empty() {
                        warn!(level = %level, "⚠️ ORCHESTRATOR: No buildings found, level contributes no pipelines");
                    }
                    let batches = self.splitter.split(level, &ids);
                    info!(
                        level = %level,
                        buildings = ids.len(),
                        batches = batches.len(),
                        batch_size = self.splitter.max_batch_size(),
                        "✂️ ORCHESTRATOR: Level split into batches"
                    );
                    level_batches.push((level, batches));
                }
                Err(error) => {
                    log_error(
                        "orchestrator",
                        "list_building_ids",
                        &error.to_string(),
                        Some(level.label()),
                    );
                    level_failures.push(error);
                }
            }
        }

        (level_batches, level_failures)
    }
}
