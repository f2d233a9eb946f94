//! # Pipeline Builder
//!
//! Turns batches into pipelines: one pipeline per batch, one job per stage, jobs in
//! stage-chain order. Building is all-or-nothing; nothing is enqueued unless every
//! pipeline of the run could be constructed.

use crate::batching::Batch;
use crate::constants::LodLevel;
use crate::error::ConstructionError;
use crate::orchestration::job::Job;
use crate::orchestration::pipeline::Pipeline;
use crate::orchestration::queue::PipelineQueue;
use crate::orchestration::stage::{ParameterBindings, StageChain};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    chain: StageChain,
    bindings: ParameterBindings,
}

impl PipelineBuilder {
    pub fn new(chain: StageChain, bindings: ParameterBindings) -> Self {
        Self { chain, bindings }
    }

    pub fn chain(&self) -> &StageChain {
        &self.chain
    }

    /// Build the pipeline for a single batch
    pub fn build_pipeline(&self, batch: &Batch) -> Result<Pipeline, ConstructionError> {
        let params = Arc::new(self.bindings.bind(batch)?);
        let jobs = self
            .chain
            .stages()
            .iter()
            .enumerate()
            .map(|(i, stage)| Job::new(stage.clone(), Arc::clone(&params), i + 1))
            .collect();

        Pipeline::new(batch.level(), batch.index(), batch.shared_ids(), jobs)
    }

    /// Build pipelines for every batch of every level, preserving level then batch order.
    ///
    /// Fails on the first batch that cannot be bound; no partial result is returned.
    pub fn build(
        &self,
        levels: &[(LodLevel, Vec<Batch>)],
    ) -> Result<Vec<Pipeline>, ConstructionError> {
        let total: usize = levels.iter().map(|(_, batches)| batches.len()).sum();
        let mut pipelines = Vec::with_capacity(total);

        for (level, batches) in levels {
            for batch in batches {
                debug_assert_eq!(batch.level(), *level);
                pipelines.push(self.build_pipeline(batch)?);
            }
            debug!(level = %level, batches = batches.len(), "🔧 BUILDER: Level pipelines built");
        }

        Ok(pipelines)
    }

    /// Build all pipelines, then place them on a fresh queue in build order
    pub fn build_queue(
        &self,
        levels: &[(LodLevel, Vec<Batch>)],
    ) -> Result<BuiltQueue, ConstructionError> {
        let pipelines = self.build(levels)?;

        let mut pipelines_per_level = BTreeMap::new();
        for (level, batches) in levels {
            *pipelines_per_level.entry(*level).or_insert(0) += batches.len();
        }

        let total_pipelines = pipelines.len();
        let queue = PipelineQueue::new();
        queue.enqueue_all(pipelines);
        let jobs_per_pipeline = queue.peek().map_or(0, |head| head.job_count());

        info!(
            total_pipelines = total_pipelines,
            jobs_per_pipeline = jobs_per_pipeline,
            "📥 QUEUE: Pipelines enqueued"
        );

        Ok(BuiltQueue {
            queue: Arc::new(queue),
            total_pipelines,
            jobs_per_pipeline,
            pipelines_per_level,
        })
    }
}

/// A filled queue plus the counts reported with the run
#[derive(Debug)]
pub struct BuiltQueue {
    pub queue: Arc<PipelineQueue>,
    pub total_pipelines: usize,
    pub jobs_per_pipeline: usize,
    pub pipelines_per_level: BTreeMap<LodLevel, usize>,
}
