//! A pipeline is the ordered chain of jobs bound to one batch.
//!
//! Job order is fixed when the pipeline is built and never changes afterwards; later
//! stages consume the committed output of earlier stages on the same batch.

use crate::batching::BuildingId;
use crate::constants::LodLevel;
use crate::error::ConstructionError;
use crate::orchestration::job::Job;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Pipeline {
    pipeline_id: Uuid,
    level: LodLevel,
    batch_index: usize,
    building_ids: Arc<[BuildingId]>,
    jobs: Arc<[Job]>,
    enqueued_at: Option<DateTime<Utc>>,
}

impl Pipeline {
    pub fn new(
        level: LodLevel,
        batch_index: usize,
        building_ids: Arc<[BuildingId]>,
        jobs: Vec<Job>,
    ) -> Result<Self, ConstructionError> {
        if jobs.is_empty() {
            return Err(ConstructionError::EmptyStageChain(format!(
                "pipeline for {level} batch {batch_index} has no jobs"
            )));
        }

        Ok(Self {
            pipeline_id: Uuid::new_v4(),
            level,
            batch_index,
            building_ids,
            jobs: jobs.into(),
            enqueued_at: None,
        })
    }

    pub fn pipeline_id(&self) -> Uuid {
        self.pipeline_id
    }

    pub fn level(&self) -> LodLevel {
        self.level
    }

    pub fn batch_index(&self) -> usize {
        self.batch_index
    }

    pub fn building_ids(&self) -> &[BuildingId] {
        &self.building_ids
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    pub fn enqueued_at(&self) -> Option<DateTime<Utc>> {
        self.enqueued_at
    }

    pub(crate) fn mark_enqueued(&mut self) {
        self.enqueued_at = Some(Utc::now());
    }
}
