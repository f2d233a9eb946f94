//! A job binds one stage of the chain to the parameters of one batch.

use crate::orchestration::stage::{Stage, StageParameters};
use std::sync::Arc;
use uuid::Uuid;

/// Immutable stage binding executed by a worker
#[derive(Debug, Clone)]
pub struct Job {
    job_id: Uuid,
    name: String,
    stage: Stage,
    params: Arc<StageParameters>,
    position: usize,
}

impl Job {
    /// `position` is the 1-based place of the stage within its pipeline
    pub fn new(stage: Stage, params: Arc<StageParameters>, position: usize) -> Self {
        let name = format!("{} {}", params.lod_level.label(), stage.name());
        Self {
            job_id: Uuid::new_v4(),
            name,
            stage,
            params,
            position,
        }
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Level-qualified job name, e.g. `LOD2 01_decompose.sql`
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn params(&self) -> &StageParameters {
        &self.params
    }

    pub fn position(&self) -> usize {
        self.position
    }
}
