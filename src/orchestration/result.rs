//! # Run Results
//!
//! Per-pipeline outcomes and the aggregate [`RunResult`] of one extraction run.
//! Counters are derived from the collected outcomes so they always agree with them.

use crate::constants::LodLevel;
use crate::error::{SourcingError, StageExecutionError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineStatus {
    Succeeded,
    /// Stopped at `stage`; later stages were not executed
    Failed {
        stage: String,
        error: StageExecutionError,
    },
}

/// Terminal record of one dispatched pipeline
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub pipeline_id: Uuid,
    pub level: LodLevel,
    pub batch_index: usize,
    pub building_count: usize,
    pub worker_id: usize,
    pub jobs_total: usize,
    pub jobs_executed: usize,
    /// Stage attempts beyond the first, across all jobs of the pipeline
    pub retries: u32,
    pub duration_ms: u64,
    #[serde(flatten)]
    pub status: PipelineStatus,
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, PipelineStatus::Succeeded)
    }

    pub fn error(&self) -> Option<&StageExecutionError> {
        match &self.status {
            PipelineStatus::Succeeded => None,
            PipelineStatus::Failed { error, .. } => Some(error),
        }
    }
}

/// Aggregate result of one extraction run
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Pipelines placed on the queue for this run
    pub total_pipelines: usize,
    pub jobs_per_pipeline: usize,
    pub pipelines_per_level: BTreeMap<LodLevel, usize>,
    pub outcomes: Vec<PipelineOutcome>,
    pub level_failures: Vec<SourcingError>,
    /// Pipelines left on the queue because intake was stopped
    pub undispatched_pipelines: usize,
    /// Workers that terminated abnormally
    pub panicked_workers: usize,
}

impl RunResult {
    /// Result of a run that dispatched nothing
    pub fn empty(started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at,
            finished_at: Utc::now(),
            total_pipelines: 0,
            jobs_per_pipeline: 0,
            pipelines_per_level: BTreeMap::new(),
            outcomes: Vec::new(),
            level_failures: Vec::new(),
            undispatched_pipelines: 0,
            panicked_workers: 0,
        }
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.len() - self.success_count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &PipelineOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn total_retries(&self) -> u32 {
        self.outcomes.iter().map(|o| o.retries).sum()
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    /// Every queued pipeline succeeded and no level or worker failed
    pub fn is_success(&self) -> bool {
        self.failure_count() == 0
            && self.level_failures.is_empty()
            && self.undispatched_pipelines == 0
            && self.panicked_workers == 0
            && self.outcomes.len() == self.total_pipelines
    }

    pub fn log_summary(&self) {
        info!(
            run_id = %self.run_id,
            total_pipelines = self.total_pipelines,
            jobs_per_pipeline = self.jobs_per_pipeline,
            succeeded = self.success_count(),
            failed = self.failure_count(),
            retries = self.total_retries(),
            undispatched = self.undispatched_pipelines,
            duration_ms = self.duration_ms(),
            "🏁 RUN: Feature extraction finished"
        );

        for (level, count) in &self.pipelines_per_level {
            info!(level = %level, pipelines = count, "📊 RUN: Pipelines per level");
        }

        for failure in &self.level_failures {
            warn!(level = %failure.level, reason = %failure.reason, "⚠️ RUN: Level skipped");
        }

        for outcome in self.failures() {
            if let PipelineStatus::Failed { stage, error } = &outcome.status {
                warn!(
                    pipeline_id = %outcome.pipeline_id,
                    level = %outcome.level,
                    batch_index = outcome.batch_index,
                    stage = %stage,
                    jobs_executed = outcome.jobs_executed,
                    error = %error,
                    "❌ RUN: Pipeline failed"
                );
            }
        }

        if self.panicked_workers > 0 {
            warn!(
                panicked_workers = self.panicked_workers,
                "⚠️ RUN: Workers terminated abnormally"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StageErrorKind;

    fn outcome(status: PipelineStatus) -> PipelineOutcome {
        PipelineOutcome {
            pipeline_id: Uuid::new_v4(),
            level: LodLevel::Lod2,
            batch_index: 0,
            building_count: 10,
            worker_id: 0,
            jobs_total: 3,
            jobs_executed: 3,
            retries: 1,
            duration_ms: 12,
            status,
        }
    }

    fn failed() -> PipelineStatus {
        PipelineStatus::Failed {
            stage: "LOD2 02_b.sql".to_string(),
            error: StageExecutionError::new("LOD2 02_b.sql", StageErrorKind::Database, "boom"),
        }
    }

    #[test]
    fn test_counts_derive_from_outcomes() {
        let mut result = RunResult::empty(Utc::now());
        result.total_pipelines = 3;
        result.outcomes = vec![
            outcome(PipelineStatus::Succeeded),
            outcome(failed()),
            outcome(PipelineStatus::Succeeded),
        ];

        assert_eq!(result.success_count(), 2);
        assert_eq!(result.failure_count(), 1);
        assert_eq!(result.failures().count(), 1);
        assert_eq!(result.total_retries(), 3);
        assert!(!result.is_success());
    }

    #[test]
    fn test_empty_run_is_success() {
        let result = RunResult::empty(Utc::now());
        assert!(result.is_success());
        assert_eq!(result.success_count(), 0);
    }

    #[test]
    fn test_undispatched_pipelines_fail_the_run() {
        let mut result = RunResult::empty(Utc::now());
        result.total_pipelines = 2;
        result.outcomes = vec![outcome(PipelineStatus::Succeeded)];
        result.undispatched_pipelines = 1;
        assert!(!result.is_success());
    }

    #[test]
    fn test_serializes_failure_status() {
        let json = serde_json::to_value(outcome(failed())).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["stage"], "LOD2 02_b.sql");
        assert_eq!(json["error"]["kind"], "database");
        assert_eq!(json["level"], 2);
    }
}
