//! # Worker Pool
//!
//! A fixed number of tokio tasks drain a shared [`PipelineQueue`]. Each worker takes one
//! pipeline at a time and runs its jobs strictly in order, stopping at the first failed
//! job. A failure is recorded against its pipeline and the worker moves on to the next
//! one; sibling workers and queued pipelines are never affected.
//!
//! The run ends when every worker has found the queue empty (or intake was stopped) and
//! all handles have been joined.

use crate::error::{ConstructionError, StageErrorKind, StageExecutionError};
use crate::logging::{log_job_operation, log_pipeline_operation};
use crate::orchestration::job::Job;
use crate::orchestration::pipeline::Pipeline;
use crate::orchestration::queue::PipelineQueue;
use crate::orchestration::result::{PipelineOutcome, PipelineStatus, RunResult};
use crate::orchestration::retry::{AttemptCounter, RetryPolicy};
use crate::orchestration::traits::StageExecutor;
use chrono::Utc;
use futures::future::join_all;
use futures::FutureExt;
use parking_lot::Mutex;
use std::any::Any;
use std::num::NonZeroUsize;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Stops pipeline intake for a running pool.
///
/// In-flight pipelines run to completion; pipelines still queued stay there and are
/// reported as undispatched. A stop applies to every later run of the pool until
/// [`IntakeHandle::resume`] is called, so intake can also be stopped before a run starts.
#[derive(Debug, Clone, Default)]
pub struct IntakeHandle {
    stopped: Arc<AtomicBool>,
}

impl IntakeHandle {
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// Allow the next run to dispatch pipelines again
    pub fn resume(&self) {
        self.stopped.store(false, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

pub struct WorkerPool {
    worker_count: NonZeroUsize,
    executor: Arc<dyn StageExecutor>,
    retry_policy: RetryPolicy,
    intake: IntakeHandle,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("worker_count", &self.worker_count)
            .field("retry_policy", &self.retry_policy)
            .field("intake_stopped", &self.intake.is_stopped())
            .finish()
    }
}

impl WorkerPool {
    /// Create a pool of `worker_count` workers; zero or less is rejected
    pub fn new(
        worker_count: i64,
        executor: Arc<dyn StageExecutor>,
    ) -> Result<Self, ConstructionError> {
        let worker_count = usize::try_from(worker_count)
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or(ConstructionError::InvalidWorkerCount(worker_count))?;

        Ok(Self {
            worker_count,
            executor,
            retry_policy: RetryPolicy::disabled(),
            intake: IntakeHandle::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count.get()
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    pub fn intake_handle(&self) -> IntakeHandle {
        self.intake.clone()
    }

    /// Drain `queue` with all workers and wait for every one of them to stop.
    ///
    /// Level bookkeeping (`pipelines_per_level`, `level_failures`) is left for the
    /// caller to fill in.
    pub async fn run(&self, queue: Arc<PipelineQueue>) -> RunResult {
        let started_at = Utc::now();
        let total_pipelines = queue.len();
        let jobs_per_pipeline = queue.peek().map_or(0, |head| head.job_count());
        let outcomes = Arc::new(Mutex::new(Vec::with_capacity(total_pipelines)));

        info!(
            workers = self.worker_count.get(),
            pipelines = total_pipelines,
            jobs_per_pipeline = jobs_per_pipeline,
            retries_enabled = self.retry_policy.is_enabled(),
            "🚀 POOL: Starting workers"
        );

        let handles: Vec<_> = (0..self.worker_count.get())
            .map(|worker_id| {
                let worker = Worker {
                    worker_id,
                    executor: Arc::clone(&self.executor),
                    retry_policy: self.retry_policy.clone(),
                    intake: self.intake.clone(),
                };
                let queue = Arc::clone(&queue);
                let outcomes = Arc::clone(&outcomes);
                tokio::spawn(async move { worker.run(queue, outcomes).await })
            })
            .collect();

        let mut panicked_workers = 0;
        for (worker_id, joined) in join_all(handles).await.into_iter().enumerate() {
            if let Err(e) = joined {
                panicked_workers += 1;
                error!(worker_id = worker_id, error = %e, "❌ POOL: Worker terminated abnormally");
            }
        }

        let undispatched_pipelines = queue.len();
        if undispatched_pipelines > 0 {
            warn!(
                undispatched = undispatched_pipelines,
                "🛑 POOL: Intake stopped with pipelines still queued"
            );
        }

        let outcomes = std::mem::take(&mut *outcomes.lock());
        info!(
            completed = outcomes.len(),
            panicked_workers = panicked_workers,
            "✅ POOL: All workers stopped"
        );

        RunResult {
            run_id: Uuid::new_v4(),
            started_at,
            finished_at: Utc::now(),
            total_pipelines,
            jobs_per_pipeline,
            pipelines_per_level: Default::default(),
            outcomes,
            level_failures: Vec::new(),
            undispatched_pipelines,
            panicked_workers,
        }
    }
}

/// One worker task; holds nothing beyond the pipeline it is currently running
struct Worker {
    worker_id: usize,
    executor: Arc<dyn StageExecutor>,
    retry_policy: RetryPolicy,
    intake: IntakeHandle,
}

impl Worker {
    async fn run(self, queue: Arc<PipelineQueue>, outcomes: Arc<Mutex<Vec<PipelineOutcome>>>) {
        let mut processed = 0usize;

        loop {
            if self.intake.is_stopped() {
                info!(worker_id = self.worker_id, "🛑 WORKER: Intake stopped");
                break;
            }
            let Some(pipeline) = queue.dequeue() else {
                break;
            };

            let outcome = self.execute_pipeline(&pipeline).await;
            outcomes.lock().push(outcome);
            processed += 1;
        }

        info!(
            worker_id = self.worker_id,
            pipelines = processed,
            "👋 WORKER: Finished"
        );
    }

    async fn execute_pipeline(&self, pipeline: &Pipeline) -> PipelineOutcome {
        let pipeline_id = pipeline.pipeline_id().to_string();
        let level = pipeline.level().to_string();
        let started = Instant::now();
        let mut retries = 0u32;
        let mut status = PipelineStatus::Succeeded;
        let mut jobs_executed = 0;

        log_pipeline_operation(
            "execute",
            &pipeline_id,
            &level,
            pipeline.batch_index(),
            Some(self.worker_id),
            "started",
            None,
        );

        for job in pipeline.jobs() {
            jobs_executed += 1;
            let (result, job_retries) = self.execute_job(&pipeline_id, job).await;
            retries += job_retries;

            if let Err(error) = result {
                status = PipelineStatus::Failed {
                    stage: job.name().to_string(),
                    error,
                };
                break;
            }
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        match &status {
            PipelineStatus::Succeeded => log_pipeline_operation(
                "execute",
                &pipeline_id,
                &level,
                pipeline.batch_index(),
                Some(self.worker_id),
                "succeeded",
                None,
            ),
            PipelineStatus::Failed { stage, error } => {
                let details = format!("stage {stage}: {error}");
                log_pipeline_operation(
                    "execute",
                    &pipeline_id,
                    &level,
                    pipeline.batch_index(),
                    Some(self.worker_id),
                    "failed",
                    Some(&details),
                );
            }
        }

        PipelineOutcome {
            pipeline_id: pipeline.pipeline_id(),
            level: pipeline.level(),
            batch_index: pipeline.batch_index(),
            building_count: pipeline.building_ids().len(),
            worker_id: self.worker_id,
            jobs_total: pipeline.job_count(),
            jobs_executed,
            retries,
            duration_ms,
            status,
        }
    }

    /// Run one job, retrying per policy; returns the final result and the retry count
    async fn execute_job(
        &self,
        pipeline_id: &str,
        job: &Job,
    ) -> (Result<(), StageExecutionError>, u32) {
        let mut attempts = AttemptCounter::default();

        loop {
            let started = Instant::now();
            let result = self.call_executor(job).await;
            let duration_ms = Some(started.elapsed().as_millis() as u64);

            let error = match result {
                Ok(()) => {
                    log_job_operation(
                        "execute",
                        pipeline_id,
                        job.name(),
                        self.worker_id,
                        "succeeded",
                        duration_ms,
                    );
                    return (Ok(()), attempts.total());
                }
                Err(error) => error,
            };

            log_job_operation(
                "execute",
                pipeline_id,
                job.name(),
                self.worker_id,
                "failed",
                duration_ms,
            );

            match self.retry_policy.next_delay(&error, &mut attempts) {
                Some(delay) => {
                    warn!(
                        worker_id = self.worker_id,
                        pipeline_id = %pipeline_id,
                        stage = %job.name(),
                        attempt = attempts.total(),
                        delay_ms = delay.as_millis() as u64,
                        deadlock = error.is_deadlock(),
                        "🔄 WORKER: Retrying stage"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => return (Err(error), attempts.total()),
            }
        }
    }

    /// A panicking executor is recorded as a failure of the job
    async fn call_executor(&self, job: &Job) -> Result<(), StageExecutionError> {
        match AssertUnwindSafe(self.executor.execute(job))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(payload) => Err(StageExecutionError::new(
                job.name(),
                StageErrorKind::Other,
                format!("stage executor panicked: {}", panic_message(payload.as_ref())),
            )),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
