use async_trait::async_trait;
use city2tabula::orchestration::{IdentifierSource, Job, StageExecutor};
use city2tabula::{BuildingId, LodLevel, SourcingError, StageErrorKind, StageExecutionError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

/// Identifier source backed by a fixed map; unmapped levels fail to source
#[derive(Debug, Default)]
pub struct InMemorySource {
    levels: HashMap<LodLevel, Result<Vec<BuildingId>, String>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: LodLevel, ids: impl IntoIterator<Item = BuildingId>) -> Self {
        self.levels.insert(level, Ok(ids.into_iter().collect()));
        self
    }

    pub fn with_failing_level(mut self, level: LodLevel, reason: &str) -> Self {
        self.levels.insert(level, Err(reason.to_string()));
        self
    }
}

#[async_trait]
impl IdentifierSource for InMemorySource {
    async fn list(&self, level: LodLevel) -> Result<Vec<BuildingId>, SourcingError> {
        match self.levels.get(&level) {
            Some(Ok(ids)) => Ok(ids.clone()),
            Some(Err(reason)) => Err(SourcingError::new(level, reason.clone())),
            None => Err(SourcingError::new(level, "schema does not exist")),
        }
    }
}

/// One executed job, as seen by the executor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedJob {
    pub level: LodLevel,
    pub first_building: BuildingId,
    pub name: String,
    pub position: usize,
}

type FailureRule = Box<dyn Fn(&Job) -> Option<StageErrorKind> + Send + Sync>;

/// Stage executor that records calls and fails jobs matching its rules.
///
/// Rules are checked in order; a rule with a budget only fires that many times per job,
/// which models transient failures such as deadlocks.
#[derive(Default)]
pub struct ScriptedExecutor {
    executed: Mutex<Vec<ExecutedJob>>,
    rules: Vec<(FailureRule, Option<u32>)>,
    fired: Mutex<HashMap<Uuid, u32>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every matching job
    pub fn fail_when(
        mut self,
        kind: StageErrorKind,
        predicate: impl Fn(&Job) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.rules
            .push((Box::new(move |job| predicate(job).then_some(kind)), None));
        self
    }

    /// Fail each matching job `times` times, then let it succeed
    pub fn fail_times_when(
        mut self,
        kind: StageErrorKind,
        times: u32,
        predicate: impl Fn(&Job) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.rules
            .push((Box::new(move |job| predicate(job).then_some(kind)), Some(times)));
        self
    }

    /// Hold every job for `delay` so pipelines overlap across workers
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn executed(&self) -> Vec<ExecutedJob> {
        self.executed.lock().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Executed jobs grouped by pipeline (level, first building id), in execution order
    pub fn by_pipeline(&self) -> HashMap<(LodLevel, BuildingId), Vec<ExecutedJob>> {
        let mut grouped: HashMap<_, Vec<_>> = HashMap::new();
        for job in self.executed() {
            grouped
                .entry((job.level, job.first_building))
                .or_default()
                .push(job);
        }
        grouped
    }

    fn failure_for(&self, job: &Job) -> Option<StageErrorKind> {
        for (rule, budget) in &self.rules {
            let Some(kind) = rule(job) else { continue };
            match budget {
                None => return Some(kind),
                Some(times) => {
                    let mut fired = self.fired.lock();
                    let count = fired.entry(job.job_id()).or_insert(0);
                    if *count < *times {
                        *count += 1;
                        return Some(kind);
                    }
                }
            }
        }
        None
    }
}

#[async_trait]
impl StageExecutor for ScriptedExecutor {
    async fn execute(&self, job: &Job) -> Result<(), StageExecutionError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        self.executed.lock().push(ExecutedJob {
            level: job.params().lod_level,
            first_building: job.params().building_ids.first().copied().unwrap_or_default(),
            name: job.name().to_string(),
            position: job.position(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let outcome = match self.failure_for(job) {
            None => Ok(()),
            Some(kind) => Err(StageExecutionError::new(
                job.name(),
                kind,
                format!("{kind:?} while running {}", job.name()),
            )),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}
