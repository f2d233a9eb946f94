//! External collaborators of the orchestration core.
//!
//! The core only sequences and dispatches; listing identifiers and running a stage's
//! SQL are delegated to these traits. [`crate::database`] provides the PostgreSQL
//! implementations.

use crate::batching::BuildingId;
use crate::constants::LodLevel;
use crate::error::{SourcingError, StageExecutionError};
use crate::orchestration::job::Job;
use async_trait::async_trait;

/// Returns the full ordered identifier set of a dataset level.
///
/// An empty list is a valid outcome, not an error.
#[async_trait]
pub trait IdentifierSource: Send + Sync {
    async fn list(&self, level: LodLevel) -> Result<Vec<BuildingId>, SourcingError>;
}

/// Executes one job's stage with its bound parameters
#[async_trait]
pub trait StageExecutor: Send + Sync {
    async fn execute(&self, job: &Job) -> Result<(), StageExecutionError>;
}
