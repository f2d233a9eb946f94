//! Error types for the City2TABULA orchestration core.
//!
//! Errors are split by where they surface:
//! - [`ConstructionError`] - invalid batch size, worker count, stage chain or parameters;
//!   raised before any worker starts.
//! - [`SourcingError`] - identifier listing failed for one dataset level.
//! - [`StageExecutionError`] - a Job failed; captured per Pipeline and never propagated
//!   past the worker loop.

use crate::config::ConfigurationError;
use crate::constants::LodLevel;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fatal errors raised while splitting batches or building pipelines
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructionError {
    #[error("Invalid batch size {0}: batch size must be a positive integer")]
    InvalidBatchSize(i64),

    #[error("Invalid worker count {0}: worker count must be a positive integer")]
    InvalidWorkerCount(i64),

    #[error("Stage chain is empty: {0}")]
    EmptyStageChain(String),

    #[error("Missing stage parameter '{parameter}' for {level}")]
    MissingStageParameter { level: LodLevel, parameter: String },

    #[error("Invalid stage parameter '{parameter}' = '{value}' for {level}: {reason}")]
    InvalidStageParameter {
        level: LodLevel,
        parameter: String,
        value: String,
        reason: String,
    },
}

/// Identifier listing failed for a dataset level
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Failed to list building identifiers for {level}: {reason}")]
pub struct SourcingError {
    pub level: LodLevel,
    pub reason: String,
}

impl SourcingError {
    pub fn new(level: LodLevel, reason: impl Into<String>) -> Self {
        Self {
            level,
            reason: reason.into(),
        }
    }
}

/// Classification of a stage failure, used by the retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageErrorKind {
    /// The stage's SQL script could not be read
    ScriptRead,
    /// PostgreSQL aborted the transaction to break a deadlock (SQLSTATE 40P01)
    Deadlock,
    /// Any other database-side failure
    Database,
    Other,
}

/// A single Job failed while executing its stage
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Stage '{stage}' failed ({kind:?}): {detail}")]
pub struct StageExecutionError {
    pub stage: String,
    pub kind: StageErrorKind,
    pub detail: String,
}

impl StageExecutionError {
    pub fn new(stage: impl Into<String>, kind: StageErrorKind, detail: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            kind,
            detail: detail.into(),
        }
    }

    pub fn database(stage: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(stage, StageErrorKind::Database, detail)
    }

    pub fn is_deadlock(&self) -> bool {
        self.kind == StageErrorKind::Deadlock
    }
}

/// Top-level error for the orchestration core and its database collaborators
#[derive(Debug, Error)]
pub enum City2TabulaError {
    #[error("Construction error: {0}")]
    Construction(#[from] ConstructionError),

    #[error("Sourcing error: {0}")]
    Sourcing(#[from] SourcingError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for City2TabulaError {
    fn from(err: sqlx::Error) -> Self {
        City2TabulaError::Database(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, City2TabulaError>;
