#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # City2TABULA
//!
//! Orchestration core for extracting geometric building features from CityDB datasets
//! and matching them against the TABULA building typology.
//!
//! ## Overview
//!
//! A run takes every building identifier of each configured level of detail, splits
//! the identifiers into bounded batches and runs a fixed, ordered chain of SQL stages
//! over every batch. Batches are processed in parallel by a fixed pool of workers;
//! stages within a batch run strictly in order.
//!
//! ## Module Organization
//!
//! - [`batching`] - order-preserving batch splitting
//! - [`orchestration`] - pipelines, queue, worker pool and run reporting
//! - [`database`] - PostgreSQL identifier source and stage executor
//! - [`config`] - layered YAML and environment configuration
//! - [`error`] - structured error handling
//! - [`logging`] - `tracing` subscriber setup and structured log helpers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use city2tabula::config::ConfigManager;
//! use city2tabula::database::{
//!     CityDbIdentifierSource, DatabaseConnection, SqlScriptCatalog, SqlStageExecutor,
//! };
//! use city2tabula::orchestration::FeatureExtractionOrchestrator;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let config = manager.config();
//!
//! let connection = DatabaseConnection::connect(&config.database).await?;
//! let chain = SqlScriptCatalog::load(&config.sql.main_scripts_dir)?.into_chain();
//! let source = Arc::new(CityDbIdentifierSource::new(
//!     connection.pool().clone(),
//!     config.schemas.clone(),
//! ));
//! let executor = Arc::new(SqlStageExecutor::new(connection.pool().clone()));
//!
//! let orchestrator = FeatureExtractionOrchestrator::new(config, chain, source, executor)?;
//! let result = orchestrator.run().await?;
//! result.log_summary();
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! Unit and integration tests use in-memory identifier sources and stage executors,
//! so no database is required:
//!
//! ```bash
//! cargo test
//! ```

pub mod batching;
pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod logging;
pub mod orchestration;

pub use batching::{Batch, BatchSplitter, BuildingId};
pub use config::{ConfigManager, ExtractionConfig};
pub use constants::LodLevel;
pub use error::{
    City2TabulaError, ConstructionError, Result, SourcingError, StageErrorKind,
    StageExecutionError,
};
pub use orchestration::{
    FeatureExtractionOrchestrator, IdentifierSource, PipelineBuilder, PipelineQueue, RunResult,
    StageExecutor, WorkerPool,
};
