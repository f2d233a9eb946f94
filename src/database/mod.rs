//! # Database Operations
//!
//! PostgreSQL implementations of the orchestration collaborators.
//!
//! ## Key Components
//!
//! - [`connection`] - connection pool sized from configuration
//! - [`identifier_source`] - lists building ids per level from a CityDB schema
//! - [`stage_executor`] - executes rendered stage scripts
//! - [`sql_scripts`] - discovers the ordered stage scripts on disk
//! - [`sql_template`] - `{placeholder}` rendering

pub mod connection;
pub mod identifier_source;
pub mod sql_scripts;
pub mod sql_template;
pub mod stage_executor;

pub use connection::DatabaseConnection;
pub use identifier_source::CityDbIdentifierSource;
pub use sql_scripts::SqlScriptCatalog;
pub use stage_executor::SqlStageExecutor;
