//! Runs stage scripts against PostgreSQL.

use crate::constants::SQLSTATE_DEADLOCK;
use crate::database::sql_template::render_stage;
use crate::error::{StageErrorKind, StageExecutionError};
use crate::orchestration::job::Job;
use crate::orchestration::traits::StageExecutor;
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::trace;

/// Reads a job's script, renders its parameters and executes it as one
/// multi-statement batch on a pooled connection.
#[derive(Debug, Clone)]
pub struct SqlStageExecutor {
    pool: PgPool,
}

impl SqlStageExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StageExecutor for SqlStageExecutor {
    async fn execute(&self, job: &Job) -> Result<(), StageExecutionError> {
        let path = job.stage().sql_file();
        let template = tokio::fs::read_to_string(path).await.map_err(|e| {
            StageExecutionError::new(
                job.name(),
                StageErrorKind::ScriptRead,
                format!("failed to read {}: {e}", path.display()),
            )
        })?;

        let sql = render_stage(&template, job.params());
        trace!(stage = %job.name(), bytes = sql.len(), "🔧 EXECUTOR: Running stage script");

        sqlx::raw_sql(&sql)
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| classify(job.name(), &e))
    }
}

/// Map a database error to a stage error, flagging deadlocks
pub fn classify(stage: &str, error: &sqlx::Error) -> StageExecutionError {
    let code_is_deadlock = error
        .as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == SQLSTATE_DEADLOCK);

    let kind = if code_is_deadlock || is_deadlock_message(&error.to_string()) {
        StageErrorKind::Deadlock
    } else {
        StageErrorKind::Database
    };

    StageExecutionError::new(stage, kind, error.to_string())
}

fn is_deadlock_message(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("deadlock detected") || message.contains("sqlstate 40p01")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadlock_message_detection() {
        assert!(is_deadlock_message("ERROR: deadlock detected"));
        assert!(is_deadlock_message("error returned from database (SQLSTATE 40P01)"));
        assert!(!is_deadlock_message("relation \"lod2.feature\" does not exist"));
    }

    #[test]
    fn test_non_database_error_is_database_kind() {
        let error = classify("LOD2 01_decompose.sql", &sqlx::Error::PoolTimedOut);
        assert_eq!(error.kind, StageErrorKind::Database);
        assert_eq!(error.stage, "LOD2 01_decompose.sql");
    }
}
