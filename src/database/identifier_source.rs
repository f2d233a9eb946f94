//! Building identifiers from a CityDB v5 schema.
//!
//! Building object classes are discovered first (CityDB reserves the 900-999 range for
//! the building module), then every feature of those classes is listed in id order.

use crate::batching::BuildingId;
use crate::config::SchemaConfig;
use crate::constants::{LodLevel, BUILDING_OBJECTCLASS_RANGE};
use crate::error::SourcingError;
use crate::orchestration::traits::IdentifierSource;
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct CityDbIdentifierSource {
    pool: PgPool,
    schemas: SchemaConfig,
}

impl CityDbIdentifierSource {
    pub fn new(pool: PgPool, schemas: SchemaConfig) -> Self {
        Self { pool, schemas }
    }

    async fn building_classes(
        &self,
        level: LodLevel,
        schema: &str,
    ) -> Result<Vec<i32>, SourcingError> {
        let (low, high) = BUILDING_OBJECTCLASS_RANGE;
        let query = format!(
            "SELECT DISTINCT objectclass_id FROM {schema}.feature \
             WHERE objectclass_id BETWEEN $1 AND $2 ORDER BY objectclass_id"
        );

        sqlx::query_scalar::<_, i32>(&query)
            .bind(low)
            .bind(high)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                SourcingError::new(level, format!("failed to query building object classes: {e}"))
            })
    }
}

#[async_trait]
impl IdentifierSource for CityDbIdentifierSource {
    async fn list(&self, level: LodLevel) -> Result<Vec<BuildingId>, SourcingError> {
        let schema = self.schemas.lod_schema(level);
        let classes = self.building_classes(level, schema).await?;
        if classes.is_empty() {
            debug!(level = %level, schema = %schema, "🏢 SOURCE: No building object classes");
            return Ok(Vec::new());
        }

        let query = format!(
            "SELECT id FROM {schema}.feature WHERE objectclass_id = ANY($1) ORDER BY id"
        );

        let ids = sqlx::query_scalar::<_, i64>(&query)
            .bind(&classes)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SourcingError::new(level, format!("failed to query building ids: {e}")))?;

        debug!(
            level = %level,
            schema = %schema,
            classes = ?classes,
            buildings = ids.len(),
            "🏢 SOURCE: Building ids listed"
        );
        Ok(ids)
    }
}
