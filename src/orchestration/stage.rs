//! # Stages and Stage Parameters
//!
//! A [`Stage`] is one named SQL script of the feature extraction chain. The
//! [`StageChain`] is the fixed, ordered list of stages every pipeline of a level runs.
//! [`ParameterBindings`] turns the validated configuration plus one batch into the
//! [`StageParameters`] shared by all jobs of that batch's pipeline.

use crate::batching::{Batch, BuildingId};
use crate::config::{is_sql_identifier, parse_srid, ExtractionConfig};
use crate::constants::{params, LodLevel};
use crate::error::ConstructionError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One named, opaque stage of the extraction chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stage {
    name: String,
    sql_file: PathBuf,
}

impl Stage {
    pub fn new(name: impl Into<String>, sql_file: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            sql_file: sql_file.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sql_file(&self) -> &Path {
        &self.sql_file
    }
}

/// Fixed, ordered, non-empty list of stages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageChain {
    stages: Arc<[Stage]>,
}

impl StageChain {
    pub fn new(stages: Vec<Stage>) -> Result<Self, ConstructionError> {
        if stages.is_empty() {
            return Err(ConstructionError::EmptyStageChain(
                "at least one stage is required".to_string(),
            ));
        }
        Ok(Self {
            stages: stages.into(),
        })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(Stage::name)
    }
}

/// Parameters bound into every stage of one pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageParameters {
    pub building_ids: Arc<[BuildingId]>,
    pub lod_level: LodLevel,
    pub lod_schema: String,
    pub srid: u32,
    pub city2tabula_schema: String,
    pub tabula_schema: String,
    pub public_schema: String,
    pub citydb_schema: String,
    pub citydb_pkg_schema: String,
    pub country: String,
    pub tabula_table: String,
    pub tabula_variant_table: String,
}

impl StageParameters {
    /// Identifier list as a bounded SQL literal set: `(1,2,3)`, or `()` when empty
    pub fn building_ids_literal(&self) -> String {
        let ids: Vec<String> = self.building_ids.iter().map(ToString::to_string).collect();
        format!("({})", ids.join(","))
    }

    /// Every `{placeholder}` name paired with its rendered value
    pub fn template_values(&self) -> Vec<(&'static str, String)> {
        vec![
            (params::BUILDING_IDS, self.building_ids_literal()),
            (params::LOD_SCHEMA, self.lod_schema.clone()),
            (params::SRID, self.srid.to_string()),
            (params::CITY2TABULA_SCHEMA, self.city2tabula_schema.clone()),
            (params::TABULA_SCHEMA, self.tabula_schema.clone()),
            (params::LOD_LEVEL, self.lod_level.as_number().to_string()),
            (params::PUBLIC_SCHEMA, self.public_schema.clone()),
            (params::CITYDB_SCHEMA, self.citydb_schema.clone()),
            (params::CITYDB_PKG_SCHEMA, self.citydb_pkg_schema.clone()),
            (params::COUNTRY, self.country.clone()),
            (params::TABULA_TABLE, self.tabula_table.clone()),
            (params::TABULA_VARIANT_TABLE, self.tabula_variant_table.clone()),
        ]
    }
}

/// Run-wide parameter values, bound per level and batch
#[derive(Debug, Clone)]
pub struct ParameterBindings {
    pub lod2_schema: String,
    pub lod3_schema: String,
    /// `EPSG:25832` or `25832`
    pub srid: String,
    pub city2tabula_schema: String,
    pub tabula_schema: String,
    pub public_schema: String,
    pub citydb_schema: String,
    pub citydb_pkg_schema: String,
    pub country: String,
    pub tabula_table: String,
    pub tabula_variant_table: String,
}

impl ParameterBindings {
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            lod2_schema: config.schemas.lod2.clone(),
            lod3_schema: config.schemas.lod3.clone(),
            srid: config.citydb.srid.clone(),
            city2tabula_schema: config.schemas.city2tabula.clone(),
            tabula_schema: config.schemas.tabula.clone(),
            public_schema: config.schemas.public.clone(),
            citydb_schema: config.schemas.citydb.clone(),
            citydb_pkg_schema: config.schemas.citydb_pkg.clone(),
            country: config.normalized_country(),
            tabula_table: config.tables.tabula.clone(),
            tabula_variant_table: config.tables.tabula_variant.clone(),
        }
    }

    fn lod_schema(&self, level: LodLevel) -> &str {
        match level {
            LodLevel::Lod2 => &self.lod2_schema,
            LodLevel::Lod3 => &self.lod3_schema,
        }
    }

    /// Bind the parameters for one batch, rejecting missing or unsafe values
    pub fn bind(&self, batch: &Batch) -> Result<StageParameters, ConstructionError> {
        let level = batch.level();

        let identifiers = [
            (params::LOD_SCHEMA, self.lod_schema(level)),
            (params::CITY2TABULA_SCHEMA, self.city2tabula_schema.as_str()),
            (params::TABULA_SCHEMA, self.tabula_schema.as_str()),
            (params::PUBLIC_SCHEMA, self.public_schema.as_str()),
            (params::CITYDB_SCHEMA, self.citydb_schema.as_str()),
            (params::CITYDB_PKG_SCHEMA, self.citydb_pkg_schema.as_str()),
            (params::TABULA_TABLE, self.tabula_table.as_str()),
            (params::TABULA_VARIANT_TABLE, self.tabula_variant_table.as_str()),
        ];
        for (parameter, value) in identifiers {
            require_present(level, parameter, value)?;
            if !is_sql_identifier(value) {
                return Err(ConstructionError::InvalidStageParameter {
                    level,
                    parameter: parameter.to_string(),
                    value: value.to_string(),
                    reason: "not a plain SQL identifier".to_string(),
                });
            }
        }

        require_present(level, params::SRID, &self.srid)?;
        let srid = parse_srid(&self.srid).ok_or_else(|| ConstructionError::InvalidStageParameter {
            level,
            parameter: params::SRID.to_string(),
            value: self.srid.clone(),
            reason: "expected EPSG:XXXX or XXXX".to_string(),
        })?;

        require_present(level, params::COUNTRY, &self.country)?;
        if !is_sql_identifier(&self.country) {
            return Err(ConstructionError::InvalidStageParameter {
                level,
                parameter: params::COUNTRY.to_string(),
                value: self.country.clone(),
                reason: "country must normalize to a plain identifier".to_string(),
            });
        }

        Ok(StageParameters {
            building_ids: batch.shared_ids(),
            lod_level: level,
            lod_schema: self.lod_schema(level).to_string(),
            srid,
            city2tabula_schema: self.city2tabula_schema.clone(),
            tabula_schema: self.tabula_schema.clone(),
            public_schema: self.public_schema.clone(),
            citydb_schema: self.citydb_schema.clone(),
            citydb_pkg_schema: self.citydb_pkg_schema.clone(),
            country: self.country.clone(),
            tabula_table: self.tabula_table.clone(),
            tabula_variant_table: self.tabula_variant_table.clone(),
        })
    }
}

fn require_present(level: LodLevel, parameter: &str, value: &str) -> Result<(), ConstructionError> {
    if value.trim().is_empty() {
        return Err(ConstructionError::MissingStageParameter {
            level,
            parameter: parameter.to_string(),
        });
    }
    Ok(())
}
