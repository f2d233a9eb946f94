//! # System Constants
//!
//! Dataset levels, default schema/table names and the placeholder names understood by
//! the stage SQL templates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dataset level (CityGML level of detail) a building identifier belongs to.
///
/// The derived ordering is the order pipelines are queued and reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum LodLevel {
    Lod2,
    Lod3,
}

impl LodLevel {
    pub const ALL: [LodLevel; 2] = [LodLevel::Lod2, LodLevel::Lod3];

    pub fn as_number(self) -> u8 {
        match self {
            LodLevel::Lod2 => 2,
            LodLevel::Lod3 => 3,
        }
    }

    /// Label used as the job name prefix, e.g. `LOD2 01_decompose.sql`
    pub fn label(self) -> &'static str {
        match self {
            LodLevel::Lod2 => "LOD2",
            LodLevel::Lod3 => "LOD3",
        }
    }
}

impl fmt::Display for LodLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl TryFrom<u8> for LodLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(LodLevel::Lod2),
            3 => Ok(LodLevel::Lod3),
            other => Err(format!("unsupported LOD level {other} (expected 2 or 3)")),
        }
    }
}

impl From<LodLevel> for u8 {
    fn from(level: LodLevel) -> Self {
        level.as_number()
    }
}

/// Default schema names
pub mod schemas {
    pub const PUBLIC: &str = "public";
    pub const CITYDB: &str = "citydb";
    pub const CITYDB_PKG: &str = "citydb_pkg";
    pub const LOD2: &str = "lod2";
    pub const LOD3: &str = "lod3";
    pub const TABULA: &str = "tabula";
    pub const CITY2TABULA: &str = "city2tabula";
}

/// Default table names
pub mod tables {
    pub const TABULA: &str = "tabula";
    pub const TABULA_VARIANT: &str = "tabula_variant";
}

/// Placeholder names substituted into stage SQL as `{name}`
pub mod params {
    pub const BUILDING_IDS: &str = "building_ids";
    pub const LOD_SCHEMA: &str = "lod_schema";
    pub const SRID: &str = "srid";
    pub const CITY2TABULA_SCHEMA: &str = "city2tabula_schema";
    pub const TABULA_SCHEMA: &str = "tabula_schema";
    pub const LOD_LEVEL: &str = "lod_level";
    pub const PUBLIC_SCHEMA: &str = "public_schema";
    pub const CITYDB_SCHEMA: &str = "citydb_schema";
    pub const CITYDB_PKG_SCHEMA: &str = "citydb_pkg_schema";
    pub const COUNTRY: &str = "country";
    pub const TABULA_TABLE: &str = "tabula_table";
    pub const TABULA_VARIANT_TABLE: &str = "tabula_variant_table";
}

/// CityDB object class id range covering building features
pub const BUILDING_OBJECTCLASS_RANGE: (i32, i32) = (900, 999);

/// Default main feature extraction script directory
pub const DEFAULT_MAIN_SCRIPTS_DIR: &str = "sql/scripts/main";

/// PostgreSQL SQLSTATE for `deadlock_detected`
pub const SQLSTATE_DEADLOCK: &str = "40P01";
