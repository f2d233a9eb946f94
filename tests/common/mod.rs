#![allow(dead_code)]

pub mod mock_collaborators;
pub mod strategies;

pub use mock_collaborators::*;
pub use strategies::*;

use city2tabula::orchestration::{Stage, StageChain};
use city2tabula::ExtractionConfig;

/// Valid configuration for the given batch size and worker count
pub fn test_config(batch_size: i64, workers: i64) -> ExtractionConfig {
    let mut config = ExtractionConfig::default();
    config.country = "germany".to_string();
    config.citydb.srid = "EPSG:25832".to_string();
    config.citydb.srs_name = "urn:ogc:def:crs:EPSG::25832".to_string();
    config.batch.size = batch_size;
    config.batch.workers = workers;
    config.database.max_connections = workers.max(1) as u32;
    config
}

/// Stage chain mirroring the shape of the main extraction scripts
pub fn stage_chain(names: &[&str]) -> StageChain {
    let stages = names
        .iter()
        .map(|name| Stage::new(*name, format!("sql/scripts/main/{name}")))
        .collect();
    StageChain::new(stages).expect("non-empty stage chain")
}

pub fn default_chain() -> StageChain {
    stage_chain(&[
        "01_decompose_surfaces.sql",
        "02_roof_features.sql",
        "03_wall_features.sql",
        "04_tabula_match.sql",
    ])
}
