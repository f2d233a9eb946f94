//! Discovery of the ordered feature extraction scripts.
//!
//! Every `*.sql` file of the main scripts directory is one stage. File names carry a
//! numeric prefix (`01_`, `02_`, ...) so lexicographic order is execution order.

use crate::error::ConstructionError;
use crate::orchestration::stage::{Stage, StageChain};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SqlScriptCatalog {
    chain: StageChain,
}

impl SqlScriptCatalog {
    /// Scan `directory`; a missing, unreadable or script-less directory is rejected
    pub fn load(directory: impl AsRef<Path>) -> Result<Self, ConstructionError> {
        let directory = directory.as_ref().to_path_buf();
        let entries = std::fs::read_dir(&directory).map_err(|e| {
            ConstructionError::EmptyStageChain(format!(
                "cannot read SQL script directory {}: {e}",
                directory.display()
            ))
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "sql"))
            .collect();
        files.sort();

        let stages = files
            .into_iter()
            .filter_map(|path| {
                let name = path.file_name()?.to_string_lossy().into_owned();
                Some(Stage::new(name, path))
            })
            .collect::<Vec<_>>();

        if stages.is_empty() {
            return Err(ConstructionError::EmptyStageChain(format!(
                "no .sql scripts found in {}",
                directory.display()
            )));
        }

        debug!(
            directory = %directory.display(),
            stages = stages.len(),
            "📜 SQL: Stage scripts discovered"
        );

        Ok(Self {
            chain: StageChain::new(stages)?,
        })
    }

    pub fn chain(&self) -> &StageChain {
        &self.chain
    }

    pub fn into_chain(self) -> StageChain {
        self.chain
    }
}
