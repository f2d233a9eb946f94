//! # Batch Splitter
//!
//! Partitions a level's ordered building identifiers into bounded, order-preserving
//! batches. Each batch becomes the unit of work for exactly one pipeline.
//!
//! Splitting is purely count-based. Buildings that are spatial neighbours can land in
//! different batches, so a stage that reasons about adjacent buildings (party walls)
//! only sees neighbours inside its own batch.

use crate::constants::LodLevel;
use crate::error::ConstructionError;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Opaque building key, scoped to one dataset level
pub type BuildingId = i64;

/// A bounded, ordered, non-empty slice of one level's identifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    level: LodLevel,
    index: usize,
    building_ids: Arc<[BuildingId]>,
}

impl Batch {
    pub fn level(&self) -> LodLevel {
        self.level
    }

    /// Position of this batch within its level, starting at 0
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn building_ids(&self) -> &[BuildingId] {
        &self.building_ids
    }

    pub(crate) fn shared_ids(&self) -> Arc<[BuildingId]> {
        Arc::clone(&self.building_ids)
    }

    pub fn len(&self) -> usize {
        self.building_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.building_ids.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BatchSplitter {
    max_batch_size: NonZeroUsize,
}

impl BatchSplitter {
    /// Create a splitter; a batch size of zero or less is rejected
    pub fn new(max_batch_size: i64) -> Result<Self, ConstructionError> {
        usize::try_from(max_batch_size)
            .ok()
            .and_then(NonZeroUsize::new)
            .map(|max_batch_size| Self { max_batch_size })
            .ok_or(ConstructionError::InvalidBatchSize(max_batch_size))
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size.get()
    }

    /// Number of batches `split` will produce for `count` identifiers
    pub fn batch_count(&self, count: usize) -> usize {
        count.div_ceil(self.max_batch_size.get())
    }

    /// Split `ids` into batches of at most `max_batch_size`, all but the last full.
    ///
    /// Empty input yields no batches. Every batch owns a copy of its identifiers, so
    /// batches are independent of the input and of each other.
    pub fn split(&self, level: LodLevel, ids: &[BuildingId]) -> Vec<Batch> {
        ids.chunks(self.max_batch_size.get())
            .enumerate()
            .map(|(index, chunk)| Batch {
                level,
                index,
                building_ids: Arc::from(chunk),
            })
            .collect()
    }
}
