//! # Pipeline Queue
//!
//! Mutex-guarded FIFO of pipelines. Every mutating operation takes the lock, so
//! concurrent `dequeue` calls never hand the same pipeline to two callers, even while
//! another task is still enqueuing.

use crate::orchestration::pipeline::Pipeline;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;

#[derive(Default)]
pub struct PipelineQueue {
    pipelines: Mutex<VecDeque<Pipeline>>,
}

impl PipelineQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pipeline to the tail
    pub fn enqueue(&self, mut pipeline: Pipeline) {
        pipeline.mark_enqueued();
        self.pipelines.lock().push_back(pipeline);
    }

    /// Append all pipelines under a single lock, preserving their order
    pub fn enqueue_all(&self, pipelines: impl IntoIterator<Item = Pipeline>) {
        let mut queue = self.pipelines.lock();
        for mut pipeline in pipelines {
            pipeline.mark_enqueued();
            queue.push_back(pipeline);
        }
    }

    /// Remove and return the head, or `None` once the queue is drained
    pub fn dequeue(&self) -> Option<Pipeline> {
        self.pipelines.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.pipelines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.lock().is_empty()
    }

    /// Copy of the head without removing it; diagnostics only
    pub fn peek(&self) -> Option<Pipeline> {
        self.pipelines.lock().front().cloned()
    }

    pub fn clear(&self) {
        self.pipelines.lock().clear();
    }
}

impl fmt::Debug for PipelineQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineQueue")
            .field("len", &self.len())
            .finish()
    }
}
