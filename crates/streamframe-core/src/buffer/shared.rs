//! Cloneable handle to a frame shared between a producer and readers.

use super::batch::Batch;
use super::eviction::{EvictionDecision, EvictionWindow};
use super::streaming::{FrameSnapshot, StreamingFrame};
use crate::Result;
use parking_lot::RwLock;
use std::sync::Arc;

/// A [`StreamingFrame`] behind a read-write lock.
///
/// Pushes take the write lock for their whole duration, so readers never
/// observe a partially applied batch.
#[derive(Debug, Clone)]
pub struct SharedFrame {
    inner: Arc<RwLock<StreamingFrame>>,
}

impl SharedFrame {
    pub fn new(frame: StreamingFrame) -> Self {
        Self {
            inner: Arc::new(RwLock::new(frame)),
        }
    }

    /// Apply a batch under the write lock.
    pub fn push(&self, batch: Batch) -> Result<()> {
        self.inner.write().push(batch)
    }

    /// Replace the eviction window under the write lock.
    pub fn resize(&self, window: EvictionWindow) -> Result<EvictionDecision> {
        self.inner.write().resize(window)
    }

    /// Run `f` against the frame under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&StreamingFrame) -> R) -> R {
        f(&self.inner.read())
    }

    pub fn snapshot(&self) -> FrameSnapshot {
        self.inner.read().snapshot()
    }

    pub fn length(&self) -> usize {
        self.inner.read().length()
    }
}

impl From<StreamingFrame> for SharedFrame {
    fn from(frame: StreamingFrame) -> Self {
        Self::new(frame)
    }
}
