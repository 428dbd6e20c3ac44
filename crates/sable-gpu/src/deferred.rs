//! Deferred resource release for in-flight recordings.
//!
//! A resource referenced by a submitted recording cannot be destroyed until
//! the GPU is done with it. This queue parks doomed handles together with
//! the fence value current at destruction time and only runs the real
//! destruction (slot reclaim plus registry purge) once the queue fence has
//! passed that point.

use std::collections::VecDeque;

use crate::backend::FenceValue;
use crate::resource::{ResourceHandle, ResourcePool};

/// A resource awaiting destruction.
struct PendingRelease {
    handle: ResourceHandle,
    /// Fence value that must complete before the handle may be destroyed.
    fence_queued: FenceValue,
}

/// FIFO queue of handles waiting for their last fence to complete.
#[derive(Default)]
pub struct DeferredReleaseQueue {
    pending: VecDeque<PendingRelease>,
}

impl DeferredReleaseQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Park `handle` until `fence` completes.
    ///
    /// `fence` should be the last fence value at which the resource could
    /// still be referenced, typically the most recent submission. The
    /// caller's handle is taken over and invalidated.
    pub fn queue(&mut self, handle: &mut ResourceHandle, fence: FenceValue) {
        let taken = std::mem::take(handle);
        if !taken.is_valid() {
            return;
        }
        self.pending.push_back(PendingRelease {
            handle: taken,
            fence_queued: fence,
        });
    }

    /// Destroy every handle whose fence has completed. Returns the number
    /// released.
    ///
    /// Queue order is FIFO and fence values are non-decreasing, so only the
    /// front can mature.
    pub fn process(&mut self, pool: &ResourcePool, completed: FenceValue) -> usize {
        let mut released = 0;
        while matches!(self.pending.front(), Some(p) if p.fence_queued <= completed) {
            if let Some(mut pending) = self.pending.pop_front() {
                if pool.destroy(&mut pending.handle) {
                    released += 1;
                } else {
                    tracing::warn!("deferred release of already destroyed resource");
                }
            }
        }
        released
    }

    /// Destroy everything immediately, regardless of fence progress.
    ///
    /// For shutdown, after the queue has been drained with a full fence
    /// wait. Returns the number released.
    pub fn flush(&mut self, pool: &ResourcePool) -> usize {
        let mut released = 0;
        while let Some(mut pending) = self.pending.pop_front() {
            if pool.destroy(&mut pending.handle) {
                released += 1;
            }
        }
        released
    }

    /// Number of handles still parked.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
