//! Submission ordering and deferred barrier patching.
//!
//! The submission queue is where "unknown" stops being unknown: once the
//! caller fixes the order of a batch, every deferred barrier can be patched
//! from the registry, and every recording's final states become the truth
//! the next batch resolves against. Submissions to one queue serialize on an
//! internal lock held across patch, publish, and execute, so the registry's
//! read-then-write cannot interleave between two batches.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::{ExecutionBackend, FenceValue};
use crate::error::Result;
use crate::recorder::CommandRecorder;
use crate::registry::StateRegistry;
use crate::state::Barrier;

/// Orders recordings for execution and advances the queue fence.
pub struct SubmissionQueue {
    registry: Arc<StateRegistry>,
    backend: Arc<dyn ExecutionBackend>,
    // Fence counter doubles as the queue-level submission lock.
    next_fence: Mutex<FenceValue>,
}

impl SubmissionQueue {
    /// Create a queue publishing into `registry` and executing on `backend`.
    #[must_use]
    pub fn new(registry: Arc<StateRegistry>, backend: Arc<dyn ExecutionBackend>) -> Self {
        Self {
            registry,
            backend,
            next_fence: Mutex::new(0),
        }
    }

    /// Submit `recorders` for execution, in order, and return the fence
    /// value at which this batch completes.
    ///
    /// For each recording in turn: deferred barriers are patched against the
    /// registry (a subresource with no registry entry has no real prior use,
    /// so its barrier degrades to a no-op and is dropped), the resolved
    /// barriers are spliced back at their program-order positions, and the
    /// recording's final states are published. Publishing happens before the
    /// next recording is patched, so recordings later in the batch resolve
    /// against earlier ones' final states. The caller's order is the
    /// ordering guarantee; nothing is reordered here.
    ///
    /// Execution failure is returned as-is and never retried; recovery (for
    /// example device-removal handling) belongs to the frame loop. Invalid
    /// recorders in the batch are skipped.
    pub fn submit(&self, recorders: &mut [&mut CommandRecorder]) -> Result<FenceValue> {
        let mut next_fence = self.next_fence.lock();

        for recorder in recorders.iter_mut() {
            if !recorder.is_valid() {
                tracing::warn!(kind = ?recorder.kind(), "skipping invalid recorder in submission");
                continue;
            }
            let resolved = self.patch_pending_barriers(recorder);
            recorder.splice_resolved_barriers(resolved);
            recorder.resolve_local_states(&self.registry);
        }

        for recorder in recorders.iter_mut() {
            if !recorder.is_valid() {
                continue;
            }
            self.backend.execute(recorder.kind(), recorder.commands())?;
            recorder.mark_submitted();
        }

        *next_fence += 1;
        let fence = *next_fence;
        self.backend.signal(fence);
        tracing::debug!(fence, batch = recorders.len(), "submitted batch");
        Ok(fence)
    }

    /// Drain one recording's deferred barriers and patch their prior states
    /// from the registry. Consumes each pending barrier exactly once.
    fn patch_pending_barriers(&self, recorder: &mut CommandRecorder) -> Vec<(usize, Barrier)> {
        let pending = recorder.take_pending_barriers();
        let mut resolved = Vec::with_capacity(pending.len());

        for barrier in pending {
            match self.registry.get_state(barrier.resource, barrier.subresource) {
                Some(before) if before != barrier.after => {
                    resolved.push((
                        barrier.position,
                        Barrier {
                            resource: barrier.resource,
                            subresource: barrier.subresource,
                            before,
                            after: barrier.after,
                        },
                    ));
                }
                // Already in the target state, or first-ever use with no
                // prior usage to transition from. Either way: no-op.
                Some(_) | None => {
                    tracing::trace!(
                        resource = ?barrier.resource,
                        subresource = barrier.subresource,
                        "deferred barrier degraded to no-op"
                    );
                }
            }
        }

        resolved
    }

    /// Fence value of the most recent submission, 0 if none yet.
    #[must_use]
    pub fn last_submitted_fence(&self) -> FenceValue {
        *self.next_fence.lock()
    }

    /// Highest fence value the backend has completed.
    #[must_use]
    pub fn completed_fence(&self) -> FenceValue {
        self.backend.completed_fence()
    }

    /// Block until the backend completes `fence`. Callable from any thread.
    pub fn wait_for_fence_value(&self, fence: FenceValue) {
        self.backend.wait_for_fence_value(fence);
    }

    /// The registry this queue publishes into.
    #[must_use]
    pub fn registry(&self) -> &Arc<StateRegistry> {
        &self.registry
    }
}
