//! Execution backend interface and a software reference implementation.
//!
//! The execution queue is an external collaborator: it accepts ordered
//! instruction streams and owns actual GPU progress. The tracking subsystem
//! talks to it through [`ExecutionBackend`] and never blocks on execution
//! except through the explicit fence wait.

use parking_lot::{Condvar, Mutex};

use crate::error::Result;
use crate::recorder::Command;

/// Monotonically increasing completion counter for one queue.
///
/// Value 0 means "nothing submitted yet"; the first submission signals 1.
pub type FenceValue = u64;

/// Which hardware queue a recording targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueueKind {
    /// Graphics queue; accepts draws, dispatches, and copies.
    Graphics,
    /// Compute-only queue.
    Compute,
    /// Transfer/copy queue.
    Transfer,
}

/// Interface the submission machinery requires from an execution queue.
///
/// Implementations wrap a real device queue; [`SoftwareBackend`] provides a
/// headless stand-in for tests and tools.
pub trait ExecutionBackend: Send + Sync {
    /// Provision backing storage for a new recording cycle.
    ///
    /// Failure leaves the calling recorder invalid; it is the one
    /// initialization error this subsystem surfaces (driver refusal).
    fn begin_recording(&self, kind: QueueKind) -> Result<()>;

    /// Execute a finished instruction stream.
    ///
    /// Streams arrive in submission order; the order is the ordering
    /// guarantee and must not be reordered by the backend.
    fn execute(&self, kind: QueueKind, commands: &[Command]) -> Result<()>;

    /// Mark everything executed so far as completing at `fence`.
    fn signal(&self, fence: FenceValue);

    /// Block the calling thread until `fence` has completed.
    ///
    /// Callable from any thread; this is the subsystem's only blocking
    /// synchronization point against the GPU.
    fn wait_for_fence_value(&self, fence: FenceValue);

    /// Highest completed fence value.
    fn completed_fence(&self) -> FenceValue;
}

/// CPU-only backend that completes work the moment it is signaled.
///
/// Serves the same role as a headless context in rendering tests: recordings
/// "execute" by being logged, and fences complete immediately on signal, so
/// frame-loop logic can run without a device.
#[derive(Default)]
pub struct SoftwareBackend {
    completed: Mutex<FenceValue>,
    fence_reached: Condvar,
    executed: Mutex<Vec<(QueueKind, Vec<Command>)>>,
}

impl SoftwareBackend {
    /// Create an idle backend with no completed work.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every instruction stream executed so far, in submission order.
    #[must_use]
    pub fn executed_streams(&self) -> Vec<(QueueKind, Vec<Command>)> {
        self.executed.lock().clone()
    }
}

impl ExecutionBackend for SoftwareBackend {
    fn begin_recording(&self, _kind: QueueKind) -> Result<()> {
        Ok(())
    }

    fn execute(&self, kind: QueueKind, commands: &[Command]) -> Result<()> {
        tracing::trace!(?kind, count = commands.len(), "executing stream");
        self.executed.lock().push((kind, commands.to_vec()));
        Ok(())
    }

    fn signal(&self, fence: FenceValue) {
        let mut completed = self.completed.lock();
        if fence > *completed {
            *completed = fence;
            self.fence_reached.notify_all();
        }
    }

    fn wait_for_fence_value(&self, fence: FenceValue) {
        let mut completed = self.completed.lock();
        while *completed < fence {
            self.fence_reached.wait(&mut completed);
        }
    }

    fn completed_fence(&self) -> FenceValue {
        *self.completed.lock()
    }
}

/// Backend that refuses everything, for exercising failure paths in tests.
#[cfg(test)]
pub(crate) struct RefusingBackend;

#[cfg(test)]
impl ExecutionBackend for RefusingBackend {
    fn begin_recording(&self, kind: QueueKind) -> Result<()> {
        Err(crate::error::GpuError::RecorderInit(format!(
            "no {kind:?} queue available"
        )))
    }

    fn execute(&self, _kind: QueueKind, _commands: &[Command]) -> Result<()> {
        Err(crate::error::GpuError::Submission(
            "device removed".to_string(),
        ))
    }

    fn signal(&self, _fence: FenceValue) {}

    fn wait_for_fence_value(&self, _fence: FenceValue) {}

    fn completed_fence(&self) -> FenceValue {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn signal_completes_the_fence() {
        let backend = SoftwareBackend::new();
        assert_eq!(backend.completed_fence(), 0);

        backend.signal(3);
        assert_eq!(backend.completed_fence(), 3);

        // Signals never move backwards.
        backend.signal(1);
        assert_eq!(backend.completed_fence(), 3);
    }

    #[test]
    fn wait_returns_once_fence_is_signaled() {
        let backend = Arc::new(SoftwareBackend::new());

        let waiter = {
            let backend = Arc::clone(&backend);
            std::thread::spawn(move || {
                backend.wait_for_fence_value(2);
                backend.completed_fence()
            })
        };

        backend.signal(1);
        backend.signal(2);
        assert!(waiter.join().unwrap() >= 2);
    }

    #[test]
    fn executed_streams_preserve_order() {
        let backend = SoftwareBackend::new();
        backend
            .execute(QueueKind::Graphics, &[Command::Draw {
                vertex_count: 3,
                instance_count: 1,
            }])
            .unwrap();
        backend.execute(QueueKind::Transfer, &[]).unwrap();

        let streams = backend.executed_streams();
        assert_eq!(streams.len(), 2);
        assert_eq!(streams[0].0, QueueKind::Graphics);
        assert_eq!(streams[1].0, QueueKind::Transfer);
    }
}
