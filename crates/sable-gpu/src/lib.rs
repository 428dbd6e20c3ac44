//! Resource-state tracking and barrier scheduling for the Sable renderer.
//!
//! Explicit graphics APIs require every resource to be transitioned between
//! usage states before the GPU may read it in a new way. This crate owns that
//! bookkeeping across independently recorded command streams:
//!
//! - [`ResourcePool`] hands out stable resource handles and subresource counts
//! - [`StateRegistry`] is the process-wide record of last-known states
//! - [`CommandRecorder`] emits barriers eagerly when the prior state is known
//!   within the recording and defers first-touch transitions otherwise
//! - [`SubmissionQueue`] patches deferred barriers against the registry at
//!   submission time and publishes the post-submission truth back to it

pub mod backend;
pub mod deferred;
pub mod error;
pub mod recorder;
pub mod registry;
pub mod resource;
pub mod state;
pub mod submit;

pub use backend::{ExecutionBackend, FenceValue, QueueKind, SoftwareBackend};
pub use deferred::DeferredReleaseQueue;
pub use error::{GpuError, Result};
pub use recorder::{Command, CommandRecorder, RecorderState};
pub use registry::StateRegistry;
pub use resource::{ResourceDesc, ResourceHandle, ResourceKind, ResourcePool};
pub use state::{Barrier, PendingBarrier, ResourceState, SubresourceRange};
pub use submit::SubmissionQueue;
