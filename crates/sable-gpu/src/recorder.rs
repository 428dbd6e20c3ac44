//! Command recording with deferred barrier resolution.
//!
//! A recorder assembles one instruction stream per frame on one thread. It
//! keeps a local table of the states it has driven each subresource through;
//! whenever that table makes a transition sound, the barrier is emitted
//! immediately so the recorded stream stays linear and inspectable. Only the
//! unavoidable case is deferred: the first touch of a resource within a
//! recording, where the true prior state belongs to whichever other recording
//! last used it and may not even be submitted yet. Those become
//! [`PendingBarrier`]s, patched in by the submission queue.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use crate::backend::{ExecutionBackend, QueueKind};
use crate::error::Result;
use crate::registry::StateRegistry;
use crate::resource::{ResourceHandle, ResourcePool};
use crate::state::{Barrier, PendingBarrier, ResourceState, SubresourceRange};

/// One instruction in a recorded stream.
///
/// The tracking subsystem only interprets `Transition`; the remaining
/// variants are pass-through work whose placement relative to barriers is
/// what the bookkeeping protects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Explicit resource state transition.
    Transition(Barrier),
    /// Draw call.
    Draw {
        /// Vertices per instance.
        vertex_count: u32,
        /// Number of instances.
        instance_count: u32,
    },
    /// Compute dispatch.
    Dispatch {
        /// Workgroups along x.
        x: u32,
        /// Workgroups along y.
        y: u32,
        /// Workgroups along z.
        z: u32,
    },
    /// Whole-resource copy.
    CopyResource {
        /// Source resource.
        src: ResourceHandle,
        /// Destination resource.
        dst: ResourceHandle,
    },
}

/// Recording lifecycle.
///
/// `Invalid → Valid` on successful init, `Valid → Submitted` at submission,
/// `Submitted → Valid` on reset for the next cycle. Every recording call on
/// an `Invalid` recorder is a defensive no-op, so callers detect a failed
/// init once instead of checking before every call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecorderState {
    /// Not initialized, or initialization failed.
    Invalid,
    /// Accepting commands.
    Valid,
    /// Handed to a submission; terminal for this cycle.
    Submitted,
}

/// Per-thread command recorder with deferred barrier resolution.
///
/// Not internally synchronized: one recorder belongs to one worker thread.
/// The shared collaborators it touches ([`ResourcePool`], [`StateRegistry`])
/// serialize access themselves.
pub struct CommandRecorder {
    state: RecorderState,
    kind: QueueKind,
    resources: Arc<ResourcePool>,
    commands: Vec<Command>,
    local_states: HashMap<ResourceHandle, Vec<Option<ResourceState>>>,
    pending: Vec<PendingBarrier>,
}

impl CommandRecorder {
    /// Create an uninitialized recorder for `kind` work.
    #[must_use]
    pub fn new(resources: Arc<ResourcePool>, kind: QueueKind) -> Self {
        Self {
            state: RecorderState::Invalid,
            kind,
            resources,
            commands: Vec::new(),
            local_states: HashMap::new(),
            pending: Vec::new(),
        }
    }

    /// Initialize against the execution backend.
    ///
    /// On failure the error is returned and the recorder stays invalid;
    /// subsequent recording calls become no-ops rather than panics, so one
    /// failed recording cannot take down a frame loop.
    pub fn init(&mut self, backend: &dyn ExecutionBackend) -> Result<()> {
        backend.begin_recording(self.kind)?;
        self.state = RecorderState::Valid;
        Ok(())
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> RecorderState {
        self.state
    }

    /// Returns true if the recorder is accepting commands.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.state == RecorderState::Valid
    }

    /// Queue kind this recorder targets.
    #[must_use]
    pub fn kind(&self) -> QueueKind {
        self.kind
    }

    /// The instruction stream recorded so far.
    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Deferred barriers awaiting resolution, in program order.
    #[must_use]
    pub fn pending_barriers(&self) -> &[PendingBarrier] {
        &self.pending
    }

    /// Request that `range` of `resource` be usable as `after`.
    ///
    /// Emits an immediate barrier when the local table knows the prior
    /// state, elides the call when the subresource is already in `after`,
    /// and defers everything else to submission time.
    pub fn transition(
        &mut self,
        resource: ResourceHandle,
        after: ResourceState,
        range: SubresourceRange,
    ) {
        if self.state != RecorderState::Valid {
            return;
        }

        match self.local_states.entry(resource) {
            Entry::Occupied(mut occupied) => {
                let position = self.commands.len();
                for (index, local) in occupied.get_mut().iter_mut().enumerate() {
                    let subresource = index as u32;
                    if !range.covers(subresource) {
                        continue;
                    }
                    match *local {
                        // Already there; never emit a no-op barrier.
                        Some(before) if before == after => {}
                        Some(before) => {
                            self.commands.push(Command::Transition(Barrier {
                                resource,
                                subresource,
                                before,
                                after,
                            }));
                            *local = Some(after);
                        }
                        // Inherited placeholder from an earlier partial
                        // touch; still not resolvable locally.
                        None => {
                            self.pending.push(PendingBarrier {
                                resource,
                                subresource,
                                after,
                                position,
                            });
                            *local = Some(after);
                        }
                    }
                }
            }
            Entry::Vacant(vacant) => {
                // First touch within this recording: size the local vector
                // from the allocation layer and defer the covered entries,
                // since the prior state is only known at submission time.
                let Some(count) = self.resources.subresource_count(resource) else {
                    tracing::warn!(?resource, "transition on unknown resource dropped");
                    return;
                };
                let position = self.commands.len();
                let mut locals = vec![None; count as usize];
                for (index, local) in locals.iter_mut().enumerate() {
                    let subresource = index as u32;
                    if range.covers(subresource) {
                        *local = Some(after);
                        self.pending.push(PendingBarrier {
                            resource,
                            subresource,
                            after,
                            position,
                        });
                    }
                }
                vacant.insert(locals);
            }
        }
    }

    /// Record a draw call.
    pub fn draw(&mut self, vertex_count: u32, instance_count: u32) {
        if self.state != RecorderState::Valid {
            return;
        }
        self.commands.push(Command::Draw {
            vertex_count,
            instance_count,
        });
    }

    /// Record a compute dispatch.
    pub fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        if self.state != RecorderState::Valid {
            return;
        }
        self.commands.push(Command::Dispatch { x, y, z });
    }

    /// Record a whole-resource copy.
    ///
    /// The caller is responsible for transitioning `src`/`dst` to the copy
    /// states first; the recorder does not infer barriers from work.
    pub fn copy_resource(&mut self, src: ResourceHandle, dst: ResourceHandle) {
        if self.state != RecorderState::Valid {
            return;
        }
        self.commands.push(Command::CopyResource { src, dst });
    }

    /// Publish final local states into the registry.
    ///
    /// Only sound once this recording's place in the submission order is
    /// fixed, since it overwrites the truth other recordings resolve against.
    pub fn resolve_local_states(&self, registry: &StateRegistry) {
        for (resource, locals) in &self.local_states {
            for (index, local) in locals.iter().enumerate() {
                if let Some(state) = *local {
                    registry.set_state(*resource, index as u32, state);
                }
            }
        }
    }

    /// Drain the deferred barrier list. Each pending barrier is handed out
    /// exactly once.
    pub fn take_pending_barriers(&mut self) -> Vec<PendingBarrier> {
        std::mem::take(&mut self.pending)
    }

    /// Splice resolved barriers into the stream at their recorded positions.
    ///
    /// `resolved` must be ordered by position, which `take_pending_barriers`
    /// guarantees since positions are assigned monotonically.
    pub(crate) fn splice_resolved_barriers(&mut self, resolved: Vec<(usize, Barrier)>) {
        if resolved.is_empty() {
            return;
        }

        let recorded = std::mem::take(&mut self.commands);
        self.commands = Vec::with_capacity(recorded.len() + resolved.len());

        let mut resolved = resolved.into_iter().peekable();
        for (index, command) in recorded.into_iter().enumerate() {
            while let Some((_, barrier)) = resolved.next_if(|(position, _)| *position <= index) {
                self.commands.push(Command::Transition(barrier));
            }
            self.commands.push(command);
        }
        for (_, barrier) in resolved {
            self.commands.push(Command::Transition(barrier));
        }
    }

    /// Mark the recording as handed off to the queue.
    pub(crate) fn mark_submitted(&mut self) {
        self.state = RecorderState::Submitted;
    }

    /// Begin the next recording cycle.
    ///
    /// Clears the instruction stream, the local transition table, and any
    /// undrained pending barriers. No-op on an invalid recorder.
    pub fn reset(&mut self) {
        if self.state == RecorderState::Invalid {
            return;
        }
        self.commands.clear();
        self.local_states.clear();
        self.pending.clear();
        self.state = RecorderState::Valid;
    }
}
