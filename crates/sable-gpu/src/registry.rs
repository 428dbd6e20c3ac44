//! Process-wide registry of last-known resource states.
//!
//! The registry is the authoritative record of each tracked subresource's
//! state as of the most recent submission. Any recording thread may read it;
//! only the submission queue writes states, after recording order has been
//! fixed. A single coarse mutex is sufficient because every operation is a
//! short map access that never waits on GPU completion.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::resource::ResourceHandle;
use crate::state::ResourceState;

/// Shared mapping from resource handle to per-subresource states.
///
/// An entry of `None` means the subresource has never been observed since
/// the resource was created, so there is no prior usage to transition from.
#[derive(Default)]
pub struct StateRegistry {
    states: Mutex<HashMap<ResourceHandle, Vec<Option<ResourceState>>>>,
}

impl StateRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `resource` with `subresource_count` unknown entries.
    ///
    /// Called by the allocation layer at creation time; the count is cached
    /// here so state queries never go back to the allocator. Re-registering
    /// a handle resets it to all-unknown.
    pub fn register(&self, resource: ResourceHandle, subresource_count: u32) {
        if !resource.is_valid() {
            return;
        }
        self.states
            .lock()
            .insert(resource, vec![None; subresource_count as usize]);
    }

    /// Last-known state of one subresource.
    ///
    /// `None` means never observed, purged, or out of range; in every case
    /// there is no prior state a barrier could name.
    #[must_use]
    pub fn get_state(&self, resource: ResourceHandle, subresource: u32) -> Option<ResourceState> {
        let states = self.states.lock();
        *states.get(&resource)?.get(subresource as usize)?
    }

    /// Publish the state of one subresource. Idempotent overwrite.
    ///
    /// Writes to untracked handles or out-of-range indices are dropped; a
    /// purged resource must not resurrect a registry entry.
    pub fn set_state(&self, resource: ResourceHandle, subresource: u32, state: ResourceState) {
        let mut states = self.states.lock();
        match states
            .get_mut(&resource)
            .and_then(|vector| vector.get_mut(subresource as usize))
        {
            Some(entry) => *entry = Some(state),
            None => {
                tracing::warn!(?resource, subresource, "state write to untracked subresource dropped");
            }
        }
    }

    /// Cached subresource count, `None` for untracked handles.
    #[must_use]
    pub fn subresource_count(&self, resource: ResourceHandle) -> Option<u32> {
        let states = self.states.lock();
        states.get(&resource).map(|vector| vector.len() as u32)
    }

    /// Returns true if the handle currently has a registry entry.
    #[must_use]
    pub fn is_tracked(&self, resource: ResourceHandle) -> bool {
        self.states.lock().contains_key(&resource)
    }

    /// Drop every entry for a destroyed resource.
    ///
    /// Must run before the handle value can be reissued, otherwise a fresh
    /// resource would inherit the dead one's states and recorders would skip
    /// obligatory barriers. Returns `false` if nothing was tracked.
    pub fn purge(&self, resource: ResourceHandle) -> bool {
        self.states.lock().remove(&resource).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ResourceDesc, ResourcePool};
    use crate::state::ResourceState;
    use std::sync::Arc;

    fn tracked_resource(subresources: u32) -> (Arc<StateRegistry>, ResourceHandle) {
        let registry = Arc::new(StateRegistry::new());
        let pool = ResourcePool::new(Arc::clone(&registry));
        let handle = pool.create(ResourceDesc::texture(subresources, 1));
        (registry, handle)
    }

    #[test]
    fn unobserved_subresource_has_no_state() {
        let (registry, texture) = tracked_resource(2);
        assert_eq!(registry.get_state(texture, 0), None);
        assert_eq!(registry.get_state(texture, 1), None);
    }

    #[test]
    fn set_then_get_round_trips() {
        let (registry, texture) = tracked_resource(2);
        registry.set_state(texture, 1, ResourceState::CopyDest);
        assert_eq!(registry.get_state(texture, 1), Some(ResourceState::CopyDest));
        assert_eq!(registry.get_state(texture, 0), None);

        // Overwrite is idempotent.
        registry.set_state(texture, 1, ResourceState::CopyDest);
        registry.set_state(texture, 1, ResourceState::ShaderResource);
        assert_eq!(
            registry.get_state(texture, 1),
            Some(ResourceState::ShaderResource)
        );
    }

    #[test]
    fn writes_to_untracked_handles_are_dropped() {
        let registry = StateRegistry::new();
        registry.set_state(ResourceHandle::INVALID, 0, ResourceState::Common);
        assert_eq!(registry.get_state(ResourceHandle::INVALID, 0), None);
    }

    #[test]
    fn out_of_range_subresource_is_dropped() {
        let (registry, texture) = tracked_resource(2);
        registry.set_state(texture, 5, ResourceState::Present);
        assert_eq!(registry.get_state(texture, 5), None);
        assert_eq!(registry.subresource_count(texture), Some(2));
    }

    #[test]
    fn purge_removes_every_entry() {
        let (registry, texture) = tracked_resource(3);
        registry.set_state(texture, 0, ResourceState::RenderTarget);
        registry.set_state(texture, 2, ResourceState::DepthWrite);

        assert!(registry.purge(texture));
        assert!(!registry.is_tracked(texture));
        assert_eq!(registry.get_state(texture, 0), None);
        assert!(!registry.purge(texture));
    }
}
