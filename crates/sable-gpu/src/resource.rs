//! Resource identity and the allocation-layer surface.
//!
//! The tracking subsystem observes resources, it does not own their GPU
//! memory. [`ResourcePool`] is the allocation layer at its interface: it
//! issues stable handles backed by the pooled slot allocator, answers
//! subresource-count queries, and keeps the state registry in sync with
//! resource lifetimes.

use std::sync::Arc;

use sable_core::{PoolHandle, SlotPool};

use crate::registry::StateRegistry;

/// What kind of GPU object a handle refers to.
///
/// The kind fixes the subresource count: buffers have exactly one
/// subresource, textures have one per mip level and array layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    /// Linear memory; a single subresource.
    Buffer,
    /// Image with mip and array dimensions.
    Texture {
        /// Number of mip levels.
        mip_levels: u32,
        /// Number of array layers.
        array_layers: u32,
    },
}

impl ResourceKind {
    /// Number of individually trackable subresources.
    #[must_use]
    pub const fn subresource_count(self) -> u32 {
        match self {
            Self::Buffer => 1,
            Self::Texture {
                mip_levels,
                array_layers,
            } => mip_levels * array_layers,
        }
    }
}

/// Creation description for a tracked resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceDesc {
    /// The kind of resource, which fixes its subresource count.
    pub kind: ResourceKind,
}

impl ResourceDesc {
    /// Describe a buffer.
    #[must_use]
    pub const fn buffer() -> Self {
        Self {
            kind: ResourceKind::Buffer,
        }
    }

    /// Describe a texture with the given mip/array dimensions.
    #[must_use]
    pub const fn texture(mip_levels: u32, array_layers: u32) -> Self {
        Self {
            kind: ResourceKind::Texture {
                mip_levels,
                array_layers,
            },
        }
    }
}

/// Opaque identity of a GPU resource, observed by the tracking subsystem.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ResourceHandle(pub(crate) PoolHandle);

impl ResourceHandle {
    /// Handle that refers to nothing.
    pub const INVALID: Self = Self(PoolHandle::INVALID);

    /// Returns true if this handle is not the invalid sentinel.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0.is_valid()
    }
}

/// Issues and recycles resource handles, and owns their descriptions.
///
/// Destruction purges the state registry before the handle value can be
/// reissued, so a freshly created resource can never inherit a stale prior
/// state. Resources that may still be referenced by in-flight recordings
/// must go through [`DeferredReleaseQueue`](crate::DeferredReleaseQueue)
/// instead of being destroyed directly.
pub struct ResourcePool {
    slots: SlotPool<ResourceDesc>,
    registry: Arc<StateRegistry>,
}

impl ResourcePool {
    /// Create a pool publishing lifetimes into `registry`.
    #[must_use]
    pub fn new(registry: Arc<StateRegistry>) -> Self {
        Self {
            slots: SlotPool::new(),
            registry,
        }
    }

    /// The registry this pool keeps in sync.
    #[must_use]
    pub fn registry(&self) -> &Arc<StateRegistry> {
        &self.registry
    }

    /// Allocate a tracked resource and register its subresource count.
    pub fn create(&self, desc: ResourceDesc) -> ResourceHandle {
        let handle = ResourceHandle(self.slots.push(desc));
        self.registry
            .register(handle, desc.kind.subresource_count());
        tracing::debug!(?handle, kind = ?desc.kind, "created resource");
        handle
    }

    /// Destroy a resource, invalidating the caller's handle.
    ///
    /// The registry entry is purged before the slot index can be reissued,
    /// so a concurrent [`ResourcePool::create`] recycling the same index
    /// always registers after the purge and keeps its fresh entry. Returns
    /// `false` for an invalid or already destroyed handle.
    pub fn destroy(&self, handle: &mut ResourceHandle) -> bool {
        let claimed = *handle;
        if !self.slots.release_with(&mut handle.0, || {
            self.registry.purge(claimed);
        }) {
            return false;
        }
        tracing::debug!(handle = ?claimed, "destroyed resource");
        true
    }

    /// Subresource count of a live resource, `None` for stale handles.
    #[must_use]
    pub fn subresource_count(&self, handle: ResourceHandle) -> Option<u32> {
        self.slots
            .with(handle.0, |desc| desc.kind.subresource_count())
    }

    /// Description of a live resource.
    #[must_use]
    pub fn desc(&self, handle: ResourceHandle) -> Option<ResourceDesc> {
        self.slots.at(handle.0)
    }

    /// Number of live resources.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.slots.live_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> ResourcePool {
        ResourcePool::new(Arc::new(StateRegistry::new()))
    }

    #[test]
    fn buffer_has_one_subresource() {
        let pool = pool();
        let buffer = pool.create(ResourceDesc::buffer());
        assert_eq!(pool.subresource_count(buffer), Some(1));
    }

    #[test]
    fn texture_subresource_count_is_mips_times_layers() {
        let pool = pool();
        let texture = pool.create(ResourceDesc::texture(4, 6));
        assert_eq!(pool.subresource_count(texture), Some(24));
    }

    #[test]
    fn create_registers_with_the_registry() {
        let pool = pool();
        let texture = pool.create(ResourceDesc::texture(3, 1));
        assert_eq!(pool.registry().subresource_count(texture), Some(3));
    }

    #[test]
    fn destroy_purges_the_registry_and_invalidates_the_handle() {
        let pool = pool();
        let mut buffer = pool.create(ResourceDesc::buffer());
        let stale = buffer;

        assert!(pool.destroy(&mut buffer));
        assert!(!buffer.is_valid());
        assert!(!pool.registry().is_tracked(stale));
        assert_eq!(pool.subresource_count(stale), None);

        // Double destroy through a stale copy is a no-op.
        let mut again = stale;
        assert!(!pool.destroy(&mut again));
    }

    #[test]
    fn destroy_racing_create_never_untracks_a_live_resource() {
        let pool = pool();

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for _ in 0..20_000 {
                    let mut handle = pool.create(ResourceDesc::buffer());
                    assert!(pool.destroy(&mut handle));
                }
            });

            // Every handle returned by create must be tracked until this
            // thread destroys it, no matter how the churn thread's destroys
            // interleave with slot recycling.
            for _ in 0..20_000 {
                let mut handle = pool.create(ResourceDesc::texture(2, 1));
                assert!(
                    pool.registry().is_tracked(handle),
                    "live resource lost its registry entry"
                );
                assert_eq!(pool.subresource_count(handle), Some(2));
                assert!(pool.destroy(&mut handle));
            }
        });
    }

    #[test]
    fn recycled_handle_starts_with_fresh_registration() {
        let pool = pool();
        let mut old = pool.create(ResourceDesc::texture(2, 1));
        pool.registry()
            .set_state(old, 0, crate::ResourceState::RenderTarget);
        pool.destroy(&mut old);

        let fresh = pool.create(ResourceDesc::buffer());
        assert_eq!(pool.registry().get_state(fresh, 0), None);
        assert_eq!(pool.registry().subresource_count(fresh), Some(1));
    }
}
