//! Resource usage states and transition records.
//!
//! "Not yet determined" is deliberately not a [`ResourceState`] variant.
//! State vectors store `Option<ResourceState>`, so an unknown entry is
//! structurally distinct from every real GPU state and can never leak into
//! an emitted barrier.

use crate::resource::ResourceHandle;

/// GPU usage category of a resource (or one subresource of it).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceState {
    /// Neutral state usable as a transition hub between queue kinds.
    Common,
    /// Read as a vertex or constant buffer.
    VertexAndConstantBuffer,
    /// Read as an index buffer.
    IndexBuffer,
    /// Written as a color render target.
    RenderTarget,
    /// Written as a depth/stencil target.
    DepthWrite,
    /// Read as a depth/stencil target.
    DepthRead,
    /// Sampled or read from a shader.
    ShaderResource,
    /// Source of a copy operation.
    CopySource,
    /// Destination of a copy operation.
    CopyDest,
    /// Handed to the presentation engine.
    Present,
}

/// Selects which subresources of a resource a transition applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubresourceRange {
    /// Every subresource of the resource.
    All,
    /// A single subresource index.
    Single(u32),
}

impl SubresourceRange {
    /// Returns true if `index` falls inside this range.
    #[inline]
    #[must_use]
    pub const fn covers(self, index: u32) -> bool {
        match self {
            Self::All => true,
            Self::Single(single) => single == index,
        }
    }
}

/// A fully resolved transition record, ready for the instruction stream.
///
/// Construction sites guarantee `before != after`; redundant transitions are
/// elided rather than emitted as no-op barriers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Barrier {
    /// Resource being transitioned.
    pub resource: ResourceHandle,
    /// Subresource index the transition applies to.
    pub subresource: u32,
    /// Usage state the subresource is leaving.
    pub before: ResourceState,
    /// Usage state the subresource is entering.
    pub after: ResourceState,
}

/// A transition whose prior state was unknown at record time.
///
/// Produced on the first touch of a subresource within a recording, where the
/// true prior state belongs to whichever other recording last used the
/// resource. The submission queue patches `before` in from the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingBarrier {
    /// Resource being transitioned.
    pub resource: ResourceHandle,
    /// Subresource index the transition applies to.
    pub subresource: u32,
    /// Usage state the subresource is entering.
    pub after: ResourceState,
    /// Command-stream index at which the transition was requested, so the
    /// resolved barrier can be spliced back in at its program-order position.
    pub position: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_covers_everything() {
        assert!(SubresourceRange::All.covers(0));
        assert!(SubresourceRange::All.covers(17));
    }

    #[test]
    fn single_covers_only_its_index() {
        let range = SubresourceRange::Single(2);
        assert!(range.covers(2));
        assert!(!range.covers(0));
        assert!(!range.covers(3));
    }
}
