//! Thread-safe pooled slot allocator.
//!
//! Hands out stable integer handles for owned values. Released slots are
//! recycled in FIFO order, so the oldest freed index is reused before the
//! pool grows. A single coarse mutex guards the slot array and the free
//! queue together; pool operations are short and never block on external
//! work, so per-slot locking does not pay for itself here.

use std::collections::VecDeque;

use parking_lot::Mutex;

/// Stable index into a [`SlotPool`].
///
/// A released handle is overwritten with [`PoolHandle::INVALID`], so a stale
/// copy held by the releasing caller cannot silently alias a recycled slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PoolHandle(usize);

impl PoolHandle {
    /// Sentinel for a handle that refers to nothing.
    pub const INVALID: Self = Self(usize::MAX);

    /// Returns true if this handle is not the invalid sentinel.
    ///
    /// A valid-looking handle may still refer to a released slot; lookups
    /// report that as absence.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != usize::MAX
    }

    /// Raw slot index. Only meaningful for valid handles.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl Default for PoolHandle {
    fn default() -> Self {
        Self::INVALID
    }
}

struct PoolInner<T> {
    slots: Vec<Option<T>>,
    free: VecDeque<usize>,
}

/// Thread-safe pool issuing reusable slot handles for owned values.
///
/// The pool never physically shrinks; released slots are parked on a free
/// queue and handed out again by [`SlotPool::push`].
pub struct SlotPool<T> {
    inner: Mutex<PoolInner<T>>,
}

impl<T> SlotPool<T> {
    /// Create an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(PoolInner {
                slots: Vec::new(),
                free: VecDeque::new(),
            }),
        }
    }

    /// Create an empty pool with room for `capacity` slots before reallocating.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(PoolInner {
                slots: Vec::with_capacity(capacity),
                free: VecDeque::new(),
            }),
        }
    }

    /// Store a value and return a stable handle to it.
    ///
    /// Reuses the oldest freed slot before growing the pool. Amortized O(1).
    pub fn push(&self, value: T) -> PoolHandle {
        let mut inner = self.inner.lock();

        if let Some(index) = inner.free.pop_front() {
            inner.slots[index] = Some(value);
            return PoolHandle(index);
        }

        inner.slots.push(Some(value));
        PoolHandle(inner.slots.len() - 1)
    }

    /// Release the slot behind `handle` and invalidate the handle.
    ///
    /// The caller's handle is overwritten with [`PoolHandle::INVALID`]
    /// unconditionally. Returns `false` without touching the pool if the
    /// handle was invalid, out of range, or already released; a slot enters
    /// the free queue at most once.
    pub fn release(&self, handle: &mut PoolHandle) -> bool {
        self.release_with(handle, || {})
    }

    /// Release the slot behind `handle`, running `f` before the slot index
    /// can be reissued.
    ///
    /// `f` runs under the pool lock with the value already removed, so a
    /// concurrent [`SlotPool::push`] cannot hand the same index out again
    /// until `f` has returned. `f` is not called when the release fails.
    /// Semantics otherwise match [`SlotPool::release`]; keep `f` short.
    pub fn release_with(&self, handle: &mut PoolHandle, f: impl FnOnce()) -> bool {
        let taken = std::mem::replace(handle, PoolHandle::INVALID);
        if !taken.is_valid() {
            return false;
        }

        let mut inner = self.inner.lock();
        let index = taken.index();

        if index >= inner.slots.len() {
            return false;
        }
        if inner.slots[index].is_none() {
            return false;
        }

        inner.slots[index] = None;
        f();
        inner.free.push_back(index);
        true
    }

    /// Look up the value stored at `handle`.
    ///
    /// Returns `None` for invalid, out-of-range, or released handles.
    /// Absence is a normal outcome under concurrent producer/consumer use,
    /// not an error.
    #[must_use]
    pub fn at(&self, handle: PoolHandle) -> Option<T>
    where
        T: Clone,
    {
        self.with(handle, T::clone)
    }

    /// Run `f` against the value stored at `handle`, if present.
    ///
    /// The pool lock is held for the duration of `f`; keep it short.
    pub fn with<R>(&self, handle: PoolHandle, f: impl FnOnce(&T) -> R) -> Option<R> {
        if !handle.is_valid() {
            return None;
        }

        let inner = self.inner.lock();
        inner.slots.get(handle.index())?.as_ref().map(f)
    }

    /// Number of slots currently holding a value.
    #[must_use]
    pub fn live_count(&self) -> usize {
        let inner = self.inner.lock();
        inner.slots.len() - inner.free.len()
    }

    /// Total number of slots ever created, live or released.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.inner.lock().slots.len()
    }
}

impl<T> Default for SlotPool<T> {
    fn default() -> Self {
        Self::new()
    }
}
