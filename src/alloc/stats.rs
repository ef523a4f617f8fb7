//! Accounting and fault-injection wrappers around any [`Alloc`].
//!
//! [`Tracking`] counts outstanding bytes and blocks with relaxed atomics;
//! the leak-freedom properties of the pointer primitives are stated in terms
//! of its `live_bytes` reading. [`Quota`] admits a fixed number of
//! allocations and then fails, which is how the out-of-memory paths
//! (including clone-on-write rollback) are exercised.

use core::alloc::Layout;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;

use crate::alloc::allocator::{Alloc, AllocError};
use crate::alloc::global::Global;

/// An allocator wrapper that tracks outstanding memory.
pub struct Tracking<A: Alloc = Global> {
    inner: A,
    live_bytes: AtomicUsize,
    live_blocks: AtomicUsize,
    peak_bytes: AtomicUsize,
    allocations: AtomicUsize,
    deallocations: AtomicUsize,
}

impl Tracking<Global> {
    /// Creates a tracker over the process heap.
    pub fn new() -> Self {
        Self::wrap(Global)
    }
}

impl Default for Tracking<Global> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Alloc> Tracking<A> {
    /// Wraps an existing allocator.
    pub fn wrap(inner: A) -> Self {
        Self {
            inner,
            live_bytes: AtomicUsize::new(0),
            live_blocks: AtomicUsize::new(0),
            peak_bytes: AtomicUsize::new(0),
            allocations: AtomicUsize::new(0),
            deallocations: AtomicUsize::new(0),
        }
    }

    /// Bytes currently allocated and not yet freed.
    pub fn live_bytes(&self) -> usize {
        self.live_bytes.load(Ordering::Relaxed)
    }

    /// Blocks currently allocated and not yet freed.
    pub fn live_blocks(&self) -> usize {
        self.live_blocks.load(Ordering::Relaxed)
    }

    /// Total number of successful allocations so far.
    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::Relaxed)
    }

    /// Snapshot of all counters.
    pub fn stats(&self) -> AllocStats {
        AllocStats {
            live_bytes: self.live_bytes.load(Ordering::Relaxed),
            live_blocks: self.live_blocks.load(Ordering::Relaxed),
            peak_bytes: self.peak_bytes.load(Ordering::Relaxed),
            allocations: self.allocations.load(Ordering::Relaxed),
            deallocations: self.deallocations.load(Ordering::Relaxed),
        }
    }
}

impl<A: Alloc> Alloc for Tracking<A> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        let ptr = self.inner.allocate(layout)?;
        self.allocations.fetch_add(1, Ordering::Relaxed);
        self.live_blocks.fetch_add(1, Ordering::Relaxed);
        let live = self.live_bytes.fetch_add(layout.size(), Ordering::Relaxed) + layout.size();
        self.peak_bytes.fetch_max(live, Ordering::Relaxed);
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.inner.deallocate(ptr, layout);
        self.deallocations.fetch_add(1, Ordering::Relaxed);
        self.live_blocks.fetch_sub(1, Ordering::Relaxed);
        self.live_bytes.fetch_sub(layout.size(), Ordering::Relaxed);
    }
}

/// A point-in-time snapshot of a [`Tracking`] allocator's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AllocStats {
    /// Bytes currently outstanding.
    pub live_bytes: usize,
    /// Blocks currently outstanding.
    pub live_blocks: usize,
    /// High-water mark of outstanding bytes.
    pub peak_bytes: usize,
    /// Total successful allocations.
    pub allocations: usize,
    /// Total deallocations.
    pub deallocations: usize,
}

/// An allocator wrapper that fails after a fixed allocation budget.
///
/// Each `allocate` call consumes one unit of budget; once the budget is
/// exhausted every further call returns [`AllocError`]. Deallocation always
/// passes through.
pub struct Quota<A: Alloc = Global> {
    inner: A,
    remaining: AtomicUsize,
}

impl Quota<Global> {
    /// A budget of `budget` allocations over the process heap.
    pub fn new(budget: usize) -> Self {
        Self::wrap(budget, Global)
    }
}

impl<A: Alloc> Quota<A> {
    /// A budget of `budget` allocations over an existing allocator.
    pub fn wrap(budget: usize, inner: A) -> Self {
        Self {
            inner,
            remaining: AtomicUsize::new(budget),
        }
    }

    /// Allocations still admitted.
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Relaxed)
    }
}

impl<A: Alloc> Alloc for Quota<A> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        self.remaining
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .map_err(|_| AllocError)?;
        self.inner.allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.inner.deallocate(ptr, layout);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracking_counts_live_bytes() {
        let tracker = Tracking::new();
        let layout = Layout::new::<u64>();

        let ptr = tracker.allocate(layout).unwrap();
        assert_eq!(tracker.live_bytes(), 8);
        assert_eq!(tracker.live_blocks(), 1);

        unsafe { tracker.deallocate(ptr, layout) };
        assert_eq!(tracker.live_bytes(), 0);
        assert_eq!(tracker.live_blocks(), 0);
        assert_eq!(tracker.stats().peak_bytes, 8);
    }

    #[test]
    fn quota_exhausts() {
        let quota = Quota::new(1);
        let layout = Layout::new::<u32>();

        let ptr = quota.allocate(layout).unwrap();
        assert_eq!(quota.allocate(layout), Err(AllocError));

        unsafe { quota.deallocate(ptr, layout) };
        // Deallocation does not refill the budget.
        assert_eq!(quota.allocate(layout), Err(AllocError));
    }
}
