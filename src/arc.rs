//! `Arc` - an atomically reference-counted shared pointer over an explicit
//! allocator.
//!
//! The heap box holds the strong count, the allocator handle, and the value;
//! the handle is a single pointer. There are no weak references: when the
//! strong count reaches zero the value is released and the box is freed, in
//! that order, exactly once.

use core::alloc::Layout;
use core::fmt;
use core::marker::PhantomData;
use core::ops::Deref;
use core::ptr::{self, NonNull};

#[cfg(loom)]
use loom::sync::atomic::{fence, AtomicU32, Ordering};
#[cfg(not(loom))]
use core::sync::atomic::{fence, AtomicU32, Ordering};

use crate::alloc::{Alloc, AllocError, Global};
use crate::managed::Managed;

// Clones beyond this are treated as a leak or a counter attack; aborting
// keeps the count from ever wrapping past the use-after-free assertion.
const MAX_STRONG: u32 = u32::MAX / 2;

#[repr(C)]
struct ArcInner<T, A> {
    strong: AtomicU32,
    alloc: A,
    value: T,
}

/// An atomically reference-counted shared pointer.
///
/// Cloning increments the strong count without allocating; dropping
/// decrements it, and the handle that takes the count from 1 to 0 releases
/// the value through [`Managed`] and frees the box through the allocator it
/// was built with.
///
/// The payload must be treated as logically immutable while more than one
/// handle exists; [`Arc::get_mut`] is the sanctioned in-place mutation path.
pub struct Arc<T: Managed, A: Alloc = Global> {
    ptr: NonNull<ArcInner<T, A>>,
    _marker: PhantomData<ArcInner<T, A>>,
}

impl<T: Managed> Arc<T, Global> {
    /// Moves `value` into a shared box on the process heap.
    ///
    /// # Errors
    /// Returns `AllocError` if allocation fails.
    pub fn new(value: T) -> Result<Self, AllocError> {
        Self::new_in(value, Global)
    }
}

impl<T: Managed, A: Alloc> Arc<T, A> {
    /// Moves `value` into a shared box allocated from `alloc`.
    ///
    /// The box starts with a strong count of 1 and keeps the allocator
    /// alongside the value for the final release.
    ///
    /// # Errors
    /// Returns `AllocError` if allocation fails.
    pub fn new_in(value: T, alloc: A) -> Result<Self, AllocError> {
        let ptr = alloc.create::<ArcInner<T, A>>()?;
        // SAFETY: `ptr` is valid, uninitialized storage for one inner box.
        unsafe {
            ptr.as_ptr().write(ArcInner {
                strong: AtomicU32::new(1),
                alloc,
                value,
            });
        }
        Ok(Self {
            ptr,
            _marker: PhantomData,
        })
    }

    /// The current strong count.
    ///
    /// A snapshot: under concurrent cloning or dropping it may be stale by
    /// the time the caller looks at it.
    pub fn strong_count(&self) -> u32 {
        self.inner().strong.load(Ordering::Acquire)
    }

    /// Mutable access to the value, only if this is the sole handle.
    ///
    /// Returns `None` whenever the strong count is not exactly 1 at the
    /// moment of the call, since any other handle may be reading
    /// concurrently. The check can still race with a `clone` on another
    /// thread completing just after it; callers needing a stronger guarantee
    /// must synchronize externally.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        if self.inner().strong.load(Ordering::Acquire) == 1 {
            // SAFETY: sole handle, checked above via the release/acquire
            // chain on the counter.
            Some(unsafe { &mut (*self.ptr.as_ptr()).value })
        } else {
            None
        }
    }

    /// Mutable access to the value regardless of the strong count.
    ///
    /// # Safety
    /// With more than one live handle this aliases shared data; the caller
    /// takes on the entire data-race obligation.
    pub unsafe fn get_mut_unchecked(&mut self) -> &mut T {
        &mut (*self.ptr.as_ptr()).value
    }

    /// Whether two handles share the same box.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }

    /// The allocator the box was built with.
    pub fn allocator(&self) -> &A {
        &self.inner().alloc
    }

    fn inner(&self) -> &ArcInner<T, A> {
        // SAFETY: the box is alive as long as any handle is.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T: Managed, A: Alloc> Clone for Arc<T, A> {
    fn clone(&self) -> Self {
        let old = self.inner().strong.fetch_add(1, Ordering::Acquire);
        assert!(old != 0, "Arc cloned after its strong count reached zero");
        if old > MAX_STRONG {
            std::process::abort();
        }
        Self {
            ptr: self.ptr,
            _marker: PhantomData,
        }
    }
}

impl<T: Managed, A: Alloc> Drop for Arc<T, A> {
    fn drop(&mut self) {
        let old = self.inner().strong.fetch_sub(1, Ordering::Release);
        assert!(old != 0, "Arc dropped after its strong count reached zero");
        if old != 1 {
            return;
        }

        // Pairs with the release decrements above: every other handle's use
        // of the value happened-before this teardown.
        fence(Ordering::Acquire);

        #[cfg(feature = "tracing")]
        tracing::trace!(
            bytes = core::mem::size_of::<ArcInner<T, A>>(),
            "strong count reached zero; releasing shared box"
        );

        // SAFETY: this is the last handle. Release the value's resources,
        // move the allocator out, run drop glue on the value, then free the
        // box through the recovered allocator.
        unsafe {
            let inner = self.ptr.as_ptr();
            (*inner).value.release(&(*inner).alloc);
            let alloc = ptr::read(ptr::addr_of!((*inner).alloc));
            ptr::drop_in_place(ptr::addr_of_mut!((*inner).value));
            alloc.deallocate(self.ptr.cast(), Layout::new::<ArcInner<T, A>>());
        }
    }
}

impl<T: Managed, A: Alloc> Deref for Arc<T, A> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner().value
    }
}

impl<T: Managed + fmt::Debug, A: Alloc> fmt::Debug for Arc<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

// SAFETY: sending or sharing a handle exposes `T` on other threads both by
// reference and, via the last drop, by value; the allocator travels with the
// box the same way.
unsafe impl<T: Managed + Send + Sync, A: Alloc + Send + Sync> Send for Arc<T, A> {}
unsafe impl<T: Managed + Send + Sync, A: Alloc + Send + Sync> Sync for Arc<T, A> {}
