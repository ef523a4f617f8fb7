//! # `moor` - Manual-Memory Pointer Primitives
//!
//! A small toolkit of generic smart-pointer primitives with
//! manual-memory-management ergonomics over an explicit allocator:
//! shared ownership, copy-on-write borrowing, and header+payload
//! co-location in a single allocation.
//!
//! ## Primitives
//!
//! - [`Arc`]: an atomically reference-counted shared pointer. The heap box
//!   carries the strong count, the allocator handle, and the value; the
//!   handle itself is a single pointer. No weak references.
//! - [`Boo`]: a "borrow or own" pointer packing the ownership tag into the
//!   low bit of the pointer word. Borrowed data is never freed; the first
//!   mutable borrow promotes it into freshly owned storage (clone-on-write).
//! - [`BooStr`]: the string-slice form of [`Boo`], carrying pointer and
//!   length directly instead of a pointer-to-slice.
//! - [`Dst`]: a single allocation laid out as a fixed frontmatter record
//!   (length field of configurable width plus an arbitrary header) followed
//!   immediately by a variable-length element array.
//!
//! ## Resource release
//!
//! [`Arc`] and [`Boo`] delegate payload teardown to the [`Managed`]
//! capability, a closed set of structural shapes (primitives, non-owning
//! pointers, [`OwnedPtr`], [`OwnedSlice`], optionals, and user aggregates
//! that opt in). A payload type outside the set fails to compile rather
//! than misbehaving at runtime.
//!
//! ## Allocation
//!
//! Every operation that can allocate is expressed against the [`Alloc`]
//! boundary trait and surfaces out-of-memory as an explicit
//! [`AllocError`] - the one recoverable error in this crate. Ownership
//! contract violations (double drop, use after release) are assertion
//! failures, never silently tolerated.
//!
//! ## Example
//!
//! ```rust
//! use moor::{Arc, Tracking};
//!
//! let tracker = Tracking::new();
//! let shared = Arc::new_in(10u32, &tracker).unwrap();
//! let other = shared.clone();
//!
//! assert_eq!(shared.strong_count(), 2);
//! assert_eq!(*other, 10);
//!
//! drop(shared);
//! drop(other);
//! assert_eq!(tracker.live_bytes(), 0);
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod alloc;
pub mod arc;
pub mod boo;
pub mod dst;
pub mod managed;

pub use alloc::{Alloc, AllocError, AllocStats, Global, Quota, Tracking};
pub use arc::Arc;
pub use boo::{Boo, BooStr};
pub use dst::{Dst, LenWidth};
pub use managed::{Managed, OwnedPtr, OwnedSlice};

// Compile-time layout claims the primitives are built around.
const _: () = {
    use core::mem;

    // Handles stay thin: one pointer word, niche-optimized when optional.
    assert!(mem::size_of::<Arc<u64>>() == mem::size_of::<usize>());
    assert!(mem::size_of::<Option<Arc<u64>>>() == mem::size_of::<usize>());
    assert!(mem::size_of::<Dst<u64, u8>>() == mem::size_of::<usize>());

    // `Boo` is the tagged word plus the allocator handle; with a zero-sized
    // allocator that is exactly one word.
    assert!(mem::size_of::<Boo<'static, u64>>() == mem::size_of::<usize>());

    // The string form trades the stolen bit for an explicit tag field.
    assert!(mem::size_of::<BooStr<'static>>() <= mem::size_of::<usize>() * 3);
};
