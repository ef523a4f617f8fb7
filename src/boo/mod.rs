//! `Boo` - a "borrow or own" pointer with clone-on-write promotion.
//!
//! A `Boo` is one machine word plus an allocator handle. The word is a
//! tagged pointer: bit 0 set means the referenced storage is owned by this
//! `Boo` and freed on drop; bit 0 clear means the storage is borrowed and
//! never freed. The all-zero word is the borrowed-null sentinel, which lets
//! nullable payloads represent "absent" with no allocation at all.
//!
//! Stealing the bit requires the payload's alignment to be at least 2 bytes,
//! which is checked at compile time in the constructors. Byte-aligned string
//! data gets its own representation, [`BooStr`].

mod string;

pub use string::BooStr;

use core::fmt;
use core::marker::PhantomData;
use core::mem;
use core::ops::Deref;
use core::ptr::{self, NonNull};

use crate::alloc::{Alloc, AllocError, Global};
use crate::managed::Managed;

const OWNED_BIT: usize = 0b1;

/// A copy-on-write pointer that either borrows caller storage or owns a
/// heap-allocated value.
///
/// Borrowed data is wrapped without copying and never freed; the first
/// [`borrow_mut`](Boo::borrow_mut) on a borrowed instance duplicates the
/// value into freshly owned storage and flips the tag. Owned storage is
/// released through [`Managed`] and freed on drop.
///
/// Not safe to share across threads without external synchronization.
pub struct Boo<'a, T: Managed, A: Alloc = Global> {
    bits: usize,
    alloc: A,
    _marker: PhantomData<(&'a T, *mut T)>,
}

impl<'a, T: Managed, A: Alloc> Boo<'a, T, A> {
    /// Wraps an existing reference without copying. The storage is never
    /// freed by this `Boo`; the allocator is used only if a later mutation
    /// forces promotion.
    pub fn borrowed(value: &'a T, alloc: A) -> Self {
        const {
            assert!(
                mem::align_of::<T>() >= 2,
                "Boo payloads need at least 2-byte alignment; use BooStr for byte data"
            );
        }
        Self {
            bits: ptr::from_ref(value) as usize,
            alloc,
            _marker: PhantomData,
        }
    }

    /// Moves `value` into freshly owned storage.
    ///
    /// # Errors
    /// Returns `AllocError` if allocation fails.
    pub fn new_in(value: T, alloc: A) -> Result<Self, AllocError> {
        const {
            assert!(
                mem::align_of::<T>() >= 2,
                "Boo payloads need at least 2-byte alignment; use BooStr for byte data"
            );
        }
        let cell = alloc.create::<T>()?;
        // SAFETY: `cell` is valid, uninitialized storage for one `T`.
        unsafe { cell.as_ptr().write(value) };
        Ok(Self {
            bits: cell.as_ptr() as usize | OWNED_BIT,
            alloc,
            _marker: PhantomData,
        })
    }

    /// Whether the storage is owned by this `Boo` and freed on drop.
    pub fn is_owned(&self) -> bool {
        self.bits & OWNED_BIT != 0
    }

    /// Whether the storage is borrowed (the null sentinel counts as
    /// borrowed).
    pub fn is_borrowed(&self) -> bool {
        !self.is_owned()
    }

    /// Shared access to the value, valid in both states.
    pub fn borrow(&self) -> &T {
        if self.bits == 0 {
            return T::NULL.expect("null sentinel without a nullable payload");
        }
        // SAFETY: a nonzero word always carries a live pointer - borrowed
        // storage outlives `'a`, owned storage outlives `self`.
        unsafe { &*self.data_ptr() }
    }

    /// Exclusive access to the value, promoting a borrow to ownership
    /// first.
    ///
    /// Already-owned instances return the reference directly. Borrowed
    /// instances duplicate the value via [`Managed::duplicate`] into
    /// freshly owned storage and flip the tag; subsequent calls take the
    /// owned fast path without reallocating.
    ///
    /// # Errors
    /// Returns `AllocError` if promotion fails to allocate; the `Boo` is
    /// left in its original borrowed state with the partial duplicate
    /// rolled back.
    pub fn borrow_mut(&mut self) -> Result<&mut T, AllocError> {
        if self.is_borrowed() {
            let dup = self.borrow().duplicate(&self.alloc)?;
            match self.alloc.create::<T>() {
                Ok(cell) => {
                    // SAFETY: fresh storage for one `T`.
                    unsafe { cell.as_ptr().write(dup) };
                    self.bits = cell.as_ptr() as usize | OWNED_BIT;

                    #[cfg(feature = "tracing")]
                    tracing::trace!("promoted borrowed payload to owned storage");
                }
                Err(err) => {
                    let mut dup = dup;
                    dup.release(&self.alloc);
                    return Err(err);
                }
            }
        }
        // SAFETY: owned at this point; exclusive through `&mut self`.
        Ok(unsafe { &mut *self.data_ptr() })
    }

    /// The allocator this `Boo` promotes and frees with.
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    fn data_ptr(&self) -> *mut T {
        (self.bits & !OWNED_BIT) as *mut T
    }
}

impl<'a, T: Managed, A: Alloc> Boo<'a, Option<T>, A> {
    /// The borrowed-null sentinel: an absent value held with zero
    /// allocation. Dropping it frees nothing.
    pub fn none_in(alloc: A) -> Self {
        const {
            assert!(
                mem::align_of::<Option<T>>() >= 2,
                "Boo payloads need at least 2-byte alignment; use BooStr for byte data"
            );
        }
        Self {
            bits: 0,
            alloc,
            _marker: PhantomData,
        }
    }

    /// Moves an optional value in: `None` becomes the allocation-free
    /// sentinel, `Some` gets owned storage.
    ///
    /// # Errors
    /// Returns `AllocError` if the `Some` case fails to allocate.
    pub fn from_option_in(value: Option<T>, alloc: A) -> Result<Self, AllocError> {
        match value {
            None => Ok(Self::none_in(alloc)),
            some => Self::new_in(some, alloc),
        }
    }
}

impl<'a, T: Managed, A: Alloc> Drop for Boo<'a, T, A> {
    fn drop(&mut self) {
        if self.is_owned() {
            // SAFETY: owned storage came from `create` on this allocator;
            // release resources, run drop glue, then free the cell.
            unsafe {
                let ptr = self.data_ptr();
                (*ptr).release(&self.alloc);
                ptr::drop_in_place(ptr);
                self.alloc.destroy(NonNull::new_unchecked(ptr));
            }
        }
    }
}

impl<'a, T: Managed, A: Alloc> Deref for Boo<'a, T, A> {
    type Target = T;

    fn deref(&self) -> &T {
        self.borrow()
    }
}

impl<'a, T: Managed + fmt::Debug, A: Alloc> fmt::Debug for Boo<'a, T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.borrow(), f)
    }
}
