//! `Dst` - a fixed header and a variable-length element array in one
//! allocation.
//!
//! The block is laid out as a frontmatter record (a length field of
//! configurable unsigned width, then the header) followed immediately by
//! `len` elements. A zero-length `[T; 0]` field at the end of the
//! frontmatter forces its alignment - and therefore its size - to cover the
//! element type, so the element array begins exactly at
//! `size_of::<Frontmatter>()` with no gap and the whole block is exactly
//! `size_of::<Frontmatter>() + len * size_of::<T>()` bytes.
//!
//! `Dst` does not store its allocator; the caller passes it back to
//! [`destroy`](Dst::destroy), which recomputes the byte length from the
//! stored `len` and frees the block in one call.

use core::alloc::Layout;
use core::mem;
use core::ptr::{self, NonNull};
use core::slice;

use num_traits::{NumCast, PrimInt, ToPrimitive, Unsigned};
use zerocopy::FromZeroes;

use crate::alloc::{Alloc, AllocError};

/// Unsigned primitive integers usable as the stored length field.
pub trait LenWidth: PrimInt + Unsigned {}

impl<L: PrimInt + Unsigned> LenWidth for L {}

#[repr(C)]
struct Frontmatter<L, H, T> {
    len: L,
    header: H,
    // Zero elements, but aligns the frontmatter to the element type so the
    // trailing array starts at `size_of::<Frontmatter>()`.
    _align: [T; 0],
}

/// A single allocation holding a length-prefixed header plus trailing
/// element array.
///
/// `len` is fixed at construction. The handle is one pointer; it is not
/// safe to share across threads without external synchronization.
pub struct Dst<H, T, L: LenWidth = u32> {
    ptr: NonNull<Frontmatter<L, H, T>>,
}

impl<H, T, L: LenWidth> Dst<H, T, L> {
    /// Allocates a block for `len` elements, writing only the length field.
    ///
    /// # Safety
    /// Header and element storage are uninitialized; the caller must write
    /// both (via [`header_mut`](Dst::header_mut) and
    /// [`slice_mut`](Dst::slice_mut)) before any read.
    ///
    /// # Errors
    /// Returns `AllocError` if allocation fails.
    ///
    /// # Panics
    /// Panics if `len` does not fit the configured length width.
    pub unsafe fn new_uninit_in<A: Alloc>(len: usize, alloc: &A) -> Result<Self, AllocError> {
        Ok(Self {
            ptr: Self::allocate_raw(len, alloc)?,
        })
    }

    /// Allocates and fully initializes a block: `header` moves into the
    /// frontmatter and `source` is copied into the trailing array.
    ///
    /// # Errors
    /// Returns `AllocError` if allocation fails.
    ///
    /// # Panics
    /// Panics if `source.len()` does not fit the configured length width.
    pub fn new_in<A: Alloc>(header: H, source: &[T], alloc: &A) -> Result<Self, AllocError>
    where
        T: Copy,
    {
        // SAFETY: every field of the block is written before the handle is
        // returned; no partial state escapes.
        unsafe {
            let ptr = Self::allocate_raw(source.len(), alloc)?;
            ptr::addr_of_mut!((*ptr.as_ptr()).header).write(header);
            ptr::copy_nonoverlapping(source.as_ptr(), Self::elem_base(ptr), source.len());

            #[cfg(feature = "tracing")]
            tracing::trace!(
                len = source.len(),
                bytes = mem::size_of::<Frontmatter<L, H, T>>()
                    + source.len() * mem::size_of::<T>(),
                "allocated header+payload block"
            );

            Ok(Self { ptr })
        }
    }

    /// Allocates a block with the header and all elements zero-filled.
    ///
    /// The `FromZeroes` bounds make the zero pattern a valid value of both
    /// types, so the result is fully initialized.
    ///
    /// # Errors
    /// Returns `AllocError` if allocation fails.
    ///
    /// # Panics
    /// Panics if `len` does not fit the configured length width.
    pub fn new_zeroed_in<A: Alloc>(len: usize, alloc: &A) -> Result<Self, AllocError>
    where
        H: FromZeroes,
        T: FromZeroes,
    {
        // SAFETY: length is written by `allocate_raw`; header and elements
        // are zero-filled, which both types declare valid.
        unsafe {
            let ptr = Self::allocate_raw(len, alloc)?;
            ptr::addr_of_mut!((*ptr.as_ptr()).header).write_bytes(0, 1);
            Self::elem_base(ptr).write_bytes(0, len);
            Ok(Self { ptr })
        }
    }

    /// Number of elements, read from the stored length field.
    pub fn len(&self) -> usize {
        self.stored_len()
            .to_usize()
            .expect("stored length originated from a usize")
    }

    /// Whether the element array is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The length field at its configured width.
    pub fn stored_len(&self) -> L {
        self.frontmatter().len
    }

    /// Shared access to the header.
    pub fn header(&self) -> &H {
        &self.frontmatter().header
    }

    /// Exclusive access to the header.
    pub fn header_mut(&mut self) -> &mut H {
        // SAFETY: the frontmatter is part of the live block; exclusivity
        // comes from `&mut self`.
        unsafe { &mut (*self.ptr.as_ptr()).header }
    }

    /// The element array as a shared slice. A view into the allocation, not
    /// a copy.
    pub fn slice(&self) -> &[T] {
        // SAFETY: the trailing array holds exactly `len` elements.
        unsafe { slice::from_raw_parts(Self::elem_base(self.ptr), self.len()) }
    }

    /// The element array as an exclusive slice.
    pub fn slice_mut(&mut self) -> &mut [T] {
        // SAFETY: as above, plus `&mut self` gives exclusivity.
        unsafe { slice::from_raw_parts_mut(Self::elem_base(self.ptr), self.len()) }
    }

    /// Frees the whole block, recomputing its byte length from the stored
    /// `len`.
    ///
    /// # Safety
    /// `alloc` must be the allocator the block was created with.
    pub unsafe fn destroy<A: Alloc>(self, alloc: &A) {
        let len = self.len();
        let (layout, _) = Self::layout_for(len).expect("layout was valid at construction");

        #[cfg(feature = "tracing")]
        tracing::trace!(len, bytes = layout.size(), "freeing header+payload block");

        alloc.deallocate(self.ptr.cast(), layout);
    }

    fn frontmatter(&self) -> &Frontmatter<L, H, T> {
        // SAFETY: the block is alive as long as the handle is.
        unsafe { self.ptr.as_ref() }
    }

    fn elem_base(ptr: NonNull<Frontmatter<L, H, T>>) -> *mut T {
        // The frontmatter's size is a multiple of the element alignment, so
        // the array starts right behind it.
        unsafe {
            ptr.as_ptr()
                .cast::<u8>()
                .add(mem::size_of::<Frontmatter<L, H, T>>())
                .cast::<T>()
        }
    }

    fn layout_for(len: usize) -> Result<(Layout, usize), AllocError> {
        let bytes = len
            .checked_mul(mem::size_of::<T>())
            .and_then(|payload| payload.checked_add(mem::size_of::<Frontmatter<L, H, T>>()))
            .ok_or(AllocError)?;
        let layout = Layout::from_size_align(bytes, mem::align_of::<Frontmatter<L, H, T>>())
            .map_err(|_| AllocError)?;
        Ok((layout, bytes))
    }

    unsafe fn allocate_raw<A: Alloc>(
        len: usize,
        alloc: &A,
    ) -> Result<NonNull<Frontmatter<L, H, T>>, AllocError> {
        let stored: L = NumCast::from(len).expect("length does not fit the configured width");
        let (layout, _) = Self::layout_for(len)?;
        let ptr = alloc.allocate(layout)?.cast::<Frontmatter<L, H, T>>();
        ptr::addr_of_mut!((*ptr.as_ptr()).len).write(stored);
        Ok(ptr)
    }
}
