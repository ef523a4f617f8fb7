//! The string form of [`Boo`](crate::Boo).
//!
//! Byte storage has alignment 1, so there is no spare pointer bit to steal;
//! `BooStr` instead carries pointer, explicit length, and the ownership tag
//! as separate fields. Compared to wrapping a `&str` behind another pointer
//! this keeps the data one indirection away.

use core::fmt::{self, Write as _};
use core::marker::PhantomData;
use core::ops::Deref;
use core::ptr::NonNull;
use core::slice;
use core::str;

use crate::alloc::{Alloc, AllocError, Global};

/// A copy-on-write string: borrowed text is never freed, owned text is a
/// duplicated byte sequence freed on drop.
pub struct BooStr<'a, A: Alloc = Global> {
    ptr: NonNull<u8>,
    len: usize,
    owned: bool,
    alloc: A,
    _marker: PhantomData<&'a str>,
}

impl BooStr<'static, Global> {
    /// Wraps a string literal. Always borrowed; dropping it frees nothing.
    pub fn from_static(value: &'static str) -> Self {
        Self::borrowed(value, Global)
    }
}

impl<'a, A: Alloc> BooStr<'a, A> {
    /// Wraps existing text without copying. Never freed by this `BooStr`;
    /// the allocator is used only if a later mutation forces promotion.
    pub fn borrowed(value: &'a str, alloc: A) -> Self {
        Self {
            // SAFETY: `str::as_ptr` is never null.
            ptr: unsafe { NonNull::new_unchecked(value.as_ptr().cast_mut()) },
            len: value.len(),
            owned: false,
            alloc,
            _marker: PhantomData,
        }
    }

    /// Copies `value` into freshly owned storage.
    ///
    /// # Errors
    /// Returns `AllocError` if allocation fails.
    pub fn owned_in(value: &str, alloc: A) -> Result<Self, AllocError> {
        let bytes = alloc.dupe(value.as_bytes())?;
        Ok(Self {
            ptr: bytes.cast(),
            len: value.len(),
            owned: true,
            alloc,
            _marker: PhantomData,
        })
    }

    /// Renders format arguments into freshly owned storage. Always owned.
    ///
    /// # Errors
    /// Returns `AllocError` if allocation fails.
    pub fn format_in(args: fmt::Arguments<'_>, alloc: A) -> Result<Self, AllocError> {
        // Rendering goes through a transient std buffer; the result is then
        // moved into allocator-owned bytes.
        let mut rendered = String::new();
        rendered
            .write_fmt(args)
            .expect("formatting into a String cannot fail");
        Self::owned_in(&rendered, alloc)
    }

    /// Whether the text is owned by this `BooStr` and freed on drop.
    pub fn is_owned(&self) -> bool {
        self.owned
    }

    /// Whether the text is borrowed.
    pub fn is_borrowed(&self) -> bool {
        !self.owned
    }

    /// The text.
    pub fn as_str(&self) -> &str {
        // SAFETY: `ptr`/`len` always describe valid UTF-8: they come from a
        // `&str` or from a byte-exact duplicate of one.
        unsafe { str::from_utf8_unchecked(slice::from_raw_parts(self.ptr.as_ptr(), self.len)) }
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the text is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Exclusive access to the text, promoting a borrow to ownership first.
    ///
    /// Borrowed text is duplicated through the allocator and the tag flips
    /// to owned; subsequent calls return the same owned bytes without
    /// reallocating.
    ///
    /// # Errors
    /// Returns `AllocError` if the duplication fails; the `BooStr` is left
    /// borrowed and untouched.
    pub fn to_mut(&mut self) -> Result<&mut str, AllocError> {
        if !self.owned {
            let bytes = self.alloc.dupe(self.as_str().as_bytes())?;
            self.ptr = bytes.cast();
            self.owned = true;

            #[cfg(feature = "tracing")]
            tracing::trace!(len = self.len, "promoted borrowed text to owned storage");
        }
        // SAFETY: owned at this point; exclusive through `&mut self`; the
        // bytes stay valid UTF-8 under `&mut str`'s own rules.
        Ok(unsafe {
            str::from_utf8_unchecked_mut(slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len))
        })
    }

    /// The allocator this `BooStr` promotes and frees with.
    pub fn allocator(&self) -> &A {
        &self.alloc
    }
}

impl<'a, A: Alloc> Drop for BooStr<'a, A> {
    fn drop(&mut self) {
        if self.owned {
            // SAFETY: owned bytes came from `dupe` on this allocator.
            unsafe {
                self.alloc
                    .free(NonNull::slice_from_raw_parts(self.ptr, self.len));
            }
        }
    }
}

impl<'a, A: Alloc> Deref for BooStr<'a, A> {
    type Target = str;

    fn deref(&self) -> &str {
        self.as_str()
    }
}

impl<'a, A: Alloc> fmt::Display for BooStr<'a, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'a, A: Alloc> fmt::Debug for BooStr<'a, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl<'a, A: Alloc> PartialEq<str> for BooStr<'a, A> {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl<'a, 'b, A: Alloc> PartialEq<&'b str> for BooStr<'a, A> {
    fn eq(&self, other: &&'b str) -> bool {
        self.as_str() == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::Tracking;

    #[test]
    fn static_text_never_allocates() {
        let text = BooStr::from_static("foo");
        assert!(text.is_borrowed());
        assert_eq!(text, "foo");
    }

    #[test]
    fn to_mut_duplicates_once() {
        let tracker = Tracking::new();
        let mut text = BooStr::borrowed("loud", &tracker);

        text.to_mut().unwrap().make_ascii_uppercase();
        assert!(text.is_owned());
        assert_eq!(text, "LOUD");
        assert_eq!(tracker.allocations(), 1);

        text.to_mut().unwrap();
        assert_eq!(tracker.allocations(), 1);

        drop(text);
        assert_eq!(tracker.live_bytes(), 0);
    }
}
