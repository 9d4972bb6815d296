//! Caller-owned C buffers built from engine strings.
//!
//! Everything handed out here is allocated with an [`Allocator`]; with the
//! default [`CAllocator`] that is `malloc`, so C callers release with `free`.
//!
//! A device name list is one pointer array plus one payload holding every
//! string back to back. Entry 0 points at the start of the payload, so two
//! `free` calls (entry 0, then the array) reclaim everything for any length.

use crate::error::{Result, ViError};
use std::ffi::CStr;
use std::marker::PhantomData;
use std::mem::{self, ManuallyDrop};
use std::os::raw::c_char;
use std::ptr::{self, NonNull};

/// Raw byte allocator for memory that crosses the C boundary.
///
/// # Safety
///
/// `allocate` returns null or a block of at least `size` bytes aligned for a
/// pointer. `release` accepts every non-null pointer returned by `allocate`.
pub unsafe trait Allocator {
    /// Returns null on failure.
    fn allocate(&self, size: usize) -> *mut u8;

    /// # Safety
    ///
    /// `ptr` came from `allocate` on this allocator and was not released yet.
    unsafe fn release(&self, ptr: *mut u8);
}

unsafe impl<A: Allocator + ?Sized> Allocator for &A {
    fn allocate(&self, size: usize) -> *mut u8 {
        (**self).allocate(size)
    }

    unsafe fn release(&self, ptr: *mut u8) {
        (**self).release(ptr)
    }
}

/// The C runtime heap.
#[derive(Debug, Default, Clone, Copy)]
pub struct CAllocator;

unsafe impl Allocator for CAllocator {
    fn allocate(&self, size: usize) -> *mut u8 {
        unsafe { libc::malloc(size) as *mut u8 }
    }

    unsafe fn release(&self, ptr: *mut u8) {
        libc::free(ptr as *mut libc::c_void)
    }
}

/// Bytes of `s` as a C string would see them, up to the first NUL.
fn c_bytes(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&b| b == 0) {
        Some(end) => &bytes[..end],
        None => bytes,
    }
}

/// Flattened, owned list of C strings.
///
/// Dropping the list releases it; [`NameList::into_raw`] transfers it to a C
/// caller instead.
pub struct NameList<A: Allocator = CAllocator> {
    entries: NonNull<*mut c_char>,
    len: usize,
    allocator: A,
    _owns: PhantomData<c_char>,
}

impl<A: Allocator> NameList<A> {
    /// Flatten `names`, copying their bytes unchanged up to any NUL.
    ///
    /// Returns `Ok(None)` for an empty slice and `Err(OutOfMemory)` if either
    /// allocation fails, in which case nothing stays allocated.
    pub fn new<S: AsRef<[u8]>>(names: &[S], allocator: A) -> Result<Option<Self>> {
        if names.is_empty() {
            return Ok(None);
        }
        let len = names.len();

        let total = names
            .iter()
            .try_fold(0usize, |acc, name| acc.checked_add(c_bytes(name.as_ref()).len() + 1))
            .ok_or(ViError::OutOfMemory)?;
        let index_size = len
            .checked_mul(mem::size_of::<*mut c_char>())
            .ok_or(ViError::OutOfMemory)?;

        let entries = NonNull::new(allocator.allocate(index_size) as *mut *mut c_char)
            .ok_or(ViError::OutOfMemory)?;

        let payload = allocator.allocate(total);
        if payload.is_null() {
            unsafe { allocator.release(entries.as_ptr() as *mut u8) };
            return Err(ViError::OutOfMemory);
        }

        let mut offset = 0;
        for (i, name) in names.iter().enumerate() {
            let bytes = c_bytes(name.as_ref());
            // SAFETY: offsets stay below `total` and `i` below `len`.
            unsafe {
                let dst = payload.add(offset);
                ptr::copy_nonoverlapping(bytes.as_ptr(), dst, bytes.len());
                *dst.add(bytes.len()) = 0;
                *entries.as_ptr().add(i) = dst as *mut c_char;
            }
            offset += bytes.len() + 1;
        }

        Ok(Some(NameList {
            entries,
            len,
            allocator,
            _owns: PhantomData,
        }))
    }

    /// Number of names.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false; empty input produces no list.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Name at `index`.
    pub fn get(&self, index: usize) -> Option<&CStr> {
        if index >= self.len {
            return None;
        }
        // SAFETY: every entry points at a NUL-terminated string in the payload.
        Some(unsafe { CStr::from_ptr(*self.entries.as_ptr().add(index)) })
    }

    /// Names in order.
    pub fn iter(&self) -> impl Iterator<Item = &CStr> + '_ {
        (0..self.len).filter_map(move |i| self.get(i))
    }

    /// Hand the list to a C caller, who must release entry 0 and then the
    /// array (or call `VI_FreeDeviceNames`).
    pub fn into_raw(self) -> (*mut *mut c_char, usize) {
        let this = ManuallyDrop::new(self);
        (this.entries.as_ptr(), this.len)
    }
}

impl<A: Allocator> Drop for NameList<A> {
    fn drop(&mut self) {
        unsafe { release_name_list(self.entries.as_ptr(), &self.allocator) }
    }
}

/// Release a list produced by [`NameList::into_raw`]. Null is ignored.
///
/// # Safety
///
/// `names` is null or came from `NameList::into_raw` with the same allocator
/// and was not released yet.
pub unsafe fn release_name_list<A: Allocator>(names: *mut *mut c_char, allocator: &A) {
    if names.is_null() {
        return;
    }
    allocator.release(*names as *mut u8);
    allocator.release(names as *mut u8);
}

/// Copy `s` up to any NUL into a fresh NUL-terminated allocation owned by
/// the caller.
pub fn copy_c_string<A: Allocator>(s: &[u8], allocator: &A) -> Result<NonNull<c_char>> {
    let bytes = c_bytes(s);
    let dst = NonNull::new(allocator.allocate(bytes.len() + 1)).ok_or(ViError::OutOfMemory)?;
    // SAFETY: `dst` holds `bytes.len() + 1` bytes.
    unsafe {
        ptr::copy_nonoverlapping(bytes.as_ptr(), dst.as_ptr(), bytes.len());
        *dst.as_ptr().add(bytes.len()) = 0;
    }
    Ok(dst.cast())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Allocator;
    use std::cell::{Cell, RefCell};
    use std::collections::HashSet;

    /// Heap allocator that counts live blocks and can fail on the n-th call.
    #[derive(Default)]
    pub struct TrackingAllocator {
        live: RefCell<HashSet<usize>>,
        calls: Cell<usize>,
        fail_on: Option<usize>,
    }

    impl TrackingAllocator {
        pub fn failing_on(call: usize) -> Self {
            TrackingAllocator {
                fail_on: Some(call),
                ..Default::default()
            }
        }

        pub fn live(&self) -> usize {
            self.live.borrow().len()
        }

        pub fn calls(&self) -> usize {
            self.calls.get()
        }
    }

    unsafe impl Allocator for TrackingAllocator {
        fn allocate(&self, size: usize) -> *mut u8 {
            let call = self.calls.get() + 1;
            self.calls.set(call);
            if self.fail_on == Some(call) {
                return std::ptr::null_mut();
            }
            let ptr = unsafe { libc::malloc(size) as *mut u8 };
            if !ptr.is_null() {
                self.live.borrow_mut().insert(ptr as usize);
            }
            ptr
        }

        unsafe fn release(&self, ptr: *mut u8) {
            assert!(
                self.live.borrow_mut().remove(&(ptr as usize)),
                "released a pointer that is not live"
            );
            libc::free(ptr as *mut libc::c_void)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::TrackingAllocator;
    use super::*;

    #[test]
    fn flattens_names_in_order() {
        let alloc = TrackingAllocator::default();
        let names = ["Cam A", "Cam B", "", "USB2.0 HD UVC WebCam"];
        let list = NameList::new(&names, &alloc).unwrap().unwrap();

        assert_eq!(list.len(), 4);
        let read: Vec<&str> = list.iter().map(|s| s.to_str().unwrap()).collect();
        assert_eq!(read, names);
        assert_eq!(alloc.live(), 2);

        drop(list);
        assert_eq!(alloc.live(), 0);
    }

    #[test]
    fn entries_point_into_one_payload() {
        let alloc = TrackingAllocator::default();
        let list = NameList::new(&["ab", "cde", "f"], &alloc).unwrap().unwrap();
        let (raw, len) = list.into_raw();
        unsafe {
            let base = *raw as usize;
            assert_eq!(*raw.add(1) as usize, base + 3);
            assert_eq!(*raw.add(2) as usize, base + 7);
            assert_eq!(len, 3);
            release_name_list(raw, &&alloc);
        }
        assert_eq!(alloc.live(), 0);
    }

    #[test]
    fn empty_input_allocates_nothing() {
        let alloc = TrackingAllocator::default();
        let list = NameList::<&TrackingAllocator>::new::<&str>(&[], &alloc).unwrap();
        assert!(list.is_none());
        assert_eq!(alloc.calls(), 0);
    }

    #[test]
    fn index_allocation_failure() {
        let alloc = TrackingAllocator::failing_on(1);
        let res = NameList::new(&["Cam A"], &alloc);
        assert!(matches!(res, Err(ViError::OutOfMemory)));
        assert_eq!(alloc.live(), 0);
    }

    #[test]
    fn payload_allocation_failure_releases_index() {
        let alloc = TrackingAllocator::failing_on(2);
        let res = NameList::new(&["Cam A", "Cam B"], &alloc);
        assert!(matches!(res, Err(ViError::OutOfMemory)));
        assert_eq!(alloc.calls(), 2);
        assert_eq!(alloc.live(), 0);
    }

    #[test]
    fn interior_nul_truncates() {
        let alloc = TrackingAllocator::default();
        let list = NameList::new(&["Cam\0hidden", "B"], &alloc).unwrap().unwrap();
        assert_eq!(list.get(0).unwrap().to_bytes(), b"Cam");
        assert_eq!(list.get(1).unwrap().to_bytes(), b"B");
        assert!(list.get(2).is_none());
    }

    #[test]
    fn bytes_are_copied_verbatim() {
        let alloc = TrackingAllocator::default();
        let list = NameList::new(&[&b"Cam\xE9ra"[..]], &alloc).unwrap().unwrap();
        assert_eq!(list.get(0).unwrap().to_bytes(), b"Cam\xE9ra");
        drop(list);

        let ptr = copy_c_string(b"Cam\xE9ra", &alloc).unwrap();
        unsafe {
            assert_eq!(CStr::from_ptr(ptr.as_ptr()).to_bytes(), b"Cam\xE9ra");
            alloc.release(ptr.as_ptr() as *mut u8);
        }
        assert_eq!(alloc.live(), 0);
    }

    #[test]
    fn copy_single_string() {
        let alloc = TrackingAllocator::default();
        let ptr = copy_c_string(b"Integrated Camera", &alloc).unwrap();
        unsafe {
            assert_eq!(CStr::from_ptr(ptr.as_ptr()).to_str().unwrap(), "Integrated Camera");
            alloc.release(ptr.as_ptr() as *mut u8);
        }
        assert_eq!(alloc.live(), 0);

        let failing = TrackingAllocator::failing_on(1);
        assert_eq!(copy_c_string(b"x", &failing), Err(ViError::OutOfMemory));
    }

    #[test]
    fn release_null_is_noop() {
        let alloc = TrackingAllocator::default();
        unsafe { release_name_list(ptr::null_mut(), &alloc) };
        assert_eq!(alloc.calls(), 0);
    }
}
