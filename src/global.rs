//! `GlobalAlloc` front end, so firmware code using `alloc` draws from the
//! same arena as direct [`Heap`] callers.

use core::alloc::{GlobalAlloc, Layout};
use core::ptr::{self, NonNull};

use spin::Mutex;

use crate::config::HEAP_BLOCK_ALIGN;
use crate::heap::{Heap, HeapPtr, HeapStats};
use crate::region::Region;
use crate::Result;

/// A raw arena at a fixed address.
pub struct RawArena {
    base: NonNull<u8>,
    len: usize,
}

// The arena is only reached through the mutex in `LockedHeap`.
unsafe impl Send for RawArena {}

impl Region for RawArena {
    fn bytes(&self) -> &[u8] {
        unsafe { core::slice::from_raw_parts(self.base.as_ptr(), self.len) }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        unsafe { core::slice::from_raw_parts_mut(self.base.as_ptr(), self.len) }
    }
}

pub struct LockedHeap {
    inner: Mutex<Option<Heap<RawArena>>>,
}

impl LockedHeap {
    pub const fn empty() -> Self {
        Self { inner: Mutex::new(None) }
    }

    /// Formats `len` bytes at `base` as the arena.
    ///
    /// # Safety
    /// The memory must be valid for reads and writes for `'static`, aligned
    /// to two bytes and not used by anything else.
    pub unsafe fn init(&self, base: *mut u8, len: usize) -> Result<()> {
        let base = NonNull::new(base).ok_or(crate::Error::InvalidLayout)?;
        let heap = Heap::init(RawArena { base, len })?;
        *self.inner.lock() = Some(heap);
        Ok(())
    }

    /// Runs the coalescing pass. Meant for idle points in the main loop.
    pub fn merge(&self) -> Result<usize> {
        match self.inner.lock().as_mut() {
            Some(heap) => heap.merge(),
            None => Ok(0),
        }
    }

    pub fn stats(&self) -> Option<HeapStats> {
        self.inner.lock().as_ref().map(Heap::stats)
    }

    fn to_handle(heap: &Heap<RawArena>, ptr: *mut u8) -> Option<HeapPtr> {
        let offset = (ptr as usize).checked_sub(heap.arena().base.as_ptr() as usize)?;
        u16::try_from(offset).ok().map(HeapPtr::from_offset)
    }

    fn to_ptr(heap: &Heap<RawArena>, handle: HeapPtr) -> *mut u8 {
        unsafe { heap.arena().base.as_ptr().add(handle.offset()) }
    }
}

unsafe impl GlobalAlloc for LockedHeap {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let mut guard = self.inner.lock();
        let Some(heap) = guard.as_mut() else {
            return ptr::null_mut();
        };
        let Ok(handle) = heap.alloc(layout.size()) else {
            return ptr::null_mut();
        };
        let ptr = Self::to_ptr(heap, handle);
        if ptr as usize % layout.align() != 0 {
            let _ = heap.free(handle);
            return ptr::null_mut();
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
        if let Some(heap) = self.inner.lock().as_mut() {
            if let Some(handle) = Self::to_handle(heap, ptr) {
                let _ = heap.free(handle);
            }
        }
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { self.alloc(layout) };
        if !ptr.is_null() {
            unsafe { ptr::write_bytes(ptr, 0, layout.size()) };
        }
        ptr
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if layout.align() > HEAP_BLOCK_ALIGN {
            // A moved block could lose the alignment, so go through `alloc`.
            let Ok(new_layout) = Layout::from_size_align(new_size, layout.align()) else {
                return ptr::null_mut();
            };
            let new_ptr = unsafe { self.alloc(new_layout) };
            if !new_ptr.is_null() {
                unsafe {
                    ptr::copy_nonoverlapping(ptr, new_ptr, layout.size().min(new_size));
                    self.dealloc(ptr, layout);
                }
            }
            return new_ptr;
        }

        let mut guard = self.inner.lock();
        let Some(heap) = guard.as_mut() else {
            return ptr::null_mut();
        };
        let Some(handle) = Self::to_handle(heap, ptr) else {
            return ptr::null_mut();
        };
        match heap.realloc(Some(handle), new_size) {
            Ok(moved) => Self::to_ptr(heap, moved),
            Err(_) => ptr::null_mut(),
        }
    }
}
