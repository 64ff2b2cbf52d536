//! The allocation seam: a small trait the containers route every internal
//! allocation through, chosen once at construction.
//!
//! `Global` is the zero-sized default over `std::alloc`. `Arena` is a
//! fixed-capacity bump allocator for callers that want region lifetime:
//! individual deallocation is a no-op and the whole backing block is
//! released when the arena drops. `&A` also implements `Allocator`, so a
//! single arena can back several containers at once.

use core::cell::Cell;
use core::marker::PhantomData;
use core::ptr::NonNull;
use std::alloc::{handle_alloc_error, Layout};

/// Allocation strategy injected into a container at construction.
///
/// Implementations must return memory satisfying `layout`'s size and
/// alignment, or `None` when they cannot. Containers treat `None` as
/// fatal; callers probing an allocator directly (e.g. an arena near
/// capacity) may treat it as a recoverable signal.
pub trait Allocator {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate` on this same allocator
    /// with this same `layout`, and must not be deallocated twice.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

impl<A: Allocator + ?Sized> Allocator for &A {
    #[inline]
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        (**self).allocate(layout)
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        (**self).deallocate(ptr, layout)
    }
}

/// The process heap, via `std::alloc`.
#[derive(Copy, Clone, Debug, Default)]
pub struct Global;

impl Allocator for Global {
    #[inline]
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        if layout.size() == 0 {
            // Dangling but well-aligned; never dereferenced for zero bytes.
            return Some(unsafe { NonNull::new_unchecked(layout.align() as *mut u8) });
        }
        NonNull::new(unsafe { std::alloc::alloc(layout) })
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() != 0 {
            std::alloc::dealloc(ptr.as_ptr(), layout);
        }
    }
}

/// Largest alignment an `Arena` will serve. The backing block is allocated
/// at this alignment, so any smaller alignment can be satisfied by offset
/// math alone.
const ARENA_ALIGN: usize = 16;

/// Fixed-capacity bump allocator.
///
/// Allocation walks a cursor forward through one pre-allocated block;
/// `deallocate` is a no-op and everything is reclaimed at once when the
/// arena drops. Exhaustion and over-aligned requests report `None`.
pub struct Arena {
    base: NonNull<u8>,
    capacity: usize,
    used: Cell<usize>,
    // Single-threaded like the containers it backs.
    _nosend: PhantomData<*mut ()>,
}

impl Arena {
    /// Reserve `capacity` bytes of backing storage up front.
    pub fn with_capacity(capacity: usize) -> Self {
        let layout = Layout::from_size_align(capacity.max(1), ARENA_ALIGN)
            .expect("arena capacity fits in a Layout");
        let base = match Global.allocate(layout) {
            Some(p) => p,
            None => handle_alloc_error(layout),
        };
        Self {
            base,
            capacity,
            used: Cell::new(0),
            _nosend: PhantomData,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes handed out so far, including alignment padding.
    pub fn used(&self) -> usize {
        self.used.get()
    }

    pub fn remaining(&self) -> usize {
        self.capacity - self.used.get()
    }
}

impl Allocator for Arena {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        if layout.align() > ARENA_ALIGN {
            return None;
        }
        let cur = self.used.get();
        let aligned = cur.checked_add(layout.align() - 1)? & !(layout.align() - 1);
        let end = aligned.checked_add(layout.size())?;
        if end > self.capacity {
            return None;
        }
        self.used.set(end);
        Some(unsafe { NonNull::new_unchecked(self.base.as_ptr().add(aligned)) })
    }

    #[inline]
    unsafe fn deallocate(&self, _ptr: NonNull<u8>, _layout: Layout) {
        // Region lifetime: everything is released when the arena drops.
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        let layout = Layout::from_size_align(self.capacity.max(1), ARENA_ALIGN)
            .expect("layout was valid at construction");
        unsafe { Global.deallocate(self.base, layout) };
    }
}

/// Allocate through `alloc` or die. Containers have no degraded path for
/// out-of-memory; an inconsistent chain is worse than stopping.
pub(crate) fn allocate_or_abort<A: Allocator>(alloc: &A, layout: Layout) -> NonNull<u8> {
    match alloc.allocate(layout) {
        Some(ptr) => ptr,
        None => handle_alloc_error(layout),
    }
}
