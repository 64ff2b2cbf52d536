//! `ByteMap`: a chained hash table keyed by byte strings.
//!
//! Structure: an allocator-owned bucket array; each bucket heads a singly
//! linked chain of entries. An entry is one allocation holding its chain
//! link, the precomputed key hash, a pointer/length pair for the owned
//! key copy, and the value inline. The key copy is the entry's only
//! secondary allocation.
//!
//! Invariants
//! - `len` equals the sum of all bucket chain lengths.
//! - Every entry's stored hash equals `hash_bytes(key)`, and the entry is
//!   reachable only from the bucket at `hash % bucket_count`.
//! - Under the default distinct policy, no two live entries share a key.
//! - Within a bucket, chains are most-recently-inserted first (inserts
//!   prepend); that is also the canonical iteration order per bucket.
//!
//! Growth: after a successful insert is linked and counted, the table
//! doubles its bucket array when `len * 100 >= bucket_count *
//! LOAD_FACTOR_PERCENT`. Rehashing relocates the existing entry
//! allocations into the new array using their stored hashes — key bytes
//! are never re-hashed, entries are never copied, and the key-removal
//! finalizer never runs for a relocation.

use crate::alloc::{allocate_or_abort, Allocator, Global};
use crate::guard::ReentryCheck;
use crate::hash::hash_bytes;
use core::marker::PhantomData;
use core::ptr::{self, NonNull};
use core::{fmt, slice};
use std::alloc::Layout;

/// Buckets allocated at creation.
pub const INITIAL_BUCKETS: usize = 16;

/// Growth trigger: the table grows when `len * 100` reaches
/// `bucket_count * LOAD_FACTOR_PERCENT`. Tunable per build.
pub const LOAD_FACTOR_PERCENT: usize = 75;

struct Entry<V> {
    next: Option<NonNull<Entry<V>>>,
    hash: u64,
    key_ptr: NonNull<u8>,
    key_len: usize,
    value: V,
}

impl<V> Entry<V> {
    fn key(&self) -> &[u8] {
        // key_ptr/key_len always describe this entry's owned key copy.
        unsafe { slice::from_raw_parts(self.key_ptr.as_ptr(), self.key_len) }
    }
}

struct Bucket<V> {
    head: Option<NonNull<Entry<V>>>,
    len: usize,
}

/// Result of `ByteMap::insert`. Duplicate rejection is a normal outcome,
/// not an error: the existing entry stays authoritative and the offered
/// value is dropped.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[must_use = "insert reports whether the key was actually added"]
pub enum InsertOutcome {
    Inserted,
    RejectedDuplicate,
}

pub struct ByteMap<V, A: Allocator = Global> {
    buckets: NonNull<Bucket<V>>,
    bucket_count: usize,
    len: usize,
    distinct: bool,
    finalizer: Option<Box<dyn FnMut(&mut V)>>,
    alloc: A,
    check: ReentryCheck,
    _owns: PhantomData<V>,
}

#[inline]
fn key_layout(len: usize) -> Layout {
    Layout::array::<u8>(len).expect("key length fits in a Layout")
}

/// Finalize, drop, and free one unlinked entry (value finalizer, value
/// drop, key copy, entry allocation — in that order).
///
/// # Safety
///
/// `entry` must have been allocated by `alloc` for this map, must already
/// be unlinked from its bucket, and must not be touched again afterwards.
unsafe fn dispose_entry<V, A: Allocator>(
    finalizer: &mut Option<Box<dyn FnMut(&mut V)>>,
    alloc: &A,
    entry: NonNull<Entry<V>>,
) {
    let p = entry.as_ptr();
    if let Some(f) = finalizer.as_mut() {
        f(&mut (*p).value);
    }
    ptr::drop_in_place(ptr::addr_of_mut!((*p).value));
    alloc.deallocate((*p).key_ptr, key_layout((*p).key_len));
    alloc.deallocate(entry.cast(), Layout::new::<Entry<V>>());
}

impl<V> ByteMap<V, Global> {
    pub fn new() -> Self {
        Self::new_in(Global)
    }
}

impl<V> Default for ByteMap<V, Global> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, A: Allocator> ByteMap<V, A> {
    /// Empty map: `INITIAL_BUCKETS` buckets, distinct keys enforced, no
    /// finalizer.
    pub fn new_in(alloc: A) -> Self {
        let buckets = Self::alloc_buckets(&alloc, INITIAL_BUCKETS);
        Self {
            buckets,
            bucket_count: INITIAL_BUCKETS,
            len: 0,
            distinct: true,
            finalizer: None,
            alloc,
            check: ReentryCheck::new(),
            _owns: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current bucket array size; grows by doubling, never shrinks.
    pub fn bucket_count(&self) -> usize {
        self.bucket_count
    }

    /// Register or replace the key-removal finalizer, invoked on every
    /// entry's value at `remove`, `clear`, and map drop — never when an
    /// entry is relocated by a rehash.
    pub fn set_key_removal_finalizer<F>(&mut self, f: F)
    where
        F: FnMut(&mut V) + 'static,
    {
        self.finalizer = Some(Box::new(f));
    }

    /// Switch off duplicate rejection: later inserts of an existing key
    /// add a second entry instead of being rejected, and `find` sees the
    /// most recent one. One-way — re-enabling distinctness over existing
    /// duplicates would break the distinct invariant, so it is not
    /// representable.
    pub fn permit_duplicates(&mut self) {
        self.distinct = false;
    }

    fn buckets_layout(count: usize) -> Layout {
        Layout::array::<Bucket<V>>(count).expect("bucket count fits in a Layout")
    }

    fn alloc_buckets(alloc: &A, count: usize) -> NonNull<Bucket<V>> {
        let buckets = allocate_or_abort(alloc, Self::buckets_layout(count)).cast::<Bucket<V>>();
        for i in 0..count {
            unsafe {
                buckets.as_ptr().add(i).write(Bucket { head: None, len: 0 });
            }
        }
        buckets
    }

    #[inline]
    fn bucket_index(&self, hash: u64) -> usize {
        (hash % self.bucket_count as u64) as usize
    }

    /// Chain scan: stored hash first (cheap reject), then the full key
    /// bytes (authoritative under collisions).
    fn find_in_bucket(&self, idx: usize, hash: u64, key: &[u8]) -> Option<NonNull<Entry<V>>> {
        let mut cur = unsafe { (*self.buckets.as_ptr().add(idx)).head };
        while let Some(e) = cur {
            let er = unsafe { e.as_ref() };
            if er.hash == hash && er.key() == key {
                return Some(e);
            }
            cur = er.next;
        }
        None
    }

    pub fn find(&self, key: &[u8]) -> Option<&V> {
        let hash = hash_bytes(key);
        self.find_in_bucket(self.bucket_index(hash), hash, key)
            .map(|e| unsafe { &(*e.as_ptr()).value })
    }

    pub fn find_mut(&mut self, key: &[u8]) -> Option<&mut V> {
        let hash = hash_bytes(key);
        self.find_in_bucket(self.bucket_index(hash), hash, key)
            .map(|e| unsafe { &mut (*e.as_ptr()).value })
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        let hash = hash_bytes(key);
        self.find_in_bucket(self.bucket_index(hash), hash, key)
            .is_some()
    }

    /// Insert a key/value pair. Under the distinct policy an equal key
    /// already present leaves the map unchanged and reports
    /// `RejectedDuplicate` (the offered value is dropped). Otherwise the
    /// new entry is prepended to its bucket chain, and the table may grow
    /// once the insert is fully visible.
    pub fn insert(&mut self, key: &[u8], value: V) -> InsertOutcome {
        let hash = hash_bytes(key);
        let idx = self.bucket_index(hash);

        if self.distinct && self.find_in_bucket(idx, hash, key).is_some() {
            return InsertOutcome::RejectedDuplicate;
        }

        let entry = self.alloc_entry(hash, key, value);
        unsafe {
            let bucket = &mut *self.buckets.as_ptr().add(idx);
            (*entry.as_ptr()).next = bucket.head;
            bucket.head = Some(entry);
            bucket.len += 1;
        }
        self.len += 1;

        // Growth runs strictly after the new entry is linked and counted.
        if self.len * 100 >= self.bucket_count * LOAD_FACTOR_PERCENT {
            self.grow();
        }
        InsertOutcome::Inserted
    }

    fn alloc_entry(&self, hash: u64, key: &[u8], value: V) -> NonNull<Entry<V>> {
        let key_ptr = allocate_or_abort(&self.alloc, key_layout(key.len()));
        unsafe {
            ptr::copy_nonoverlapping(key.as_ptr(), key_ptr.as_ptr(), key.len());
        }
        let entry = allocate_or_abort(&self.alloc, Layout::new::<Entry<V>>()).cast::<Entry<V>>();
        unsafe {
            entry.as_ptr().write(Entry {
                next: None,
                hash,
                key_ptr,
                key_len: key.len(),
                value,
            });
        }
        entry
    }

    /// Double the bucket array and relocate every entry into it by its
    /// stored hash. `len` is unchanged; no user code runs. Relocation
    /// preserves each chain's relative order, so the most-recent-first
    /// order (and duplicate shadowing) is stable across growth.
    fn grow(&mut self) {
        let new_count = self.bucket_count * 2;
        let new_buckets = Self::alloc_buckets(&self.alloc, new_count);
        for i in 0..self.bucket_count {
            // Reverse the old chain first; prepending the reversed chain
            // into the new buckets then restores the original order.
            let mut rev: Option<NonNull<Entry<V>>> = None;
            let mut cur = unsafe { (*self.buckets.as_ptr().add(i)).head };
            while let Some(e) = cur {
                unsafe {
                    cur = e.as_ref().next;
                    (*e.as_ptr()).next = rev;
                    rev = Some(e);
                }
            }
            let mut cur = rev;
            while let Some(e) = cur {
                unsafe {
                    cur = e.as_ref().next;
                    let idx = (e.as_ref().hash % new_count as u64) as usize;
                    let nb = &mut *new_buckets.as_ptr().add(idx);
                    (*e.as_ptr()).next = nb.head;
                    nb.head = Some(e);
                    nb.len += 1;
                }
            }
        }
        unsafe {
            self.alloc
                .deallocate(self.buckets.cast(), Self::buckets_layout(self.bucket_count));
        }
        self.buckets = new_buckets;
        self.bucket_count = new_count;
    }

    /// Remove the entry for `key`, if any: unlink it from its chain,
    /// invoke the key-removal finalizer on the value, drop the value,
    /// free the key copy and the entry. A miss reports `false`.
    pub fn remove(&mut self, key: &[u8]) -> bool {
        let hash = hash_bytes(key);
        let idx = self.bucket_index(hash);
        let _g = self.check.enter();
        unsafe {
            let bucket = &mut *self.buckets.as_ptr().add(idx);
            // Predecessor walk through the singly linked chain.
            let mut cur: *mut Option<NonNull<Entry<V>>> = &mut bucket.head;
            while let Some(e) = *cur {
                let er = e.as_ref();
                if er.hash == hash && er.key() == key {
                    *cur = er.next;
                    bucket.len -= 1;
                    self.len -= 1;
                    dispose_entry(&mut self.finalizer, &self.alloc, e);
                    return true;
                }
                cur = &mut (*e.as_ptr()).next;
            }
        }
        false
    }

    /// Destroy every entry (finalizer per entry, key copies freed); the
    /// bucket array keeps its current size.
    pub fn clear(&mut self) {
        let _g = self.check.enter();
        for i in 0..self.bucket_count {
            unsafe {
                let bucket = &mut *self.buckets.as_ptr().add(i);
                let mut cur = bucket.head.take();
                bucket.len = 0;
                while let Some(e) = cur {
                    cur = e.as_ref().next;
                    dispose_entry(&mut self.finalizer, &self.alloc, e);
                }
            }
        }
        self.len = 0;
    }

    /// Iterate all entries: buckets in index order, each chain
    /// most-recently-inserted first.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            buckets: self.buckets,
            bucket_count: self.bucket_count,
            next_bucket: 0,
            entry: None,
            remaining: self.len,
            _marker: PhantomData,
        }
    }
}

impl<V, A: Allocator> Drop for ByteMap<V, A> {
    fn drop(&mut self) {
        self.clear();
        unsafe {
            self.alloc
                .deallocate(self.buckets.cast(), Self::buckets_layout(self.bucket_count));
        }
    }
}

impl<V, A: Allocator> fmt::Debug for ByteMap<V, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteMap")
            .field("len", &self.len)
            .field("bucket_count", &self.bucket_count)
            .field("distinct", &self.distinct)
            .finish()
    }
}

pub struct Iter<'a, V> {
    buckets: NonNull<Bucket<V>>,
    bucket_count: usize,
    next_bucket: usize,
    entry: Option<NonNull<Entry<V>>>,
    remaining: usize,
    _marker: PhantomData<&'a V>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a [u8], &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(e) = self.entry {
                unsafe {
                    let er = &*e.as_ptr();
                    self.entry = er.next;
                    self.remaining -= 1;
                    return Some((er.key(), &er.value));
                }
            }
            if self.next_bucket == self.bucket_count {
                return None;
            }
            self.entry = unsafe { (*self.buckets.as_ptr().add(self.next_bucket)).head };
            self.next_bucket += 1;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}
