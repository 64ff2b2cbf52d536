//! `ByteBuf`: a growable, self-describing byte buffer for building
//! strings and binary blobs incrementally.
//!
//! Layout contract: `len <= capacity`; while storage exists, `capacity +
//! 1` bytes are physically allocated and the byte at offset `len` is
//! always `0`. The terminator lives beyond the usable range, so every
//! buffer doubles as a NUL-terminated string for native interop while
//! staying binary-safe (`append` and `push` accept NUL bytes freely).
//!
//! A buffer starts unallocated; storage appears on the first mutating
//! call. Growth doubles capacity, copying the existing bytes and the
//! terminator forward, which keeps `push` amortized O(1).
//!
//! Formatted append goes through `fmt::Write` straight into the buffer's
//! own storage: no scratch buffers, no shared state, no output length
//! cap. Formatted output is text; embedded NULs in *formatted* output are
//! the caller's own doing and simply land in the buffer like any byte.

use crate::alloc::{allocate_or_abort, Allocator, Global};
use core::fmt;
use core::ptr::NonNull;
use core::{ptr, slice};
use std::alloc::Layout;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

pub struct ByteBuf<A: Allocator = Global> {
    /// `None` until the first allocation; all mutating operations treat
    /// the unallocated state as an empty buffer and allocate on demand.
    ptr: Option<NonNull<u8>>,
    /// Usable payload bytes; one more byte is physically allocated for
    /// the terminator.
    capacity: usize,
    len: usize,
    alloc: A,
}

/// Physical allocation backing `capacity` usable bytes.
#[inline]
fn physical_layout(capacity: usize) -> Layout {
    Layout::array::<u8>(capacity + 1).expect("buffer capacity fits in a Layout")
}

impl ByteBuf<Global> {
    /// An unallocated buffer. No storage until the first write.
    pub fn new() -> Self {
        Self::new_in(Global)
    }

    /// Reserve at least `capacity` usable bytes up front.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_in(capacity, Global)
    }

    /// Copy of `bytes`, sized exactly, terminated. Binary-safe.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::from_bytes_in(bytes, Global)
    }

    /// Read a whole file into a fresh buffer: `len` equals the file's
    /// byte length and the contents are copied verbatim. An unopenable or
    /// unreadable file is the recoverable error arm.
    pub fn read_from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Self::read_from_file_in(path, Global)
    }
}

impl Default for ByteBuf<Global> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Allocator> ByteBuf<A> {
    pub fn new_in(alloc: A) -> Self {
        Self {
            ptr: None,
            capacity: 0,
            len: 0,
            alloc,
        }
    }

    pub fn with_capacity_in(capacity: usize, alloc: A) -> Self {
        let mut buf = Self::new_in(alloc);
        buf.grow_to(capacity);
        buf
    }

    pub fn from_bytes_in(bytes: &[u8], alloc: A) -> Self {
        let mut buf = Self::with_capacity_in(bytes.len(), alloc);
        buf.append(bytes);
        buf
    }

    pub fn read_from_file_in<P: AsRef<Path>>(path: P, alloc: A) -> io::Result<Self> {
        let mut file = File::open(path)?;
        let hint = file.metadata().map(|m| m.len() as usize).unwrap_or(0);
        let mut buf = Self::with_capacity_in(hint, alloc);
        let mut chunk = [0u8; 4096];
        loop {
            let n = file.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            buf.append(&chunk[..n]);
        }
        Ok(buf)
    }

    /// Bytes currently used. 0 for unallocated buffers.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Usable bytes reserved, excluding the terminator slot.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        match self.ptr {
            Some(p) => unsafe { slice::from_raw_parts(p.as_ptr(), self.len) },
            None => &[],
        }
    }

    /// Contents plus the trailing NUL. Unallocated buffers present as an
    /// empty terminated string.
    #[inline]
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        match self.ptr {
            Some(p) => unsafe { slice::from_raw_parts(p.as_ptr(), self.len + 1) },
            None => &[0],
        }
    }

    /// Append one byte, reallocating if the buffer is unallocated or
    /// full. Amortized O(1).
    pub fn push(&mut self, byte: u8) {
        self.reserve(1);
        let p = self.ptr.expect("reserve allocates storage");
        unsafe {
            p.as_ptr().add(self.len).write(byte);
            self.len += 1;
            p.as_ptr().add(self.len).write(0);
        }
    }

    /// Binary-safe bulk append: one reservation, one copy, terminator
    /// rewritten at the new length.
    pub fn append(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        self.reserve(bytes.len());
        let p = self.ptr.expect("reserve allocates storage");
        unsafe {
            ptr::copy_nonoverlapping(bytes.as_ptr(), p.as_ptr().add(self.len), bytes.len());
            self.len += bytes.len();
            p.as_ptr().add(self.len).write(0);
        }
    }

    /// Render `args` directly into the buffer. Errors only surface from a
    /// `Display` impl inside `args`; the buffer itself never fails.
    ///
    /// Usually called as `buf.append_format(format_args!(...))`.
    pub fn append_format(&mut self, args: fmt::Arguments<'_>) -> fmt::Result {
        fmt::Write::write_fmt(self, args)
    }

    /// Ensure room for `additional` more bytes beyond `len`, allocating
    /// or reallocating as needed.
    pub fn reserve(&mut self, additional: usize) {
        let needed = self
            .len
            .checked_add(additional)
            .expect("buffer length overflow");
        if self.ptr.is_none() || needed > self.capacity {
            self.grow_to(needed);
        }
    }

    /// Keep storage, drop contents, rewrite the terminator.
    pub fn clear(&mut self) {
        self.len = 0;
        if let Some(p) = self.ptr {
            unsafe { p.as_ptr().write(0) };
        }
    }

    /// Reallocate to at least `min_capacity` usable bytes, doubling from
    /// the current capacity so successive pushes stay amortized O(1).
    fn grow_to(&mut self, min_capacity: usize) {
        let new_capacity = min_capacity.max(self.capacity * 2);
        let new_ptr = allocate_or_abort(&self.alloc, physical_layout(new_capacity));
        unsafe {
            match self.ptr {
                Some(old) => {
                    // Bytes plus terminator move forward together.
                    ptr::copy_nonoverlapping(old.as_ptr(), new_ptr.as_ptr(), self.len + 1);
                    self.alloc
                        .deallocate(old, physical_layout(self.capacity));
                }
                None => new_ptr.as_ptr().write(0),
            }
        }
        self.ptr = Some(new_ptr);
        self.capacity = new_capacity;
    }
}

impl<A: Allocator> fmt::Write for ByteBuf<A> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.append(s.as_bytes());
        Ok(())
    }
}

impl<A: Allocator> core::ops::Deref for ByteBuf<A> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl<A: Allocator> fmt::Debug for ByteBuf<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteBuf")
            .field("len", &self.len)
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl<A: Allocator> Drop for ByteBuf<A> {
    fn drop(&mut self) {
        if let Some(p) = self.ptr.take() {
            unsafe { self.alloc.deallocate(p, physical_layout(self.capacity)) };
        }
    }
}
