//! bytestore: single-threaded, manually-managed in-memory containers
//! with pluggable allocators and eviction finalizers.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: provide the three containers a larger native system needs when
//!   it cannot lean on a runtime collection library — a byte-keyed chained
//!   hash map, a doubly linked list, and a growable byte buffer — built as
//!   independent leaves that share one contract: the container owns every
//!   node, entry, key copy, and backing array it creates, routes all of
//!   that storage through one injected allocator, and runs a caller
//!   registered finalizer at the exact moment a stored payload is evicted.
//! - Components:
//!   - `ByteBuf<A>`: self-describing byte sequence with lazy first
//!     allocation, amortized O(1) push, binary-safe bulk append, direct
//!     `fmt::Write` formatted append, and whole-file loading. Always keeps
//!     a NUL terminator one past its length.
//!   - `LinkedList<T, A>`: doubly linked nodes with the payload inline,
//!     O(1) push at both ends, and cursor-based O(1) erasure of an
//!     arbitrary node.
//!   - `ByteMap<V, A>`: chained hash table over byte-string keys; each
//!     entry stores its precomputed hash, an owned key copy, and the value
//!     inline. Buckets double and entries are relocated (never copied,
//!     never finalized) when the load factor is crossed.
//!
//! Constraints
//! - Single-threaded: every container is `!Send`/`!Sync` by construction
//!   (raw links plus `Cell`-based debug state). Callers that need sharing
//!   must serialize access externally.
//! - One allocation per element: list nodes and map entries carry their
//!   payload inline; the only secondary allocation is the map's owned key
//!   copy.
//! - The allocator is chosen once, at construction, and every internal
//!   allocation goes through it; mixing allocators within one container
//!   lifetime is unrepresentable.
//! - Allocation failure is fatal (`handle_alloc_error`); continuing with
//!   half-linked structures is worse than stopping.
//!
//! Finalizer policy
//! - Payload bytes are opaque to the containers. If a payload owns
//!   sub-resources, the caller registers a finalizer; it runs exactly once
//!   per evicted slot — cursor erase, `remove`, `clear`, or container
//!   drop — and never when an entry is merely relocated by a rehash. The
//!   payload's own `Drop` still runs after the finalizer.
//! - A debug-only reentry check panics if a finalizer calls back into the
//!   container that is mid-mutation; release builds compile it away.
//!
//! Notes and non-goals
//! - No persistence, no internal locking, no ordering beyond exact key
//!   equality.
//! - The map's hash is a fixed pure function (`hash_bytes`, djb2) rather
//!   than a keyed hasher: stored hashes must stay valid across rehashes
//!   and process runs.
//! - Duplicate-key insertion under the default distinct policy is a
//!   normal, reportable outcome (`InsertOutcome::RejectedDuplicate`), not
//!   an error; so is a `find`/`remove` miss.

mod alloc;
mod buf;
mod guard;
mod hash;
mod list;
mod map;

// Public surface
pub use alloc::{Allocator, Arena, Global};
pub use buf::ByteBuf;
pub use hash::hash_bytes;
pub use list::{CursorMut, LinkedList};
pub use map::{ByteMap, InsertOutcome, INITIAL_BUCKETS, LOAD_FACTOR_PERCENT};
