// ByteBuf integration suite.
//
// Core invariants exercised:
// - Growth: pushing N bytes one at a time yields len == N and reads back
//   the exact sequence, across at least one reallocation boundary.
// - Terminator: the byte at offset len is always NUL, through pushes,
//   bulk appends, formatted appends, growth, and clear.
// - Null-handle semantics: a fresh buffer has no storage, reports length
//   zero, and allocates on first use.
// - File loading: a whole file round-trips verbatim (binary included);
//   a missing file is a recoverable error.
use bytestore::{Arena, ByteBuf};
use std::fmt::Write as _;

// Test: byte-at-a-time growth across boundaries.
// Verifies: for N in {0, 1, cap-1, cap, cap+1} relative to an explicit
// starting capacity, len and contents are exact.
#[test]
fn push_across_growth_boundaries() {
    let start_cap = 16;
    for n in [0usize, 1, start_cap - 1, start_cap, start_cap + 1, 4 * start_cap] {
        let mut b = ByteBuf::with_capacity(start_cap);
        assert!(b.capacity() >= start_cap);
        for i in 0..n {
            b.push((i % 251) as u8);
        }
        assert_eq!(b.len(), n);
        let expect: Vec<u8> = (0..n).map(|i| (i % 251) as u8).collect();
        assert_eq!(b.as_bytes(), &expect[..]);
        assert_eq!(b.as_bytes_with_nul().last(), Some(&0));
    }
}

// Test: unallocated buffers behave as empty and allocate on first write.
#[test]
fn null_handle_semantics() {
    let mut b = ByteBuf::new();
    assert_eq!(b.len(), 0);
    assert_eq!(b.capacity(), 0);
    assert!(b.is_empty());
    assert_eq!(b.as_bytes(), b"");

    // Dropping an unallocated buffer is a no-op.
    drop(ByteBuf::new());

    b.append(b"late");
    assert_eq!(b.as_bytes(), b"late");
}

// Test: bulk append is binary-safe and reallocation-consistent.
// Verifies: appending runs with embedded NULs keeps every byte and the
// terminator placement.
#[test]
fn append_is_binary_safe() {
    let mut b = ByteBuf::with_capacity(4);
    let chunk = [1u8, 2, 3, 4, 5, 0, 5, 3, 2, 6];
    b.append(b"0123456789");
    b.append(&chunk);
    assert_eq!(b.len(), 20);
    assert_eq!(&b.as_bytes()[10..], &chunk[..]);
    assert_eq!(b.as_bytes_with_nul()[20], 0);
}

// Test: a mixed build-up of a buffer: digits pushed one at a time, then
// formatted text, then more writes through fmt::Write.
#[test]
fn formatted_append_composes() {
    let mut b = ByteBuf::with_capacity(64);
    for i in 0..9u8 {
        b.push(b'0' + i);
    }
    b.append_format(format_args!("formatted data {}\n", 12345))
        .unwrap();
    assert_eq!(b.as_bytes(), b"012345678formatted data 12345\n");

    // fmt::Write works directly too.
    write!(b, "{}-{}", 1, 2).unwrap();
    assert!(b.as_bytes().ends_with(b"1-2"));
}

// Test: from_bytes sizes the buffer exactly and copies verbatim.
#[test]
fn from_bytes_exact() {
    let b = ByteBuf::from_bytes(b"hello world");
    assert_eq!(b.len(), 11);
    assert_eq!(b.capacity(), 11);
    assert_eq!(b.as_bytes(), b"hello world");
    assert_eq!(b.as_bytes_with_nul(), b"hello world\0");
}

// Test: whole-file loading.
// Verifies: a binary file (embedded NULs included) round-trips with len
// equal to the file's byte length; a missing path is Err, not a panic.
#[test]
fn read_whole_file_roundtrip() {
    let path = std::env::temp_dir().join(format!(
        "bytestore-buf-test-{}-{}",
        std::process::id(),
        line!()
    ));
    let payload: Vec<u8> = (0..=255u8).cycle().take(5000).collect();
    std::fs::write(&path, &payload).unwrap();

    let b = ByteBuf::read_from_file(&path).unwrap();
    assert_eq!(b.len(), payload.len());
    assert_eq!(b.as_bytes(), &payload[..]);
    assert_eq!(b.as_bytes_with_nul().last(), Some(&0));

    std::fs::remove_file(&path).unwrap();
    assert!(ByteBuf::read_from_file(&path).is_err());
}

// Test: clear keeps capacity and the buffer stays usable.
#[test]
fn clear_retains_storage() {
    let mut b = ByteBuf::from_bytes(b"abcdef");
    let cap = b.capacity();
    b.clear();
    assert_eq!(b.len(), 0);
    assert_eq!(b.capacity(), cap);
    b.push(b'z');
    assert_eq!(b.as_bytes(), b"z");
}

// Test: arena-backed buffer, including growth inside the arena.
#[test]
fn arena_backed_buffer_grows() {
    let arena = Arena::with_capacity(64 * 1024);
    let mut b = ByteBuf::new_in(&arena);
    for i in 0..1000usize {
        b.push((i % 256) as u8);
    }
    assert_eq!(b.len(), 1000);
    assert_eq!(b.as_bytes()[999], (999 % 256) as u8);
    drop(b);
    assert!(arena.used() >= 1000);
}
