//! `LinkedList`: a doubly linked sequence with the payload stored inline
//! in each node, one allocation per node, routed through the container's
//! allocator.
//!
//! Invariants
//! - `head.is_none() == tail.is_none() == (len == 0)`.
//! - For adjacent nodes `a` and `b`: `a.next == b` iff `b.prev == a`.
//! - Every node was allocated by this list's allocator and is freed by it
//!   exactly once.
//!
//! Erasure goes through `CursorMut::remove_current`, which advances the
//! cursor to the successor *before* the node is destroyed; erasing while
//! walking is therefore always safe. Each erased payload gets the
//! registered finalizer (if any) and then its ordinary `Drop`, in that
//! order, before the node's memory is released.

use crate::alloc::{allocate_or_abort, Allocator, Global};
use crate::guard::ReentryCheck;
use core::fmt;
use core::marker::PhantomData;
use core::ptr::{self, NonNull};
use std::alloc::Layout;

struct Node<T> {
    next: Option<NonNull<Node<T>>>,
    prev: Option<NonNull<Node<T>>>,
    value: T,
}

pub struct LinkedList<T, A: Allocator = Global> {
    head: Option<NonNull<Node<T>>>,
    tail: Option<NonNull<Node<T>>>,
    len: usize,
    finalizer: Option<Box<dyn FnMut(&mut T)>>,
    alloc: A,
    check: ReentryCheck,
    _owns: PhantomData<T>,
}

/// Finalize, drop, and free one unlinked node.
///
/// # Safety
///
/// `node` must have been allocated by `alloc` for this list, must already
/// be unlinked, and must not be touched again afterwards.
unsafe fn dispose<T, A: Allocator>(
    finalizer: &mut Option<Box<dyn FnMut(&mut T)>>,
    alloc: &A,
    node: NonNull<Node<T>>,
) {
    let p = node.as_ptr();
    if let Some(f) = finalizer.as_mut() {
        f(&mut (*p).value);
    }
    ptr::drop_in_place(p);
    alloc.deallocate(node.cast(), Layout::new::<Node<T>>());
}

impl<T> LinkedList<T, Global> {
    pub fn new() -> Self {
        Self::new_in(Global)
    }
}

impl<T> Default for LinkedList<T, Global> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, A: Allocator> LinkedList<T, A> {
    pub fn new_in(alloc: A) -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
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

    /// Register or replace the payload finalizer, invoked on every node
    /// at erase time — cursor removal, `clear`, or list drop.
    pub fn set_finalizer<F>(&mut self, f: F)
    where
        F: FnMut(&mut T) + 'static,
    {
        self.finalizer = Some(Box::new(f));
    }

    fn alloc_node(&self, value: T) -> NonNull<Node<T>> {
        let node = allocate_or_abort(&self.alloc, Layout::new::<Node<T>>()).cast::<Node<T>>();
        unsafe {
            node.as_ptr().write(Node {
                next: None,
                prev: None,
                value,
            });
        }
        node
    }

    /// Prepend; the new node becomes the head. O(1).
    pub fn push_front(&mut self, value: T) -> &mut T {
        let mut node = self.alloc_node(value);
        unsafe {
            node.as_mut().next = self.head;
            match self.head {
                Some(mut h) => h.as_mut().prev = Some(node),
                None => self.tail = Some(node),
            }
            self.head = Some(node);
            self.len += 1;
            &mut (*node.as_ptr()).value
        }
    }

    /// Append; the new node becomes the tail. O(1) via the tail link.
    pub fn push_back(&mut self, value: T) -> &mut T {
        let mut node = self.alloc_node(value);
        unsafe {
            node.as_mut().prev = self.tail;
            match self.tail {
                Some(mut t) => t.as_mut().next = Some(node),
                None => self.head = Some(node),
            }
            self.tail = Some(node);
            self.len += 1;
            &mut (*node.as_ptr()).value
        }
    }

    pub fn front(&self) -> Option<&T> {
        self.head.map(|n| unsafe { &(*n.as_ptr()).value })
    }

    pub fn back(&self) -> Option<&T> {
        self.tail.map(|n| unsafe { &(*n.as_ptr()).value })
    }

    pub fn front_mut(&mut self) -> Option<&mut T> {
        self.head.map(|n| unsafe { &mut (*n.as_ptr()).value })
    }

    pub fn back_mut(&mut self) -> Option<&mut T> {
        self.tail.map(|n| unsafe { &mut (*n.as_ptr()).value })
    }

    /// Forward traversal from head; reverse traversal via `.rev()`.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            head: self.head,
            tail: self.tail,
            remaining: self.len,
            _marker: PhantomData,
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut {
            head: self.head,
            tail: self.tail,
            remaining: self.len,
            _marker: PhantomData,
        }
    }

    /// Cursor parked on the head (or nowhere, if empty).
    pub fn cursor_front_mut(&mut self) -> CursorMut<'_, T, A> {
        let cur = self.head;
        CursorMut { list: self, cur }
    }

    /// Cursor parked on the tail (or nowhere, if empty).
    pub fn cursor_back_mut(&mut self) -> CursorMut<'_, T, A> {
        let cur = self.tail;
        CursorMut { list: self, cur }
    }

    /// Erase every node, finalizing each payload.
    pub fn clear(&mut self) {
        let _g = self.check.enter();
        // Detach the whole chain first: if a finalizer panics the list is
        // already consistent (empty), at the cost of leaking the rest.
        let mut cur = self.head.take();
        self.tail = None;
        self.len = 0;
        while let Some(node) = cur {
            unsafe {
                cur = node.as_ref().next;
                dispose(&mut self.finalizer, &self.alloc, node);
            }
        }
    }

    /// Unlink and destroy one node. Used by cursors; `node` must belong
    /// to this list.
    fn erase(&mut self, node: NonNull<Node<T>>) {
        let _g = self.check.enter();
        unsafe {
            let (prev, next) = {
                let n = node.as_ref();
                (n.prev, n.next)
            };
            match prev {
                Some(mut p) => p.as_mut().next = next,
                None => self.head = next,
            }
            match next {
                Some(mut x) => x.as_mut().prev = prev,
                None => self.tail = prev,
            }
            self.len -= 1;
            dispose(&mut self.finalizer, &self.alloc, node);
        }
    }
}

impl<T, A: Allocator> Drop for LinkedList<T, A> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for LinkedList<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a LinkedList<T, A> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

/// Mutable cursor over a list. `remove_current` advances to the successor
/// before destroying the node, so removal while walking is safe.
pub struct CursorMut<'a, T, A: Allocator = Global> {
    list: &'a mut LinkedList<T, A>,
    cur: Option<NonNull<Node<T>>>,
}

impl<T, A: Allocator> CursorMut<'_, T, A> {
    pub fn current(&mut self) -> Option<&mut T> {
        self.cur.map(|n| unsafe { &mut (*n.as_ptr()).value })
    }

    /// Step towards the tail. Returns `false` when stepping off the end.
    pub fn move_next(&mut self) -> bool {
        match self.cur {
            Some(n) => {
                self.cur = unsafe { n.as_ref().next };
                self.cur.is_some()
            }
            None => false,
        }
    }

    /// Step towards the head. Returns `false` when stepping off the end.
    pub fn move_prev(&mut self) -> bool {
        match self.cur {
            Some(n) => {
                self.cur = unsafe { n.as_ref().prev };
                self.cur.is_some()
            }
            None => false,
        }
    }

    /// Erase the current node: advance to its successor, run the
    /// finalizer on the payload, drop the payload, free the node. O(1).
    /// Reports `false` (no-op) when the cursor is not on a node.
    pub fn remove_current(&mut self) -> bool {
        let Some(node) = self.cur else {
            return false;
        };
        self.cur = unsafe { node.as_ref().next };
        self.list.erase(node);
        true
    }
}

pub struct Iter<'a, T> {
    head: Option<NonNull<Node<T>>>,
    tail: Option<NonNull<Node<T>>>,
    remaining: usize,
    _marker: PhantomData<&'a T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }
        self.head.map(|node| unsafe {
            self.remaining -= 1;
            let n = &*node.as_ptr();
            self.head = n.next;
            &n.value
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    fn next_back(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }
        self.tail.map(|node| unsafe {
            self.remaining -= 1;
            let n = &*node.as_ptr();
            self.tail = n.prev;
            &n.value
        })
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

pub struct IterMut<'a, T> {
    head: Option<NonNull<Node<T>>>,
    tail: Option<NonNull<Node<T>>>,
    remaining: usize,
    _marker: PhantomData<&'a mut T>,
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<&'a mut T> {
        if self.remaining == 0 {
            return None;
        }
        self.head.map(|node| unsafe {
            self.remaining -= 1;
            let n = &mut *node.as_ptr();
            self.head = n.next;
            &mut n.value
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> DoubleEndedIterator for IterMut<'a, T> {
    fn next_back(&mut self) -> Option<&'a mut T> {
        if self.remaining == 0 {
            return None;
        }
        self.tail.map(|node| unsafe {
            self.remaining -= 1;
            let n = &mut *node.as_ptr();
            self.tail = n.prev;
            &mut n.value
        })
    }
}

impl<T> ExactSizeIterator for IterMut<'_, T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Invariant: head and tail are both set or both empty; push at either
    /// end links correctly from both directions.
    #[test]
    fn push_order_front_and_back() {
        let mut l = LinkedList::new();
        assert!(l.is_empty());
        assert!(l.front().is_none() && l.back().is_none());

        for i in 0..4 {
            l.push_back(i);
        }
        assert_eq!(l.iter().copied().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        assert_eq!(
            l.iter().rev().copied().collect::<Vec<_>>(),
            vec![3, 2, 1, 0]
        );

        let mut l = LinkedList::new();
        for i in 0..4 {
            l.push_front(i);
        }
        assert_eq!(l.iter().copied().collect::<Vec<_>>(), vec![3, 2, 1, 0]);
        assert_eq!(l.front(), Some(&3));
        assert_eq!(l.back(), Some(&0));
    }

    /// push returns a usable reference to the stored payload.
    #[test]
    fn push_returns_payload_slot() {
        let mut l = LinkedList::new();
        *l.push_back(1) += 10;
        *l.push_front(2) += 20;
        assert_eq!(l.iter().copied().collect::<Vec<_>>(), vec![22, 11]);
    }

    /// Invariant: removing the sole node empties the list entirely.
    #[test]
    fn remove_sole_node_empties() {
        let mut l = LinkedList::new();
        l.push_back("only");
        let mut c = l.cursor_front_mut();
        assert!(c.remove_current());
        assert!(!c.remove_current(), "no current node left");
        assert!(l.is_empty());
        assert!(l.front().is_none() && l.back().is_none());
    }

    /// Cursor removal mid-list relinks neighbors in both directions.
    #[test]
    fn remove_middle_relinks() {
        let mut l = LinkedList::new();
        for i in 0..5 {
            l.push_back(i);
        }
        let mut c = l.cursor_front_mut();
        c.move_next();
        c.move_next(); // on 2
        assert!(c.remove_current());
        assert_eq!(c.current(), Some(&mut 3), "cursor advanced to successor");

        assert_eq!(l.iter().copied().collect::<Vec<_>>(), vec![0, 1, 3, 4]);
        assert_eq!(
            l.iter().rev().copied().collect::<Vec<_>>(),
            vec![4, 3, 1, 0]
        );
    }

    /// Erase-while-walking: the advance-before-destroy ordering lets a
    /// single pass drop every matching node.
    #[test]
    fn filter_while_walking() {
        let mut l = LinkedList::new();
        for i in 0..10 {
            l.push_back(i);
        }
        let mut c = l.cursor_front_mut();
        loop {
            match c.current() {
                Some(v) if *v % 2 == 0 => {
                    c.remove_current();
                }
                Some(_) => {
                    if !c.move_next() {
                        break;
                    }
                }
                None => break,
            }
        }
        assert_eq!(l.iter().copied().collect::<Vec<_>>(), vec![1, 3, 5, 7, 9]);
    }

    /// Invariant: the finalizer runs exactly once per node on erase and on
    /// drop, before the payload's own Drop.
    #[test]
    fn finalizer_runs_once_per_node() {
        let count = Rc::new(Cell::new(0));
        let c2 = Rc::clone(&count);
        let mut l = LinkedList::new();
        l.set_finalizer(move |_: &mut i32| c2.set(c2.get() + 1));

        for i in 0..3 {
            l.push_back(i);
        }
        let mut c = l.cursor_front_mut();
        c.remove_current();
        assert_eq!(count.get(), 1);

        drop(l);
        assert_eq!(count.get(), 3);
    }

    /// iter_mut updates payloads in place, front to back and back to front.
    #[test]
    fn iter_mut_updates() {
        let mut l = LinkedList::new();
        for i in 0..4 {
            l.push_back(i);
        }
        for v in l.iter_mut() {
            *v *= 10;
        }
        assert_eq!(l.iter().copied().collect::<Vec<_>>(), vec![0, 10, 20, 30]);

        if let Some(v) = l.iter_mut().next_back() {
            *v += 1;
        }
        assert_eq!(l.back(), Some(&31));
    }
}
