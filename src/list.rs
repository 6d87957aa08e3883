//! Fixed-capacity, array-backed doubly linked list.
//!
//! [`RecencyList`] pre-allocates every node at construction and recycles them
//! through a stack of free indices, so adding and removing elements never
//! touches the allocator. Nodes are addressed by [`NodeHandle`] (a plain
//! index) instead of by pointer.
//!
//! The list is circular internally. `head()` is the element that has been in
//! the list the longest (the least recently positioned one); [`add`] appends
//! just before the head, i.e. at the logical tail, and [`add_first`] appends
//! and then makes the new node the head.
//!
//! ```text
//!           head                                  tail (head.prev)
//!        ┌────────┐     ┌────────┐     ┌────────┐     ┌────────┐
//!   ┌───▶│ idx 2  │────▶│ idx 0  │────▶│ idx 3  │────▶│ idx 1  │────┐
//!   │    └────────┘◀────└────────┘◀────└────────┘◀────└────────┘    │
//!   └────────────────────────────────────────────────────────────────┘
//!   free stack: [4, 5, ...]
//! ```
//!
//! [`add`]: RecencyList::add
//! [`add_first`]: RecencyList::add_first
//!
//! This collection is not thread-safe; the synchronized cache only touches it
//! under its mutex.

use crate::error::CapacityExceeded;
use core::fmt;
use core::iter::FusedIterator;
use core::num::NonZeroUsize;

/// Stable handle to a node of a [`RecencyList`].
///
/// A handle stays valid until its node is removed. After that the index goes
/// back to the free pool and may be handed out again by a later add, so
/// holders must drop the handle together with the element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle(usize);

impl NodeHandle {
    /// Returns the pool index this handle refers to.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

struct Node<T> {
    value: Option<T>,
    prev: usize,
    next: usize,
}

/// A doubly linked list with a fixed pool of nodes.
///
/// # Examples
///
/// ```
/// use readthrough_cache::list::RecencyList;
/// use core::num::NonZeroUsize;
///
/// let mut list = RecencyList::new(NonZeroUsize::new(3).unwrap());
/// let first = list.add(1).unwrap();
/// list.add(2).unwrap();
/// list.add(3).unwrap();
/// assert!(list.add(4).is_err());
///
/// assert_eq!(list.remove(first), Some(1));
/// assert_eq!(list.iter().copied().collect::<Vec<_>>(), vec![2, 3]);
/// ```
pub struct RecencyList<T> {
    nodes: Box<[Node<T>]>,
    /// Indices of unused nodes. Never grows past the pool length.
    free: Vec<usize>,
    len: usize,
    head: usize,
}

impl<T> RecencyList<T> {
    /// Creates a list that holds at most `cap` elements.
    pub fn new(cap: NonZeroUsize) -> Self {
        let cap = cap.get();
        let nodes = (0..cap)
            .map(|idx| Node {
                value: None,
                prev: idx,
                next: idx,
            })
            .collect();
        // Popping from the back hands out index 0 first.
        let free = (0..cap).rev().collect();

        RecencyList {
            nodes,
            free,
            len: 0,
            head: 0,
        }
    }

    /// Returns the maximum number of elements the list can hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of elements in the list.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the list holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` if every node of the pool is in use.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == self.nodes.len()
    }

    /// Returns the handle of the head element, or `None` if the list is empty.
    #[inline]
    pub fn head(&self) -> Option<NodeHandle> {
        if self.is_empty() {
            None
        } else {
            Some(NodeHandle(self.head))
        }
    }

    /// Appends `value` just before the head, making it the last element
    /// visited by iteration.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityExceeded`] if the list is full.
    pub fn add(&mut self, value: T) -> Result<NodeHandle, CapacityExceeded> {
        let idx = match self.free.pop() {
            Some(idx) if self.len < self.nodes.len() => idx,
            _ => return Err(CapacityExceeded::new(self.nodes.len())),
        };

        if self.len == 0 {
            self.head = idx;
            self.nodes[idx].prev = idx;
            self.nodes[idx].next = idx;
        } else {
            let head = self.head;
            let tail = self.nodes[head].prev;
            self.nodes[idx].prev = tail;
            self.nodes[idx].next = head;
            self.nodes[tail].next = idx;
            self.nodes[head].prev = idx;
        }

        self.nodes[idx].value = Some(value);
        self.len += 1;
        Ok(NodeHandle(idx))
    }

    /// Appends `value` and makes it the new head.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityExceeded`] if the list is full.
    pub fn add_first(&mut self, value: T) -> Result<NodeHandle, CapacityExceeded> {
        let handle = self.add(value)?;
        self.head = handle.0;
        Ok(handle)
    }

    /// Unlinks the node behind `handle` and returns its value.
    ///
    /// The node's index goes back to the free pool. If the node was the head,
    /// its successor becomes the head. Returns `None` if the handle does not
    /// refer to a live node.
    pub fn remove(&mut self, handle: NodeHandle) -> Option<T> {
        let idx = handle.0;
        let value = self.nodes.get_mut(idx)?.value.take()?;

        let (prev, next) = (self.nodes[idx].prev, self.nodes[idx].next);
        if self.len > 1 {
            self.nodes[prev].next = next;
            self.nodes[next].prev = prev;
            if self.head == idx {
                self.head = next;
            }
        }
        self.nodes[idx].prev = idx;
        self.nodes[idx].next = idx;

        self.len -= 1;
        self.free.push(idx);
        Some(value)
    }

    /// Removes the head element and returns it.
    pub fn pop_head(&mut self) -> Option<T> {
        let head = self.head()?;
        self.remove(head)
    }

    /// Returns a reference to the value behind `handle`.
    #[inline]
    pub fn get(&self, handle: NodeHandle) -> Option<&T> {
        self.nodes.get(handle.0)?.value.as_ref()
    }

    /// Returns a mutable reference to the value behind `handle`.
    #[inline]
    pub fn get_mut(&mut self, handle: NodeHandle) -> Option<&mut T> {
        self.nodes.get_mut(handle.0)?.value.as_mut()
    }

    /// Returns the handle following `handle`, wrapping from the tail to the head.
    pub fn next(&self, handle: NodeHandle) -> Option<NodeHandle> {
        let node = self.nodes.get(handle.0)?;
        node.value.as_ref().map(|_| NodeHandle(node.next))
    }

    /// Returns the handle preceding `handle`, wrapping from the head to the tail.
    pub fn prev(&self, handle: NodeHandle) -> Option<NodeHandle> {
        let node = self.nodes.get(handle.0)?;
        node.value.as_ref().map(|_| NodeHandle(node.prev))
    }

    /// Iterates from the head through `next` links, visiting each element once.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            idx: self.head,
            remaining: self.len,
        }
    }
}

impl<'a, T> IntoIterator for &'a RecencyList<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: fmt::Debug> fmt::Debug for RecencyList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RecencyList(")?;
        f.debug_list().entries(self.iter()).finish()?;
        f.write_str(")")
    }
}

/// Iterator over the elements of a [`RecencyList`], head first.
///
/// Stops after exactly `len` steps; the underlying links are circular.
pub struct Iter<'a, T> {
    list: &'a RecencyList<T>,
    idx: usize,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = &self.list.nodes[self.idx];
        self.idx = node.next;
        self.remaining -= 1;
        node.value.as_ref()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

impl<T> fmt::Debug for Iter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter")
            .field("idx", &self.idx)
            .field("remaining", &self.remaining)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list<T>(cap: usize) -> RecencyList<T> {
        RecencyList::new(NonZeroUsize::new(cap).unwrap())
    }

    fn values(list: &RecencyList<u32>) -> Vec<u32> {
        list.iter().copied().collect()
    }

    #[test]
    fn test_new_list_is_empty() {
        let list = list::<u32>(5);
        assert_eq!(list.len(), 0);
        assert_eq!(list.capacity(), 5);
        assert!(list.is_empty());
        assert_eq!(list.head(), None);
        assert_eq!(format!("{:?}", list), "RecencyList([])");
    }

    #[test]
    fn test_add_on_empty_links_to_itself() {
        let mut list = list(5);
        let node = list.add(42).unwrap();

        assert_eq!(list.get(node), Some(&42));
        assert_eq!(list.head(), Some(node));
        assert_eq!(list.next(node), Some(node));
        assert_eq!(list.prev(node), Some(node));
        assert_eq!(list.len(), 1);
        assert_eq!(format!("{:?}", list), "RecencyList([42])");
    }

    #[test]
    fn test_add_twice() {
        let mut list = list(5);
        let first = list.add(42).unwrap();
        let second = list.add(43).unwrap();

        assert_eq!(list.head(), Some(first));
        assert_eq!(list.next(first), Some(second));
        assert_eq!(list.prev(first), Some(second));
        assert_eq!(list.next(second), Some(first));
        assert_eq!(list.prev(second), Some(first));
        assert_eq!(list.len(), 2);
        assert_eq!(values(&list), vec![42, 43]);
    }

    #[test]
    fn test_add_then_remove() {
        let mut list = list(5);
        let node = list.add(42).unwrap();
        assert_eq!(list.remove(node), Some(42));
        assert_eq!(list.len(), 0);
        assert_eq!(list.head(), None);
        assert!(values(&list).is_empty());
    }

    #[test]
    fn test_remove_in_the_middle() {
        let mut list = list(5);
        list.add(42).unwrap();
        let middle = list.add(43).unwrap();
        list.add(44).unwrap();

        assert_eq!(list.remove(middle), Some(43));
        assert_eq!(list.len(), 2);
        assert_eq!(values(&list), vec![42, 44]);
    }

    #[test]
    fn test_remove_head_promotes_successor() {
        let mut list = list(5);
        list.add(1).unwrap();
        let second = list.add(2).unwrap();
        list.add(3).unwrap();

        let head = list.head().unwrap();
        assert_eq!(list.remove(head), Some(1));
        assert_eq!(list.head(), Some(second));
        assert_eq!(values(&list), vec![2, 3]);
    }

    #[test]
    fn test_remove_tail() {
        let mut list = list(3);
        list.add(1).unwrap();
        list.add(2).unwrap();
        let tail = list.add(3).unwrap();

        assert_eq!(list.remove(tail), Some(3));
        assert_eq!(values(&list), vec![1, 2]);
        list.add(4).unwrap();
        assert_eq!(values(&list), vec![1, 2, 4]);
    }

    #[test]
    fn test_add_first_reverses_order() {
        let mut list = list(5);
        list.add_first(1).unwrap();
        list.add_first(2).unwrap();
        list.add_first(3).unwrap();
        assert_eq!(values(&list), vec![3, 2, 1]);
        assert_eq!(format!("{:?}", list), "RecencyList([3, 2, 1])");
    }

    #[test]
    fn test_max_capacity() {
        let mut list = list(3);
        list.add(1).unwrap();
        list.add(2).unwrap();
        list.add(3).unwrap();
        assert!(list.is_full());

        let err = list.add(4).unwrap_err();
        assert_eq!(err.capacity(), 3);
        assert!(list.add_first(4).is_err());
        assert_eq!(list.len(), 3);
        assert_eq!(values(&list), vec![1, 2, 3]);
    }

    #[test]
    fn test_remove_then_add_reuses_index() {
        let mut list = list(4);
        list.add(10).unwrap();
        let node = list.add(20).unwrap();
        list.add(30).unwrap();

        assert_eq!(list.remove(node), Some(20));
        let readded = list.add(20).unwrap();
        assert_eq!(readded, node);
        assert_eq!(values(&list), vec![10, 30, 20]);
    }

    #[test]
    fn test_stale_handle_is_rejected() {
        let mut list = list(2);
        let node = list.add(1).unwrap();
        assert_eq!(list.remove(node), Some(1));
        assert_eq!(list.remove(node), None);
        assert_eq!(list.get(node), None);
        assert_eq!(list.next(node), None);
        assert_eq!(list.remove(NodeHandle(17)), None);
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn test_pop_head_drains_in_order() {
        let mut list = list(3);
        list.add(1).unwrap();
        list.add(2).unwrap();
        list.add(3).unwrap();

        assert_eq!(list.pop_head(), Some(1));
        assert_eq!(list.pop_head(), Some(2));
        assert_eq!(list.pop_head(), Some(3));
        assert_eq!(list.pop_head(), None);
        assert!(list.is_empty());
    }

    #[test]
    fn test_get_mut_updates_in_place() {
        let mut list = list(2);
        let node = list.add(1).unwrap();
        *list.get_mut(node).unwrap() = 5;
        assert_eq!(values(&list), vec![5]);
    }

    #[test]
    fn test_iter_len_matches_size() {
        let mut list = list(8);
        let handles: Vec<_> = (0..8).map(|i| list.add(i).unwrap()).collect();
        for handle in handles.iter().step_by(2) {
            list.remove(*handle);
        }
        let iter = list.iter();
        assert_eq!(iter.len(), 4);
        assert_eq!(values(&list), vec![1, 3, 5, 7]);
    }

    #[test]
    fn test_length_consistency_after_churn() {
        let mut list = list(4);
        let mut handles = Vec::new();
        for round in 0..50u32 {
            if list.is_full() {
                let head = list.head().unwrap();
                list.remove(head);
                handles.retain(|h| *h != head);
            }
            handles.push(list.add(round).unwrap());
            assert!(list.len() <= list.capacity());
            assert_eq!(list.iter().count(), list.len());
        }
        assert_eq!(values(&list), vec![46, 47, 48, 49]);
    }
}
