//! Index-addressed node arena shared by every eviction policy.
//!
//! A `NodeStore<T>` owns all list nodes of one cache. Nodes are addressed by
//! stable [`NodeId`] handles and linked to each other by id, so a cache can
//! keep a `key -> NodeId` map next to the ordering structure without any
//! reference counting or raw pointers.
//!
//! ## Architecture
//!
//! ```text
//!   nodes (Vec<Node<T>>)
//!   ┌────────┬──────────────────────────────────────────────┐
//!   │ NodeId │ Node { value, prev, next }                   │
//!   ├────────┼──────────────────────────────────────────────┤
//!   │ 0      │ { None,    prev: 0, next: 2 }   head sentinel │
//!   │ 1      │ { None,    prev: 3, next: 1 }   tail sentinel │
//!   │ 2      │ { Some(A), prev: 0, next: 3 }                │
//!   │ 3      │ { Some(B), prev: 2, next: 1 }                │
//!   └────────┴──────────────────────────────────────────────┘
//!
//!   ListHandle { head: 0, tail: 1 }
//!
//!   [head] ◄──► [A] ◄──► [B] ◄──► [tail]
//!    front                 back
//! ```
//!
//! Every list is delimited by two sentinel nodes that never hold a value, so
//! insert and unlink never branch on list ends. Several lists can live in one
//! store (the LFU cache keeps one list per frequency bucket); a node belongs to
//! at most one list at a time.
//!
//! ## Operations
//! - `new_list` / `release_list`: allocate or free a sentinel pair
//! - `push_back(list, value)`: allocate a node and link it before the tail
//! - `unlink(id)` / `link_back(list, id)`: splice a node between lists
//! - `move_to_back(list, id)`: unlink + link_back within one list
//! - `remove(id)`: unlink and free, returning the value
//!
//! All of the above are O(1). Freed slots are recycled through a free list.

use crate::error::{InvariantError, ensure_invariant};

/// Stable handle to a node inside a [`NodeStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Returns the slot index backing this handle.
    pub fn index(self) -> usize {
        self.0
    }
}

/// The two sentinels delimiting one list inside a [`NodeStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListHandle {
    head: NodeId,
    tail: NodeId,
}

#[derive(Debug)]
struct Node<T> {
    value: Option<T>,
    prev: NodeId,
    next: NodeId,
}

/// Arena of doubly linked nodes addressed by [`NodeId`].
#[derive(Debug)]
pub struct NodeStore<T> {
    nodes: Vec<Node<T>>,
    free: Vec<NodeId>,
    len: usize,
}

impl<T> NodeStore<T> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Creates an empty store with room for `capacity` value nodes plus one
    /// sentinel pair.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity.saturating_add(2)),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Number of value-carrying nodes (sentinels excluded).
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the store holds no value nodes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocates a new, empty list.
    pub fn new_list(&mut self) -> ListHandle {
        let head = self.alloc(None);
        let tail = self.alloc(None);
        self.nodes[head.0].next = tail;
        self.nodes[tail.0].prev = head;
        ListHandle { head, tail }
    }

    /// Frees the sentinels of an empty list. The handle must not be used
    /// afterwards.
    pub fn release_list(&mut self, list: ListHandle) {
        debug_assert!(self.list_is_empty(list), "released list still links nodes");
        self.free_slot(list.head);
        self.free_slot(list.tail);
    }

    /// Returns `true` if only the two sentinels are linked in `list`.
    pub fn list_is_empty(&self, list: ListHandle) -> bool {
        self.nodes[list.head.0].next == list.tail
    }

    /// First value node of `list` (the one right after the head sentinel).
    pub fn front(&self, list: ListHandle) -> Option<NodeId> {
        let first = self.nodes[list.head.0].next;
        (first != list.tail).then_some(first)
    }

    /// Last value node of `list` (the one right before the tail sentinel).
    pub fn back(&self, list: ListHandle) -> Option<NodeId> {
        let last = self.nodes[list.tail.0].prev;
        (last != list.head).then_some(last)
    }

    /// Allocates a node holding `value` and links it at the back of `list`.
    pub fn push_back(&mut self, list: ListHandle, value: T) -> NodeId {
        let id = self.alloc(Some(value));
        self.len += 1;
        self.link_before(list.tail, id);
        id
    }

    /// Links a detached node at the back of `list`.
    pub fn link_back(&mut self, list: ListHandle, id: NodeId) {
        debug_assert!(self.is_detached(id), "node {} is still linked", id.0);
        self.link_before(list.tail, id);
    }

    /// Detaches a value node from whatever list it is in. The node stays
    /// allocated and can be re-linked with [`link_back`](Self::link_back).
    pub fn unlink(&mut self, id: NodeId) {
        debug_assert!(
            self.nodes[id.0].value.is_some(),
            "node {} is a sentinel or a freed slot",
            id.0
        );
        let (prev, next) = {
            let node = &self.nodes[id.0];
            (node.prev, node.next)
        };
        self.nodes[prev.0].next = next;
        self.nodes[next.0].prev = prev;
        let node = &mut self.nodes[id.0];
        node.prev = id;
        node.next = id;
    }

    /// Moves a linked node to the back of `list`.
    pub fn move_to_back(&mut self, list: ListHandle, id: NodeId) {
        if self.nodes[list.tail.0].prev == id {
            return;
        }
        self.unlink(id);
        self.link_before(list.tail, id);
    }

    /// Unlinks and frees a value node, returning its value.
    pub fn remove(&mut self, id: NodeId) -> Option<T> {
        self.nodes.get(id.0)?.value.as_ref()?;
        self.unlink(id);
        self.len -= 1;
        self.free_slot(id)
    }

    /// Returns the value stored at `id`, or `None` for sentinels and freed
    /// slots.
    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.nodes.get(id.0).and_then(|node| node.value.as_ref())
    }

    /// Mutable variant of [`get`](Self::get).
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.nodes.get_mut(id.0).and_then(|node| node.value.as_mut())
    }

    /// Drops every node, sentinels included. All outstanding handles become
    /// invalid; callers must allocate fresh lists.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.len = 0;
    }

    /// Iterates the value nodes of `list` from front to back.
    pub fn iter(&self, list: ListHandle) -> ListIter<'_, T> {
        ListIter {
            store: self,
            current: self.nodes[list.head.0].next,
            tail: list.tail,
        }
    }

    /// Walks `list` checking link symmetry and returns its length.
    pub fn validate_list(&self, list: ListHandle) -> Result<usize, InvariantError> {
        ensure_invariant!(
            self.nodes[list.head.0].value.is_none() && self.nodes[list.tail.0].value.is_none(),
            "list sentinels {}/{} carry values",
            list.head.0,
            list.tail.0
        );
        let mut count = 0usize;
        let mut prev = list.head;
        let mut current = self.nodes[list.head.0].next;
        while current != list.tail {
            let node = &self.nodes[current.0];
            ensure_invariant!(node.value.is_some(), "node {} in list has no value", current.0);
            ensure_invariant!(
                node.prev == prev,
                "node {} prev link is {}, expected {}",
                current.0,
                node.prev.0,
                prev.0
            );
            count += 1;
            ensure_invariant!(count <= self.len, "cycle detected in list");
            prev = current;
            current = node.next;
        }
        ensure_invariant!(
            self.nodes[list.tail.0].prev == prev,
            "tail sentinel prev link is {}, expected {}",
            self.nodes[list.tail.0].prev.0,
            prev.0
        );
        Ok(count)
    }

    fn alloc(&mut self, value: Option<T>) -> NodeId {
        if let Some(id) = self.free.pop() {
            let node = &mut self.nodes[id.0];
            node.value = value;
            node.prev = id;
            node.next = id;
            id
        } else {
            let id = NodeId(self.nodes.len());
            self.nodes.push(Node {
                value,
                prev: id,
                next: id,
            });
            id
        }
    }

    fn free_slot(&mut self, id: NodeId) -> Option<T> {
        let node = &mut self.nodes[id.0];
        node.prev = id;
        node.next = id;
        self.free.push(id);
        node.value.take()
    }

    fn is_detached(&self, id: NodeId) -> bool {
        let node = &self.nodes[id.0];
        node.prev == id && node.next == id
    }

    fn link_before(&mut self, anchor: NodeId, id: NodeId) {
        let prev = self.nodes[anchor.0].prev;
        let node = &mut self.nodes[id.0];
        node.prev = prev;
        node.next = anchor;
        self.nodes[prev.0].next = id;
        self.nodes[anchor.0].prev = id;
    }
}

impl<T> Default for NodeStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over `(NodeId, &T)` pairs of one list, front to back.
pub struct ListIter<'a, T> {
    store: &'a NodeStore<T>,
    current: NodeId,
    tail: NodeId,
}

impl<'a, T> Iterator for ListIter<'a, T> {
    type Item = (NodeId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        if self.current == self.tail {
            return None;
        }
        let id = self.current;
        let node = &self.store.nodes[id.0];
        self.current = node.next;
        node.value.as_ref().map(|value| (id, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values<T: Copy>(store: &NodeStore<T>, list: ListHandle) -> Vec<T> {
        store.iter(list).map(|(_, v)| *v).collect()
    }

    #[test]
    fn new_list_is_empty_and_bounded_by_sentinels() {
        let mut store: NodeStore<u32> = NodeStore::new();
        let list = store.new_list();

        assert!(store.list_is_empty(list));
        assert_eq!(store.front(list), None);
        assert_eq!(store.back(list), None);
        assert_eq!(store.len(), 0);
        assert_eq!(store.validate_list(list), Ok(0));
    }

    #[test]
    fn push_back_appends_in_order() {
        let mut store = NodeStore::new();
        let list = store.new_list();
        let a = store.push_back(list, "a");
        store.push_back(list, "b");
        let c = store.push_back(list, "c");

        assert_eq!(values(&store, list), vec!["a", "b", "c"]);
        assert_eq!(store.front(list), Some(a));
        assert_eq!(store.back(list), Some(c));
        assert_eq!(store.len(), 3);
        assert_eq!(store.validate_list(list), Ok(3));
    }

    #[test]
    fn move_to_back_reorders() {
        let mut store = NodeStore::new();
        let list = store.new_list();
        let a = store.push_back(list, 1);
        let b = store.push_back(list, 2);
        store.push_back(list, 3);

        store.move_to_back(list, a);
        assert_eq!(values(&store, list), vec![2, 3, 1]);

        // Already at the back: no-op.
        store.move_to_back(list, a);
        assert_eq!(values(&store, list), vec![2, 3, 1]);

        store.move_to_back(list, b);
        assert_eq!(values(&store, list), vec![3, 1, 2]);
        assert_eq!(store.validate_list(list), Ok(3));
    }

    #[test]
    fn unlink_and_relink_across_lists() {
        let mut store = NodeStore::new();
        let low = store.new_list();
        let high = store.new_list();
        let a = store.push_back(low, 'a');
        store.push_back(low, 'b');

        store.unlink(a);
        store.link_back(high, a);

        assert_eq!(values(&store, low), vec!['b']);
        assert_eq!(values(&store, high), vec!['a']);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn remove_frees_and_recycles_slot() {
        let mut store = NodeStore::new();
        let list = store.new_list();
        let a = store.push_back(list, 10);
        store.push_back(list, 20);

        assert_eq!(store.remove(a), Some(10));
        assert_eq!(store.get(a), None);
        assert_eq!(store.remove(a), None);
        assert_eq!(store.len(), 1);

        let c = store.push_back(list, 30);
        assert_eq!(c.index(), a.index());
        assert_eq!(values(&store, list), vec![20, 30]);
    }

    #[test]
    fn sentinels_are_not_values() {
        let mut store: NodeStore<u8> = NodeStore::new();
        let list = store.new_list();
        assert_eq!(store.get(list.head), None);
        assert_eq!(store.get(list.tail), None);
        assert_eq!(store.remove(list.head), None);
    }

    #[test]
    fn release_list_recycles_sentinels() {
        let mut store: NodeStore<u8> = NodeStore::new();
        let first = store.new_list();
        store.release_list(first);
        let second = store.new_list();
        assert!(store.list_is_empty(second));
        assert_eq!(store.validate_list(second), Ok(0));
    }

    #[test]
    fn get_mut_updates_in_place() {
        let mut store = NodeStore::new();
        let list = store.new_list();
        let id = store.push_back(list, 1);
        if let Some(value) = store.get_mut(id) {
            *value = 5;
        }
        assert_eq!(store.get(id), Some(&5));
    }

    #[test]
    fn clear_drops_everything() {
        let mut store = NodeStore::with_capacity(4);
        let list = store.new_list();
        store.push_back(list, 1);
        store.push_back(list, 2);
        store.clear();
        assert!(store.is_empty());

        let list = store.new_list();
        assert!(store.list_is_empty(list));
    }
}
