//! An addressable priority queue implemented with a 4-ary heap.
//!
//! Every element maps to a unique index in `[0, max_index)` through the `Indexing` trait.
//! That allows checking membership and decreasing keys in place, which is all
//! Dijkstra-style searches need from their frontier.
//!
//! # Examples
//!
//! ```
//! use routeiq::datastr::index_heap::{Indexing, IndexdMinHeap};
//!
//! #[derive(Copy, Clone, Eq, PartialEq, Debug, Ord, PartialOrd)]
//! pub struct State {
//!     pub distance: usize,
//!     pub node: usize,
//! }
//!
//! impl Indexing for State {
//!     fn as_index(&self) -> usize {
//!         self.node
//!     }
//! }
//!
//! let mut heap = IndexdMinHeap::new(3);
//! heap.push(State { node: 0, distance: 42 });
//! heap.push(State { node: 1, distance: 23 });
//! heap.push(State { node: 2, distance: 50000 });
//! assert_eq!(heap.peek().cloned(), Some(State { node: 1, distance: 23 }));
//! heap.decrease_key(State { node: 0, distance: 1 });
//! assert_eq!(heap.pop(), Some(State { node: 0, distance: 1 }));
//! ```

/// Maps heap elements to a unique `usize` index.
pub trait Indexing {
    fn as_index(&self) -> usize;
}

/// Min-heap over elements with ids from 0 to `max_id - 1`.
/// Elements are ordered ascending by their `Ord` implementation.
#[derive(Debug, Clone)]
pub struct IndexdMinHeap<T> {
    positions: Vec<usize>,
    data: Vec<T>,
}

const TREE_ARITY: usize = 4;
const INVALID_POSITION: usize = usize::MAX;

impl<T: Ord + Indexing> IndexdMinHeap<T> {
    pub fn new(max_id: usize) -> IndexdMinHeap<T> {
        IndexdMinHeap {
            positions: vec![INVALID_POSITION; max_id],
            data: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn contains_index(&self, id: usize) -> bool {
        self.positions[id] != INVALID_POSITION
    }

    pub fn clear(&mut self) {
        for element in &self.data {
            self.positions[element.as_index()] = INVALID_POSITION;
        }
        self.data.clear();
    }

    pub fn peek(&self) -> Option<&T> {
        self.data.first()
    }

    /// Removes the smallest element.
    pub fn pop(&mut self) -> Option<T> {
        if self.data.is_empty() {
            return None;
        }
        let last = self.data.len() - 1;
        self.swap(0, last);
        let min = self.data.pop()?;
        self.positions[min.as_index()] = INVALID_POSITION;
        if !self.data.is_empty() {
            self.move_down_in_tree(0);
        }
        Some(min)
    }

    /// Pushes an element. Panics if an element with the same index is already contained.
    pub fn push(&mut self, element: T) {
        assert!(!self.contains_index(element.as_index()));
        let position = self.data.len();
        self.positions[element.as_index()] = position;
        self.data.push(element);
        self.move_up_in_tree(position);
    }

    /// Replaces the element with the same index by a smaller one.
    /// Does nothing if the new element is not smaller.
    pub fn decrease_key(&mut self, element: T) {
        let position = self.positions[element.as_index()];
        if element < self.data[position] {
            self.data[position] = element;
            self.move_up_in_tree(position);
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.data.swap(a, b);
        self.positions[self.data[a].as_index()] = a;
        self.positions[self.data[b].as_index()] = b;
    }

    fn move_up_in_tree(&mut self, mut position: usize) {
        while position > 0 {
            let parent = (position - 1) / TREE_ARITY;
            if self.data[parent] <= self.data[position] {
                break;
            }
            self.swap(parent, position);
            position = parent;
        }
    }

    fn move_down_in_tree(&mut self, mut position: usize) {
        loop {
            let first_child = TREE_ARITY * position + 1;
            let last_child = (first_child + TREE_ARITY).min(self.data.len());
            let smallest_child = (first_child..last_child).min_by(|&a, &b| self.data[a].cmp(&self.data[b]));

            match smallest_child {
                Some(child) if self.data[child] < self.data[position] => {
                    self.swap(child, position);
                    position = child;
                }
                _ => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Copy, Clone, Eq, PartialEq, Debug, Ord, PartialOrd)]
    struct State {
        distance: u32,
        node: usize,
    }

    impl Indexing for State {
        fn as_index(&self) -> usize {
            self.node
        }
    }

    #[test]
    fn pops_in_ascending_order() {
        let mut heap = IndexdMinHeap::new(10);
        for (node, distance) in [7, 3, 9, 1, 4, 8, 2, 6, 5, 0].iter().enumerate() {
            heap.push(State { distance: *distance, node });
        }
        let order: Vec<u32> = std::iter::from_fn(|| heap.pop()).map(|s| s.distance).collect();
        assert_eq!(order, (0..10).collect::<Vec<_>>());
        assert!(heap.is_empty());
    }

    #[test]
    fn decrease_key_moves_element_to_front() {
        let mut heap = IndexdMinHeap::new(4);
        heap.push(State { distance: 10, node: 0 });
        heap.push(State { distance: 20, node: 1 });
        heap.push(State { distance: 30, node: 2 });
        heap.decrease_key(State { distance: 5, node: 2 });
        heap.decrease_key(State { distance: 50, node: 1 });

        assert_eq!(heap.pop(), Some(State { distance: 5, node: 2 }));
        assert_eq!(heap.pop(), Some(State { distance: 10, node: 0 }));
        assert_eq!(heap.pop(), Some(State { distance: 20, node: 1 }));
        assert_eq!(heap.pop(), None);
    }

    #[test]
    fn clear_releases_indices() {
        let mut heap = IndexdMinHeap::new(2);
        heap.push(State { distance: 1, node: 1 });
        assert!(heap.contains_index(1));
        heap.clear();
        assert!(!heap.contains_index(1));
        heap.push(State { distance: 2, node: 1 });
        assert_eq!(heap.len(), 1);
    }
}
