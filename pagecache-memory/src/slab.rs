// Copyright 2026 pagecache Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A slab of slots addressed by stable tokens, and a doubly linked list whose nodes live in such a slab.
//!
//! Tokens stay valid until the slot they address is removed, so owners can keep the token of a node and unlink it
//! in O(1) without any pointer into the list.

use std::num::NonZeroUsize;

use pagecache_common::strict_assert;

/// A stable address of a slot in a [`Slab`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token(NonZeroUsize);

impl Token {
    fn new(index: usize) -> Self {
        Self(NonZeroUsize::MIN.saturating_add(index))
    }

    /// Index of the slot.
    pub fn index(&self) -> usize {
        self.0.get() - 1
    }
}

#[derive(Debug, Clone)]
enum Entry<T> {
    Vacant(usize),
    Occupied(T),
}

/// Pre-allocated storage for a uniform data type.
#[derive(Debug)]
pub struct Slab<T> {
    entries: Vec<Entry<T>>,
    len: usize,
    next: usize,
}

impl<T> Default for Slab<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Slab<T> {
    /// Create an empty slab.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            len: 0,
            next: 0,
        }
    }

    /// Store `val` in a vacant slot and return its token.
    pub fn insert(&mut self, val: T) -> Token {
        let index = self.next;
        self.len += 1;

        if index == self.entries.len() {
            self.entries.push(Entry::Occupied(val));
            self.next = index + 1;
        } else {
            self.next = match self.entries[index] {
                Entry::Vacant(next) => next,
                Entry::Occupied(_) => unreachable!(),
            };
            self.entries[index] = Entry::Occupied(val);
        }

        Token::new(index)
    }

    /// Take the value out of the slot addressed by `token`.
    pub fn remove(&mut self, token: Token) -> Option<T> {
        let index = token.index();
        let entry = self.entries.get_mut(index)?;
        if matches!(entry, Entry::Vacant(_)) {
            return None;
        }

        match std::mem::replace(entry, Entry::Vacant(self.next)) {
            Entry::Occupied(val) => {
                self.len -= 1;
                self.next = index;
                Some(val)
            }
            Entry::Vacant(_) => unreachable!(),
        }
    }

    /// Get the value addressed by `token`.
    pub fn get(&self, token: Token) -> Option<&T> {
        match self.entries.get(token.index()) {
            Some(Entry::Occupied(val)) => Some(val),
            _ => None,
        }
    }

    /// Get the mutable value addressed by `token`.
    pub fn get_mut(&mut self, token: Token) -> Option<&mut T> {
        match self.entries.get_mut(token.index()) {
            Some(Entry::Occupied(val)) => Some(val),
            _ => None,
        }
    }

    /// Count of occupied slots.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[derive(Debug)]
struct Node<T> {
    val: T,
    prev: Option<Token>,
    next: Option<Token>,
}

/// A doubly linked list backed by a [`Slab`].
///
/// `push_back` returns the token of the new node, which can later be passed to [`SlabList::remove`].
#[derive(Debug)]
pub struct SlabList<T> {
    slab: Slab<Node<T>>,
    head: Option<Token>,
    tail: Option<Token>,
}

impl<T> Default for SlabList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SlabList<T> {
    /// Create an empty list.
    pub const fn new() -> Self {
        Self {
            slab: Slab::new(),
            head: None,
            tail: None,
        }
    }

    /// The first element.
    pub fn front(&self) -> Option<&T> {
        self.head.and_then(|token| self.slab.get(token)).map(|node| &node.val)
    }

    /// The last element.
    pub fn back(&self) -> Option<&T> {
        self.tail.and_then(|token| self.slab.get(token)).map(|node| &node.val)
    }

    /// Append `val` and return the token of its node.
    pub fn push_back(&mut self, val: T) -> Token {
        let token = self.slab.insert(Node {
            val,
            prev: self.tail,
            next: None,
        });
        match self.tail.and_then(|tail| self.slab.get_mut(tail)) {
            Some(tail) => tail.next = Some(token),
            None => self.head = Some(token),
        }
        self.tail = Some(token);
        token
    }

    /// Remove and return the first element.
    pub fn pop_front(&mut self) -> Option<T> {
        let head = self.head?;
        self.remove(head)
    }

    /// Unlink the node addressed by `token` and return its element.
    ///
    /// Returns `None` if the token does not address a live node.
    pub fn remove(&mut self, token: Token) -> Option<T> {
        let node = self.slab.remove(token)?;

        match node.prev.and_then(|prev| self.slab.get_mut(prev)) {
            Some(prev) => prev.next = node.next,
            None => {
                strict_assert!(self.head == Some(token));
                self.head = node.next;
            }
        }
        match node.next.and_then(|next| self.slab.get_mut(next)) {
            Some(next) => next.prev = node.prev,
            None => {
                strict_assert!(self.tail == Some(token));
                self.tail = node.prev;
            }
        }

        Some(node.val)
    }

    /// Remove every element, from front to back.
    pub fn drain(&mut self) -> Vec<T> {
        let mut res = Vec::with_capacity(self.len());
        while let Some(val) = self.pop_front() {
            res.push(val);
        }
        res
    }

    /// Iterate the elements from front to back.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            token: self.head,
        }
    }

    /// Count of elements.
    pub fn len(&self) -> usize {
        self.slab.len()
    }

    /// Returns `true` if the list has no element.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Front to back iterator of a [`SlabList`].
pub struct Iter<'a, T> {
    list: &'a SlabList<T>,
    token: Option<Token>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.list.slab.get(self.token?)?;
        self.token = node.next;
        Some(&node.val)
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::*;

    #[test]
    fn test_slab_reuse_vacant_slot() {
        let mut slab = Slab::new();
        let t1 = slab.insert(1);
        let t2 = slab.insert(2);
        let t3 = slab.insert(3);
        assert_eq!(slab.len(), 3);

        assert_eq!(slab.remove(t2), Some(2));
        assert_eq!(slab.remove(t2), None);
        assert_eq!(slab.get(t2), None);

        let t4 = slab.insert(4);
        assert_eq!(t4, t2);
        assert_eq!(slab.get(t1), Some(&1));
        assert_eq!(slab.get(t3), Some(&3));
        assert_eq!(slab.get(t4), Some(&4));

        *slab.get_mut(t1).unwrap() = 10;
        assert_eq!(slab.get(t1), Some(&10));
        assert_eq!(slab.len(), 3);
    }

    #[test]
    fn test_list_push_pop() {
        let mut list = SlabList::new();
        assert!(list.is_empty());
        assert_eq!(list.pop_front(), None);

        for i in 0..5 {
            list.push_back(i);
        }
        assert_eq!(list.front(), Some(&0));
        assert_eq!(list.back(), Some(&4));
        assert_eq!(list.iter().copied().collect_vec(), vec![0, 1, 2, 3, 4]);

        assert_eq!(list.pop_front(), Some(0));
        assert_eq!(list.pop_front(), Some(1));
        assert_eq!(list.len(), 3);
        assert_eq!(list.drain(), vec![2, 3, 4]);
        assert!(list.is_empty());
        assert_eq!(list.front(), None);
        assert_eq!(list.back(), None);
    }

    #[test]
    fn test_list_remove_by_token() {
        let mut list = SlabList::new();
        let tokens = (0..6).map(|i| list.push_back(i)).collect_vec();

        // middle, head, tail
        assert_eq!(list.remove(tokens[2]), Some(2));
        assert_eq!(list.remove(tokens[0]), Some(0));
        assert_eq!(list.remove(tokens[5]), Some(5));
        assert_eq!(list.remove(tokens[5]), None);
        assert_eq!(list.iter().copied().collect_vec(), vec![1, 3, 4]);
        assert_eq!(list.front(), Some(&1));
        assert_eq!(list.back(), Some(&4));

        let t = list.push_back(6);
        assert_eq!(list.iter().copied().collect_vec(), vec![1, 3, 4, 6]);
        assert_eq!(list.remove(t), Some(6));
        assert_eq!(list.back(), Some(&4));
    }
}
