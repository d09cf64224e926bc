//! LRU List Module
//!
//! Arena-backed doubly linked list that keeps items in recency order.
//!
//! Items live in a `Vec` of slots and link to each other by slot index, so
//! moving an item to the front is O(1) without shared mutable references.
//! Freed slots are recycled through a free list, which keeps slot indices
//! stable for as long as an item is linked.

// == Slot ==
#[derive(Debug)]
struct Slot<T> {
    item: Option<T>,
    prev: Option<usize>,
    next: Option<usize>,
}

// == Recency List ==
/// Recency-ordered list of items.
///
/// - Front = most recently used
/// - Back = least recently used
#[derive(Debug)]
pub struct RecencyList<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<T> Default for RecencyList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RecencyList<T> {
    // == Constructor ==
    /// Creates a new empty list.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty list with room for `capacity` items.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    // == Push Front ==
    /// Links `item` as the most recently used and returns its slot.
    pub fn push_front(&mut self, item: T) -> usize {
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot].item = Some(item);
                slot
            }
            None => {
                self.slots.push(Slot {
                    item: Some(item),
                    prev: None,
                    next: None,
                });
                self.slots.len() - 1
            }
        };

        self.link_front(slot);
        self.len += 1;
        slot
    }

    // == Move To Front ==
    /// Marks the item in `slot` as most recently used.
    ///
    /// Unknown or vacant slots are ignored.
    pub fn move_to_front(&mut self, slot: usize) {
        if !self.is_occupied(slot) || self.head == Some(slot) {
            return;
        }
        self.unlink(slot);
        self.link_front(slot);
    }

    // == Remove ==
    /// Unlinks the item in `slot` and returns it.
    pub fn remove(&mut self, slot: usize) -> Option<T> {
        if !self.is_occupied(slot) {
            return None;
        }
        self.unlink(slot);
        self.len -= 1;
        self.free.push(slot);
        self.slots[slot].item.take()
    }

    // == Pop Back ==
    /// Removes and returns the least recently used item.
    ///
    /// Returns None if the list is empty.
    pub fn pop_back(&mut self) -> Option<T> {
        let tail = self.tail?;
        self.remove(tail)
    }

    // == Peek ==
    /// Slot of the most recently used item.
    pub fn front(&self) -> Option<usize> {
        self.head
    }

    /// Slot of the least recently used item.
    pub fn back(&self) -> Option<usize> {
        self.tail
    }

    /// Item stored in `slot`, if occupied.
    pub fn get(&self, slot: usize) -> Option<&T> {
        self.slots.get(slot).and_then(|s| s.item.as_ref())
    }

    /// Mutable item stored in `slot`, if occupied.
    pub fn get_mut(&mut self, slot: usize) -> Option<&mut T> {
        self.slots.get_mut(slot).and_then(|s| s.item.as_mut())
    }

    // == Length ==
    /// Returns the number of linked items.
    pub fn len(&self) -> usize {
        self.len
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    // == Clear ==
    /// Drops every item and releases all slots.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    // == Iterate ==
    /// Iterates `(slot, item)` pairs from least to most recently used.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            cursor: self.tail,
        }
    }

    fn is_occupied(&self, slot: usize) -> bool {
        self.slots.get(slot).is_some_and(|s| s.item.is_some())
    }

    fn link_front(&mut self, slot: usize) {
        self.slots[slot].prev = None;
        self.slots[slot].next = self.head;

        if let Some(head) = self.head {
            self.slots[head].prev = Some(slot);
        }
        self.head = Some(slot);

        if self.tail.is_none() {
            self.tail = Some(slot);
        }
    }

    fn unlink(&mut self, slot: usize) {
        let prev = self.slots[slot].prev.take();
        let next = self.slots[slot].next.take();

        match prev {
            Some(prev) => self.slots[prev].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.slots[next].prev = prev,
            None => self.tail = prev,
        }
    }
}

// == Iterator ==
/// Iterator from least recently used to most recently used.
pub struct Iter<'a, T> {
    list: &'a RecencyList<T>,
    cursor: Option<usize>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (usize, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.cursor?;
        let list = self.list;
        let node = &list.slots[slot];
        self.cursor = node.prev;
        node.item.as_ref().map(|item| (slot, item))
    }
}
