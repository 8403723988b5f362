//! Handle-indexed slot storage for every GPU object kind
//!
//! Slots live in a growable array; freed slots are recycled through a
//! [`SlotAllocator`] free-list. Growth only appends, so an issued handle
//! keeps meaning the same slot until it is removed. Looking up a removed or
//! never-issued handle is a contract violation and panics.

use crate::handle::Handle;
use crate::utils::SlotAllocator;
use std::marker::PhantomData;

/// Table of `T` slots addressed by handles of type `H`
pub struct ResourceTable<H: Handle, T> {
    slots: Vec<Option<T>>,
    allocator: SlotAllocator,
    _handle: PhantomData<H>,
}

impl<H: Handle, T> ResourceTable<H, T> {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            allocator: SlotAllocator::new(),
            _handle: PhantomData,
        }
    }

    /// Store `value` in a fresh or recycled slot and return its handle
    pub fn insert(&mut self, value: T) -> H {
        let (index, generation) = self.allocator.alloc();
        let i = index as usize;
        if i == self.slots.len() {
            self.slots.push(Some(value));
        } else {
            debug_assert!(self.slots[i].is_none());
            self.slots[i] = Some(value);
        }
        H::from_parts(index, generation)
    }

    /// Add a default-initialized slot, returning it for filling in plus its handle
    pub fn add(&mut self) -> (&mut T, H)
    where
        T: Default,
    {
        let handle = self.insert(T::default());
        (self.get_mut(handle), handle)
    }

    fn checked_index(&self, handle: H) -> usize {
        let index = match handle.index() {
            Some(index) => index,
            None => panic!("invalid handle {:?}", handle),
        };
        assert!(
            self.allocator.is_live(index, handle.generation()),
            "stale or unknown handle {:?}",
            handle
        );
        index as usize
    }

    /// Shared access to a slot
    ///
    /// # Panics
    ///
    /// If the handle is the zero value, was removed, or was never issued.
    pub fn get(&self, handle: H) -> &T {
        let i = self.checked_index(handle);
        match &self.slots[i] {
            Some(value) => value,
            None => unreachable!("live slot {} is empty", i),
        }
    }

    /// Mutable access to a slot (same panics as [`get`](Self::get))
    pub fn get_mut(&mut self, handle: H) -> &mut T {
        let i = self.checked_index(handle);
        match &mut self.slots[i] {
            Some(value) => value,
            None => unreachable!("live slot {} is empty", i),
        }
    }

    /// Whether `handle` currently names a live slot
    pub fn contains(&self, handle: H) -> bool {
        handle
            .index()
            .is_some_and(|index| self.allocator.is_live(index, handle.generation()))
    }

    /// Remove a slot and hand its value back
    pub fn remove(&mut self, handle: H) -> T {
        let i = self.checked_index(handle);
        self.allocator.free(i as u32);
        match self.slots[i].take() {
            Some(value) => value,
            None => unreachable!("live slot {} is empty", i),
        }
    }

    /// Remove a slot after passing it to `destroy` (to release native objects)
    pub fn remove_with<F: FnOnce(T)>(&mut self, handle: H, destroy: F) {
        let value = self.remove(handle);
        destroy(value);
    }

    /// Drain every live slot through `destroy`, lowest index first
    pub fn clear_with<F: FnMut(H, T)>(&mut self, mut destroy: F) {
        let live: Vec<u32> = self.allocator.live_indices().collect();
        for index in live {
            let i = index as usize;
            let generation = self.allocator.generation(index);
            let handle = H::from_parts(index, generation);
            self.allocator.free(index);
            if let Some(value) = self.slots[i].take() {
                destroy(handle, value);
            }
        }
    }

    /// Iterate over live slots
    pub fn iter(&self) -> impl Iterator<Item = (H, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(move |(i, slot)| {
            slot.as_ref()
                .map(|value| (H::from_parts(i as u32, self.allocator.generation(i as u32)), value))
        })
    }

    /// Number of live slots
    pub fn len(&self) -> usize {
        self.allocator.len() as usize
    }

    /// Whether the table has no live slots
    pub fn is_empty(&self) -> bool {
        self.allocator.is_empty()
    }
}

impl<H: Handle, T> Default for ResourceTable<H, T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "resource_table_tests.rs"]
mod tests;
