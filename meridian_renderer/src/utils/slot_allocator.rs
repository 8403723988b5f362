/// Allocates and recycles slot indices, with a generation per slot.
///
/// Every `free` bumps the slot's generation, so an index handed out again
/// after recycling carries a different generation than before. Holders of a
/// stale `(index, generation)` pair can be detected with [`is_live`].
///
/// # Example
///
/// ```ignore
/// let mut alloc = SlotAllocator::new();
/// let a = alloc.alloc();  // (0, 0)
/// alloc.free(a.0);        // slot 0 -> generation 1
/// let b = alloc.alloc();  // (0, 1)
/// ```
///
/// [`is_live`]: SlotAllocator::is_live
pub struct SlotAllocator {
    free_list: Vec<u32>,
    generations: Vec<u32>,
    live: Vec<bool>,
    len: u32,
}

impl SlotAllocator {
    /// Create a new empty allocator
    pub fn new() -> Self {
        Self {
            free_list: Vec::new(),
            generations: Vec::new(),
            live: Vec::new(),
            len: 0,
        }
    }

    /// Allocate the next available slot, returning `(index, generation)`
    pub fn alloc(&mut self) -> (u32, u32) {
        self.len += 1;
        let index = self.free_list.pop().unwrap_or_else(|| {
            let id = self.generations.len() as u32;
            self.generations.push(0);
            self.live.push(false);
            id
        });
        self.live[index as usize] = true;
        (index, self.generations[index as usize])
    }

    /// Return a slot to the pool; its generation moves on
    pub fn free(&mut self, index: u32) {
        let i = index as usize;
        assert!(i < self.live.len() && self.live[i], "freeing a slot that is not allocated: {}", index);
        self.live[i] = false;
        self.generations[i] = self.generations[i].wrapping_add(1);
        self.len -= 1;
        self.free_list.push(index);
    }

    /// Whether `(index, generation)` names a currently allocated slot
    pub fn is_live(&self, index: u32, generation: u32) -> bool {
        let i = index as usize;
        i < self.live.len() && self.live[i] && self.generations[i] == generation
    }

    /// Current generation of a slot (the one a live handle must carry)
    pub fn generation(&self, index: u32) -> u32 {
        self.generations[index as usize]
    }

    /// Highest index ever allocated + 1.
    ///
    /// Minimum capacity the backing storage must have.
    pub fn high_water_mark(&self) -> u32 {
        self.generations.len() as u32
    }

    /// Indices of all live slots, in ascending order
    pub fn live_indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.live
            .iter()
            .enumerate()
            .filter(|(_, live)| **live)
            .map(|(i, _)| i as u32)
    }

    /// Number of currently allocated slots
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Whether no slots are currently allocated
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for SlotAllocator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "slot_allocator_tests.rs"]
mod tests;
