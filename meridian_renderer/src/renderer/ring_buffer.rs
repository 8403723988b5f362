//! Ring-buffer sub-allocation math for ephemeral (per-frame) data
//!
//! The ring buffer itself is a native buffer owned by the device; this type
//! only tracks the write cursor, the synchronization horizon and the
//! capacity history. The cursor grows monotonically within a generation,
//! the physical offset of an allocation is `cursor % capacity`.

/// Result of a ring-buffer allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingAllocation {
    /// Byte offset inside the current ring buffer
    pub offset: u32,
    /// New capacity if the ring buffer had to be reallocated to satisfy the request
    pub grown_to: Option<u32>,
}

/// Position of the write cursor at some point in time
///
/// Recorded at the end of each frame and handed back to [`RingBuffer::sync_to`]
/// once the GPU is known to have finished that frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RingMark {
    generation: u32,
    cursor: u64,
}

/// Saved allocator state, see [`RingBuffer::checkpoint`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingCheckpoint {
    capacity: u32,
    cursor: u64,
    last_synced: u64,
    generations: usize,
}

#[derive(Debug)]
pub struct RingBuffer {
    capacity: u32,
    cursor: u64,
    last_synced: u64,
    /// Capacity of every generation so far, indexed by generation
    capacities: Vec<u32>,
}

impl RingBuffer {
    /// # Panics
    ///
    /// If `capacity` is zero.
    pub fn new(capacity: u32) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be non-zero");
        Self { capacity, cursor: 0, last_synced: 0, capacities: vec![capacity] }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn last_synced(&self) -> u64 {
        self.last_synced
    }

    /// Bytes written since the last synchronization point
    pub fn in_flight(&self) -> u64 {
        self.cursor - self.last_synced
    }

    /// Current generation; bumped every time the ring buffer is reallocated
    pub fn generation(&self) -> u32 {
        self.capacities.len() as u32 - 1
    }

    /// Capacity the ring buffer had in `generation`
    pub fn capacity_of(&self, generation: u32) -> Option<u32> {
        self.capacities.get(generation as usize).copied()
    }

    pub fn mark(&self) -> RingMark {
        RingMark { generation: self.generation(), cursor: self.cursor }
    }

    /// Advance the synchronization horizon to `mark`
    ///
    /// Marks from an earlier generation are ignored: a reallocated ring
    /// buffer starts with nothing in flight.
    pub fn sync_to(&mut self, mark: RingMark) {
        if mark.generation != self.generation() {
            return;
        }
        assert!(mark.cursor <= self.cursor, "ring buffer sync point ahead of the write cursor");
        self.last_synced = self.last_synced.max(mark.cursor);
    }

    /// Snapshot taken before an allocation whose growth may still fail natively
    pub fn checkpoint(&self) -> RingCheckpoint {
        RingCheckpoint {
            capacity: self.capacity,
            cursor: self.cursor,
            last_synced: self.last_synced,
            generations: self.capacities.len(),
        }
    }

    /// Undo every allocation and growth since `checkpoint`
    pub fn restore(&mut self, checkpoint: RingCheckpoint) {
        self.capacity = checkpoint.capacity;
        self.cursor = checkpoint.cursor;
        self.last_synced = checkpoint.last_synced;
        self.capacities.truncate(checkpoint.generations);
    }

    /// Carve `size` bytes aligned to `alignment` out of the ring
    ///
    /// Allocations never straddle the physical end of the buffer: when the
    /// aligned range would cross it, the cursor skips to the start of the
    /// next lap. The buffer grows to a larger power of two when the request
    /// exceeds the capacity, or when the cursor would overrun data the GPU
    /// may still be reading (one full capacity past the sync horizon).
    ///
    /// # Panics
    ///
    /// If `size` is zero, `alignment` is not a power of two, or the grown
    /// capacity would not fit in 32 bits.
    pub fn allocate(&mut self, size: u32, alignment: u32) -> RingAllocation {
        assert!(size > 0, "zero-sized ring buffer allocation");
        assert!(alignment.is_power_of_two(), "ring buffer alignment {} is not a power of two", alignment);

        let mut grown_to = None;
        let request = size.max(alignment);
        if request > self.capacity {
            let Some(new_capacity) = request.checked_next_power_of_two() else {
                panic!("ring buffer allocation of {} bytes exceeds the 32-bit capacity limit", size);
            };
            grown_to = Some(self.grow(new_capacity));
        }

        let capacity = self.capacity as u64;
        let add = alignment as u64 - 1;
        let mut aligned = (self.cursor + add) & !add;
        let mut begin = aligned % capacity;

        if begin + size as u64 > capacity {
            self.cursor = (self.cursor / capacity + 1) * capacity;
            aligned = (self.cursor + add) & !add;
            begin = aligned % capacity;
            debug_assert!(begin + size as u64 <= capacity);
        }
        self.cursor = aligned + size as u64;

        if self.cursor > self.last_synced + capacity {
            let (Some(doubled), Some(fitted)) = (self.capacity.checked_mul(2), size.checked_next_power_of_two()) else {
                panic!("ring buffer of {} bytes cannot grow past the 32-bit capacity limit", self.capacity);
            };
            grown_to = Some(self.grow(doubled.max(fitted)));
            begin = 0;
            self.cursor = size as u64;
        }

        RingAllocation { offset: begin as u32, grown_to }
    }

    fn grow(&mut self, new_capacity: u32) -> u32 {
        crate::render_warn!(
            "meridian::ring_buffer",
            "Out of ring buffer space, reallocating {} -> {} bytes",
            self.capacity,
            new_capacity
        );
        self.capacity = new_capacity;
        self.cursor = 0;
        self.last_synced = 0;
        self.capacities.push(new_capacity);
        new_capacity
    }
}

#[cfg(test)]
#[path = "ring_buffer_tests.rs"]
mod tests;
