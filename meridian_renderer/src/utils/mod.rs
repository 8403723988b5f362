//! Small shared utilities

mod retire_queue;
mod slot_allocator;

pub use retire_queue::RetireQueue;
pub use slot_allocator::SlotAllocator;
