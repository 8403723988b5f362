use super::*;

// ============================================================================
// Alignment and bounds
// ============================================================================

#[test]
fn test_allocations_are_aligned_and_in_bounds() {
    let mut ring = RingBuffer::new(4096);
    for (size, align) in [(3u32, 1u32), (100, 16), (7, 256), (64, 64), (1, 4), (255, 32)] {
        let before = ring.generation();
        let alloc = ring.allocate(size, align);
        assert_eq!(alloc.offset % align, 0);
        assert!(alloc.offset + size <= ring.capacity());
        assert_eq!(ring.generation(), before);
        // Frame-sized consumer syncs immediately so nothing grows
        ring.sync_to(ring.mark());
    }
}

#[test]
fn test_consecutive_allocations_do_not_overlap() {
    let mut ring = RingBuffer::new(1024);
    let a = ring.allocate(100, 16);
    let b = ring.allocate(100, 16);
    assert_eq!(a.offset, 0);
    assert_eq!(b.offset, 112);
    assert_eq!(ring.cursor(), 212);
}

#[test]
#[should_panic(expected = "not a power of two")]
fn test_non_pow2_alignment_panics() {
    RingBuffer::new(1024).allocate(16, 12);
}

#[test]
#[should_panic(expected = "zero-sized")]
fn test_zero_size_panics() {
    RingBuffer::new(1024).allocate(0, 4);
}

// ============================================================================
// Wraparound
// ============================================================================

#[test]
fn test_wraps_to_start_instead_of_straddling_end() {
    let mut ring = RingBuffer::new(1024);
    ring.allocate(900, 4);
    ring.sync_to(ring.mark());

    let alloc = ring.allocate(200, 4);
    assert_eq!(alloc.offset, 0);
    assert_eq!(alloc.grown_to, None);
    assert_eq!(ring.cursor(), 1024 + 200);
}

#[test]
fn test_allocation_ending_exactly_at_capacity_does_not_wrap() {
    let mut ring = RingBuffer::new(1024);
    ring.allocate(512, 4);
    ring.sync_to(ring.mark());
    let alloc = ring.allocate(512, 4);
    assert_eq!(alloc.offset, 512);
    assert_eq!(alloc.grown_to, None);
}

// ============================================================================
// Growth
// ============================================================================

#[test]
fn test_request_larger_than_capacity_grows_to_next_pow2() {
    let mut ring = RingBuffer::new(1024);
    ring.allocate(100, 4);

    let alloc = ring.allocate(3000, 4);
    assert_eq!(alloc.grown_to, Some(4096));
    assert_eq!(alloc.offset, 0);
    assert_eq!(ring.capacity(), 4096);
    assert_eq!(ring.cursor(), 3000);
    assert_eq!(ring.generation(), 1);
    assert_eq!(ring.capacity_of(0), Some(1024));
    assert_eq!(ring.capacity_of(1), Some(4096));
    assert_eq!(ring.capacity_of(2), None);
}

#[test]
fn test_overrunning_sync_horizon_grows() {
    let mut ring = RingBuffer::new(1024);
    // Nothing is ever synced: the second lap would overwrite in-flight data
    ring.allocate(600, 4);
    let alloc = ring.allocate(600, 4);
    assert_eq!(alloc.grown_to, Some(2048));
    assert_eq!(alloc.offset, 0);
    assert_eq!(ring.cursor(), 600);
    assert_eq!(ring.last_synced(), 0);
}

#[test]
fn test_synced_ring_reuses_space_without_growing() {
    let mut ring = RingBuffer::new(1024);
    for _ in 0..10 {
        let alloc = ring.allocate(600, 4);
        assert_eq!(alloc.grown_to, None);
        ring.sync_to(ring.mark());
    }
    assert_eq!(ring.capacity(), 1024);
    assert_eq!(ring.generation(), 0);
}

#[test]
fn test_marks_from_previous_generation_are_ignored() {
    let mut ring = RingBuffer::new(1024);
    ring.allocate(500, 4);
    let old = ring.mark();
    ring.allocate(2000, 4);
    ring.sync_to(old);
    assert_eq!(ring.last_synced(), 0);
    assert_eq!(ring.in_flight(), 2000);
}

#[test]
fn test_sync_never_moves_backwards() {
    let mut ring = RingBuffer::new(1024);
    ring.allocate(100, 4);
    let early = ring.mark();
    ring.allocate(100, 4);
    ring.sync_to(ring.mark());
    ring.sync_to(early);
    assert_eq!(ring.last_synced(), 200);
}

// ============================================================================
// Checkpoints and limits
// ============================================================================

#[test]
fn test_restore_undoes_growth() {
    let mut ring = RingBuffer::new(1024);
    ring.allocate(100, 4);
    let checkpoint = ring.checkpoint();

    let alloc = ring.allocate(5000, 4);
    assert_eq!(alloc.grown_to, Some(8192));
    assert_eq!(ring.generation(), 1);

    ring.restore(checkpoint);
    assert_eq!(ring.capacity(), 1024);
    assert_eq!(ring.generation(), 0);
    assert_eq!(ring.capacity_of(1), None);
    assert_eq!(ring.cursor(), 100);
    assert_eq!(ring.allocate(100, 4).offset, 100);
}

#[test]
#[should_panic(expected = "32-bit capacity limit")]
fn test_request_past_u32_capacity_panics() {
    let mut ring = RingBuffer::new(1024);
    ring.allocate(u32::MAX - 10, 4);
}

#[test]
#[should_panic(expected = "cannot grow past the 32-bit capacity limit")]
fn test_doubling_past_u32_capacity_panics() {
    let mut ring = RingBuffer::new(1 << 31);
    ring.allocate(1 << 31, 4);
    ring.allocate(1 << 31, 4);
}
