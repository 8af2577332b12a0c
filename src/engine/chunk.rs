//! # Storage Chunk
//!
//! A chunk is one fixed-size, 64-byte-aligned block of raw bytes partitioned
//! into equal-sized entity slots, together with a free-slot pool. Chunks know
//! nothing about entities or component layouts; the chunk list one level up
//! owns that mapping.
//!
//! ## Slot allocation policy
//! The free pool is a **min-heap**, so allocation always returns the lowest
//! free slot index. Holes left by deallocation are therefore filled first,
//! which biases live data toward the front of the chunk and lets compaction
//! detect re-locatable slots by comparing allocation indices.
//!
//! ## Memory
//! A chunk's region comes either from the system aligned allocator
//! (zero-filled) or from a shared [`ChunkPool`]. Pooled regions may carry
//! stale bytes from a previous tenant; slot contents are meaningless until a
//! component is constructed in them either way.

use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::ptr::NonNull;
use std::sync::Arc;

use log::warn;

use crate::engine::pool::ChunkPool;
use crate::engine::types::{SlotIndex, CHUNK_ALIGNMENT, CHUNK_SIZE};

enum ChunkMemory {
    System(NonNull<u8>),
    Pooled {
        region: NonNull<u8>,
        pool: Arc<ChunkPool>,
    },
}

/// Fixed-size aligned block of entity slots with a min-heap free pool.
///
/// ## Invariants
/// - `free_slots` holds exactly the indices in `[0, capacity)` that are not
///   currently allocated.
/// - One trailing slot beyond `capacity` is reserved as scratch space for
///   in-chunk data shuffles and is never handed out.
/// - The region base is aligned to [`CHUNK_ALIGNMENT`].

pub struct Chunk {
    memory: ChunkMemory,
    slot_size: usize,
    capacity: usize,
    free_slots: BinaryHeap<Reverse<SlotIndex>>,
}

// SAFETY: the chunk exclusively owns its region; shared references only read.
unsafe impl Send for Chunk {}
unsafe impl Sync for Chunk {}

impl Chunk {
    /// Creates a chunk partitioned into slots of `slot_size` bytes.
    ///
    /// ## Behavior
    /// Capacity is `CHUNK_SIZE / slot_size - 1`; the last slot is reserved as
    /// scratch. The region is taken from `pool` when one is supplied and has
    /// a free region, otherwise from the system aligned allocator.
    ///
    /// ## Panics
    /// Panics if `slot_size` is zero or too large to leave at least one
    /// usable slot.

    pub fn new(slot_size: usize, pool: Option<&Arc<ChunkPool>>) -> Self {
        assert!(
            slot_size > 0 && CHUNK_SIZE / slot_size >= 2,
            "slot size {slot_size} leaves no usable slots in a {CHUNK_SIZE}-byte chunk"
        );
        let capacity = CHUNK_SIZE / slot_size - 1;

        let memory = match pool {
            Some(pool) => match pool.acquire() {
                Some(region) => ChunkMemory::Pooled {
                    region,
                    pool: Arc::clone(pool),
                },
                None => {
                    warn!("chunk pool exhausted; falling back to the system allocator");
                    ChunkMemory::System(alloc_chunk_region())
                }
            },
            None => ChunkMemory::System(alloc_chunk_region()),
        };

        let mut free_slots = BinaryHeap::with_capacity(capacity);
        for slot in 0..capacity as SlotIndex {
            free_slots.push(Reverse(slot));
        }

        Self {
            memory,
            slot_size,
            capacity,
            free_slots,
        }
    }

    /// Pops the lowest free slot index.
    ///
    /// ## Panics
    /// Calling this on a full chunk is a caller bug; the chunk list is
    /// responsible for selecting a non-full chunk first.

    pub fn allocate(&mut self) -> SlotIndex {
        let Reverse(slot) = self
            .free_slots
            .pop()
            .expect("allocate called on a full chunk");
        slot
    }

    /// Returns a slot index to the free pool.
    ///
    /// ## Invariants
    /// `slot` must be in range and currently allocated (debug-checked).

    pub fn deallocate(&mut self, slot: SlotIndex) {
        debug_assert!(
            (slot as usize) < self.capacity,
            "slot {slot} out of range"
        );
        debug_assert!(
            !self.free_slots.iter().any(|&Reverse(free)| free == slot),
            "slot {slot} freed twice"
        );
        self.free_slots.push(Reverse(slot));
    }

    /// Returns the base address of a slot.
    #[inline]
    pub fn address_of(&self, slot: SlotIndex) -> NonNull<u8> {
        debug_assert!((slot as usize) < self.capacity, "slot {slot} out of range");
        // SAFETY: slot * slot_size stays strictly inside the region because
        // capacity excludes the trailing scratch slot.
        unsafe {
            NonNull::new_unchecked(self.base().as_ptr().add(slot as usize * self.slot_size))
        }
    }

    /// Returns the number of allocatable slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of slots currently allocated.
    #[inline]
    pub fn len(&self) -> usize {
        self.capacity - self.free_slots.len()
    }

    /// Returns `true` if no slot is allocated.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.free_slots.len() == self.capacity
    }

    /// Returns `true` if every slot is allocated.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.free_slots.is_empty()
    }

    /// Returns the slot stride in bytes.
    #[inline]
    pub fn slot_size(&self) -> usize {
        self.slot_size
    }

    #[inline]
    fn base(&self) -> NonNull<u8> {
        match &self.memory {
            ChunkMemory::System(base) => *base,
            ChunkMemory::Pooled { region, .. } => *region,
        }
    }
}

impl Drop for Chunk {
    fn drop(&mut self) {
        match &self.memory {
            // SAFETY: the region was allocated with `chunk_layout`.
            ChunkMemory::System(base) => unsafe {
                dealloc(base.as_ptr(), chunk_layout());
            },
            ChunkMemory::Pooled { region, pool } => pool.release(*region),
        }
    }
}

fn alloc_chunk_region() -> NonNull<u8> {
    let layout = chunk_layout();
    // SAFETY: the layout has non-zero size.
    let raw = unsafe { alloc_zeroed(layout) };
    match NonNull::new(raw) {
        Some(base) => base,
        None => handle_alloc_error(layout),
    }
}

#[inline]
fn chunk_layout() -> Layout {
    // Size and alignment validity are guaranteed by the compile-time checks
    // in `types`.
    // SAFETY: CHUNK_ALIGNMENT is a power of two and CHUNK_SIZE does not
    // overflow when rounded up to it.
    unsafe { Layout::from_size_align_unchecked(CHUNK_SIZE, CHUNK_ALIGNMENT) }
}
