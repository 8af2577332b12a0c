//! # Chunk Pool
//!
//! A single large aligned arena carved into chunk-sized regions at
//! construction. Its only job is to front-end the per-chunk aligned
//! allocations with one big allocation; chunk behaviour is identical whether
//! a region comes from the pool or from the system allocator.
//!
//! ## Design
//! - The arena is allocated once, zero-filled, and carved into
//!   `CHUNK_SIZE`-byte regions.
//! - Free regions live in a `Mutex`-guarded stack; chunks hold an `Arc` to
//!   the pool and release their region on drop.
//! - When the arena is exhausted, [`ChunkPool::acquire`] returns `None` and
//!   the caller falls back to the system allocator.
//!
//! ## Invariants
//! - Every region handed out lies inside the arena at a `CHUNK_SIZE`-multiple
//!   offset, so it inherits the arena's 64-byte alignment.
//! - A region is either in the free stack or owned by exactly one live chunk.

use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use std::ptr::NonNull;
use std::sync::{Arc, Mutex};

use crate::engine::types::{CHUNK_ALIGNMENT, CHUNK_POOL_SIZE, CHUNK_SIZE};

/// Pre-allocated arena serving fixed-size chunk regions.
pub struct ChunkPool {
    base: NonNull<u8>,
    arena_size: usize,
    free_regions: Mutex<Vec<NonNull<u8>>>,
}

// SAFETY: the arena is owned exclusively by the pool and region hand-out is
// serialized by the mutex.
unsafe impl Send for ChunkPool {}
unsafe impl Sync for ChunkPool {}

impl ChunkPool {
    /// Creates a pool with the default arena size.
    pub fn new() -> Arc<Self> {
        Self::with_arena_size(CHUNK_POOL_SIZE)
    }

    /// Creates a pool over an arena of `arena_size` bytes.
    ///
    /// ## Behavior
    /// Allocates one zero-filled region aligned to the chunk alignment and
    /// carves it into `arena_size / CHUNK_SIZE` regions, all initially free.
    ///
    /// ## Panics
    /// Panics if `arena_size` is zero or not a multiple of the chunk size.
    /// Allocation failure is reported through the global allocation error
    /// handler.

    pub fn with_arena_size(arena_size: usize) -> Arc<Self> {
        assert!(
            arena_size > 0 && arena_size % CHUNK_SIZE == 0,
            "arena size {arena_size} is not a positive multiple of the chunk size"
        );

        let layout = arena_layout(arena_size);
        // SAFETY: the layout has non-zero size.
        let raw = unsafe { alloc_zeroed(layout) };
        let base = match NonNull::new(raw) {
            Some(base) => base,
            None => handle_alloc_error(layout),
        };

        let region_count = arena_size / CHUNK_SIZE;
        let mut free_regions = Vec::with_capacity(region_count);
        for region in (0..region_count).rev() {
            // SAFETY: every offset stays inside the freshly allocated arena.
            let ptr = unsafe { NonNull::new_unchecked(base.as_ptr().add(region * CHUNK_SIZE)) };
            free_regions.push(ptr);
        }

        Arc::new(Self {
            base,
            arena_size,
            free_regions: Mutex::new(free_regions),
        })
    }

    /// Hands out one free chunk region, lowest address first.
    ///
    /// Returns `None` when the arena is exhausted.

    pub fn acquire(&self) -> Option<NonNull<u8>> {
        let mut free_regions = self
            .free_regions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        free_regions.pop()
    }

    /// Returns a region to the pool.
    ///
    /// ## Invariants
    /// `region` must have been produced by [`ChunkPool::acquire`] on this pool
    /// and must not be returned twice (debug-checked).

    pub fn release(&self, region: NonNull<u8>) {
        let offset = (region.as_ptr() as usize).wrapping_sub(self.base.as_ptr() as usize);
        debug_assert!(
            offset < self.arena_size && offset % CHUNK_SIZE == 0,
            "released region does not belong to this pool"
        );

        let mut free_regions = self
            .free_regions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        debug_assert!(
            !free_regions.contains(&region),
            "region released twice"
        );
        free_regions.push(region);
    }

    /// Returns the number of regions currently available.
    pub fn free_region_count(&self) -> usize {
        self.free_regions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Returns the total number of regions the arena was carved into.
    #[inline]
    pub fn region_count(&self) -> usize {
        self.arena_size / CHUNK_SIZE
    }
}

impl Drop for ChunkPool {
    fn drop(&mut self) {
        // All chunks hold an Arc to the pool, so by the time this runs every
        // region has been released.
        // SAFETY: `base` was allocated with this exact layout.
        unsafe { dealloc(self.base.as_ptr(), arena_layout(self.arena_size)) };
    }
}

#[inline]
fn arena_layout(arena_size: usize) -> Layout {
    // Alignment validity is guaranteed by the compile-time checks in `types`.
    // SAFETY: CHUNK_ALIGNMENT is a power of two and the size was validated by
    // the caller.
    unsafe { Layout::from_size_align_unchecked(arena_size, CHUNK_ALIGNMENT) }
}
