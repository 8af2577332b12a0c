//! # Per-Archetype Chunk Storage
//!
//! A [`ChunkList`] is the storage body of one archetype: a growable sequence
//! of fixed-size chunks plus the slot layout shared by every entity of that
//! archetype. It provides entity-independent `(chunk, slot)` addressing; the
//! mapping from entities to allocations lives one level up, in the archive.
//!
//! ## Slot layout
//! Components are packed in the archetype's canonical order, each offset
//! rounded up to the component's alignment, and the total rounded up to the
//! largest alignment so the stride between slots preserves every component's
//! alignment. Combined with the 64-byte chunk base, every component address
//! handed out by this module is correctly aligned.
//!
//! ## Lifecycle discipline
//! This layer moves **bytes only**. Constructors and destructors are the
//! archive's responsibility; [`ChunkList::move_data`] and
//! [`ChunkList::relocate`] never run either.

use std::ptr::{self, NonNull};
use std::sync::Arc;

use crate::engine::chunk::Chunk;
use crate::engine::component::ComponentInfo;
use crate::engine::pool::ChunkPool;
use crate::engine::types::{
    Allocation, ChunkIndex, ComponentId, ComponentRange, CHUNK_SIZE,
};

/// Chunk sequence specialised to one archetype's slot layout.
///
/// ## Invariants
/// - `layout` is in the archetype's canonical (ascending id) order.
/// - `slot_size` is a multiple of every component's alignment.
/// - Chunks are appended only; surviving chunk indices are stable except
///   across [`ChunkList::shrink_to_fit`], which removes a trailing run of
///   empty chunks.

pub struct ChunkList {
    layout: Vec<(ComponentId, ComponentRange)>,
    slot_size: usize,
    chunks: Vec<Chunk>,
    pool: Option<Arc<ChunkPool>>,
}

impl ChunkList {
    /// Builds a chunk list for the given component descriptions.
    ///
    /// ## Behavior
    /// `infos` must be in the archetype's canonical order; the packed
    /// [`ComponentRange`]s and the per-entity slot size are computed here and
    /// fixed for the lifetime of the list.
    ///
    /// ## Panics
    /// Panics if `infos` is empty or the packed slot does not fit a chunk.

    pub fn new(infos: &[ComponentInfo], pool: Option<Arc<ChunkPool>>) -> Self {
        assert!(!infos.is_empty(), "a chunk list needs at least one component");
        debug_assert!(
            infos.windows(2).all(|pair| pair[0].id < pair[1].id),
            "component descriptions must be in canonical order"
        );

        let mut layout = Vec::with_capacity(infos.len());
        let mut offset = 0usize;
        let mut max_align = 1usize;
        for info in infos {
            offset = align_up(offset, info.align);
            layout.push((
                info.id,
                ComponentRange {
                    offset,
                    size: info.size,
                },
            ));
            offset += info.size;
            max_align = max_align.max(info.align);
        }
        let slot_size = align_up(offset, max_align);
        assert!(
            CHUNK_SIZE / slot_size >= 2,
            "slot of {slot_size} bytes does not fit a {CHUNK_SIZE}-byte chunk"
        );

        Self {
            layout,
            slot_size,
            chunks: Vec::new(),
            pool,
        }
    }

    /// Allocates a slot, filling the lowest-indexed non-full chunk first.
    ///
    /// ## Behavior
    /// Appends a fresh chunk when every existing chunk is full. Never fails
    /// short of allocator exhaustion.

    pub fn create(&mut self) -> Allocation {
        let chunk_index = self.free_chunk_index();
        if chunk_index == self.chunks.len() {
            self.chunks.push(Chunk::new(self.slot_size, self.pool.as_ref()));
        }
        let slot = self.chunks[chunk_index].allocate();
        Allocation::new(chunk_index as ChunkIndex, slot)
    }

    /// Frees a slot.
    ///
    /// ## Invariants
    /// This never runs component destructors; the archive must have done so
    /// already for any component that is not migrating elsewhere.

    pub fn destroy(&mut self, allocation: Allocation) {
        self.chunks[allocation.chunk as usize].deallocate(allocation.slot);
    }

    /// Returns the base address of an entity slot.
    #[inline]
    pub fn address_of(&self, allocation: Allocation) -> NonNull<u8> {
        self.chunks[allocation.chunk as usize].address_of(allocation.slot)
    }

    /// Returns the address of one component within an entity slot.
    ///
    /// Returns `None` if the component is not part of this list's layout.

    pub fn address_of_component(
        &self,
        allocation: Allocation,
        component_id: ComponentId,
    ) -> Option<NonNull<u8>> {
        let range = self.component_range(component_id)?;
        let slot = self.address_of(allocation);
        // SAFETY: the range lies inside the slot, which lies inside the chunk.
        Some(unsafe { NonNull::new_unchecked(slot.as_ptr().add(range.offset)) })
    }

    /// Returns `true` if the layout contains `component_id`.
    pub fn supports(&self, component_id: ComponentId) -> bool {
        self.component_range(component_id).is_some()
    }

    /// Returns the byte range assigned to `component_id`, if present.
    pub fn component_range(&self, component_id: ComponentId) -> Option<ComponentRange> {
        self.layout
            .iter()
            .find(|(id, _)| *id == component_id)
            .map(|(_, range)| *range)
    }

    /// Returns the index of the first non-full chunk.
    ///
    /// Equals the chunk count when every chunk is full (or none exist).

    pub fn free_chunk_index(&self) -> usize {
        self.chunks
            .iter()
            .position(|chunk| !chunk.is_full())
            .unwrap_or(self.chunks.len())
    }

    /// Returns the per-entity slot stride in bytes.
    #[inline]
    pub fn slot_size(&self) -> usize {
        self.slot_size
    }

    /// Returns the number of chunks currently allocated.
    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Returns the number of live slots across all chunks.
    pub fn live_slots(&self) -> usize {
        self.chunks.iter().map(Chunk::len).sum()
    }

    /// Returns the packed layout in canonical order.
    #[inline]
    pub fn layout(&self) -> &[(ComponentId, ComponentRange)] {
        &self.layout
    }

    /// Drops the trailing run of empty chunks.
    ///
    /// ## Behavior
    /// Only trailing chunks are removed, so every surviving allocation keeps
    /// its chunk index. After forward compaction the trailing run is the only
    /// place empty chunks can be.
    ///
    /// Returns the number of chunks removed.

    pub fn shrink_to_fit(&mut self) -> usize {
        let before = self.chunks.len();
        while self.chunks.last().is_some_and(Chunk::is_empty) {
            self.chunks.pop();
        }
        before - self.chunks.len()
    }

    /// Byte-copies an entity's payload between two chunk lists.
    ///
    /// ## Behavior
    /// For every component present in **both** layouts, the bytes are copied
    /// from the source slot to the destination slot using each side's own
    /// offsets; the source slot is then freed. Components present only in the
    /// source are dropped bytewise (their destructors must already have run);
    /// components present only in the destination are left raw for the caller
    /// to construct.
    ///
    /// ## Invariants
    /// No constructors or destructors run here.

    pub fn move_data(
        source: &mut ChunkList,
        source_allocation: Allocation,
        destination: &mut ChunkList,
        destination_allocation: Allocation,
    ) {
        let source_slot = source.address_of(source_allocation);
        let destination_slot = destination.address_of(destination_allocation);

        for &(component_id, source_range) in &source.layout {
            if let Some(destination_range) = destination.component_range(component_id) {
                // SAFETY: both slots are live and sized for their layouts, and
                // distinct chunk lists never share memory.
                unsafe {
                    ComponentRange::copy(
                        destination_slot.as_ptr(),
                        source_slot.as_ptr(),
                        destination_range,
                        source_range,
                    );
                }
            }
        }

        source.destroy(source_allocation);
    }

    /// Moves a whole slot to another position in the same list.
    ///
    /// ## Behavior
    /// Used by forward compaction: the entire slot is copied and the source
    /// slot freed. Source and destination share one layout, so the copy is
    /// the identity mapping over every component range.
    ///
    /// ## Invariants
    /// No constructors or destructors run here.

    pub fn relocate(&mut self, source: Allocation, destination: Allocation) {
        debug_assert_ne!(source, destination, "relocating a slot onto itself");
        let source_slot = self.address_of(source).as_ptr();
        let destination_slot = self.address_of(destination).as_ptr();
        // SAFETY: distinct slots never overlap, even within one chunk.
        unsafe { ptr::copy_nonoverlapping(source_slot, destination_slot, self.slot_size) };
        self.destroy(source);
    }
}

#[inline]
fn align_up(value: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}
