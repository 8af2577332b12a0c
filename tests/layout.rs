use std::ptr::NonNull;

use component_archive::engine::chunk::Chunk;
use component_archive::engine::pool::ChunkPool;
use component_archive::engine::storage::ChunkList;
use component_archive::{
    Allocation, ComponentInfo, ComponentRange, CHUNK_ALIGNMENT, CHUNK_SIZE,
};

// Layout tests drive the storage layer directly with hand-built descriptions;
// the thunks are never invoked here.
unsafe fn noop(_target: NonNull<u8>) {}

fn info(id: u32, size: usize, align: usize) -> ComponentInfo {
    ComponentInfo {
        id,
        name: "",
        size,
        align,
        default_construct: noop,
        drop: noop,
    }
}

#[test]
fn chunk_reserves_a_scratch_slot() {
    let chunk = Chunk::new(64, None);
    assert_eq!(chunk.capacity(), CHUNK_SIZE / 64 - 1);
    assert!(chunk.is_empty());
    assert!(!chunk.is_full());
}

#[test]
fn chunk_allocates_lowest_free_slot_first() {
    let mut chunk = Chunk::new(256, None);

    assert_eq!(chunk.allocate(), 0);
    assert_eq!(chunk.allocate(), 1);
    assert_eq!(chunk.allocate(), 2);
    assert_eq!(chunk.len(), 3);

    chunk.deallocate(1);
    assert_eq!(chunk.allocate(), 1, "freed hole must be refilled first");
    assert_eq!(chunk.allocate(), 3);

    chunk.deallocate(0);
    chunk.deallocate(2);
    assert_eq!(chunk.allocate(), 0);
    assert_eq!(chunk.allocate(), 2);
}

#[test]
fn chunk_slots_are_contiguous_and_aligned() {
    let mut chunk = Chunk::new(128, None);
    let base = chunk.address_of(0).as_ptr() as usize;

    assert_eq!(base % CHUNK_ALIGNMENT, 0, "chunk base must be 64-byte aligned");

    for _ in 0..8 {
        chunk.allocate();
    }
    for slot in 0..8u32 {
        let address = chunk.address_of(slot).as_ptr() as usize;
        assert_eq!(address, base + slot as usize * 128);
    }
}

#[test]
fn chunk_fills_to_capacity() {
    let mut chunk = Chunk::new(CHUNK_SIZE / 4, None);
    assert_eq!(chunk.capacity(), 3);

    chunk.allocate();
    chunk.allocate();
    chunk.allocate();
    assert!(chunk.is_full());

    chunk.deallocate(2);
    assert!(!chunk.is_full());
    assert_eq!(chunk.len(), 2);
}

#[test]
fn list_packs_components_in_canonical_order() {
    let list = ChunkList::new(
        &[info(1, 40, 8), info(2, 16, 8), info(3, 8, 8)],
        None,
    );

    assert_eq!(
        list.component_range(1),
        Some(ComponentRange { offset: 0, size: 40 })
    );
    assert_eq!(
        list.component_range(2),
        Some(ComponentRange { offset: 40, size: 16 })
    );
    assert_eq!(
        list.component_range(3),
        Some(ComponentRange { offset: 56, size: 8 })
    );
    assert_eq!(list.slot_size(), 64);

    assert!(list.supports(2));
    assert!(!list.supports(4));
    assert_eq!(list.component_range(4), None);
}

#[test]
fn list_pads_offsets_to_component_alignment() {
    // 4-byte value, then a single byte, then an 8-byte value: the third
    // component must start at offset 8, and the slot stride must stay a
    // multiple of the largest alignment.
    let list = ChunkList::new(
        &[info(10, 4, 4), info(11, 1, 1), info(12, 8, 8)],
        None,
    );

    assert_eq!(list.component_range(10).unwrap().offset, 0);
    assert_eq!(list.component_range(11).unwrap().offset, 4);
    assert_eq!(list.component_range(12).unwrap().offset, 8);
    assert_eq!(list.slot_size(), 16);
}

#[test]
fn list_fills_lowest_chunk_then_appends() {
    // One slot per chunk (half the chunk is the scratch reservation).
    let mut list = ChunkList::new(&[info(1, CHUNK_SIZE / 2, 1)], None);

    let first = list.create();
    let second = list.create();
    let third = list.create();
    assert_eq!(first, Allocation::new(0, 0));
    assert_eq!(second, Allocation::new(1, 0));
    assert_eq!(third, Allocation::new(2, 0));
    assert_eq!(list.chunk_count(), 3);
    assert_eq!(list.free_chunk_index(), 3);

    list.destroy(second);
    assert_eq!(list.free_chunk_index(), 1);
    assert_eq!(list.create(), second, "hole must be refilled before appending");
}

#[test]
fn list_shrink_removes_only_trailing_empty_chunks() {
    let mut list = ChunkList::new(&[info(1, CHUNK_SIZE / 2, 1)], None);
    let first = list.create();
    let second = list.create();
    let third = list.create();

    // Hole at the front: nothing to shrink.
    list.destroy(first);
    assert_eq!(list.shrink_to_fit(), 0);
    assert_eq!(list.chunk_count(), 3);

    // Empty the tail: exactly the trailing run goes away.
    list.destroy(second);
    list.destroy(third);
    assert_eq!(list.shrink_to_fit(), 3);
    assert_eq!(list.chunk_count(), 0);
}

#[test]
fn move_data_copies_the_layout_intersection() {
    let mut source = ChunkList::new(&[info(1, 8, 8), info(2, 8, 8)], None);
    let mut destination = ChunkList::new(&[info(2, 8, 8), info(3, 8, 8)], None);

    let from = source.create();
    let to = destination.create();

    unsafe {
        source
            .address_of_component(from, 1)
            .unwrap()
            .as_ptr()
            .cast::<u64>()
            .write(0x1111_1111_1111_1111);
        source
            .address_of_component(from, 2)
            .unwrap()
            .as_ptr()
            .cast::<u64>()
            .write(0x2222_2222_2222_2222);
    }

    ChunkList::move_data(&mut source, from, &mut destination, to);

    assert_eq!(source.live_slots(), 0, "source slot must be freed");
    let shared = unsafe {
        destination
            .address_of_component(to, 2)
            .unwrap()
            .as_ptr()
            .cast::<u64>()
            .read()
    };
    assert_eq!(shared, 0x2222_2222_2222_2222);
}

#[test]
fn relocate_moves_whole_slots_within_a_list() {
    let mut list = ChunkList::new(&[info(1, 8, 8)], None);

    let first = list.create();
    let second = list.create();
    unsafe {
        list.address_of(second).as_ptr().cast::<u64>().write(0xABCD);
    }

    list.destroy(first);
    let hole = list.create();
    assert_eq!(hole, first);

    list.relocate(second, hole);
    assert_eq!(list.live_slots(), 1);
    let moved = unsafe { list.address_of(hole).as_ptr().cast::<u64>().read() };
    assert_eq!(moved, 0xABCD);
}

#[test]
fn pooled_chunks_come_from_the_arena_and_return_on_drop() {
    let pool = ChunkPool::with_arena_size(4 * CHUNK_SIZE);
    assert_eq!(pool.region_count(), 4);
    assert_eq!(pool.free_region_count(), 4);

    {
        let mut list = ChunkList::new(&[info(1, CHUNK_SIZE / 2, 1)], Some(pool.clone()));
        for _ in 0..4 {
            list.create();
        }
        assert_eq!(pool.free_region_count(), 0);

        // Exhausted arena: the fifth chunk falls back to the system
        // allocator and the list keeps working.
        let overflow = list.create();
        assert_eq!(overflow, Allocation::new(4, 0));

        let base = list.address_of(Allocation::new(0, 0)).as_ptr() as usize;
        assert_eq!(base % CHUNK_ALIGNMENT, 0);
    }

    assert_eq!(pool.free_region_count(), 4, "regions must return on drop");
}

#[test]
fn pool_hands_out_lowest_addresses_first() {
    let pool = ChunkPool::with_arena_size(2 * CHUNK_SIZE);
    let first = pool.acquire().unwrap();
    let second = pool.acquire().unwrap();
    assert!(pool.acquire().is_none());

    assert_eq!(
        second.as_ptr() as usize - first.as_ptr() as usize,
        CHUNK_SIZE
    );

    pool.release(second);
    pool.release(first);
    assert_eq!(pool.free_region_count(), 2);
}
