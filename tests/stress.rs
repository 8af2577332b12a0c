use std::sync::Once;

use component_archive::prelude::*;

const ENTITY_COUNT: usize = 100_000;

#[derive(Clone, Copy, PartialEq, Debug, Default)]
struct Velocity {
    a: u64,
    b: u64,
    clip: f64,
}

#[derive(Clone, Copy, PartialEq, Debug, Default)]
struct Heading {
    bytes: [u8; 16],
}

#[derive(Clone, Copy, PartialEq, Debug, Default)]
struct Inertia {
    value: u64,
}

static INIT: Once = Once::new();

fn init_registry() {
    INIT.call_once(|| {
        register_component::<Velocity>().unwrap();
        register_component::<Heading>().unwrap();
        register_component::<Inertia>().unwrap();
    });
}

// Deterministic per-index mixer so failures reproduce exactly.
fn mix(index: u64) -> u64 {
    let mut x = index.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ 0x5DEE_CE66;
    x ^= x >> 27;
    x = x.wrapping_mul(0x2545_F491_4F6C_DD1D);
    x ^ (x >> 31)
}

fn expected_velocity(index: u64) -> Velocity {
    Velocity {
        a: index + 0xFF_FFFF,
        b: index + 0xF0_F0F0,
        clip: 10_000.5555,
    }
}

fn validate_survivors(
    archive: &ComponentArchive,
    entities: &[Entity],
    alive: impl Fn(u64) -> bool,
) {
    for (index, &entity) in entities.iter().enumerate() {
        let index = index as u64;
        if !alive(index) {
            assert!(archive.get_ref::<Velocity>(entity).is_none());
            continue;
        }

        let velocity = archive
            .get_ref::<Velocity>(entity)
            .unwrap_or_else(|| panic!("entity {index} lost its velocity"));
        assert_eq!(*velocity, expected_velocity(index));

        let draw = mix(index);
        assert_eq!(archive.contains_component::<Heading>(entity), draw & 1 != 0);
        assert_eq!(archive.contains_component::<Inertia>(entity), draw & 2 != 0);
        if draw & 1 != 0 {
            assert_eq!(
                archive.get_ref::<Heading>(entity).unwrap().bytes,
                [(index % 251) as u8; 16]
            );
        }
    }
}

#[test]
fn bulk_population_survives_churn_and_compaction() {
    init_registry();

    // Pool-backed archive: the arena front-ends every chunk allocation.
    let mut archive = ComponentArchive::with_pool();

    let mut entities = Vec::with_capacity(ENTITY_COUNT);
    for index in 0..ENTITY_COUNT as u64 {
        let entity = generate_entity();
        let draw = mix(index);

        // Every entity carries a velocity; heading and inertia are drawn
        // pseudo-randomly, with varied attach order.
        if draw & 4 != 0 {
            archive.attach_default::<Velocity>(entity).unwrap();
            if draw & 1 != 0 {
                archive.attach_default::<Heading>(entity).unwrap();
            }
            if draw & 2 != 0 {
                archive.attach_default::<Inertia>(entity).unwrap();
            }
        } else {
            if draw & 2 != 0 {
                archive.attach_default::<Inertia>(entity).unwrap();
            }
            if draw & 1 != 0 {
                archive.attach_default::<Heading>(entity).unwrap();
            }
            archive.attach_default::<Velocity>(entity).unwrap();
        }

        *archive.get_mut::<Velocity>(entity).unwrap() = expected_velocity(index);
        if draw & 1 != 0 {
            archive.get_mut::<Heading>(entity).unwrap().bytes = [(index % 251) as u8; 16];
        }
        if draw & 2 != 0 {
            archive.get_mut::<Inertia>(entity).unwrap().value = !index;
        }

        entities.push(entity);
    }

    // Final archetypes are the four subsets containing a velocity; the
    // varied attach orders also visit the three velocity-less intermediates,
    // whose chunk lists stay registered for cheap oscillation.
    assert_eq!(archive.archetype_count(), 7);
    assert_eq!(archive.live_slot_count(), ENTITY_COUNT);

    // Full linear validation of the populated state.
    validate_survivors(&archive, &entities, |_| true);

    // Destroy roughly half the population at pseudo-random indices.
    let mut destroyed = 0usize;
    for (index, &entity) in entities.iter().enumerate() {
        if mix(index as u64) & 8 != 0 {
            assert!(archive.destroy(entity));
            destroyed += 1;
        }
    }
    assert!(destroyed > ENTITY_COUNT / 3);
    assert_eq!(archive.live_slot_count(), ENTITY_COUNT - destroyed);

    let chunks_before = archive.chunk_count();
    archive.defragment();
    let reduced = archive.shrink_to_fit(false);
    assert!(reduced > 0, "halving the population must free whole chunks");
    assert_eq!(archive.chunk_count(), chunks_before - reduced);

    // Storage overhead stays bounded: after compaction each chunk list keeps
    // at most one partial chunk, so live slots account for all other chunks
    // even at the largest slot size.
    let largest_slot = std::mem::size_of::<Velocity>()
        + std::mem::size_of::<Heading>()
        + std::mem::size_of::<Inertia>();
    let worst_case_capacity = component_archive::CHUNK_SIZE / largest_slot - 1;
    let partial_chunks = archive.archetype_count();
    assert!(
        archive.live_slot_count()
            >= archive.chunk_count().saturating_sub(partial_chunks) * worst_case_capacity
    );

    validate_survivors(&archive, &entities, |index| mix(index) & 8 == 0);
}
