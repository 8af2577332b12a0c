//! # Archetype Membership Filters
//!
//! Pure functions that narrow a caller-supplied entity list by set-wise tests
//! against each entity's archetype. Output order matches input order and
//! duplicates are preserved; entities unknown to the archive count as owning
//! no components.

use crate::engine::archive::ComponentArchive;
use crate::engine::types::{ComponentId, Entity};

/// Keeps entities whose archetype contains **every** filter component.
///
/// ## Behavior
/// An empty filter keeps every entity (the empty set is a subset of any
/// archetype). Absent entities survive only an empty filter.

pub fn filter_all(
    archive: &ComponentArchive,
    entities: &[Entity],
    components: &[ComponentId],
) -> Vec<Entity> {
    let mut result = Vec::with_capacity(entities.len());
    for &entity in entities {
        let keep = match archive.archetype_of(entity) {
            Some(archetype) => components.iter().all(|&id| archetype.contains(id)),
            None => components.is_empty(),
        };
        if keep {
            result.push(entity);
        }
    }
    result
}

/// Keeps entities whose archetype shares **at least one** filter component.
///
/// ## Panics
/// An empty filter set is a caller bug and asserts.

pub fn filter_any(
    archive: &ComponentArchive,
    entities: &[Entity],
    components: &[ComponentId],
) -> Vec<Entity> {
    assert!(
        !components.is_empty(),
        "filter_any requires a non-empty component set"
    );
    let mut result = Vec::with_capacity(entities.len());
    for &entity in entities {
        let keep = archive
            .archetype_of(entity)
            .is_some_and(|archetype| components.iter().any(|&id| archetype.contains(id)));
        if keep {
            result.push(entity);
        }
    }
    result
}

/// Keeps entities whose archetype shares **no** filter component.
///
/// ## Panics
/// An empty filter set is a caller bug and asserts.

pub fn filter_none(
    archive: &ComponentArchive,
    entities: &[Entity],
    components: &[ComponentId],
) -> Vec<Entity> {
    assert!(
        !components.is_empty(),
        "filter_none requires a non-empty component set"
    );
    let mut result = Vec::with_capacity(entities.len());
    for &entity in entities {
        let keep = match archive.archetype_of(entity) {
            Some(archetype) => !components.iter().any(|&id| archetype.contains(id)),
            None => true,
        };
        if keep {
            result.push(entity);
        }
    }
    result
}
