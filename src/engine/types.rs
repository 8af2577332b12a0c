//! # Core Types, Identifiers, and Layout Constants
//!
//! This module defines the **fundamental types, identifiers, and layout
//! constants** used throughout the storage engine. These definitions form the
//! *semantic backbone* of the system and are shared across all subsystems,
//! including chunk allocation, archetype indexing, the archive facade, and
//! filtering.
//!
//! ## Design Philosophy
//!
//! The engine is designed around:
//!
//! - **Opaque entity handles** with no owned storage,
//! - **Stable numeric identifiers** for component kinds,
//! - **Canonical archetypes** so set equality is attach-order independent,
//! - **Fixed-size aligned chunks** addressed by `(chunk, slot)` pairs.
//!
//! ## Entity Representation
//!
//! Entities are plain 64-bit values. Zero is reserved as the invalid handle.
//! Identity is value equality; there is no embedded generation counter, so a
//! handle stays comparable for the lifetime of the process.
//!
//! ## Archetypes
//!
//! An [`Archetype`] is the set of component kinds an entity currently owns,
//! held in canonical ascending order. Two entities are "same archetype" iff
//! their sets are equal, regardless of the order in which components were
//! attached. Canonical order also fixes the byte layout of a storage slot:
//! components are packed by scanning the archetype front to back.
//!
//! ## Addressing
//!
//! Storage positions are `(chunk, slot)` pairs ([`Allocation`]). The sentinel
//! [`Allocation::NONE`] marks entities that currently own no components.
//! [`ComponentRange`] locates one component's bytes inside a slot.

/// Raw integral value backing an [`Entity`] handle.
pub type EntityId = u64;

/// Stable identifier for a registered component kind.
pub type ComponentId = u32;

/// Index of a chunk within a chunk list.
pub type ChunkIndex = u32;

/// Index of a slot within a chunk.
pub type SlotIndex = u32;

/// Reserved component identifier; never names a registered kind.
pub const INVALID_COMPONENT_ID: ComponentId = 0;

/// Size in bytes of one storage chunk.
pub const CHUNK_SIZE: usize = 16_384;

/// Base alignment of every chunk region.
pub const CHUNK_ALIGNMENT: usize = 64;

/// Arena size carved into chunk regions by the chunk pool.
#[cfg(not(feature = "large-arena"))]
pub const CHUNK_POOL_SIZE: usize = 67_108_864;

/// Arena size carved into chunk regions by the chunk pool.
#[cfg(feature = "large-arena")]
pub const CHUNK_POOL_SIZE: usize = 536_870_912;

const _: [(); 1] = [(); CHUNK_ALIGNMENT.is_power_of_two() as usize];
const _: [(); 1] = [(); (CHUNK_SIZE % CHUNK_ALIGNMENT == 0) as usize];
const _: [(); 1] = [(); (CHUNK_POOL_SIZE % CHUNK_SIZE == 0) as usize];

/// Opaque handle naming one entity.
///
/// ## Purpose
/// `Entity` is a value-identity handle that references rows in archetype
/// storage. It owns no data; every lookup goes through the archive.
///
/// ## Invariants
/// - `Entity(0)` is [`Entity::INVALID`] and never refers to stored data.
/// - Handles are unique per generator (monotonic path) or probabilistically
///   unique (random path).
///
/// ## Notes
/// `Entity` values are cheap to copy and compare and are safe to pass
/// across threads.

#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Entity(pub EntityId);

impl Entity {
    /// The reserved invalid handle.
    pub const INVALID: Entity = Entity(0);

    /// Returns `true` if this handle is not the reserved invalid value.
    #[inline]
    pub fn is_valid(self) -> bool {
        self.0 != 0
    }

    /// Returns the raw 64-bit value of this handle.
    #[inline]
    pub fn id(self) -> EntityId {
        self.0
    }
}

/// Position of one entity slot within a chunk list.
///
/// ## Purpose
/// Identifies where an entity's packed component record lives: which chunk in
/// the list and which slot in that chunk.
///
/// ## Notes
/// The derived ordering is chunk-major, which is what forward compaction
/// compares when deciding whether a relocation actually moves data toward the
/// front of the list.

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Allocation {
    /// Chunk index within the chunk list.
    pub chunk: ChunkIndex,

    /// Slot index within the chunk.
    pub slot: SlotIndex,
}

impl Allocation {
    /// Sentinel for entities that currently own no components.
    pub const NONE: Allocation = Allocation {
        chunk: ChunkIndex::MAX,
        slot: SlotIndex::MAX,
    };

    /// Creates an allocation from a chunk and slot index.
    #[inline]
    pub fn new(chunk: ChunkIndex, slot: SlotIndex) -> Self {
        Self { chunk, slot }
    }

    /// Returns `true` if this is the sentinel value.
    #[inline]
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

/// Byte range of one component within an entity slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ComponentRange {
    /// Offset from the slot base in bytes.
    pub offset: usize,

    /// Size of the component in bytes.
    pub size: usize,
}

impl ComponentRange {
    /// Copies one component's bytes between two slot bases, using each side's
    /// own offset.
    ///
    /// ## Safety
    /// Both `destination_slot` and `source_slot` must address live slots large
    /// enough to contain their respective ranges, and the two ranges must not
    /// overlap in memory.

    #[inline]
    pub unsafe fn copy(
        destination_slot: *mut u8,
        source_slot: *const u8,
        destination: ComponentRange,
        source: ComponentRange,
    ) {
        debug_assert_eq!(
            destination.size, source.size,
            "component size mismatch between slot layouts"
        );
        unsafe {
            std::ptr::copy_nonoverlapping(
                source_slot.add(source.offset),
                destination_slot.add(destination.offset),
                source.size,
            );
        }
    }
}

/// Canonical ordered set of the component kinds an entity owns.
///
/// ## Purpose
/// The archetype is the grouping key of the whole engine: entities with equal
/// archetypes share a chunk list, and the canonical (ascending) order of the
/// set fixes the packed byte layout of their slots.
///
/// ## Invariants
/// - `components` is sorted ascending and contains no duplicates.
/// - [`INVALID_COMPONENT_ID`] never appears in the set.
///
/// Equality and hashing operate on the canonical form, so any sequence of
/// attaches producing the same set compares equal.

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Archetype {
    components: Vec<ComponentId>,
}

impl Archetype {
    /// Creates an empty archetype.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an archetype from a list of component identifiers.
    ///
    /// ## Behavior
    /// Input order is irrelevant; duplicates and invalid identifiers are
    /// discarded. The result is in canonical form.

    pub fn from_ids(ids: &[ComponentId]) -> Self {
        let mut components: Vec<ComponentId> = ids
            .iter()
            .copied()
            .filter(|&id| id != INVALID_COMPONENT_ID)
            .collect();
        components.sort_unstable();
        components.dedup();
        Self { components }
    }

    /// Returns `true` if the archetype contains no components.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Returns the number of component kinds in the set.
    #[inline]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns `true` if `component_id` is a member of the set.
    #[inline]
    pub fn contains(&self, component_id: ComponentId) -> bool {
        self.components.binary_search(&component_id).is_ok()
    }

    /// Inserts a component identifier, keeping canonical order.
    ///
    /// Returns `false` if the identifier was already present or invalid.

    pub fn insert(&mut self, component_id: ComponentId) -> bool {
        if component_id == INVALID_COMPONENT_ID {
            return false;
        }
        match self.components.binary_search(&component_id) {
            Ok(_) => false,
            Err(position) => {
                self.components.insert(position, component_id);
                true
            }
        }
    }

    /// Removes a component identifier.
    ///
    /// Returns `false` if the identifier was not a member.

    pub fn remove(&mut self, component_id: ComponentId) -> bool {
        match self.components.binary_search(&component_id) {
            Ok(position) => {
                self.components.remove(position);
                true
            }
            Err(_) => false,
        }
    }

    /// Returns a copy of this archetype with `component_id` added.
    pub fn with(&self, component_id: ComponentId) -> Self {
        let mut next = self.clone();
        next.insert(component_id);
        next
    }

    /// Returns a copy of this archetype with `component_id` removed.
    pub fn without(&self, component_id: ComponentId) -> Self {
        let mut next = self.clone();
        next.remove(component_id);
        next
    }

    /// Returns `true` if every member of `other` is also a member of `self`.
    pub fn contains_all(&self, other: &Archetype) -> bool {
        other.components.iter().all(|&id| self.contains(id))
    }

    /// Returns `true` if the two sets share at least one member.
    pub fn intersects(&self, other: &Archetype) -> bool {
        // Both sides are sorted; probe with the shorter one.
        let (probe, base) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        probe.components.iter().any(|&id| base.contains(id))
    }

    /// Iterates the component identifiers in canonical order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.components.iter().copied()
    }

    /// Returns the canonical identifier slice.
    #[inline]
    pub fn as_slice(&self) -> &[ComponentId] {
        &self.components
    }
}
