//! # Component Archive
//!
//! Archetype-based entity-component storage engine for cache-friendly bulk
//! iteration.
//!
//! ## Design Goals
//! - Archetype grouping: entities with equal component sets share storage
//! - Chunked, 64-byte-aligned slot layout for cache locality
//! - Type-erased component lifecycles (register once, store raw bytes)
//! - Explicit ownership: one archive, one owner, no hidden synchronization
//!
//! ## Overview
//!
//! Component kinds are registered once at program start; at runtime, callers
//! create entities, attach and detach components, fetch component bytes by
//! entity, query archetype membership, compact storage, and destroy entities.
//! Entities that share the exact same component set (their *archetype*) are
//! stored contiguously in fixed-size chunks, so sweeping one archetype walks
//! memory linearly.
//!
//! ```
//! use component_archive::prelude::*;
//!
//! #[derive(Default)]
//! struct Health { points: u32 }
//!
//! register_component::<Health>().unwrap();
//!
//! let mut archive = ComponentArchive::new();
//! let entity = generate_entity();
//! archive.attach_default::<Health>(entity).unwrap().points = 10;
//! assert_eq!(archive.get_ref::<Health>(entity).unwrap().points, 10);
//! archive.destroy(entity);
//! ```

#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![deny(dead_code)]

pub mod engine;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (Public API)
// ─────────────────────────────────────────────────────────────────────────────

pub use engine::archive::{AttachInit, ComponentArchive, ComponentHandle};

pub use engine::component::{
    component_id_of,
    component_info,
    elf_hash,
    is_registered,
    register_component,
    register_info,
    ComponentInfo,
    ComponentThunk,
};

pub use engine::entity::{generate_entity, generate_entity_random};

pub use engine::filter::{filter_all, filter_any, filter_none};

pub use engine::error::{RegistryError, RegistryResult};

pub use engine::types::{
    Allocation,
    Archetype,
    ChunkIndex,
    ComponentId,
    ComponentRange,
    Entity,
    EntityId,
    SlotIndex,
    CHUNK_ALIGNMENT,
    CHUNK_POOL_SIZE,
    CHUNK_SIZE,
    INVALID_COMPONENT_ID,
};

// ─────────────────────────────────────────────────────────────────────────────
// Prelude (Optional but recommended)
// ─────────────────────────────────────────────────────────────────────────────

/// Commonly used storage-engine types.
///
/// Import with:
/// ```rust
/// use component_archive::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        filter_all,
        filter_any,
        filter_none,
        generate_entity,
        register_component,
        Archetype,
        AttachInit,
        ComponentArchive,
        ComponentHandle,
        ComponentId,
        Entity,
    };
}
