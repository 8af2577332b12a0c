//! # Component Kind Registry
//!
//! This module provides the process-wide registry that maps stable
//! [`ComponentId`] values to kind descriptions, and the typed sugar that
//! derives those descriptions from Rust types.
//!
//! ## Purpose
//! The registry erases component types into `{id, name, size, alignment,
//! default-construct thunk, drop thunk}` so the storage layer can manage raw
//! bytes without compile-time type knowledge. The typed wrappers on the
//! archive are thin facades over this erased description.
//!
//! ## Identifier derivation
//! A kind's identifier is the ELF string hash of its registered name, which is
//! deterministic across processes and builds as long as the name is stable.
//! Zero is reserved as the invalid identifier; a name hashing to zero, and a
//! collision between two distinct names, are both surfaced as
//! [`RegistryError`]s at registration time.
//!
//! ## Invariants
//! - Every identifier reachable through any archetype has an entry here.
//! - Re-registering the same name is idempotent (last writer wins).
//! - Entries are immutable once the setup phase completes.
//!
//! ## Concurrency
//! The registry is protected by `RwLock` for concurrent reads and serialized
//! writes. It is append-only in practice: registration happens at program
//! start, lookups dominate afterwards.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::mem::{align_of, needs_drop, size_of};
use std::ptr::{self, NonNull};
use std::sync::{OnceLock, RwLock};

use crate::engine::error::{RegistryError, RegistryResult};
use crate::engine::types::{ComponentId, INVALID_COMPONENT_ID};

/// Type-erased operation applied to one component's bytes.
pub type ComponentThunk = unsafe fn(NonNull<u8>);

/// Stable 32-bit hash of a component kind name (ELF string hash).
///
/// ## Behavior
/// Hashes the full byte sequence of `name`. The result is deterministic for a
/// given name across processes and builds. A result of zero would collide
/// with the reserved invalid identifier and is rejected at registration.

pub const fn elf_hash(name: &str) -> ComponentId {
    let bytes = name.as_bytes();
    let mut hash: u32 = 0;
    let mut index = 0;
    while index < bytes.len() {
        hash = (hash << 4).wrapping_add(bytes[index] as u32);
        let x = hash & 0xF000_0000;
        if x != 0 {
            hash ^= x >> 24;
        }
        hash &= !x;
        index += 1;
    }
    hash
}

/// Description of one registered component kind.
///
/// ## Purpose
/// Captures everything the storage layer needs to lay out, initialise, and
/// tear down instances of a kind without knowing its Rust type: byte size and
/// alignment for slot packing, plus the two lifecycle thunks.
///
/// ## Invariants
/// - `id` is non-zero and equals `elf_hash(name)` for descriptions produced
///   by [`ComponentInfo::of`].
/// - `default_construct` writes a fully initialised instance to an aligned,
///   allocated region of `size` bytes.
/// - `drop` is safe to call exactly once on a constructed instance.

#[derive(Clone, Copy, Debug)]
pub struct ComponentInfo {
    /// Stable identifier, derived from `name`.
    pub id: ComponentId,

    /// Kind name used for identifier derivation and diagnostics.
    pub name: &'static str,

    /// Size of one instance in bytes.
    pub size: usize,

    /// Required alignment of an instance in bytes.
    pub align: usize,

    /// Writes a default-constructed instance into raw bytes.
    pub default_construct: ComponentThunk,

    /// Drops a constructed instance in place.
    pub drop: ComponentThunk,
}

impl ComponentInfo {
    /// Builds the description for Rust type `T`.
    ///
    /// ## Behavior
    /// Uses `type_name::<T>()` as the kind name, so the identifier is stable
    /// for as long as the type's path is. The drop thunk is a no-op for types
    /// that do not need dropping.

    pub fn of<T: Default + 'static>() -> Self {
        let name = type_name::<T>();
        Self {
            id: elf_hash(name),
            name,
            size: size_of::<T>(),
            align: align_of::<T>(),
            default_construct: construct_impl::<T>,
            drop: if needs_drop::<T>() {
                drop_impl::<T>
            } else {
                drop_noop
            },
        }
    }
}

impl fmt::Display for ComponentInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ComponentInfo {{ id: {:#010x}, name: {}, size: {}, align: {} }}",
            self.id, self.name, self.size, self.align
        )
    }
}

/// Default-construct thunk for `T`.
unsafe fn construct_impl<T: Default>(target: NonNull<u8>) {
    // SAFETY: caller guarantees `target` is aligned for `T` and addresses
    // `size_of::<T>()` allocated bytes.
    unsafe { ptr::write(target.as_ptr() as *mut T, T::default()) }
}

/// Drop thunk for types that need dropping.
unsafe fn drop_impl<T>(target: NonNull<u8>) {
    // SAFETY: caller guarantees `target` holds a constructed `T` that is
    // dropped at most once.
    unsafe { ptr::drop_in_place(target.as_ptr() as *mut T) }
}

/// Drop thunk for types that do not need dropping.
unsafe fn drop_noop(_target: NonNull<u8>) {}

/// Process-wide mapping from component identifiers to kind descriptions.
///
/// ## Design
/// - `by_id` is the authoritative identifier-to-description table.
/// - `by_type` shortcuts `TypeId` lookups for the typed facade.
///
/// Access goes through the free functions below, which guard the single
/// global instance.

pub struct ComponentRegistry {
    by_id: HashMap<ComponentId, ComponentInfo>,
    by_type: HashMap<TypeId, ComponentId>,
}

static REGISTRY: OnceLock<RwLock<ComponentRegistry>> = OnceLock::new();

fn component_registry() -> &'static RwLock<ComponentRegistry> {
    REGISTRY.get_or_init(|| {
        RwLock::new(ComponentRegistry {
            by_id: HashMap::new(),
            by_type: HashMap::new(),
        })
    })
}

impl ComponentRegistry {
    /// Installs a kind description.
    ///
    /// ## Behavior
    /// - Re-registering the same name overwrites the entry (last writer wins).
    /// - A different name mapping to an occupied identifier is a collision.
    ///
    /// ## Errors
    /// - `NullId` if the identifier is the reserved invalid value.
    /// - `ZeroSized` if a named kind reports zero size.
    /// - `Collision` if a distinct name already owns the identifier.

    pub fn register(&mut self, info: ComponentInfo) -> RegistryResult<ComponentId> {
        if info.id == INVALID_COMPONENT_ID {
            return Err(RegistryError::NullId { name: info.name });
        }
        if info.size == 0 && !info.name.is_empty() {
            return Err(RegistryError::ZeroSized { name: info.name });
        }
        if let Some(existing) = self.by_id.get(&info.id) {
            if existing.name != info.name {
                return Err(RegistryError::Collision {
                    id: info.id,
                    existing: existing.name,
                    incoming: info.name,
                });
            }
        }
        self.by_id.insert(info.id, info);
        Ok(info.id)
    }

    /// Returns the description registered under `component_id`, if any.
    pub fn info(&self, component_id: ComponentId) -> Option<&ComponentInfo> {
        self.by_id.get(&component_id)
    }

    /// Returns `true` if `component_id` names a registered kind.
    pub fn is_registered(&self, component_id: ComponentId) -> bool {
        self.by_id.contains_key(&component_id)
    }
}

/// Registers Rust type `T` as a component kind.
///
/// ## Purpose
/// Typed sugar over [`register_info`]: derives the description (including
/// both lifecycle thunks) from `T` and records the `TypeId` shortcut used by
/// the archive's typed facade.
///
/// ## Errors
/// Propagates `RegistryError` on hash collision, zero-sized `T`, or a
/// poisoned registry lock.

pub fn register_component<T: Default + 'static>() -> RegistryResult<ComponentId> {
    let info = ComponentInfo::of::<T>();
    let registry = component_registry();
    let mut registry = registry.write().map_err(|_| RegistryError::PoisonedLock)?;
    let id = registry.register(info)?;
    registry.by_type.insert(TypeId::of::<T>(), id);
    Ok(id)
}

/// Registers an explicitly described component kind.
///
/// ## Purpose
/// The untyped registration path for kinds whose layout and lifecycle thunks
/// are produced outside the Rust type system.
///
/// ## Errors
/// Propagates `RegistryError` as for [`register_component`].

pub fn register_info(info: ComponentInfo) -> RegistryResult<ComponentId> {
    let registry = component_registry();
    let mut registry = registry.write().map_err(|_| RegistryError::PoisonedLock)?;
    registry.register(info)
}

/// Returns the identifier registered for Rust type `T`, if any.
pub fn component_id_of<T: 'static>() -> Option<ComponentId> {
    let registry = component_registry().read().ok()?;
    registry.by_type.get(&TypeId::of::<T>()).copied()
}

/// Returns a copy of the description registered under `component_id`.
pub fn component_info(component_id: ComponentId) -> Option<ComponentInfo> {
    let registry = component_registry().read().ok()?;
    registry.info(component_id).copied()
}

/// Returns `true` if `component_id` names a registered kind.
pub fn is_registered(component_id: ComponentId) -> bool {
    component_registry()
        .read()
        .map(|registry| registry.is_registered(component_id))
        .unwrap_or(false)
}
