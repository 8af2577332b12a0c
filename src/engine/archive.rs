//! # Component Archive
//!
//! The public facade of the storage engine, responsible for:
//!
//! * owning the archetype → chunk-list index and the entity location table,
//! * coordinating entity migration between archetypes on attach/detach,
//! * running component constructors and destructors at the right moments,
//! * forward compaction and chunk reclamation,
//! * stable re-resolving component handles.
//!
//! ## Ownership model
//!
//! The archive is **single-owner and single-threaded**: one archive plus its
//! chunk lists and index tables form one exclusive-access unit. Callers that
//! want parallelism shard across archives or serialize access externally.
//!
//! ## Pointer validity
//!
//! Raw pointers returned by [`ComponentArchive::get`] are borrows that stay
//! valid only until the next mutating call (attach, detach, destroy,
//! defragment, shrink). [`ComponentHandle`] is the stable alternative: it
//! stores only `(entity, component id)` and re-resolves through the archive
//! on every access, so it survives migration, compaction, and chunk-list
//! growth.
//!
//! ## Index structure
//!
//! The archetype index is an append-only sequence of
//! `(Archetype, ChunkList)` pairs with linear lookup. Archetype counts are
//! small in practice (tens to low hundreds), and the append-only discipline
//! keeps positions stable across insertions.

use std::collections::HashMap;
use std::ptr::NonNull;
use std::sync::Arc;

use log::{debug, trace, warn};

use crate::engine::component::{component_id_of, component_info, ComponentInfo};
use crate::engine::pool::ChunkPool;
use crate::engine::storage::ChunkList;
use crate::engine::types::{
    Allocation, Archetype, ComponentId, Entity, INVALID_COMPONENT_ID,
};

/// Controls how `attach` initialises the new component's bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttachInit {
    /// Run the kind's default constructor on the new bytes.
    DefaultConstruct,

    /// Leave the bytes raw; the caller placement-initialises them before the
    /// next archive call.
    Uninitialized,
}

/// Per-entity record: current archetype and storage position.
struct ArchetypeData {
    archetype: Archetype,
    allocation: Allocation,
}

/// Stable reference to one component of one entity.
///
/// ## Purpose
/// Unlike the raw pointers returned by `get`, a handle consults the archive
/// on every access, so it stays valid across migration, defragmentation, and
/// chunk-list growth. A handle is *valid* iff the entity currently owns the
/// component.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComponentHandle {
    entity: Entity,
    component_id: ComponentId,
}

impl ComponentHandle {
    /// Creates a handle for `(entity, component_id)`.
    #[inline]
    pub fn new(entity: Entity, component_id: ComponentId) -> Self {
        Self {
            entity,
            component_id,
        }
    }

    /// Returns the referenced entity.
    #[inline]
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Returns the referenced component kind.
    #[inline]
    pub fn component_id(&self) -> ComponentId {
        self.component_id
    }

    /// Returns `true` if the entity currently owns the component.
    pub fn is_valid(&self, archive: &ComponentArchive) -> bool {
        archive.contains(self.entity, self.component_id)
    }

    /// Resolves the handle to the component's current bytes.
    pub fn deref(&self, archive: &ComponentArchive) -> Option<NonNull<u8>> {
        archive.get(self.entity, self.component_id)
    }

    /// Resolves the handle to a typed shared reference.
    ///
    /// Returns `None` if the handle is invalid or `T` is not the kind this
    /// handle refers to.

    pub fn read<'a, T: 'static>(&self, archive: &'a ComponentArchive) -> Option<&'a T> {
        if component_id_of::<T>() != Some(self.component_id) {
            return None;
        }
        let ptr = archive.get(self.entity, self.component_id)?;
        // SAFETY: the slot layout aligns the component for `T`, and the bytes
        // were initialised by attach.
        Some(unsafe { &*(ptr.as_ptr() as *const T) })
    }

    /// Resolves the handle to a typed exclusive reference.
    pub fn write<'a, T: 'static>(
        &self,
        archive: &'a mut ComponentArchive,
    ) -> Option<&'a mut T> {
        if component_id_of::<T>() != Some(self.component_id) {
            return None;
        }
        let ptr = archive.get(self.entity, self.component_id)?;
        // SAFETY: as in `read`; exclusivity comes from the `&mut` archive
        // borrow.
        Some(unsafe { &mut *(ptr.as_ptr() as *mut T) })
    }
}

/// Archetype-grouped, chunk-backed component storage.
///
/// ## Invariants
/// - Every entity with a non-empty archetype has a live slot in the chunk
///   list of exactly that archetype, and no two entities share one.
/// - Chunk lists are created on first use of an archetype and never removed,
///   so transitions stay cheap when entities oscillate between archetypes.
/// - Entities that lost their last component keep an entry with an empty
///   archetype and the sentinel allocation.

pub struct ComponentArchive {
    lists: Vec<(Archetype, ChunkList)>,
    entities: HashMap<Entity, ArchetypeData>,
    pool: Option<Arc<ChunkPool>>,
}

impl ComponentArchive {
    /// Creates an archive whose chunks use the system aligned allocator.
    pub fn new() -> Self {
        Self {
            lists: Vec::new(),
            entities: HashMap::new(),
            pool: None,
        }
    }

    /// Creates an archive whose chunks draw from a pre-allocated arena.
    ///
    /// ## Notes
    /// Behaviour is identical to [`ComponentArchive::new`]; the pool only
    /// front-ends the per-chunk allocations with one large allocation. When
    /// the arena runs out, chunks fall back to the system allocator.

    pub fn with_pool() -> Self {
        Self {
            lists: Vec::new(),
            entities: HashMap::new(),
            pool: Some(ChunkPool::new()),
        }
    }

    /// Attaches a component kind to an entity.
    ///
    /// ## Behavior
    /// - Returns `None` without mutation if the entity already owns the kind,
    ///   the handle or identifier is invalid, or the kind is unregistered.
    /// - Otherwise the entity migrates to the archetype extended by
    ///   `component_id`: a slot is allocated in the destination chunk list,
    ///   the old payload (if any) is byte-copied across, and the old slot is
    ///   freed. Only the new component's constructor runs, and only when
    ///   `init` is [`AttachInit::DefaultConstruct`].
    ///
    /// ## Returns
    /// A pointer to the new component's bytes, valid until the next mutating
    /// archive call.

    pub fn attach(
        &mut self,
        entity: Entity,
        component_id: ComponentId,
        init: AttachInit,
    ) -> Option<NonNull<u8>> {
        if !entity.is_valid() || component_id == INVALID_COMPONENT_ID {
            return None;
        }
        let Some(info) = component_info(component_id) else {
            warn!("attach of unregistered component {component_id:#010x} ignored");
            return None;
        };

        let (current, old_allocation) = match self.entities.get(&entity) {
            Some(data) => (data.archetype.clone(), data.allocation),
            None => (Archetype::new(), Allocation::NONE),
        };
        if current.contains(component_id) {
            return None;
        }

        let next = current.with(component_id);
        let destination_index = self.find_or_create_list(&next)?;
        let new_allocation = self.lists[destination_index].1.create();

        if !current.is_empty() {
            let Some(source_index) = self.find_list(&current) else {
                // The entity's archetype has no list; the index is corrupt.
                self.lists[destination_index].1.destroy(new_allocation);
                return None;
            };
            let (source, destination) = self.lists_pair_mut(source_index, destination_index);
            ChunkList::move_data(source, old_allocation, destination, new_allocation);
        }

        self.entities.insert(
            entity,
            ArchetypeData {
                archetype: next,
                allocation: new_allocation,
            },
        );

        let target = self.lists[destination_index]
            .1
            .address_of_component(new_allocation, component_id)?;
        if init == AttachInit::DefaultConstruct {
            // SAFETY: `target` addresses `info.size` freshly reserved bytes,
            // aligned by the slot layout.
            unsafe { (info.default_construct)(target) };
        }
        Some(target)
    }

    /// Detaches a component kind from an entity.
    ///
    /// ## Behavior
    /// - No-op returning `false` if the entity does not own the kind.
    /// - Otherwise the component's destructor runs on its bytes, and the
    ///   entity migrates to the reduced archetype. When the reduced archetype
    ///   is empty, the entity keeps an empty-archetype entry with the
    ///   sentinel allocation.

    pub fn detach(&mut self, entity: Entity, component_id: ComponentId) -> bool {
        let Some(data) = self.entities.get(&entity) else {
            return false;
        };
        if !data.archetype.contains(component_id) {
            return false;
        }
        let current = data.archetype.clone();
        let old_allocation = data.allocation;
        let next = current.without(component_id);

        let Some(source_index) = self.find_list(&current) else {
            return false;
        };
        let destination_index = if next.is_empty() {
            None
        } else {
            // Resolve the destination before touching any component state.
            match self.find_or_create_list(&next) {
                Some(index) => Some(index),
                None => return false,
            }
        };

        if let Some(info) = component_info(component_id) {
            if let Some(target) = self.lists[source_index]
                .1
                .address_of_component(old_allocation, component_id)
            {
                // SAFETY: the entity owns the component, so its bytes hold a
                // constructed instance that is dropped exactly once here.
                unsafe { (info.drop)(target) };
            }
        }

        match destination_index {
            None => {
                self.lists[source_index].1.destroy(old_allocation);
                self.entities.insert(
                    entity,
                    ArchetypeData {
                        archetype: next,
                        allocation: Allocation::NONE,
                    },
                );
            }
            Some(destination_index) => {
                let new_allocation = self.lists[destination_index].1.create();
                let (source, destination) =
                    self.lists_pair_mut(source_index, destination_index);
                ChunkList::move_data(source, old_allocation, destination, new_allocation);
                self.entities.insert(
                    entity,
                    ArchetypeData {
                        archetype: next,
                        allocation: new_allocation,
                    },
                );
            }
        }
        true
    }

    /// Returns a pointer to one component of one entity.
    ///
    /// ## Notes
    /// The pointer is invalidated by any subsequent mutating archive call
    /// touching the relevant chunk list; use [`ComponentArchive::get_handle`]
    /// for a stable reference.

    pub fn get(&self, entity: Entity, component_id: ComponentId) -> Option<NonNull<u8>> {
        let data = self.entities.get(&entity)?;
        if !data.archetype.contains(component_id) {
            return None;
        }
        let index = self.find_list(&data.archetype)?;
        self.lists[index]
            .1
            .address_of_component(data.allocation, component_id)
    }

    /// Returns a stable, re-resolving handle for `(entity, component_id)`.
    ///
    /// The handle may be created for any pair; validity is checked at each
    /// access.

    #[inline]
    pub fn get_handle(&self, entity: Entity, component_id: ComponentId) -> ComponentHandle {
        ComponentHandle::new(entity, component_id)
    }

    /// Returns `true` if the entity currently owns the component kind.
    pub fn contains(&self, entity: Entity, component_id: ComponentId) -> bool {
        self.entities
            .get(&entity)
            .is_some_and(|data| data.archetype.contains(component_id))
    }

    /// Destroys an entity, running the destructor of every owned component.
    ///
    /// Returns `false` if the entity was not known to the archive.

    pub fn destroy(&mut self, entity: Entity) -> bool {
        let Some(data) = self.entities.remove(&entity) else {
            return false;
        };
        if data.archetype.is_empty() || data.allocation.is_none() {
            return true;
        }
        if let Some(index) = self.find_list(&data.archetype) {
            let list = &mut self.lists[index].1;
            for component_id in data.archetype.iter() {
                if let Some(info) = component_info(component_id) {
                    if let Some(target) =
                        list.address_of_component(data.allocation, component_id)
                    {
                        // SAFETY: every component of a live entity is
                        // constructed; each is dropped exactly once here.
                        unsafe { (info.drop)(target) };
                    }
                }
            }
            list.destroy(data.allocation);
        }
        true
    }

    /// Returns the entity's current archetype, or an empty one when absent.
    pub fn query_archetype(&self, entity: Entity) -> Archetype {
        self.entities
            .get(&entity)
            .map(|data| data.archetype.clone())
            .unwrap_or_default()
    }

    /// Returns the entity's archetype without copying, if the entity is known.
    pub fn archetype_of(&self, entity: Entity) -> Option<&Archetype> {
        self.entities.get(&entity).map(|data| &data.archetype)
    }

    /// Returns `true` if both entities own exactly the same component set.
    ///
    /// Entities unknown to the archive count as owning no components, so two
    /// absent entities compare equal.

    pub fn is_same_archetype(&self, left: Entity, right: Entity) -> bool {
        let empty = Archetype::new();
        let left = self.archetype_of(left).unwrap_or(&empty);
        let right = self.archetype_of(right).unwrap_or(&empty);
        left == right
    }

    /// Returns the number of distinct archetypes with storage.
    #[inline]
    pub fn archetype_count(&self) -> usize {
        self.lists.len()
    }

    /// Returns the number of entities known to the archive.
    #[inline]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Returns the total number of chunks across all chunk lists.
    pub fn chunk_count(&self) -> usize {
        self.lists.iter().map(|(_, list)| list.chunk_count()).sum()
    }

    /// Returns the total number of live entity slots across all chunk lists.
    pub fn live_slot_count(&self) -> usize {
        self.lists.iter().map(|(_, list)| list.live_slots()).sum()
    }

    /// Re-packs live slots toward the front of every chunk list.
    ///
    /// ## Behavior
    /// For each entity whose chunk list has a free slot at or before the
    /// entity's chunk, a fresh slot is taken from the min-heap; the move is
    /// committed only when the new position orders strictly before the old
    /// one, keeping the sweep monotone. Payloads are byte-copied — no
    /// constructors or destructors run, and component values are bitwise
    /// unchanged.
    ///
    /// Raw pointers obtained earlier are invalidated; handles stay valid.
    ///
    /// Returns the number of entities that moved.

    pub fn defragment(&mut self) -> usize {
        let lists = &mut self.lists;
        let mut moved = 0usize;
        for data in self.entities.values_mut() {
            if data.archetype.is_empty() || data.allocation.is_none() {
                continue;
            }
            let Some(position) = lists
                .iter()
                .position(|(archetype, _)| *archetype == data.archetype)
            else {
                continue;
            };
            let list = &mut lists[position].1;
            if list.free_chunk_index() > data.allocation.chunk as usize {
                continue;
            }
            let candidate = list.create();
            if candidate < data.allocation {
                list.relocate(data.allocation, candidate);
                data.allocation = candidate;
                moved += 1;
            } else {
                list.destroy(candidate);
            }
        }
        debug!("defragment relocated {moved} entity slots");
        moved
    }

    /// Releases empty chunks at the tail of every chunk list.
    ///
    /// ## Behavior
    /// Optionally defragments first, then removes the trailing run of empty
    /// chunks per list. Surviving chunk indices are unchanged, so no live
    /// allocation is disturbed.
    ///
    /// Returns the total number of chunks removed.

    pub fn shrink_to_fit(&mut self, also_defragment: bool) -> usize {
        if also_defragment {
            self.defragment();
        }
        let mut reduced = 0usize;
        for (_, list) in &mut self.lists {
            reduced += list.shrink_to_fit();
        }
        debug!("shrink_to_fit released {reduced} chunks");
        reduced
    }

    fn find_list(&self, archetype: &Archetype) -> Option<usize> {
        self.lists
            .iter()
            .position(|(candidate, _)| candidate == archetype)
    }

    fn find_or_create_list(&mut self, archetype: &Archetype) -> Option<usize> {
        if let Some(index) = self.find_list(archetype) {
            return Some(index);
        }

        let mut infos: Vec<ComponentInfo> = Vec::with_capacity(archetype.len());
        for component_id in archetype.iter() {
            match component_info(component_id) {
                Some(info) => infos.push(info),
                None => {
                    warn!(
                        "archetype references unregistered component {component_id:#010x}"
                    );
                    return None;
                }
            }
        }

        trace!("creating chunk list for archetype {:?}", archetype.as_slice());
        self.lists
            .push((archetype.clone(), ChunkList::new(&infos, self.pool.clone())));
        Some(self.lists.len() - 1)
    }

    fn lists_pair_mut(
        &mut self,
        first: usize,
        second: usize,
    ) -> (&mut ChunkList, &mut ChunkList) {
        assert!(first != second, "source and destination chunk list must differ");
        if first < second {
            let (head, tail) = self.lists.split_at_mut(second);
            (&mut head[first].1, &mut tail[0].1)
        } else {
            let (head, tail) = self.lists.split_at_mut(first);
            (&mut tail[0].1, &mut head[second].1)
        }
    }
}

impl Default for ComponentArchive {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ComponentArchive {
    fn drop(&mut self) {
        // Run destructors for every live entity before the chunks release
        // their memory.
        let entities: Vec<Entity> = self.entities.keys().copied().collect();
        for entity in entities {
            self.destroy(entity);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Typed facade
// ─────────────────────────────────────────────────────────────────────────────

impl ComponentArchive {
    /// Attaches a default-constructed `T` to the entity.
    ///
    /// Returns `None` if `T` is unregistered or the entity already owns it.

    pub fn attach_default<T: Default + 'static>(&mut self, entity: Entity) -> Option<&mut T> {
        let component_id = component_id_of::<T>()?;
        let ptr = self.attach(entity, component_id, AttachInit::DefaultConstruct)?;
        // SAFETY: the slot layout aligns the component for `T`, and the bytes
        // were just default-constructed.
        Some(unsafe { &mut *(ptr.as_ptr() as *mut T) })
    }

    /// Attaches `T` to the entity, placement-initialising it with `value`.
    ///
    /// Returns `None` (dropping `value`) if `T` is unregistered or the entity
    /// already owns it.

    pub fn attach_with<T: 'static>(&mut self, entity: Entity, value: T) -> Option<&mut T> {
        let component_id = component_id_of::<T>()?;
        let ptr = self.attach(entity, component_id, AttachInit::Uninitialized)?;
        let target = ptr.as_ptr() as *mut T;
        // SAFETY: `target` is aligned and points at raw reserved bytes; the
        // write is the component's placement initialisation.
        unsafe {
            std::ptr::write(target, value);
            Some(&mut *target)
        }
    }

    /// Returns a shared reference to the entity's `T`.
    pub fn get_ref<T: 'static>(&self, entity: Entity) -> Option<&T> {
        let component_id = component_id_of::<T>()?;
        let ptr = self.get(entity, component_id)?;
        // SAFETY: aligned, initialised, and borrowed from `&self`.
        Some(unsafe { &*(ptr.as_ptr() as *const T) })
    }

    /// Returns an exclusive reference to the entity's `T`.
    pub fn get_mut<T: 'static>(&mut self, entity: Entity) -> Option<&mut T> {
        let component_id = component_id_of::<T>()?;
        let ptr = self.get(entity, component_id)?;
        // SAFETY: aligned, initialised, and exclusive through `&mut self`.
        Some(unsafe { &mut *(ptr.as_ptr() as *mut T) })
    }

    /// Detaches `T` from the entity.
    pub fn detach_component<T: 'static>(&mut self, entity: Entity) -> bool {
        match component_id_of::<T>() {
            Some(component_id) => self.detach(entity, component_id),
            None => false,
        }
    }

    /// Returns `true` if the entity owns a `T`.
    pub fn contains_component<T: 'static>(&self, entity: Entity) -> bool {
        match component_id_of::<T>() {
            Some(component_id) => self.contains(entity, component_id),
            None => false,
        }
    }

    /// Returns a stable handle to the entity's `T`.
    pub fn handle_of<T: 'static>(&self, entity: Entity) -> Option<ComponentHandle> {
        component_id_of::<T>().map(|component_id| ComponentHandle::new(entity, component_id))
    }
}
