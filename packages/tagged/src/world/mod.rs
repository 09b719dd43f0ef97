//! A world which can hold entities.
//!
//! Each `World` is an isolated entity universe: it owns the id counter, the
//! id to entity map, the trait buckets and one `SystemIndex` per system it
//! supports. Every entity in the map is in exactly the trait buckets of its
//! kind's traits and exactly the system buckets whose constraints its kind
//! satisfies.

use std::collections::HashMap;

use tracing::trace;

use crate::entity::{Entity, EntityId};
use crate::system::{SystemDecl, SystemRegistry};
use crate::tag::{TagId, TagRegistry};

pub use index::{Bucket, SystemIndex};

mod index;

slotmap::new_key_type! {
    /// The key of a `World` owned by an `Engine`.
    pub struct WorldId;
}

/// An entity store plus the trait and system indices over it.
#[derive(Debug)]
pub struct World {
    next_id: u64,
    entities: HashMap<EntityId, Entity>,
    traits: HashMap<TagId, Bucket>,
    systems: HashMap<String, SystemIndex>,
}

impl World {
    /// Create a new empty world with no system indices.
    pub fn new() -> World {
        World {
            next_id: 1,
            entities: HashMap::new(),
            traits: HashMap::new(),
            systems: HashMap::new(),
        }
    }

    /// Create a new empty world with empty buckets for every declared system.
    pub fn with_systems(systems: &SystemRegistry) -> World {
        let mut world = World::new();
        for decl in systems.iter() {
            world.systems.insert(decl.name().to_owned(), SystemIndex::new(decl.arity()));
        }
        world
    }

    /// Return the number of live entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if there are no live entities.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Returns true if the entity is alive in this world.
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Look up a live entity.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Look up a live entity for modification.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Iterate over every live entity, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item=&Entity> {
        self.entities.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item=&mut Entity> {
        self.entities.values_mut()
    }

    /// Return the IDs of every live entity, in no particular order.
    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    /// Fetch the bucket of live entities carrying a trait.
    pub fn trait_bucket(&self, tag: TagId) -> Option<&Bucket> {
        self.traits.get(&tag)
    }

    /// Fetch the buckets of a system.
    ///
    /// Returns None if this world has no index for the system.
    pub fn system_index(&self, name: &str) -> Option<&SystemIndex> {
        self.systems.get(name)
    }

    /// Returns true if this world has buckets for the named system.
    pub fn supports_system(&self, name: &str) -> bool {
        self.systems.contains_key(name)
    }

    /// Allocate the next entity ID.
    pub(crate) fn allocate_id(&mut self) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Insert an entity into the store and every index it belongs in.
    pub(crate) fn insert(&mut self, entity: Entity, tags: &TagRegistry, systems: &SystemRegistry) {
        let id = entity.id();
        let kind = entity.kind();

        for tag in tags.traits_of(kind) {
            self.traits.entry(tag).or_default().insert(id);
        }

        for (name, index) in self.systems.iter_mut() {
            let decl = match systems.get(name) {
                Some(decl) if decl.arity() == index.arity() => decl,
                _ => continue,
            };

            for position in 0..decl.arity() {
                if decl.accepts(tags, position, kind) {
                    index.insert(position, id);
                }
            }
        }

        trace!(?id, kind = %entity.kind_name(), "inserted entity");
        self.entities.insert(id, entity);
    }

    /// Remove an entity from the store and every index.
    ///
    /// Returns None if the entity was not alive, in which case nothing changes.
    pub(crate) fn remove(&mut self, id: EntityId, tags: &TagRegistry) -> Option<Entity> {
        let entity = self.entities.remove(&id)?;

        for tag in tags.traits_of(entity.kind()) {
            if let Some(bucket) = self.traits.get_mut(&tag) {
                bucket.remove(&id);
            }
        }

        for index in self.systems.values_mut() {
            index.remove(id);
        }

        trace!(?id, kind = %entity.kind_name(), "removed entity");
        Some(entity)
    }

    /// Rebuild the buckets of a system from scratch by scanning every entity.
    pub(crate) fn rebuild_system(&mut self, decl: &SystemDecl, tags: &TagRegistry) {
        let index = self.systems.entry(decl.name().to_owned())
            .or_insert_with(|| SystemIndex::new(decl.arity()));
        if index.arity() != decl.arity() {
            *index = SystemIndex::new(decl.arity());
        } else {
            index.clear();
        }

        for entity in self.entities.values() {
            for position in 0..decl.arity() {
                if decl.accepts(tags, position, entity.kind()) {
                    index.insert(position, entity.id());
                }
            }
        }
    }
}

impl Default for World {
    fn default() -> Self {
        World::new()
    }
}
