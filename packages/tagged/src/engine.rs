//! The engine owns every registry, world and scene.
//!
//! There is normally one `Engine` per process. All entity operations address
//! the current world; switching worlds changes which `World` the engine's
//! current key points at and nothing is copied.

use std::collections::BTreeMap;

use slotmap::SlotMap;
use tracing::{debug, warn};

use crate::entity::{Entity, EntityId};
use crate::error::{Error, Result};
use crate::field::Value;
use crate::scene::SceneStack;
use crate::system::{Runner, SystemDecl, SystemDef, SystemRegistry};
use crate::tag::{KindDef, TagId, TagKind, TagRegistry, TraitDef};
use crate::world::{Bucket, World, WorldId};

/// The indexing and dispatch core.
pub struct Engine {
    pub(crate) tags: TagRegistry,
    pub(crate) systems: SystemRegistry,
    pub(crate) worlds: SlotMap<WorldId, World>,
    pub(crate) current: WorldId,
    pub(crate) default: WorldId,
    pub(crate) scenes: SceneStack,
}

impl Engine {
    /// Create a new engine with an empty default world.
    pub fn new() -> Engine {
        let mut worlds = SlotMap::with_key();
        let default = worlds.insert(World::new());

        Engine {
            tags: TagRegistry::new(),
            systems: SystemRegistry::new(),
            worlds,
            current: default,
            default,
            scenes: SceneStack::new(),
        }
    }

    /// Get the registry of declared traits and kinds.
    pub fn tags(&self) -> &TagRegistry {
        &self.tags
    }

    /// Get the registry of declared systems.
    pub fn systems(&self) -> &SystemRegistry {
        &self.systems
    }

    /// Declare a trait.
    pub fn declare_trait(&mut self, def: TraitDef) -> Result<TagId> {
        self.tags.declare_trait(def)
    }

    /// Declare an entity kind.
    pub fn declare_kind(&mut self, def: KindDef) -> Result<TagId> {
        self.tags.declare_kind(def)
    }

    // Worlds

    /// Create a new empty world.
    ///
    /// The world gets empty buckets for every system declared so far. Systems
    /// declared later are only indexed in it if it is current at the time.
    pub fn create_world(&mut self) -> WorldId {
        let id = self.worlds.insert(World::with_systems(&self.systems));
        debug!(world = ?id, "created world");
        id
    }

    /// Make `id` the current world.
    ///
    /// Unknown worlds are ignored.
    pub fn set_current_world(&mut self, id: WorldId) {
        if !self.worlds.contains_key(id) {
            warn!(world = ?id, "ignoring switch to unknown world");
            return;
        }

        if id != self.current {
            debug!(from = ?self.current, to = ?id, "switching world");
            self.current = id;
        }
    }

    /// Make the engine's default world current.
    pub fn set_default_world(&mut self) {
        self.set_current_world(self.default);
    }

    /// Return the key of the current world.
    pub fn current_world(&self) -> WorldId {
        self.current
    }

    /// Return the key of the default world.
    pub fn default_world(&self) -> WorldId {
        self.default
    }

    /// Get the current world.
    pub fn world(&self) -> &World {
        &self.worlds[self.current]
    }

    /// Get any world by key.
    pub fn world_by_id(&self, id: WorldId) -> Option<&World> {
        self.worlds.get(id)
    }

    /// Free a world.
    ///
    /// The current and default worlds cannot be removed.
    pub fn remove_world(&mut self, id: WorldId) -> Option<World> {
        if id == self.current || id == self.default {
            return None;
        }
        self.worlds.remove(id)
    }

    // Entities

    /// Create an entity of the given kind in the current world.
    ///
    /// Fields which aren't given take their declared default. The entity is
    /// indexed before the kind's creation hook runs.
    pub fn create_entity(&mut self, kind: &str, fields: &[(&str, Value)]) -> Result<EntityId> {
        let kind_id = self.tags.lookup(kind)
            .ok_or_else(|| Error::UnknownType(kind.to_owned()))?;
        let registration = self.tags.registration(kind_id);
        if registration.kind() != TagKind::Kind {
            return Err(Error::NotAKind(kind.to_owned()));
        }

        let defaults: BTreeMap<String, Value> = registration.fields().iter()
            .map(|f| (f.name().to_owned(), f.default_value().clone()))
            .collect();
        let mut entity = Entity::new(EntityId::default(), kind_id, registration.shared_name(), defaults);
        for (name, value) in fields {
            entity.set(name, value.clone())?;
        }
        let on_create = registration.on_create();

        let world = &mut self.worlds[self.current];
        let id = world.allocate_id();
        world.insert(entity.with_id(id), &self.tags, &self.systems);
        debug!(?id, kind, "created entity");

        if let Some(hook) = on_create {
            hook(self, id)?;
        }

        Ok(id)
    }

    /// Destroy an entity in the current world.
    ///
    /// Returns the detached entity, or None if it wasn't alive. The kind's
    /// destruction hook runs after the entity has left every index.
    pub fn destroy_entity(&mut self, id: EntityId) -> Result<Option<Entity>> {
        let entity = match self.worlds[self.current].remove(id, &self.tags) {
            Some(entity) => entity,
            None => return Ok(None),
        };
        debug!(?id, kind = %entity.kind_name(), "destroyed entity");

        let on_destroy = self.tags.registration(entity.kind()).on_destroy();
        if let Some(hook) = on_destroy {
            hook(self, id)?;
        }

        Ok(Some(entity))
    }

    /// Destroy every entity in the current world.
    pub fn destroy_all_entities(&mut self) -> Result<Vec<Entity>> {
        let ids = self.world().ids();
        let mut destroyed = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(entity) = self.destroy_entity(id)? {
                destroyed.push(entity);
            }
        }
        Ok(destroyed)
    }

    /// Look up a live entity in the current world.
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.world().get(id)
    }

    /// Look up a live entity in the current world for modification.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.worlds[self.current].get_mut(id)
    }

    /// Return the number of live entities in the current world.
    pub fn entity_count(&self) -> usize {
        self.world().len()
    }

    /// Call `f` on every entity in the current world which satisfies all of
    /// the named traits and kinds.
    pub fn for_each_entity<S, F>(&mut self, filter: &[S], mut f: F) -> Result<()>
        where S: AsRef<str>,
              F: FnMut(&mut Entity),
    {
        let required = self.tags.resolve(filter)?;
        let tags = &self.tags;
        for entity in self.worlds[self.current].iter_mut() {
            if tags.satisfies(entity.kind(), &required) {
                f(entity);
            }
        }
        Ok(())
    }

    /// Return the entities in the current world carrying a trait.
    pub fn entities_with_trait(&self, name: &str) -> Result<Vec<EntityId>> {
        let tag = self.tags.lookup(name)
            .ok_or_else(|| Error::UnknownType(name.to_owned()))?;
        Ok(self.world().trait_bucket(tag)
            .map(|bucket| bucket.iter().copied().collect())
            .unwrap_or_default())
    }

    // Systems

    /// Declare a system, replacing any previous system of the same name.
    ///
    /// The system's buckets are rebuilt by scanning every entity in the
    /// current world, and in any other world which already indexes a system
    /// of this name.
    pub fn declare_system(&mut self, def: SystemDef) -> Result<()> {
        let decl = SystemDecl::resolve(def, &self.tags)?;
        let decl = self.systems.insert(decl);

        let current = self.current;
        for (id, world) in self.worlds.iter_mut() {
            if id == current || world.supports_system(decl.name()) {
                world.rebuild_system(&decl, &self.tags);
            }
        }

        debug!(system = %decl.name(), arity = decl.arity(), "declared system");
        Ok(())
    }

    /// Run a system over every combination of matching entities in the current world.
    pub fn run_system(&mut self, name: &str) -> Result<()> {
        let decl = self.systems.get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownSystem(name.to_owned()))?;
        Runner::new(decl).run(self)
    }

    /// Invoke a system's behaviour once with the given entities.
    ///
    /// This is a debugging aid: the entities are not checked against the
    /// system's constraints.
    pub fn call_system(&mut self, name: &str, entities: &[EntityId]) -> Result<()> {
        let decl = self.systems.get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownSystem(name.to_owned()))?;
        if decl.arity() != entities.len() {
            return Err(Error::Arity {
                system: name.to_owned(),
                expected: decl.arity(),
                found: entities.len(),
            });
        }

        let behavior = decl.behavior();
        behavior(self, entities).map_err(Error::Behavior)
    }

    /// Fetch one of a system's buckets in the current world.
    pub fn system_bucket(&self, name: &str, position: usize) -> Option<&Bucket> {
        self.world().system_index(name).and_then(|index| index.bucket(position))
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}
