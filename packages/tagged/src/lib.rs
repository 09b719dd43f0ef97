//! An entity system which indexes entities by trait tags.
//!
//! Entities are instances of declared kinds, and every kind carries a fixed
//! set of traits. Systems declare one trait constraint per argument and are
//! run over every combination of matching entities in the current world.
//! Worlds are isolated entity universes, and scenes pair a world with a set
//! of lifecycle callbacks on a navigable stack.
//!
//! The primary entry point is the [`Engine`] struct.

pub use engine::Engine;
pub use entity::{Entity, EntityId};
pub use error::{Error, Result};
pub use field::{FieldDef, FieldType, Value};
pub use game_loop::{FrameClock, GameLoop, LoopConfig};
pub use scene::{Scene, SceneEvent};
pub use system::SystemDef;
pub use tag::{KindDef, TagId, TagSet, TraitDef};
pub use world::{World, WorldId};

pub mod error;
pub mod field;
pub mod tag;
mod entity;

pub mod world;
pub mod system;
pub mod scene;
mod engine;

pub mod game_loop;
