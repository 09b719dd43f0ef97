//! Scenes and the scene stack.
//!
//! A scene is a named game mode with its own `World` and a set of lifecycle
//! callbacks. Scenes are registered by name and navigated like a stack:
//! pushing a scene suspends the current one, dropping returns to the one
//! below, and pushing a scene which is already further down the stack unwinds
//! back to it.
//!
//! A scene's world is created the first time it is activated and kept while
//! the scene is suspended. Exiting a scene clears its `initialized` flag, so
//! the next activation starts it again with a fresh world.

use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::field::Value;
use crate::world::WorldId;

/// A scene lifecycle callback.
pub type Callback = Rc<dyn Fn(&mut Engine, &[Value]) -> anyhow::Result<()>>;

/// The events a scene can respond to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SceneEvent {
    /// The scene was activated for the first time since it was last exited.
    Initialized,
    /// Once per frame, with the frame's delta time in seconds.
    Update,
    /// Once per frame, after `Update`.
    Draw,
    /// The scene became current again after being suspended.
    Resume,
    /// Another scene is about to replace this one.
    Leaving,
    /// The scene is being torn down.
    Exiting,
    Custom(String),
}

/// A named scene.
pub struct Scene {
    name: String,
    world: Option<WorldId>,
    initialized: bool,
    callbacks: HashMap<SceneEvent, Callback>,
}

impl Scene {
    /// Create a new scene with no callbacks.
    pub fn new(name: impl Into<String>) -> Scene {
        Scene {
            name: name.into(),
            world: None,
            initialized: false,
            callbacks: HashMap::new(),
        }
    }

    /// Set the callback for an event.
    pub fn on<F>(mut self, event: SceneEvent, callback: F) -> Self
        where F: Fn(&mut Engine, &[Value]) -> anyhow::Result<()> + 'static
    {
        self.callbacks.insert(event, Rc::new(callback));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the scene's world, if it has been activated.
    pub fn world(&self) -> Option<WorldId> {
        self.world
    }

    /// Returns true if the scene has been activated and not exited since.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Returns true if the scene has a callback for `event`.
    pub fn handles(&self, event: &SceneEvent) -> bool {
        self.callbacks.contains_key(event)
    }
}

impl Debug for Scene {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("name", &self.name)
            .field("world", &self.world)
            .field("initialized", &self.initialized)
            .finish()
    }
}

/// The scene registry and navigation history.
#[derive(Debug, Default)]
pub struct SceneStack {
    scenes: HashMap<String, Scene>,
    history: Vec<String>,
    current: Option<String>,
}

impl SceneStack {
    pub fn new() -> SceneStack {
        SceneStack::default()
    }

    /// Find a scene by name.
    pub fn get(&self, name: &str) -> Option<&Scene> {
        self.scenes.get(name)
    }

    /// Returns true if a scene with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.scenes.contains_key(name)
    }

    /// Return the name of the current scene.
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Return the suspended scenes, oldest first.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    fn callback(&self, scene: &str, event: &SceneEvent) -> Option<Callback> {
        self.scenes.get(scene)
            .and_then(|s| s.callbacks.get(event))
            .cloned()
    }
}

impl Engine {
    /// Get the scene registry.
    pub fn scenes(&self) -> &SceneStack {
        &self.scenes
    }

    /// Return the name of the current scene.
    pub fn current_scene(&self) -> Option<&str> {
        self.scenes.current()
    }

    /// Return the names of the suspended scenes, oldest first.
    pub fn scene_history(&self) -> &[String] {
        self.scenes.history()
    }

    /// Register a scene, replacing the callbacks of any scene with the same name.
    ///
    /// A replaced scene keeps its world and state.
    pub fn register_scene(&mut self, mut scene: Scene) {
        if let Some(old) = self.scenes.scenes.remove(&scene.name) {
            scene.world = old.world;
            scene.initialized = old.initialized;
        }
        debug!(scene = %scene.name, "registered scene");
        self.scenes.scenes.insert(scene.name.clone(), scene);
    }

    /// Invoke a scene's callback for `event`, if it has one.
    pub fn dispatch_scene_callback(&mut self, scene: &str, event: &SceneEvent, args: &[Value]) -> Result<()> {
        let callback = match self.scenes.callback(scene, event) {
            Some(callback) => callback,
            None => return Ok(()),
        };

        trace!(scene, ?event, "dispatch");
        callback(self, args).map_err(Error::Behavior)
    }

    /// Make a scene current, suspending the current scene.
    ///
    /// If the scene is already suspended further down the history, every
    /// scene above it is exited instead. Unregistered scenes are ignored.
    pub fn push_scene(&mut self, name: &str) -> Result<()> {
        if self.scenes.current.as_deref() == Some(name) {
            return Ok(());
        }
        if !self.scenes.contains(name) {
            warn!(scene = name, "ignoring push of unregistered scene");
            return Ok(());
        }

        if let Some(current) = self.scenes.current.clone() {
            self.dispatch_scene_callback(&current, &SceneEvent::Leaving, &[])?;
        }

        if self.scenes.history.iter().any(|s| s == name) {
            while self.scenes.current.as_deref() != Some(name) {
                if self.scenes.current.is_none() {
                    break;
                }
                self.exit_current_scene()?;
                self.scenes.current = self.scenes.history.pop();
            }
        } else {
            if let Some(current) = self.scenes.current.take() {
                self.scenes.history.push(current);
            }
            self.scenes.current = Some(name.to_owned());
        }

        debug!(scene = name, history = ?self.scenes.history, "pushed scene");
        self.activate_scene(name)
    }

    /// Exit the current scene and resume the one below it, `n + 1` times.
    ///
    /// Stops early if there is nothing left to return to.
    pub fn drop_scene(&mut self, n: usize) -> Result<()> {
        for _ in 0..=n {
            if self.scenes.history.is_empty() {
                debug!("no scene to return to");
                break;
            }

            self.exit_current_scene()?;
            self.scenes.current = self.scenes.history.pop();
            if let Some(name) = self.scenes.current.clone() {
                debug!(scene = %name, "dropped to scene");
                self.activate_scene(&name)?;
            }
        }

        Ok(())
    }

    /// Reset every scene and start again from `name`.
    ///
    /// Every registered scene is exited (its `Exiting` callback is skipped if
    /// `skip_exiting_callback` is set) and the history is cleared. Unregistered
    /// scenes are ignored and nothing is reset.
    pub fn set_scene(&mut self, name: &str, skip_exiting_callback: bool) -> Result<()> {
        if !self.scenes.contains(name) {
            warn!(scene = name, "ignoring set of unregistered scene");
            return Ok(());
        }

        let mut names: Vec<String> = self.scenes.scenes.keys().cloned().collect();
        names.sort();
        for scene in names {
            self.exit_scene(&scene, !skip_exiting_callback)?;
        }

        self.scenes.history.clear();
        self.scenes.current = None;
        self.push_scene(name)
    }

    /// Forget a scene's state so that its next activation starts afresh.
    pub fn reset_scene(&mut self, name: &str) {
        let current = self.current;
        let default = self.default;
        let scene = match self.scenes.scenes.get_mut(name) {
            Some(scene) => scene,
            None => return,
        };

        scene.initialized = false;
        if let Some(world) = scene.world {
            if world != current && world != default {
                scene.world = None;
                self.worlds.remove(world);
            }
        }
    }

    /// Send `Update` to the current scene.
    pub fn current_scene_update(&mut self, dt: f64) -> Result<()> {
        match self.scenes.current.clone() {
            Some(scene) => self.dispatch_scene_callback(&scene, &SceneEvent::Update, &[Value::Float(dt)]),
            None => Ok(()),
        }
    }

    /// Send `Draw` to the current scene.
    pub fn current_scene_draw(&mut self) -> Result<()> {
        match self.scenes.current.clone() {
            Some(scene) => self.dispatch_scene_callback(&scene, &SceneEvent::Draw, &[]),
            None => Ok(()),
        }
    }

    fn exit_current_scene(&mut self) -> Result<()> {
        match self.scenes.current.clone() {
            Some(scene) => self.exit_scene(&scene, true),
            None => Ok(()),
        }
    }

    /// Clear a scene's `initialized` flag and optionally send it `Exiting`.
    ///
    /// The scene's world is made current while the callback runs.
    fn exit_scene(&mut self, name: &str, notify: bool) -> Result<()> {
        let world = match self.scenes.scenes.get_mut(name) {
            Some(scene) => {
                scene.initialized = false;
                scene.world
            }
            None => return Ok(()),
        };

        if !notify {
            return Ok(());
        }

        if let Some(world) = world {
            self.set_current_world(world);
        }
        debug!(scene = name, "exiting scene");
        self.dispatch_scene_callback(name, &SceneEvent::Exiting, &[])
    }

    /// Bind a scene's world and send it `Initialized` or `Resume`.
    ///
    /// The world is created on first activation and kept until the scene is
    /// reset. A world removed from under the scene is replaced with an empty
    /// one and the scene starts over.
    fn activate_scene(&mut self, name: &str) -> Result<()> {
        let (mut initialized, world) = match self.scenes.get(name) {
            Some(scene) => (scene.initialized, scene.world),
            None => return Ok(()),
        };

        let world = match world.filter(|world| self.worlds.contains_key(*world)) {
            Some(world) => world,
            None => {
                initialized = false;
                self.create_world()
            }
        };
        self.set_current_world(world);
        if let Some(scene) = self.scenes.scenes.get_mut(name) {
            scene.world = Some(world);
            scene.initialized = true;
        }

        if initialized {
            self.dispatch_scene_callback(name, &SceneEvent::Resume, &[])
        } else {
            self.dispatch_scene_callback(name, &SceneEvent::Initialized, &[])
        }
    }
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;

    use anyhow::bail;

    use super::*;
    use crate::tag::KindDef;

    type Log = Rc<RefCell<Vec<String>>>;

    /// Register a scene which records every lifecycle event in `log`.
    fn logged(engine: &mut Engine, log: &Log, name: &str) {
        let mut scene = Scene::new(name);
        let events = [
            (SceneEvent::Initialized, "initialized"),
            (SceneEvent::Resume, "resume"),
            (SceneEvent::Leaving, "leaving"),
            (SceneEvent::Exiting, "exiting"),
            (SceneEvent::Update, "update"),
            (SceneEvent::Draw, "draw"),
        ];
        for (event, label) in events {
            let log = log.clone();
            let entry = format!("{}:{}", name, label);
            scene = scene.on(event, move |_, _| {
                log.borrow_mut().push(entry.clone());
                Ok(())
            });
        }
        engine.register_scene(scene);
    }

    fn setup(names: &[&str]) -> (Engine, Log) {
        let mut engine = Engine::new();
        engine.declare_kind(KindDef::new("marker")).unwrap();
        let log = Log::default();
        for name in names {
            logged(&mut engine, &log, name);
        }
        (engine, log)
    }

    fn take(log: &Log) -> Vec<String> {
        log.borrow_mut().drain(..).collect()
    }

    #[test]
    fn test_push_and_drop() {
        let (mut engine, log) = setup(&["menu", "game"]);

        engine.push_scene("menu").unwrap();
        assert_eq!(take(&log), vec!["menu:initialized"]);
        let menu_world = engine.current_world();
        assert_ne!(menu_world, engine.default_world());

        engine.push_scene("game").unwrap();
        assert_eq!(take(&log), vec!["menu:leaving", "game:initialized"]);
        assert_eq!(engine.scene_history(), &["menu".to_owned()]);
        assert_ne!(engine.current_world(), menu_world);

        engine.drop_scene(0).unwrap();
        assert_eq!(take(&log), vec!["game:exiting", "menu:resume"]);
        assert_eq!(engine.current_scene(), Some("menu"));
        assert_eq!(engine.current_world(), menu_world);
        assert!(engine.scene_history().is_empty());
        assert!(!engine.scenes().get("game").unwrap().is_initialized());
    }

    #[test]
    fn test_push_current_is_noop() {
        let (mut engine, log) = setup(&["menu"]);
        engine.push_scene("menu").unwrap();
        take(&log);
        engine.push_scene("menu").unwrap();
        assert!(take(&log).is_empty());
    }

    #[test]
    fn test_push_unregistered_is_noop() {
        let (mut engine, log) = setup(&["menu"]);
        engine.push_scene("menu").unwrap();
        take(&log);
        engine.push_scene("credits").unwrap();
        engine.set_scene("credits", false).unwrap();
        assert!(take(&log).is_empty());
        assert_eq!(engine.current_scene(), Some("menu"));
    }

    #[test]
    fn test_cycle_unwinds_history() {
        let (mut engine, log) = setup(&["s1", "s2", "s3"]);
        engine.push_scene("s1").unwrap();
        engine.push_scene("s2").unwrap();
        engine.push_scene("s3").unwrap();
        take(&log);

        engine.push_scene("s1").unwrap();
        assert_eq!(take(&log), vec!["s3:leaving", "s3:exiting", "s2:exiting", "s1:resume"]);
        assert_eq!(engine.current_scene(), Some("s1"));
        assert!(engine.scene_history().is_empty());
    }

    #[test]
    fn test_scene_world_persists() {
        let (mut engine, _log) = setup(&["menu", "pause"]);
        engine.push_scene("menu").unwrap();
        let id = engine.create_entity("marker", &[]).unwrap();

        engine.push_scene("pause").unwrap();
        assert!(engine.entity(id).is_none());

        engine.drop_scene(0).unwrap();
        assert!(engine.entity(id).is_some());
    }

    #[test]
    fn test_exited_scene_keeps_world() {
        let (mut engine, log) = setup(&["menu", "game"]);
        engine.push_scene("menu").unwrap();
        engine.push_scene("game").unwrap();
        let game_world = engine.current_world();
        let id = engine.create_entity("marker", &[]).unwrap();
        engine.drop_scene(0).unwrap();
        assert!(engine.entity(id).is_none());
        take(&log);

        engine.push_scene("game").unwrap();
        assert_eq!(take(&log), vec!["menu:leaving", "game:initialized"]);
        assert_eq!(engine.current_world(), game_world);
        assert!(engine.entity(id).is_some());
        assert_eq!(engine.entity_count(), 1);
    }

    #[test]
    fn test_removed_world_is_replaced() {
        let (mut engine, log) = setup(&["menu", "game"]);
        engine.push_scene("game").unwrap();
        let game_world = engine.current_world();
        engine.create_entity("marker", &[]).unwrap();
        engine.push_scene("menu").unwrap();
        assert!(engine.remove_world(game_world).is_some());
        take(&log);

        engine.drop_scene(0).unwrap();
        assert_eq!(take(&log), vec!["menu:exiting", "game:initialized"]);
        assert_ne!(engine.current_world(), game_world);
        assert_eq!(engine.scenes().get("game").unwrap().world(), Some(engine.current_world()));
        assert_eq!(engine.entity_count(), 0);
    }

    #[test]
    fn test_drop_many() {
        let (mut engine, log) = setup(&["a", "b", "c"]);
        engine.push_scene("a").unwrap();
        engine.push_scene("b").unwrap();
        engine.push_scene("c").unwrap();
        take(&log);

        engine.drop_scene(1).unwrap();
        assert_eq!(take(&log), vec!["c:exiting", "b:resume", "b:exiting", "a:resume"]);
        assert_eq!(engine.current_scene(), Some("a"));

        // Nothing below the root.
        engine.drop_scene(3).unwrap();
        assert!(take(&log).is_empty());
        assert_eq!(engine.current_scene(), Some("a"));
    }

    #[test]
    fn test_set_resets_everything() {
        let (mut engine, log) = setup(&["a", "b"]);
        engine.push_scene("a").unwrap();
        engine.push_scene("b").unwrap();
        take(&log);

        engine.set_scene("a", false).unwrap();
        assert_eq!(take(&log), vec!["a:exiting", "b:exiting", "a:initialized"]);
        assert_eq!(engine.current_scene(), Some("a"));
        assert!(engine.scene_history().is_empty());
        assert!(!engine.scenes().get("b").unwrap().is_initialized());

        engine.set_scene("b", true).unwrap();
        assert_eq!(take(&log), vec!["b:initialized"]);
    }

    #[test]
    fn test_update_and_draw() {
        let (mut engine, log) = setup(&["game"]);
        engine.current_scene_update(0.016).unwrap();
        assert!(take(&log).is_empty());

        engine.push_scene("game").unwrap();
        take(&log);
        engine.current_scene_update(0.016).unwrap();
        engine.current_scene_draw().unwrap();
        assert_eq!(take(&log), vec!["game:update", "game:draw"]);
    }

    #[test]
    fn test_dispatch() {
        let mut engine = Engine::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        engine.register_scene(Scene::new("game")
            .on(SceneEvent::Custom("score".to_owned()), move |_, args| {
                s.borrow_mut().extend_from_slice(args);
                Ok(())
            })
            .on(SceneEvent::Draw, |_, _| bail!("no window")));

        let score = SceneEvent::Custom("score".to_owned());
        engine.dispatch_scene_callback("game", &score, &[Value::Int(3)]).unwrap();
        engine.dispatch_scene_callback("game", &SceneEvent::Update, &[]).unwrap();
        engine.dispatch_scene_callback("nowhere", &score, &[]).unwrap();
        assert_eq!(*seen.borrow(), vec![Value::Int(3)]);

        let err = engine.dispatch_scene_callback("game", &SceneEvent::Draw, &[]).unwrap_err();
        assert_eq!(err.to_string(), "no window");
    }

    #[test]
    fn test_reset_scene() {
        let (mut engine, log) = setup(&["a", "b"]);
        engine.push_scene("a").unwrap();
        engine.push_scene("b").unwrap();
        let a_world = engine.scenes().get("a").unwrap().world().unwrap();

        engine.reset_scene("a");
        assert!(engine.world_by_id(a_world).is_none());
        take(&log);

        engine.drop_scene(0).unwrap();
        assert_eq!(take(&log), vec!["b:exiting", "a:initialized"]);
    }

    #[test]
    fn test_reregister_keeps_state() {
        let (mut engine, log) = setup(&["a"]);
        engine.push_scene("a").unwrap();
        let world = engine.current_world();

        engine.register_scene(Scene::new("a"));
        let scene = engine.scenes().get("a").unwrap();
        assert!(scene.is_initialized());
        assert_eq!(scene.world(), Some(world));
        assert!(!scene.handles(&SceneEvent::Update));
        take(&log);
        engine.current_scene_update(1.0).unwrap();
        assert!(take(&log).is_empty());
    }
}
