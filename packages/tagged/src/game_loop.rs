//! A headless frame driver.
//!
//! `GameLoop` does the engine's side of the per-frame contract: it computes
//! the frame's delta time and calls the current scene's `Update` and `Draw`
//! callbacks, in that order. Opening a window and presenting frames is left to
//! whatever renders the game; the window settings in `LoopConfig` are carried
//! for it.

use std::fs;
use std::path::Path;
use std::time::Instant;

use serde::Deserialize;
use tracing::{debug, info};

use crate::engine::Engine;
use crate::error::Result;

/// Settings read when the loop is constructed.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoopConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
    /// RGBA, each channel in `0.0..=1.0`.
    pub clear_color: [f32; 4],
    /// When set, every frame advances by exactly `1 / target_fps` seconds.
    pub target_fps: Option<u32>,
    /// The scene to start in.
    pub initial_scene: Option<String>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        LoopConfig {
            width: 800,
            height: 600,
            title: "tagged".to_owned(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            target_fps: None,
            initial_scene: None,
        }
    }
}

impl LoopConfig {
    /// Parse a configuration from TOML. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<LoopConfig> {
        Ok(toml::from_str(source)?)
    }

    /// Read a configuration from a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<LoopConfig> {
        let source = fs::read_to_string(path)?;
        LoopConfig::from_toml_str(&source)
    }
}

/// Produces the delta time of each frame.
#[derive(Clone, Debug)]
pub struct FrameClock {
    fixed: Option<f64>,
    last: Instant,
}

impl FrameClock {
    /// Create a clock. A target rate of zero is treated as unset.
    pub fn new(target_fps: Option<u32>) -> FrameClock {
        FrameClock {
            fixed: target_fps.filter(|fps| *fps > 0).map(|fps| 1.0 / fps as f64),
            last: Instant::now(),
        }
    }

    /// Returns true if every frame has the same delta time.
    pub fn is_fixed(&self) -> bool {
        self.fixed.is_some()
    }

    /// Restart the measurement from now.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    /// Return the delta time of the frame which is starting, in seconds.
    pub fn tick(&mut self) -> f64 {
        let now = Instant::now();
        let measured = now.duration_since(self.last).as_secs_f64();
        self.last = now;
        self.fixed.unwrap_or(measured)
    }
}

type LoopHook = Box<dyn FnMut(&mut Engine) -> anyhow::Result<()>>;
type UpdateHook = Box<dyn FnMut(&mut Engine, f64) -> anyhow::Result<()>>;

/// Drives an `Engine` one frame at a time.
pub struct GameLoop {
    config: LoopConfig,
    clock: FrameClock,
    frames: u64,
    on_initialized: Option<LoopHook>,
    on_update: Option<UpdateHook>,
    on_exiting: Option<LoopHook>,
}

impl GameLoop {
    pub fn new(config: LoopConfig) -> GameLoop {
        let clock = FrameClock::new(config.target_fps);
        GameLoop {
            config,
            clock,
            frames: 0,
            on_initialized: None,
            on_update: None,
            on_exiting: None,
        }
    }

    /// Run `hook` once when the loop starts, before the initial scene is set.
    pub fn on_initialized<F>(mut self, hook: F) -> Self
        where F: FnMut(&mut Engine) -> anyhow::Result<()> + 'static
    {
        self.on_initialized = Some(Box::new(hook));
        self
    }

    /// Run `hook` every frame, before the current scene's update.
    pub fn on_update<F>(mut self, hook: F) -> Self
        where F: FnMut(&mut Engine, f64) -> anyhow::Result<()> + 'static
    {
        self.on_update = Some(Box::new(hook));
        self
    }

    /// Run `hook` once when the loop stops.
    pub fn on_exiting<F>(mut self, hook: F) -> Self
        where F: FnMut(&mut Engine) -> anyhow::Result<()> + 'static
    {
        self.on_exiting = Some(Box::new(hook));
        self
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// Return the number of frames run so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Fire `on_initialized` and switch to the initial scene.
    pub fn start(&mut self, engine: &mut Engine) -> Result<()> {
        info!(
            title = %self.config.title,
            width = self.config.width,
            height = self.config.height,
            target_fps = ?self.config.target_fps,
            "starting loop");

        if let Some(hook) = self.on_initialized.as_mut() {
            hook(engine)?;
        }
        if let Some(scene) = self.config.initial_scene.clone() {
            engine.set_scene(&scene, false)?;
        }

        self.clock.reset();
        Ok(())
    }

    /// Run a single frame, returning its delta time.
    pub fn frame(&mut self, engine: &mut Engine) -> Result<f64> {
        let dt = self.clock.tick();
        if let Some(hook) = self.on_update.as_mut() {
            hook(engine, dt)?;
        }
        engine.current_scene_update(dt)?;
        engine.current_scene_draw()?;

        self.frames += 1;
        Ok(dt)
    }

    /// Run `count` frames.
    pub fn run_frames(&mut self, engine: &mut Engine, count: u64) -> Result<()> {
        for _ in 0..count {
            self.frame(engine)?;
        }
        debug!(frames = self.frames, "ran frames");
        Ok(())
    }

    /// Fire `on_exiting`.
    pub fn stop(&mut self, engine: &mut Engine) -> Result<()> {
        info!(frames = self.frames, "stopping loop");
        if let Some(hook) = self.on_exiting.as_mut() {
            hook(engine)?;
        }
        Ok(())
    }

    /// Start, run `count` frames and stop.
    pub fn run(&mut self, engine: &mut Engine, count: u64) -> Result<()> {
        self.start(engine)?;
        self.run_frames(engine, count)?;
        self.stop(engine)
    }
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::error::Error;
    use crate::field::Value;
    use crate::scene::{Scene, SceneEvent};

    #[test]
    fn test_config_defaults() {
        let config = LoopConfig::from_toml_str("").unwrap();
        assert_eq!(config, LoopConfig::default());

        let config = LoopConfig::from_toml_str(r#"
            title = "potions"
            width = 1024
            target_fps = 60
            clear_color = [0.1, 0.2, 0.3, 1.0]
            initial_scene = "menu"
        "#).unwrap();
        assert_eq!(config.title, "potions");
        assert_eq!(config.width, 1024);
        assert_eq!(config.height, 600);
        assert_eq!(config.target_fps, Some(60));
        assert_eq!(config.initial_scene.as_deref(), Some("menu"));

        assert!(matches!(LoopConfig::from_toml_str("width = \"wide\""), Err(Error::Config(_))));
        assert!(matches!(LoopConfig::from_path("/nonexistent/loop.toml"), Err(Error::Io(_))));
    }

    #[test]
    fn test_fixed_clock() {
        let mut clock = FrameClock::new(Some(50));
        assert!(clock.is_fixed());
        assert_eq!(clock.tick(), 0.02);
        assert_eq!(clock.tick(), 0.02);

        let mut clock = FrameClock::new(Some(0));
        assert!(!clock.is_fixed());
        assert!(clock.tick() >= 0.0);
    }

    #[test]
    fn test_loop_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut engine = Engine::new();

        let (u, d) = (log.clone(), log.clone());
        engine.register_scene(Scene::new("game")
            .on(SceneEvent::Update, move |_, args| {
                u.borrow_mut().push(format!("update {:?}", args[0]));
                Ok(())
            })
            .on(SceneEvent::Draw, move |_, _| {
                d.borrow_mut().push("draw".to_owned());
                Ok(())
            }));

        let (i, t, e) = (log.clone(), log.clone(), log.clone());
        let mut game = GameLoop::new(LoopConfig {
            target_fps: Some(4),
            initial_scene: Some("game".to_owned()),
            ..LoopConfig::default()
        })
            .on_initialized(move |_| {
                i.borrow_mut().push("init".to_owned());
                Ok(())
            })
            .on_update(move |_, dt| {
                t.borrow_mut().push(format!("tick {}", dt));
                Ok(())
            })
            .on_exiting(move |_| {
                e.borrow_mut().push("exit".to_owned());
                Ok(())
            });

        game.run(&mut engine, 2).unwrap();
        assert_eq!(game.frames(), 2);
        assert_eq!(engine.current_scene(), Some("game"));

        let dt = format!("{:?}", Value::Float(0.25));
        assert_eq!(*log.borrow(), vec![
            "init".to_owned(),
            "tick 0.25".to_owned(),
            format!("update {}", dt),
            "draw".to_owned(),
            "tick 0.25".to_owned(),
            format!("update {}", dt),
            "draw".to_owned(),
            "exit".to_owned(),
        ]);
    }
}
