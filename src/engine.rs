//! Frame driver: owns the registry and everything systems need around it,
//! and steps input, update and render once per frame.

use std::collections::BTreeMap;
use std::time::Instant;

use anyhow::{Context, Result};

use crate::assets::AssetStore;
use crate::config::Config;
use crate::ecs::{EcsError, EventBus, Registry, RenderContext, System, UpdateContext};
use crate::events::{Key, KeyPressedEvent};
use crate::level::Level;
use crate::render::{Camera, Canvas, Color, DrawList, MapBounds};
use crate::systems::{
    AnimationSystem, CameraMovementSystem, CollisionSystem, DamageSystem, KeyboardControlSystem,
    MovementSystem, ProjectileEmitSystem, ProjectileLifecycleSystem, RenderColliderSystem,
    RenderHealthBarSystem, RenderSystem, RenderTextSystem,
};

pub struct EngineBuilder {
    config: Config,
    registry: Registry,
    level: Option<Level>,
    error: Option<EcsError>,
}

impl EngineBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            registry: Registry::new(),
            level: None,
            error: None,
        }
    }

    /// Registers a system. The first registration error is reported by `build`.
    pub fn with_system<S: System>(mut self, system: S) -> Self {
        if let Err(err) = self.push_system(system) {
            self.error.get_or_insert(err);
        }
        self
    }

    pub fn push_system<S: System>(&mut self, system: S) -> Result<(), EcsError> {
        self.registry.add_system(system)
    }

    /// The full game system set, in the order the game runs them.
    pub fn with_default_systems(self) -> Self {
        self.with_system(MovementSystem::new())
            .with_system(RenderSystem::new())
            .with_system(AnimationSystem::new())
            .with_system(CollisionSystem::new())
            .with_system(RenderColliderSystem::new())
            .with_system(DamageSystem::new())
            .with_system(KeyboardControlSystem::new())
            .with_system(CameraMovementSystem::new())
            .with_system(ProjectileEmitSystem::new())
            .with_system(ProjectileLifecycleSystem::new())
            .with_system(RenderTextSystem::new())
            .with_system(RenderHealthBarSystem::new())
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }

    pub fn build(self) -> Result<Engine<DrawList>> {
        self.build_with_canvas(DrawList::new())
    }

    pub fn build_with_canvas<C: Canvas>(self, canvas: C) -> Result<Engine<C>> {
        if let Some(err) = self.error {
            return Err(err).context("failed to register systems");
        }

        let mut registry = self.registry;
        let mut events = EventBus::new();
        let mut assets = AssetStore::new();
        let window = self.config.window;
        let mut map = MapBounds::new(window.width as f64, window.height as f64);

        if let Some(level) = &self.level {
            let spawned = level
                .spawn(&mut registry, &mut assets, window.width, window.height)
                .context("failed to spawn level")?;
            map = spawned.map;
        }
        registry.subscribe_to_events(&mut events);
        log::info!(
            "engine ready: {} systems, {} entities",
            registry.system_count(),
            registry.entity_count()
        );

        Ok(Engine {
            registry,
            events,
            assets,
            camera: Camera::new(window.width, window.height),
            map,
            canvas,
            clock: 0.0,
            frame: 0,
            debug: self.config.debug,
            running: true,
            scheduled: BTreeMap::new(),
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FrameSummary {
    pub frame: u64,
    pub elapsed_ms: u64,
    pub entity_count: usize,
    pub update_ms: f64,
    pub render_ms: f64,
}

pub struct Engine<C: Canvas = DrawList> {
    registry: Registry,
    events: EventBus,
    assets: AssetStore,
    camera: Camera,
    map: MapBounds,
    canvas: C,
    /// Seconds since start.
    clock: f64,
    frame: u64,
    debug: bool,
    running: bool,
    scheduled: BTreeMap<u64, Vec<Key>>,
}

impl<C: Canvas> Engine<C> {
    /// Queues `key` to be pressed at the start of frame `frame` (1-based).
    pub fn schedule_key(&mut self, frame: u64, key: Key) {
        self.scheduled.entry(frame).or_default().push(key);
    }

    /// Registers `system` and hooks its handlers into the bus right away.
    pub fn add_system<S: System>(&mut self, system: S) -> Result<(), EcsError> {
        self.registry.add_system(system)?;
        self.registry.subscribe_to_events(&mut self.events);
        Ok(())
    }

    /// Removes `S` together with the handlers it subscribed.
    pub fn remove_system<S: System>(&mut self) -> Result<(), EcsError> {
        self.registry.remove_system::<S>()?;
        self.registry.subscribe_to_events(&mut self.events);
        Ok(())
    }

    /// Advances one frame: input, update, then render.
    ///
    /// Systems added or removed through [`Engine::registry_mut`] since the
    /// last frame have their handlers attached or dropped first.
    pub fn frame(&mut self, dt: f64, keys: &[Key]) -> Result<FrameSummary> {
        self.registry.subscribe_to_events(&mut self.events);
        self.frame += 1;
        self.clock += dt;
        let elapsed_ms = self.elapsed_ms();

        let mut pressed = self.scheduled.remove(&self.frame).unwrap_or_default();
        pressed.extend_from_slice(keys);
        for key in pressed {
            match key {
                Key::Escape => self.running = false,
                Key::F1 => self.debug = !self.debug,
                _ => {}
            }
            self.events
                .publish(&mut self.registry, KeyPressedEvent { key, at_ms: elapsed_ms })
                .with_context(|| format!("handling {key:?} in frame {}", self.frame))?;
        }

        let start = Instant::now();
        let mut ctx = UpdateContext {
            dt,
            elapsed_ms,
            events: &mut self.events,
            camera: &mut self.camera,
            map: self.map,
        };
        self.registry
            .update(&mut ctx)
            .with_context(|| format!("frame {} update failed", self.frame))?;
        let update_ms = start.elapsed().as_secs_f64() * 1_000.0;

        let start = Instant::now();
        self.canvas.clear(Color::BACKGROUND);
        let mut ctx = RenderContext {
            canvas: &mut self.canvas,
            assets: &self.assets,
            camera: self.camera,
            debug: self.debug,
        };
        self.registry
            .render(&mut ctx)
            .with_context(|| format!("frame {} render failed", self.frame))?;
        let render_ms = start.elapsed().as_secs_f64() * 1_000.0;

        Ok(FrameSummary {
            frame: self.frame,
            elapsed_ms,
            entity_count: self.registry.entity_count(),
            update_ms,
            render_ms,
        })
    }

    pub fn run(&mut self, frames: u64, dt: f64) -> Result<()> {
        self.run_with_hook(frames, dt, |_| {})
    }

    /// Runs up to `frames` frames, stopping early once Escape is pressed.
    pub fn run_with_hook<F>(&mut self, frames: u64, dt: f64, mut hook: F) -> Result<()>
    where
        F: FnMut(&FrameSummary),
    {
        for _ in 0..frames {
            if !self.running {
                log::info!("quit requested after frame {}", self.frame);
                break;
            }
            let summary = self.frame(dt, &[])?;
            hook(&summary);
        }
        Ok(())
    }

    pub fn elapsed_ms(&self) -> u64 {
        (self.clock * 1_000.0).round() as u64
    }

    pub fn current_frame(&self) -> u64 {
        self.frame
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    pub fn assets(&self) -> &AssetStore {
        &self.assets
    }

    pub fn camera(&self) -> Camera {
        self.camera
    }

    pub fn map(&self) -> MapBounds {
        self.map
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{KeyboardControlled, Rigidbody, Sprite, Transform, Vec2};

    #[test]
    fn test_duplicate_system_fails_build() {
        let err = EngineBuilder::new(Config::default())
            .with_system(MovementSystem::new())
            .with_system(MovementSystem::new())
            .build()
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("failed to register systems"));
    }

    #[test]
    fn test_function_keys_toggle_debug_and_quit() {
        let mut engine = EngineBuilder::new(Config::default())
            .with_default_systems()
            .build()
            .unwrap();
        assert!(!engine.debug());

        engine.frame(0.016, &[Key::F1]).unwrap();
        assert!(engine.debug());
        assert_eq!(engine.canvas().background(), Some(Color::BACKGROUND));

        engine.schedule_key(3, Key::Escape);
        let mut seen = Vec::new();
        engine
            .run_with_hook(10, 0.016, |summary| seen.push(summary.frame))
            .unwrap();
        assert_eq!(seen, vec![2, 3]);
        assert!(!engine.is_running());
        assert_eq!(engine.elapsed_ms(), 48);
    }

    #[test]
    fn test_system_handlers_follow_add_and_remove() {
        let mut engine = EngineBuilder::new(Config::default())
            .with_system(KeyboardControlSystem::new())
            .with_system(MovementSystem::new())
            .build()
            .unwrap();
        assert_eq!(engine.events_mut().handler_count::<KeyPressedEvent>(), 1);

        engine.remove_system::<KeyboardControlSystem>().unwrap();
        assert_eq!(engine.events_mut().handler_count::<KeyPressedEvent>(), 0);
        assert!(matches!(
            engine.remove_system::<KeyboardControlSystem>(),
            Err(EcsError::MissingSystem(_))
        ));

        engine.add_system(KeyboardControlSystem::new()).unwrap();
        engine.add_system(ProjectileEmitSystem::new()).unwrap();
        assert_eq!(engine.events_mut().handler_count::<KeyPressedEvent>(), 2);
    }

    #[test]
    fn test_scheduled_keys_reach_systems() {
        let mut engine = EngineBuilder::new(Config::default())
            .with_system(KeyboardControlSystem::new())
            .with_system(MovementSystem::new())
            .build()
            .unwrap();
        let chopper = engine.registry_mut().create_entity();
        let registry = engine.registry_mut();
        registry.add_component(chopper, Transform::at(100.0, 100.0)).unwrap();
        registry.add_component(chopper, Rigidbody::default()).unwrap();
        registry
            .add_component(chopper, Sprite::new("chopper-image", 32, 32, 2))
            .unwrap();
        registry
            .add_component(chopper, KeyboardControlled::uniform(100.0))
            .unwrap();

        engine.schedule_key(2, Key::Right);
        engine.run(3, 0.5).unwrap();

        let position = engine
            .registry()
            .get_component::<Transform>(chopper)
            .unwrap()
            .position;
        assert_eq!(position, Vec2::new(200.0, 100.0));
    }
}
