//! YAML level descriptions: assets to register, an optional tilemap and the
//! entities to spawn with their components.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::assets::AssetStore;
use crate::components::{
    Animation, BoxCollider, CameraFollow, Health, KeyboardControlled, ProjectileEmitter,
    Rigidbody, Sprite, TextLabel, Transform, Vec2,
};
use crate::ecs::{Entity, Registry};
use crate::render::{Color, MapBounds};
use crate::systems::TILES_GROUP;

pub const TITLE_FONT: &str = "charriot-font";

fn default_title() -> String {
    "CHOPPER 1.0".to_owned()
}

fn default_font_size() -> u32 {
    10
}

fn default_scale() -> f64 {
    1.0
}

fn default_scale_vec() -> Vec2 {
    Vec2::ONE
}

fn default_z_index() -> i32 {
    1
}

fn default_one() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

fn default_repeat_seconds() -> f64 {
    1.0
}

fn default_duration_seconds() -> f64 {
    10.0
}

fn default_damage() -> i32 {
    10
}

fn default_health() -> i32 {
    100
}

#[derive(Debug, Clone, Deserialize)]
pub struct Level {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub assets: Vec<AssetSpec>,
    #[serde(default)]
    pub tilemap: Option<TilemapSpec>,
    #[serde(default)]
    pub entities: Vec<EntitySpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssetSpec {
    Texture {
        id: String,
        file: PathBuf,
    },
    Font {
        id: String,
        file: PathBuf,
        #[serde(default = "default_font_size")]
        font_size: u32,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct TilemapSpec {
    pub map_file: PathBuf,
    pub texture_asset_id: String,
    pub num_rows: u32,
    pub num_cols: u32,
    pub tile_size: u32,
    #[serde(default = "default_scale")]
    pub scale: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntitySpec {
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub components: ComponentsSpec,
}

/// Component blocks an entity may carry. Keys follow the level file format.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComponentsSpec {
    #[serde(default)]
    pub transform: Option<TransformSpec>,
    #[serde(default)]
    pub rigidbody: Option<RigidbodySpec>,
    #[serde(default)]
    pub sprite: Option<SpriteSpec>,
    #[serde(default)]
    pub animation: Option<AnimationSpec>,
    #[serde(default)]
    pub boxcollider: Option<BoxColliderSpec>,
    #[serde(default)]
    pub projectile_emitter: Option<ProjectileEmitterSpec>,
    #[serde(default)]
    pub camera_follow: Option<MarkerSpec>,
    #[serde(default)]
    pub keyboard_controller: Option<KeyboardControllerSpec>,
    #[serde(default)]
    pub health: Option<HealthSpec>,
    #[serde(default)]
    pub text_label: Option<TextLabelSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransformSpec {
    pub position: Vec2,
    #[serde(default = "default_scale_vec")]
    pub scale: Vec2,
    #[serde(default)]
    pub rotation: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RigidbodySpec {
    #[serde(default)]
    pub velocity: Vec2,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpriteSpec {
    pub texture_asset_id: String,
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_z_index")]
    pub z_index: i32,
    #[serde(default)]
    pub fixed: bool,
    #[serde(default)]
    pub src_rect_x: i32,
    #[serde(default)]
    pub src_rect_y: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnimationSpec {
    #[serde(default = "default_one")]
    pub num_frames: u32,
    /// Frames per second.
    #[serde(default = "default_one")]
    pub speed_rate: u32,
    #[serde(default = "default_true")]
    pub looping: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoxColliderSpec {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub offset: Vec2,
}

/// Intervals are given in seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectileEmitterSpec {
    pub projectile_velocity: Vec2,
    #[serde(default = "default_repeat_seconds")]
    pub repeat_frequency: f64,
    #[serde(default = "default_duration_seconds")]
    pub projectile_duration: f64,
    #[serde(default = "default_damage")]
    pub hit_percentage_damage: i32,
    #[serde(default)]
    pub friendly: bool,
    #[serde(default)]
    pub manual: bool,
}

/// A component block with no settings, written as `{}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarkerSpec {}

#[derive(Debug, Clone, Deserialize)]
pub struct KeyboardControllerSpec {
    pub up_velocity: Vec2,
    pub right_velocity: Vec2,
    pub down_velocity: Vec2,
    pub left_velocity: Vec2,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthSpec {
    #[serde(default = "default_health")]
    pub health_percentage: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextLabelSpec {
    pub position: Vec2,
    pub text: String,
    pub font_id: String,
    #[serde(default)]
    pub color: Color,
    #[serde(default)]
    pub fixed: bool,
}

/// What [`Level::spawn`] created.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnedLevel {
    pub tiles: usize,
    pub entities: Vec<Entity>,
    pub title: Entity,
    pub map: MapBounds,
}

pub struct LevelLoader {
    base_dir: PathBuf,
}

impl LevelLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    /// Parses a level file. Relative asset and tilemap paths are resolved
    /// against the level file's directory.
    pub fn load(&self, file: impl AsRef<Path>) -> Result<Level> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read level file {}", path.display()))?;
        let mut level: Level = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        let root = path.parent().unwrap_or(self.base_dir.as_path());
        for asset in &mut level.assets {
            let file = match asset {
                AssetSpec::Texture { file, .. } | AssetSpec::Font { file, .. } => file,
            };
            *file = root.join(&*file);
        }
        if let Some(tilemap) = &mut level.tilemap {
            tilemap.map_file = root.join(&tilemap.map_file);
        }
        Ok(level)
    }
}

/// One tile: which cell of the tileset texture to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileCode {
    pub src_row: u32,
    pub src_col: u32,
}

/// Parses a tilemap: `rows` lines of `cols` comma-separated two-digit codes,
/// tens digit the tileset row and units digit the tileset column.
pub fn parse_tilemap(text: &str, rows: u32, cols: u32) -> Result<Vec<Vec<TileCode>>> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if lines.len() < rows as usize {
        bail!("tilemap has {} rows, expected {rows}", lines.len());
    }

    lines
        .iter()
        .take(rows as usize)
        .enumerate()
        .map(|(row, line)| {
            let codes = line
                .split(',')
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .take(cols as usize)
                .map(|code| parse_tile_code(code).with_context(|| format!("row {row}")))
                .collect::<Result<Vec<_>>>()?;
            if codes.len() < cols as usize {
                bail!("tilemap row {row} has {} tiles, expected {cols}", codes.len());
            }
            Ok(codes)
        })
        .collect()
}

fn parse_tile_code(code: &str) -> Result<TileCode> {
    let digits: Vec<u32> = code.chars().filter_map(|c| c.to_digit(10)).collect();
    match digits[..] {
        [src_row, src_col] if code.len() == 2 => Ok(TileCode { src_row, src_col }),
        _ => bail!("invalid tile code `{code}`"),
    }
}

impl Level {
    /// Registers the level's assets and spawns its tiles, entities and the
    /// title label. Animations start at clock zero.
    pub fn spawn(
        &self,
        registry: &mut Registry,
        assets: &mut AssetStore,
        window_width: u32,
        window_height: u32,
    ) -> Result<SpawnedLevel> {
        for asset in &self.assets {
            match asset {
                AssetSpec::Texture { id, file } => assets.add_texture(id.clone(), file),
                AssetSpec::Font {
                    id,
                    file,
                    font_size,
                } => assets.add_font(id.clone(), file, *font_size),
            }
        }

        let (tiles, map) = match &self.tilemap {
            Some(tilemap) => {
                let tiles = spawn_tilemap(registry, tilemap)?;
                let side = tilemap.tile_size as f64 * tilemap.scale;
                let map = MapBounds::new(
                    tilemap.num_cols as f64 * side,
                    tilemap.num_rows as f64 * side,
                );
                (tiles, map)
            }
            None => (
                0,
                MapBounds::new(window_width as f64, window_height as f64),
            ),
        };

        let entities = self
            .entities
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                spawn_entity(registry, spec).with_context(|| format!("level entity #{index}"))
            })
            .collect::<Result<Vec<_>>>()?;

        let title = registry.create_entity();
        registry.add_component(
            title,
            TextLabel {
                position: Vec2::new(window_width as f64 / 2.0 - 40.0, 10.0),
                text: self.title.clone(),
                font_id: TITLE_FONT.to_owned(),
                color: Color::GREEN,
                fixed: true,
            },
        )?;

        log::info!(
            "spawned level {}: {tiles} tiles, {} entities, map {}x{}",
            self.name.as_deref().unwrap_or("<unnamed>"),
            entities.len(),
            map.width,
            map.height
        );
        Ok(SpawnedLevel {
            tiles,
            entities,
            title,
            map,
        })
    }
}

fn spawn_tilemap(registry: &mut Registry, tilemap: &TilemapSpec) -> Result<usize> {
    let text = fs::read_to_string(&tilemap.map_file).with_context(|| {
        format!("Failed to read tilemap file {}", tilemap.map_file.display())
    })?;
    let grid = parse_tilemap(&text, tilemap.num_rows, tilemap.num_cols)
        .with_context(|| format!("Failed to parse {}", tilemap.map_file.display()))?;

    let size = tilemap.tile_size;
    let side = size as f64 * tilemap.scale;
    let mut count = 0;
    for (row, codes) in grid.iter().enumerate() {
        for (col, code) in codes.iter().enumerate() {
            let tile = registry.create_entity();
            registry.group_entity(tile, TILES_GROUP)?;
            registry.add_component(
                tile,
                Transform {
                    position: Vec2::new(col as f64 * side, row as f64 * side),
                    scale: Vec2::new(tilemap.scale, tilemap.scale),
                    rotation: 0.0,
                },
            )?;
            registry.add_component(
                tile,
                Sprite::new(&tilemap.texture_asset_id, size, size, 0)
                    .with_src_origin((code.src_col * size) as i32, (code.src_row * size) as i32),
            )?;
            count += 1;
        }
    }
    Ok(count)
}

fn spawn_entity(registry: &mut Registry, spec: &EntitySpec) -> Result<Entity> {
    let entity = registry.create_entity();
    if let Some(tag) = &spec.tag {
        registry.tag_entity(entity, tag.clone())?;
    }
    if let Some(group) = &spec.group {
        registry.group_entity(entity, group.clone())?;
    }

    let components = &spec.components;
    if let Some(transform) = &components.transform {
        registry.add_component(
            entity,
            Transform {
                position: transform.position,
                scale: transform.scale,
                rotation: transform.rotation,
            },
        )?;
    }
    if let Some(rigidbody) = &components.rigidbody {
        registry.add_component(
            entity,
            Rigidbody {
                velocity: rigidbody.velocity,
            },
        )?;
    }
    if let Some(sprite) = &components.sprite {
        let mut component = Sprite::new(
            &sprite.texture_asset_id,
            sprite.width,
            sprite.height,
            sprite.z_index,
        )
        .with_src_origin(sprite.src_rect_x, sprite.src_rect_y);
        component.fixed = sprite.fixed;
        registry.add_component(entity, component)?;
    }
    if let Some(animation) = &components.animation {
        registry.add_component(
            entity,
            Animation::new(
                animation.num_frames,
                animation.speed_rate,
                animation.looping,
                0,
            ),
        )?;
    }
    if let Some(collider) = &components.boxcollider {
        registry.add_component(
            entity,
            BoxCollider {
                width: collider.width,
                height: collider.height,
                offset: collider.offset,
            },
        )?;
    }
    if let Some(emitter) = &components.projectile_emitter {
        registry.add_component(
            entity,
            ProjectileEmitter {
                velocity: emitter.projectile_velocity,
                repeat_ms: seconds_to_ms(emitter.repeat_frequency),
                duration_ms: seconds_to_ms(emitter.projectile_duration),
                damage: emitter.hit_percentage_damage,
                friendly: emitter.friendly,
                manual: emitter.manual,
                last_emission_ms: 0,
            },
        )?;
    }
    if components.camera_follow.is_some() {
        registry.add_component(entity, CameraFollow)?;
    }
    if let Some(keys) = &components.keyboard_controller {
        registry.add_component(
            entity,
            KeyboardControlled {
                up: keys.up_velocity,
                right: keys.right_velocity,
                down: keys.down_velocity,
                left: keys.left_velocity,
            },
        )?;
    }
    if let Some(health) = &components.health {
        registry.add_component(entity, Health::full(health.health_percentage))?;
    }
    if let Some(label) = &components.text_label {
        registry.add_component(
            entity,
            TextLabel {
                position: label.position,
                text: label.text.clone(),
                font_id: label.font_id.clone(),
                color: label.color,
                fixed: label.fixed,
            },
        )?;
    }
    Ok(entity)
}

fn seconds_to_ms(seconds: f64) -> u64 {
    (seconds.max(0.0) * 1000.0).round() as u64
}
