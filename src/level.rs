//! Level definitions and the loader that turns one into a `LevelWorld`.
//!
//! Definitions are parsed and validated up front; a bad file is a fatal
//! configuration error and never yields a half-built level.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::enemy;
use crate::entities::{
    Anchor, Body, Bob, CoinBoxState, EntityId, EntityKind, Hero, ItemBoxState, KeyColor,
    LevelWorld, SpiderState, SpringState, TileKind,
};
use crate::physics::{GRAVITY, WORLD_HEIGHT, WORLD_WIDTH};

// ── Sizes ─────────────────────────────────────────────────────────────────────

pub const TILE_SIZE: f32 = 42.0;
pub const COIN_SIZE: f32 = 22.0;
pub const BOX_SIZE: f32 = 42.0;
pub const SPRING_WIDTH: f32 = 45.0;
pub const SPRING_HEIGHT: f32 = 32.0;
pub const KEY_SIZE: f32 = 30.0;
pub const STAR_SIZE: f32 = 30.0;
pub const LIFE_SIZE: f32 = 30.0;
pub const DOOR_WIDTH: f32 = 42.0;
pub const DOOR_HEIGHT: f32 = 66.0;
pub const DECORATION_SIZE: f32 = 42.0;
pub const ENEMY_WALL_WIDTH: f32 = 8.0;
pub const ENEMY_WALL_HEIGHT: f32 = 40.0;

pub const STAR_SPEED: f32 = 100.0;
/// Keys and life pickups drift this far up and down.
pub const BOB_AMPLITUDE: f32 = 3.0;
pub const BOB_HALF_PERIOD_MS: u64 = 800;

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("level {name}: invalid data at `{path}`: {source}")]
    Parse {
        name: String,
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("level {name}: {field} at ({x}, {y}) is outside the world")]
    OutOfBounds {
        name: String,
        field: String,
        x: f32,
        y: f32,
    },
    #[error("failed to read level file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read level directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no level files (*.json) found in {path}")]
    EmptyCatalog { path: PathBuf },
}

// ── Definition format ─────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct FramedPoint {
    pub frame: u32,
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Hash)]
pub enum PlatformImage {
    #[serde(rename = "ground")]
    Ground,
    #[serde(rename = "grass:8x1")]
    Grass8x1,
    #[serde(rename = "grass:6x1")]
    Grass6x1,
    #[serde(rename = "grass:4x1")]
    Grass4x1,
    #[serde(rename = "grass:2x1")]
    Grass2x1,
    #[serde(rename = "grass:1x1")]
    Grass1x1,
}

impl PlatformImage {
    pub fn size(self) -> (f32, f32) {
        let cells = match self {
            PlatformImage::Ground => return (960.0, TILE_SIZE),
            PlatformImage::Grass8x1 => 8.0,
            PlatformImage::Grass6x1 => 6.0,
            PlatformImage::Grass4x1 => 4.0,
            PlatformImage::Grass2x1 => 2.0,
            PlatformImage::Grass1x1 => 1.0,
        };
        (cells * TILE_SIZE, TILE_SIZE)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct PlatformDef {
    pub image: PlatformImage,
    pub x: f32,
    pub y: f32,
}

/// One level as stored on disk. Never mutated after parsing.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct LevelDefinition {
    pub hero: Point,
    pub spiders: Vec<Point>,
    pub platforms: Vec<PlatformDef>,
    pub decoration: Vec<FramedPoint>,
    pub bricks: Vec<Point>,
    pub tiles: Vec<FramedPoint>,
    pub coins: Vec<Point>,
    pub itemboxes: Vec<Point>,
    pub coinboxes: Vec<Point>,
    pub springs: Vec<Point>,
    #[serde(default)]
    pub stars: Vec<Point>,
    #[serde(default)]
    pub oneups: Vec<Point>,
    pub copperkey: Point,
    pub silverkey: Point,
    pub goldkey: Point,
    pub door: Point,
}

impl LevelDefinition {
    pub fn from_json(name: &str, text: &str) -> Result<Self, LevelError> {
        let de = &mut serde_json::Deserializer::from_str(text);
        let definition: LevelDefinition =
            serde_path_to_error::deserialize(de).map_err(|err| LevelError::Parse {
                name: name.to_string(),
                path: err.path().to_string(),
                source: err.into_inner(),
            })?;
        definition.validate(name)?;
        Ok(definition)
    }

    fn validate(&self, name: &str) -> Result<(), LevelError> {
        let mut points: Vec<(String, f32, f32)> = vec![
            ("hero".into(), self.hero.x, self.hero.y),
            ("copperkey".into(), self.copperkey.x, self.copperkey.y),
            ("silverkey".into(), self.silverkey.x, self.silverkey.y),
            ("goldkey".into(), self.goldkey.x, self.goldkey.y),
            ("door".into(), self.door.x, self.door.y),
        ];
        let lists: [(&str, &[Point]); 8] = [
            ("spiders", &self.spiders),
            ("bricks", &self.bricks),
            ("coins", &self.coins),
            ("itemboxes", &self.itemboxes),
            ("coinboxes", &self.coinboxes),
            ("springs", &self.springs),
            ("stars", &self.stars),
            ("oneups", &self.oneups),
        ];
        for (field, list) in lists {
            for (i, p) in list.iter().enumerate() {
                points.push((format!("{field}[{i}]"), p.x, p.y));
            }
        }
        for (i, p) in self.platforms.iter().enumerate() {
            points.push((format!("platforms[{i}]"), p.x, p.y));
        }
        for (i, p) in self.tiles.iter().enumerate() {
            points.push((format!("tiles[{i}]"), p.x, p.y));
        }
        for (i, p) in self.decoration.iter().enumerate() {
            points.push((format!("decoration[{i}]"), p.x, p.y));
        }

        let inside = |v: f32, max: f32| v.is_finite() && (0.0..=max).contains(&v);
        match points
            .into_iter()
            .find(|(_, x, y)| !inside(*x, WORLD_WIDTH) || !inside(*y, WORLD_HEIGHT))
        {
            Some((field, x, y)) => Err(LevelError::OutOfBounds {
                name: name.to_string(),
                field,
                x,
                y,
            }),
            None => Ok(()),
        }
    }
}

// ── Catalog ───────────────────────────────────────────────────────────────────

const BUILTIN_LEVELS: [(&str, &str); 3] = [
    ("level00", include_str!("../levels/level00.json")),
    ("level01", include_str!("../levels/level01.json")),
    ("level02", include_str!("../levels/level02.json")),
];

/// The ordered set of playable levels. Indices past the end wrap around.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelCatalog {
    levels: Vec<LevelDefinition>,
}

impl LevelCatalog {
    /// The levels compiled into the binary.
    pub fn builtin() -> Result<Self, LevelError> {
        let levels = BUILTIN_LEVELS
            .iter()
            .map(|(name, text)| LevelDefinition::from_json(name, text))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(LevelCatalog { levels })
    }

    /// Every `*.json` file in `dir`, ordered by file name.
    pub fn from_dir(dir: &Path) -> Result<Self, LevelError> {
        let entries = fs::read_dir(dir).map_err(|source| LevelError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| LevelError::ReadDir {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        if paths.is_empty() {
            return Err(LevelError::EmptyCatalog {
                path: dir.to_path_buf(),
            });
        }

        let mut levels = Vec::with_capacity(paths.len());
        for path in paths {
            let text = fs::read_to_string(&path).map_err(|source| LevelError::Read {
                path: path.clone(),
                source,
            })?;
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            debug!(level = %name, path = %path.display(), "level_file_parsed");
            levels.push(LevelDefinition::from_json(&name, &text)?);
        }
        Ok(LevelCatalog { levels })
    }

    /// `None` when `levels` is empty.
    pub fn from_definitions(levels: Vec<LevelDefinition>) -> Option<Self> {
        if levels.is_empty() {
            None
        } else {
            Some(LevelCatalog { levels })
        }
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn get(&self, index: usize) -> &LevelDefinition {
        &self.levels[index % self.levels.len()]
    }

    /// Index of the level after `index`, cycling back to 0.
    pub fn next_index(&self, index: usize) -> usize {
        (index + 1) % self.levels.len()
    }
}

// ── Loader ────────────────────────────────────────────────────────────────────

/// Build the entity collections for a level.
pub fn build_world(definition: &LevelDefinition, index: usize) -> LevelWorld {
    let mut world = LevelWorld::new(index, Hero::spawn(definition.hero.x, definition.hero.y));

    for deco in &definition.decoration {
        let body = Body::new(deco.x, deco.y, DECORATION_SIZE, DECORATION_SIZE).fixed();
        let id = world.spawn(body, EntityKind::Decoration { frame: deco.frame });
        disable(&mut world, id);
    }

    for spider in &definition.spiders {
        world.spawn(
            enemy::spider_body(spider.x, spider.y),
            EntityKind::Spider(SpiderState { alive: true }),
        );
    }

    for brick in &definition.bricks {
        world.spawn(
            Body::new(brick.x, brick.y, TILE_SIZE, TILE_SIZE).fixed(),
            EntityKind::Tile(TileKind::Brick),
        );
    }
    for tile in &definition.tiles {
        world.spawn(
            Body::new(tile.x, tile.y, TILE_SIZE, TILE_SIZE).fixed(),
            EntityKind::Tile(TileKind::Grass { frame: tile.frame }),
        );
    }

    for platform in &definition.platforms {
        spawn_platform(&mut world, platform);
    }

    for coin in &definition.coins {
        let body = Body::anchored(coin.x, coin.y, COIN_SIZE, COIN_SIZE, Anchor::CENTER).floating();
        world.spawn(body, EntityKind::Coin);
    }
    for b in &definition.itemboxes {
        let body = Body::anchored(b.x, b.y, BOX_SIZE, BOX_SIZE, Anchor::CENTER).fixed();
        world.spawn(body, EntityKind::ItemBox(ItemBoxState::Active));
    }
    for b in &definition.coinboxes {
        let body = Body::anchored(b.x, b.y, BOX_SIZE, BOX_SIZE, Anchor::CENTER).fixed();
        world.spawn(body, EntityKind::CoinBox(CoinBoxState::Active));
    }
    for s in &definition.springs {
        let body = Body::anchored(s.x, s.y, SPRING_WIDTH, SPRING_HEIGHT, Anchor::CENTER).fixed();
        world.spawn(body, EntityKind::Spring(SpringState::Idle));
    }
    for star in &definition.stars {
        spawn_star(&mut world, star.x, star.y);
    }
    for life in &definition.oneups {
        let (body, bob) = bobbing_body(life.x, life.y, LIFE_SIZE);
        world.spawn(body, EntityKind::LifePickup(bob));
    }

    let keys = [
        (KeyColor::Copper, definition.copperkey),
        (KeyColor::Silver, definition.silverkey),
        (KeyColor::Gold, definition.goldkey),
    ];
    for (color, at) in keys {
        let (body, bob) = bobbing_body(at.x, at.y, KEY_SIZE);
        world.spawn(body, EntityKind::Key(color, bob));
    }

    let door = definition.door;
    world.spawn(
        Body::anchored(door.x, door.y, DOOR_WIDTH, DOOR_HEIGHT, Anchor::BOTTOM_CENTER).floating(),
        EntityKind::Door { open: false },
    );

    let hero = &world.hero.body;
    let (width, height) = world
        .entities
        .iter()
        .map(|e| (e.body.right(), e.body.bottom()))
        .fold((hero.right(), hero.bottom()), |(w, h), (r, b)| (w.max(r), h.max(b)));
    world.width = width.min(WORLD_WIDTH);
    world.height = height.min(WORLD_HEIGHT);
    world.gravity = GRAVITY;

    info!(
        level = index,
        entities = world.entities.len(),
        spiders = definition.spiders.len(),
        platforms = definition.platforms.len(),
        coins = definition.coins.len(),
        "level_loaded"
    );
    world
}

/// A platform plus the two invisible walls standing on its ends.
fn spawn_platform(world: &mut LevelWorld, platform: &PlatformDef) {
    let (width, height) = platform.image.size();
    world.spawn(
        Body::new(platform.x, platform.y, width, height).fixed(),
        EntityKind::Platform(platform.image),
    );

    let wall = |x: f32, anchor: Anchor| {
        Body::anchored(x, platform.y, ENEMY_WALL_WIDTH, ENEMY_WALL_HEIGHT, anchor).fixed()
    };
    world.spawn(wall(platform.x, Anchor::BOTTOM_RIGHT), EntityKind::EnemyWall);
    world.spawn(wall(platform.x + width, Anchor::BOTTOM_LEFT), EntityKind::EnemyWall);
}

/// A bouncing star power-up centred on (`x`, `y`).
pub fn spawn_star(world: &mut LevelWorld, x: f32, y: f32) -> EntityId {
    let mut body = Body::anchored(x, y, STAR_SIZE, STAR_SIZE, Anchor::CENTER).bounded();
    body.bounce = 1.0;
    body.vx = STAR_SPEED;
    world.spawn(body, EntityKind::Star)
}

fn bobbing_body(x: f32, y: f32, size: f32) -> (Body, Bob) {
    let body = Body::anchored(x, y - BOB_AMPLITUDE, size, size, Anchor::CENTER).floating();
    let bob = Bob {
        base_y: body.y,
        elapsed_ms: 0,
    };
    (body, bob)
}

fn disable(world: &mut LevelWorld, id: EntityId) {
    if let Some(entity) = world.find_mut(id) {
        entity.body.enabled = false;
    }
}

/// Offset from `Bob::base_y` after `elapsed_ms`: eases down by twice the
/// amplitude over one half period, then back up.
pub fn bob_offset(elapsed_ms: u64) -> f32 {
    let period = BOB_HALF_PERIOD_MS * 2;
    let t = elapsed_ms % period;
    let phase = if t < BOB_HALF_PERIOD_MS {
        t as f32 / BOB_HALF_PERIOD_MS as f32
    } else {
        (period - t) as f32 / BOB_HALF_PERIOD_MS as f32
    };
    let eased = 0.5 * (1.0 - (std::f32::consts::PI * phase).cos());
    2.0 * BOB_AMPLITUDE * eased
}
