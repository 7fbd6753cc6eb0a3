//! All game entity types. Pure data, no game rules.
//!
//! Coordinates are world pixels with `y` growing downward. Every body stores
//! its top-left corner; anchors are only applied when an entity is created.

use std::sync::Arc;

use crate::level::{LevelCatalog, PlatformImage};
use crate::progression::Progression;
use crate::schedule::Scheduler;

// ── Bodies ────────────────────────────────────────────────────────────────────

/// One flag per side of an axis-aligned box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Sides {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl Sides {
    pub const NONE: Sides = Sides {
        up: false,
        down: false,
        left: false,
        right: false,
    };

    pub fn any(&self) -> bool {
        self.up || self.down || self.left || self.right
    }
}

/// Fractional anchor inside a box: (0, 0) is top-left, (1, 1) bottom-right.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Anchor(pub f32, pub f32);

impl Anchor {
    pub const TOP_LEFT: Anchor = Anchor(0.0, 0.0);
    pub const CENTER: Anchor = Anchor(0.5, 0.5);
    pub const BOTTOM_CENTER: Anchor = Anchor(0.5, 1.0);
    pub const BOTTOM_LEFT: Anchor = Anchor(0.0, 1.0);
    pub const BOTTOM_RIGHT: Anchor = Anchor(1.0, 1.0);
}

/// Physics body of an entity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Body {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub vx: f32,
    pub vy: f32,
    /// Position before the last integration step.
    pub prev_x: f32,
    pub prev_y: f32,
    /// Disabled bodies neither move nor collide nor overlap.
    pub enabled: bool,
    pub allow_gravity: bool,
    /// Immovable bodies are never pushed by solid collisions.
    pub immovable: bool,
    /// Fraction of velocity kept (and reversed) after hitting a solid.
    pub bounce: f32,
    pub collide_world_bounds: bool,
    /// Sides in contact with another body this frame.
    pub touching: Sides,
    /// Sides pressed against the world bounds this frame.
    pub blocked: Sides,
}

impl Body {
    /// A dynamic body whose top-left corner is at (`x`, `y`).
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Body {
            x,
            y,
            width,
            height,
            vx: 0.0,
            vy: 0.0,
            prev_x: x,
            prev_y: y,
            enabled: true,
            allow_gravity: true,
            immovable: false,
            bounce: 0.0,
            collide_world_bounds: false,
            touching: Sides::NONE,
            blocked: Sides::NONE,
        }
    }

    /// A dynamic body placed so that `anchor` sits at (`x`, `y`).
    pub fn anchored(x: f32, y: f32, width: f32, height: f32, anchor: Anchor) -> Self {
        Body::new(x - width * anchor.0, y - height * anchor.1, width, height)
    }

    /// Immovable and weightless: platforms, tiles, boxes, springs, walls.
    pub fn fixed(mut self) -> Self {
        self.allow_gravity = false;
        self.immovable = true;
        self
    }

    /// Weightless but still pushable: pickups hovering in place.
    pub fn floating(mut self) -> Self {
        self.allow_gravity = false;
        self
    }

    pub fn bounded(mut self) -> Self {
        self.collide_world_bounds = true;
        self
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }

    /// Resting on a body below, or on the bottom of the world.
    pub fn on_ground(&self) -> bool {
        self.touching.down || self.blocked.down
    }

    /// Strict box intersection; edges that merely touch do not overlap.
    pub fn intersects(&self, other: &Body) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }
}

// ── Identifiers & small enums ─────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyColor {
    Copper,
    Silver,
    Gold,
}

impl KeyColor {
    pub const ALL: [KeyColor; 3] = [KeyColor::Copper, KeyColor::Silver, KeyColor::Gold];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Facing {
    Left,
    Right,
}

/// Horizontal input for a single frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Left,
    Still,
    Right,
}

impl Direction {
    pub fn sign(self) -> f32 {
        match self {
            Direction::Left => -1.0,
            Direction::Still => 0.0,
            Direction::Right => 1.0,
        }
    }
}

// ── Entity payloads ───────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpiderState {
    pub alive: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TileKind {
    Brick,
    Grass { frame: u32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemBoxState {
    Active,
    Used,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoinBoxState {
    Active,
    PayingOut,
    Spent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpringState {
    Idle,
    Boosting,
}

/// Vertical bob around a resting position (keys, life pickups).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bob {
    /// Top of the body at the highest point of the bob.
    pub base_y: f32,
    pub elapsed_ms: u64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoreText {
    pub value: u64,
    /// Session clock time at which the fade began.
    pub fade_started_ms: Option<u64>,
}

/// What an entity is, plus any per-kind state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EntityKind {
    Spider(SpiderState),
    Platform(PlatformImage),
    Tile(TileKind),
    /// Invisible wall flanking a platform; only spiders collide with it.
    EnemyWall,
    Coin,
    ItemBox(ItemBoxState),
    CoinBox(CoinBoxState),
    Spring(SpringState),
    Star,
    LifePickup(Bob),
    Key(KeyColor, Bob),
    Door { open: bool },
    Decoration { frame: u32 },
    ScoreText(ScoreText),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub body: Body,
    pub kind: EntityKind,
}

// ── Hero ──────────────────────────────────────────────────────────────────────

/// Walk toward the door after it opens; drives position and fade.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DoorWalk {
    pub from_x: f32,
    pub to_x: f32,
    pub elapsed_ms: u64,
}

/// Animation-level state derived from the hero's flags every frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeroPose {
    Standing,
    Running,
    Jumping,
    Falling,
    Frozen,
    Dying,
    Dead,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hero {
    pub body: Body,
    pub alive: bool,
    /// Death animation finished; the hero is out of the simulation.
    pub removed: bool,
    pub is_frozen: bool,
    pub is_boosting: bool,
    pub can_double_jump: bool,
    pub on_wall: bool,
    pub health: u8,
    pub facing: Facing,
    /// Current horizontal run speed in px/s.
    pub speed: f32,
    /// Star power-up colour cycle, as 0xRRGGBB.
    pub tint: Option<u32>,
    pub alpha: f32,
    pub door_walk: Option<DoorWalk>,
}

// ── Level world ───────────────────────────────────────────────────────────────

/// Everything owned by the current level; discarded wholesale on reload.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelWorld {
    pub index: usize,
    pub hero: Hero,
    pub entities: Vec<Entity>,
    /// Extent of the level content, used for camera clamping.
    pub width: f32,
    pub height: f32,
    pub gravity: f32,
    pub next_id: u32,
}

impl LevelWorld {
    pub fn new(index: usize, hero: Hero) -> Self {
        LevelWorld {
            index,
            hero,
            entities: Vec::new(),
            width: 0.0,
            height: 0.0,
            gravity: 0.0,
            next_id: 1,
        }
    }

    pub fn spawn(&mut self, body: Body, kind: EntityKind) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        self.entities.push(Entity { id, body, kind });
        id
    }

    pub fn index_of(&self, id: EntityId) -> Option<usize> {
        self.entities.iter().position(|e| e.id == id)
    }

    pub fn find(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn find_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.id == id)
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.index_of(id).map(|i| self.entities.remove(i))
    }

    /// Number of entities whose kind satisfies `pred`.
    pub fn count(&self, pred: impl Fn(&EntityKind) -> bool) -> usize {
        self.entities.iter().filter(|e| pred(&e.kind)).count()
    }
}

// ── Events & input ────────────────────────────────────────────────────────────

/// Things that happened during one tick; consumed by sound/log/HUD layers.
#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    LevelStarted { index: usize },
    Jumped,
    CoinCollected,
    BoxCoinCollected,
    LifeCollected,
    ExtraLifeFromCoins,
    KeyCollected(KeyColor),
    StarCollected,
    StarSpawned,
    ItemBoxOpened { spawned_star: bool },
    SpringLaunched,
    Stomped,
    HeroHurt { health: u8 },
    HeroDied { lives: u32 },
    GameOver,
    DoorOpened,
}

/// Logical buttons sampled once per frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameInput {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    /// How long the jump button has been held, in milliseconds.
    pub jump_held_ms: u64,
    pub speed: bool,
    /// Reserved; read by nothing yet.
    pub wall_jump: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    LevelStart(usize),
    GameOver,
    ExtraLife,
}

/// A level rebuild requested during a tick, and the banner to show with it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingLoad {
    pub index: usize,
    pub notice: NoticeKind,
}

/// Short banner shown by the front end until `expires_ms`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub expires_ms: u64,
}

// ── Master session state ──────────────────────────────────────────────────────

/// The entire session. Cloneable so `compute::tick` can return a new copy
/// without touching the caller's state.
#[derive(Clone, Debug)]
pub struct GameSession {
    pub world: LevelWorld,
    pub progression: Progression,
    /// Deferred effects for the current level.
    pub schedule: Scheduler,
    pub catalog: Arc<LevelCatalog>,
    /// Level to (re)load at the end of the current tick.
    pub pending_level: Option<PendingLoad>,
    /// Events raised during the last tick only.
    pub events: Vec<GameEvent>,
    pub notice: Option<Notice>,
    /// Best score seen so far (updated live during play).
    pub high_score: u64,
    pub frame: u64,
    /// Milliseconds since the session started.
    pub clock_ms: u64,
    pub tick_rate_hz: u32,
}
