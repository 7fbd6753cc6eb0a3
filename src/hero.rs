//! Hero controller: running, jumping, double jumps, injury and death.

use crate::entities::{Anchor, Body, Direction, DoorWalk, Facing, Hero, HeroPose};
use crate::schedule::{Deferred, Scheduler};

// ── Tuning ────────────────────────────────────────────────────────────────────

pub const HERO_WIDTH: f32 = 36.0;
pub const HERO_HEIGHT: f32 = 42.0;

pub const WALK_SPEED: f32 = 200.0;
pub const BOOST_SPEED: f32 = 400.0;
pub const JUMP_SPEED: f32 = 400.0;
pub const DOUBLE_JUMP_SPEED: f32 = 800.0;
pub const BOUNCE_SPEED: f32 = 300.0;
pub const SPRING_SPEED: f32 = 800.0;

pub const STARTING_HEALTH: u8 = 6;

/// Eight frames at 12 fps; shared by the hurt and death animations.
pub const DEATH_ANIMATION_MS: u64 = 667;
pub const HURT_KNOCKBACK_X: f32 = 10.0;
pub const HURT_KNOCKBACK_Y: f32 = 50.0;
pub const DOOR_WALK_MS: u64 = 500;

impl Hero {
    /// A fresh hero centred on (`x`, `y`).
    pub fn spawn(x: f32, y: f32) -> Self {
        Hero {
            body: Body::anchored(x, y, HERO_WIDTH, HERO_HEIGHT, Anchor::CENTER).bounded(),
            alive: true,
            removed: false,
            is_frozen: false,
            is_boosting: false,
            can_double_jump: false,
            on_wall: false,
            health: STARTING_HEALTH,
            facing: Facing::Right,
            speed: WALK_SPEED,
            tint: None,
            alpha: 1.0,
            door_walk: None,
        }
    }

    pub fn set_speed_boost(&mut self, boosted: bool) {
        self.speed = if boosted { BOOST_SPEED } else { WALK_SPEED };
    }

    pub fn walk(&mut self, direction: Direction) {
        if self.is_frozen {
            return;
        }
        self.body.vx = direction.sign() * self.speed;
        match direction {
            Direction::Left => self.facing = Facing::Left,
            Direction::Right => self.facing = Facing::Right,
            Direction::Still => {}
        }
    }

    /// Returns `true` when a ground jump fired. Holding jump keeps a ground
    /// jump boosting; touching a wall also counts as ground. Otherwise a
    /// single double jump is available per ground jump.
    pub fn jump(&mut self) -> bool {
        let can_jump = self.body.on_ground() && self.alive && !self.is_frozen;

        if can_jump || self.is_boosting || self.on_wall {
            self.body.vy = -JUMP_SPEED;
            self.is_boosting = true;
            self.can_double_jump = true;
            self.on_wall = false;
            true
        } else {
            if self.can_double_jump {
                self.body.vy = -DOUBLE_JUMP_SPEED;
                self.can_double_jump = false;
            }
            false
        }
    }

    pub fn stop_jump_boost(&mut self) {
        self.is_boosting = false;
    }

    /// Pop upward after stomping an enemy.
    pub fn bounce(&mut self) {
        self.body.vy = -BOUNCE_SPEED;
    }

    /// Spring launch.
    pub fn launch(&mut self) {
        self.body.vy = -SPRING_SPEED;
    }

    pub fn freeze(&mut self) {
        self.body.enabled = false;
        self.is_frozen = true;
    }

    /// Fatal: the hero leaves the simulation once the death animation ends,
    /// and the level at `restart_level` is loaded.
    pub fn die(&mut self, schedule: &mut Scheduler, restart_level: usize, game_over: bool) {
        self.alive = false;
        self.body.enabled = false;
        schedule.after(
            DEATH_ANIMATION_MS,
            None,
            Deferred::HeroRemoved {
                restart_level,
                game_over,
            },
        );
    }

    /// Recoverable: the body is switched off until the animation ends.
    pub fn hurt(&mut self, schedule: &mut Scheduler) {
        self.alive = false;
        self.body.enabled = false;
        schedule.after(DEATH_ANIMATION_MS, None, Deferred::HeroRecover);
    }

    /// End of the injury animation: knock back and resume play.
    pub fn recover(&mut self) {
        self.body.x -= HURT_KNOCKBACK_X;
        self.body.y -= HURT_KNOCKBACK_Y;
        self.body.vx = 0.0;
        self.body.vy = 0.0;
        self.alive = true;
        self.body.enabled = true;
    }

    pub fn remove(&mut self) {
        self.removed = true;
    }

    pub fn start_door_walk(&mut self, door_x: f32) {
        self.door_walk = Some(DoorWalk {
            from_x: self.body.center_x(),
            to_x: door_x,
            elapsed_ms: 0,
        });
    }

    /// Slide toward the door and fade out; the body is frozen meanwhile.
    pub fn advance_door_walk(&mut self, dt_ms: u64) {
        let Some(walk) = self.door_walk.as_mut() else {
            return;
        };
        walk.elapsed_ms = (walk.elapsed_ms + dt_ms).min(DOOR_WALK_MS);
        let t = walk.elapsed_ms as f32 / DOOR_WALK_MS as f32;
        let center_x = walk.from_x + (walk.to_x - walk.from_x) * t;
        self.body.x = center_x - self.body.width / 2.0;
        self.alpha = 1.0 - t;
    }

    /// Airborne and pressed against a solid on either side.
    pub fn refresh_wall_contact(&mut self) {
        let side = self.body.touching.left
            || self.body.touching.right
            || self.body.blocked.left
            || self.body.blocked.right;
        self.on_wall = self.alive && !self.is_frozen && side && !self.body.on_ground();
    }

    pub fn pose(&self) -> HeroPose {
        if self.removed {
            HeroPose::Dead
        } else if !self.alive {
            HeroPose::Dying
        } else if self.is_frozen {
            HeroPose::Frozen
        } else if self.body.vy < 0.0 {
            HeroPose::Jumping
        } else if !self.body.on_ground() {
            HeroPose::Falling
        } else if self.body.vx != 0.0 {
            HeroPose::Running
        } else {
            HeroPose::Standing
        }
    }
}
