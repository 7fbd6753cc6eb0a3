//! Arcade physics substrate: gravity, velocity integration, world bounds,
//! solid separation and overlap tests over axis-aligned boxes.
//!
//! Solid separation is the only code that writes `touching` flags. Overlap
//! tests are read-only, so trigger dispatch can never disturb a body that a
//! solid pass already resolved.

use crate::entities::{Body, LevelWorld, Sides};

pub const GRAVITY: f32 = 1200.0;
pub const WORLD_WIDTH: f32 = 5000.0;
pub const WORLD_HEIGHT: f32 = 1000.0;
/// Speed cap per axis; keeps a fast fall from skipping through a 42 px tile.
pub const MAX_VELOCITY: f32 = 1000.0;

/// Slack when deciding which side a body approached from.
const CONTACT_EPSILON: f32 = 0.5;

// ── Integration ───────────────────────────────────────────────────────────────

/// Advance one body by `dt` seconds. Contact flags are cleared whether or
/// not the body is enabled.
pub fn integrate(body: &mut Body, gravity: f32, dt: f32) {
    body.touching = Sides::NONE;
    body.blocked = Sides::NONE;
    body.prev_x = body.x;
    body.prev_y = body.y;
    if !body.enabled {
        return;
    }

    if body.allow_gravity {
        body.vy += gravity * dt;
    }
    body.vx = body.vx.clamp(-MAX_VELOCITY, MAX_VELOCITY);
    body.vy = body.vy.clamp(-MAX_VELOCITY, MAX_VELOCITY);
    body.x += body.vx * dt;
    body.y += body.vy * dt;

    if body.collide_world_bounds {
        keep_in_world(body);
    }
}

/// Integrate the hero and every entity of the level.
pub fn step(world: &mut LevelWorld, dt: f32) {
    let gravity = world.gravity;
    if !world.hero.removed {
        integrate(&mut world.hero.body, gravity, dt);
    }
    for entity in &mut world.entities {
        integrate(&mut entity.body, gravity, dt);
    }
}

fn keep_in_world(body: &mut Body) {
    if body.x < 0.0 {
        body.x = 0.0;
        body.blocked.left = true;
        body.vx = -body.vx * body.bounce;
    } else if body.right() > WORLD_WIDTH {
        body.x = WORLD_WIDTH - body.width;
        body.blocked.right = true;
        body.vx = -body.vx * body.bounce;
    }
    if body.y < 0.0 {
        body.y = 0.0;
        body.blocked.up = true;
        body.vy = -body.vy * body.bounce;
    } else if body.bottom() > WORLD_HEIGHT {
        body.y = WORLD_HEIGHT - body.height;
        body.blocked.down = true;
        body.vy = -body.vy * body.bounce;
    }
}

// ── Solid collision ───────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
    Vertical,
    Horizontal,
}

/// Push `mover` out of the immovable `obstacle` and set touching flags on
/// both. Returns whether the two were in contact.
///
/// The side is picked from where `mover` was before this frame's step; a
/// body that was already inside falls back to the shallowest penetration.
pub fn separate(mover: &mut Body, obstacle: &mut Body) -> bool {
    if !mover.enabled || !obstacle.enabled || !mover.intersects(obstacle) {
        return false;
    }

    let was_above = mover.prev_y + mover.height <= obstacle.y + CONTACT_EPSILON;
    let was_below = mover.prev_y >= obstacle.bottom() - CONTACT_EPSILON;
    let was_left = mover.prev_x + mover.width <= obstacle.x + CONTACT_EPSILON;
    let was_right = mover.prev_x >= obstacle.right() - CONTACT_EPSILON;

    let axis = if was_above || was_below {
        Axis::Vertical
    } else if was_left || was_right {
        Axis::Horizontal
    } else {
        let dx = (mover.right() - obstacle.x).min(obstacle.right() - mover.x);
        let dy = (mover.bottom() - obstacle.y).min(obstacle.bottom() - mover.y);
        if dy <= dx {
            Axis::Vertical
        } else {
            Axis::Horizontal
        }
    };

    match axis {
        Axis::Vertical => {
            if mover.center_y() < obstacle.center_y() {
                mover.y = obstacle.y - mover.height;
                mover.touching.down = true;
                obstacle.touching.up = true;
                if mover.vy > 0.0 {
                    mover.vy = -mover.vy * mover.bounce;
                }
            } else {
                mover.y = obstacle.bottom();
                mover.touching.up = true;
                obstacle.touching.down = true;
                if mover.vy < 0.0 {
                    mover.vy = -mover.vy * mover.bounce;
                }
            }
        }
        Axis::Horizontal => {
            if mover.center_x() < obstacle.center_x() {
                mover.x = obstacle.x - mover.width;
                mover.touching.right = true;
                obstacle.touching.left = true;
                if mover.vx > 0.0 {
                    mover.vx = -mover.vx * mover.bounce;
                }
            } else {
                mover.x = obstacle.right();
                mover.touching.left = true;
                obstacle.touching.right = true;
                if mover.vx < 0.0 {
                    mover.vx = -mover.vx * mover.bounce;
                }
            }
        }
    }
    true
}

// ── Overlap ───────────────────────────────────────────────────────────────────

/// Non-physical contact test. Never mutates either body.
pub fn overlaps(a: &Body, b: &Body) -> bool {
    a.enabled && b.enabled && a.intersects(b)
}
