//! Spider behaviour: walk until something blocks the way, then turn round.

use crate::entities::{Anchor, Body, Entity, EntityKind, SpiderState};
use crate::schedule::{Deferred, Scheduler};

pub const SPIDER_WIDTH: f32 = 42.0;
pub const SPIDER_HEIGHT: f32 = 32.0;
pub const SPIDER_SPEED: f32 = 100.0;
/// Twelve frames at 12 fps.
pub const SPIDER_DEATH_MS: u64 = 1000;

/// A live spider centred on (`x`, `y`), already walking right.
pub fn spider_body(x: f32, y: f32) -> Body {
    let mut body = Body::anchored(x, y, SPIDER_WIDTH, SPIDER_HEIGHT, Anchor::CENTER).bounded();
    body.vx = SPIDER_SPEED;
    body
}

/// Reverse on contact; the right side wins when both are touched.
pub fn patrol(body: &mut Body) {
    if body.touching.right || body.blocked.right {
        body.vx = -SPIDER_SPEED;
    } else if body.touching.left || body.blocked.left {
        body.vx = SPIDER_SPEED;
    }
}

/// One hit is fatal. The spider stops interacting at once and is removed
/// when its death animation ends. Returns `false` for anything that is not
/// a live spider.
pub fn kill(spider: &mut Entity, schedule: &mut Scheduler) -> bool {
    match &mut spider.kind {
        EntityKind::Spider(state) if state.alive => {
            *state = SpiderState { alive: false };
            spider.body.enabled = false;
            schedule.after(
                SPIDER_DEATH_MS,
                Some(spider.id),
                Deferred::RemoveEntity(spider.id),
            );
            true
        }
        _ => false,
    }
}
