//! Game loop orchestration.
//!
//! `tick` takes an immutable reference to the current `GameSession` and
//! returns a brand-new one. All randomness comes through the injected RNG,
//! so a seeded RNG replays a session exactly.

use std::sync::Arc;

use rand::Rng;
use tracing::{debug, info};

use crate::collision::{self, SCORE_TEXT_FADE_MS, SCORE_TEXT_RISE, STAR_TINT_INTERVAL_MS};
use crate::entities::{
    Direction, EntityKind, FrameInput, GameEvent, GameSession, Notice, NoticeKind, PendingLoad,
    ScoreText, SpringState,
};
use crate::level::{self, LevelCatalog};
use crate::physics;
use crate::progression::Progression;
use crate::schedule::{Deferred, Scheduler};

/// The jump button only counts for this long after it went down.
pub const JUMP_HOLD_MS: u64 = 200;
/// How long level-start and game-over banners stay up.
pub const NOTICE_MS: u64 = 2000;
pub const DEFAULT_TICK_RATE_HZ: u32 = 30;

/// Milliseconds covered by frame number `frame` (counting from 1).
///
/// Frame lengths vary by at most 1 ms so that after `n` frames the clock
/// reads exactly `n * 1000 / tick_rate_hz`, rounded down.
pub fn frame_dt_ms(tick_rate_hz: u32, frame: u64) -> u64 {
    let hz = u64::from(tick_rate_hz.max(1));
    frame * 1000 / hz - frame.saturating_sub(1) * 1000 / hz
}

/// Physics step in seconds.
pub fn frame_seconds(tick_rate_hz: u32) -> f32 {
    1.0 / tick_rate_hz.max(1) as f32
}

// ── Constructors ─────────────────────────────────────────────────────────────

/// Start a session at `start_level` (wrapped into the catalog) with fresh
/// counters.
pub fn new_session(
    catalog: Arc<LevelCatalog>,
    start_level: usize,
    tick_rate_hz: u32,
    high_score: u64,
) -> GameSession {
    let index = start_level % catalog.len();
    let world = level::build_world(catalog.get(index), index);
    let mut session = GameSession {
        world,
        progression: Progression::default(),
        schedule: Scheduler::new(),
        catalog,
        pending_level: None,
        events: Vec::new(),
        notice: None,
        high_score,
        frame: 0,
        clock_ms: 0,
        tick_rate_hz,
    };
    show_notice(&mut session, NoticeKind::LevelStart(index));
    session.events.push(GameEvent::LevelStarted { index });
    session
}

/// Throw away the current level and build `load.index` from scratch.
/// Keys and the deferred queue go with the old level; counters stay.
pub fn enter_level(session: &mut GameSession, load: PendingLoad) {
    let index = load.index % session.catalog.len();
    session.world = level::build_world(session.catalog.get(index), index);
    session.progression.reset_for_level();
    session.schedule = Scheduler::new();
    show_notice(session, load.notice);
    info!(
        level = index,
        lives = session.progression.lives,
        score = session.progression.score,
        "level_started"
    );
    session.events.push(GameEvent::LevelStarted { index });
}

fn show_notice(session: &mut GameSession, kind: NoticeKind) {
    session.notice = Some(Notice {
        kind,
        expires_ms: session.clock_ms + NOTICE_MS,
    });
}

// ── Per-frame tick (nearly pure, RNG is injected) ───────────────────────────

/// Advance the simulation by one frame.
pub fn tick(state: &GameSession, input: &FrameInput, rng: &mut impl Rng) -> GameSession {
    let mut next = state.clone();
    next.events.clear();
    next.frame += 1;
    let dt_ms = frame_dt_ms(next.tick_rate_hz, next.frame);
    next.clock_ms += dt_ms;

    // ── 1. Deferred effects that came due ─────────────────────────────────────
    for effect in next.schedule.advance(dt_ms) {
        apply_deferred(&mut next, effect, rng);
    }

    // ── 2. Physics ───────────────────────────────────────────────────────────
    physics::step(&mut next.world, frame_seconds(next.tick_rate_hz));

    // ── 3. Collisions ────────────────────────────────────────────────────────
    collision::resolve(&mut next, rng);

    // ── 4. Input ─────────────────────────────────────────────────────────────
    apply_input(&mut next, input);

    // ── 5. Behaviour ─────────────────────────────────────────────────────────
    update_behaviour(&mut next, dt_ms);

    // ── 6. Derived progression ───────────────────────────────────────────────
    if next.progression.convert_coins() {
        debug!(lives = next.progression.lives, "coins_converted");
        next.events.push(GameEvent::ExtraLifeFromCoins);
        show_notice(&mut next, NoticeKind::ExtraLife);
    }
    next.high_score = next.high_score.max(next.progression.score);
    if next.notice.is_some_and(|n| n.expires_ms <= next.clock_ms) {
        next.notice = None;
    }

    // ── 7. Level transitions ─────────────────────────────────────────────────
    if let Some(load) = next.pending_level.take() {
        enter_level(&mut next, load);
    }

    next
}

/// Run one effect that the scheduler handed back.
pub fn apply_deferred(session: &mut GameSession, effect: Deferred, rng: &mut impl Rng) {
    match effect {
        Deferred::HeroRecover => {
            if !session.world.hero.removed {
                session.world.hero.recover();
            }
        }
        Deferred::HeroRemoved {
            restart_level,
            game_over,
        } => {
            session.world.hero.remove();
            session.pending_level = Some(collision::restart_after_death(restart_level, game_over));
        }
        Deferred::RemoveEntity(id) => collision::despawn(session, id),
        Deferred::CoinBoxPayout { box_id, remaining } => {
            collision::pay_box_coin(session, box_id, remaining);
        }
        Deferred::StarTint { remaining } => {
            let hero = &mut session.world.hero;
            if remaining > 0 {
                hero.tint = Some(rng.gen_range(0..=0xff_ffff));
                session.schedule.after(
                    STAR_TINT_INTERVAL_MS,
                    None,
                    Deferred::StarTint {
                        remaining: remaining - 1,
                    },
                );
            } else {
                hero.tint = None;
            }
        }
        Deferred::SpringRest(id) => {
            if let Some(spring) = session.world.find_mut(id) {
                if let EntityKind::Spring(state) = &mut spring.kind {
                    *state = SpringState::Idle;
                }
            }
        }
        Deferred::FadeScoreText(id) => {
            let now = session.clock_ms;
            if let Some(EntityKind::ScoreText(text)) =
                session.world.find_mut(id).map(|e| &mut e.kind)
            {
                text.fade_started_ms = Some(now);
                session
                    .schedule
                    .after(SCORE_TEXT_FADE_MS, Some(id), Deferred::RemoveEntity(id));
            }
        }
        Deferred::EnterNextLevel => {
            let index = session.catalog.next_index(session.world.index);
            session.pending_level = Some(PendingLoad {
                index,
                notice: NoticeKind::LevelStart(index),
            });
        }
    }
}

/// Left is read before right; the jump button only counts early in a hold.
fn apply_input(session: &mut GameSession, input: &FrameInput) {
    let hero = &mut session.world.hero;
    if hero.removed {
        return;
    }

    hero.set_speed_boost(input.speed);
    let direction = if input.left {
        Direction::Left
    } else if input.right {
        Direction::Right
    } else {
        Direction::Still
    };
    hero.walk(direction);

    if input.jump && input.jump_held_ms < JUMP_HOLD_MS {
        let was_boosting = hero.is_boosting;
        if hero.jump() && !was_boosting {
            session.events.push(GameEvent::Jumped);
        }
    } else {
        hero.stop_jump_boost();
    }
}

fn update_behaviour(session: &mut GameSession, dt_ms: u64) {
    for entity in &mut session.world.entities {
        match &mut entity.kind {
            EntityKind::Spider(state) if state.alive => crate::enemy::patrol(&mut entity.body),
            EntityKind::Key(_, bob) | EntityKind::LifePickup(bob) => {
                bob.elapsed_ms += dt_ms;
                entity.body.y = bob.base_y + level::bob_offset(bob.elapsed_ms);
            }
            _ => {}
        }
    }

    let hero = &mut session.world.hero;
    hero.advance_door_walk(dt_ms);
    hero.refresh_wall_contact();
}

/// Upward drift and opacity of a score text at `now_ms`.
pub fn score_text_fade(text: &ScoreText, now_ms: u64) -> (f32, f32) {
    match text.fade_started_ms {
        None => (0.0, 1.0),
        Some(start) => {
            let t = (now_ms.saturating_sub(start) as f32 / SCORE_TEXT_FADE_MS as f32).min(1.0);
            (SCORE_TEXT_RISE * t, 1.0 - t)
        }
    }
}
