//! Collision resolution policy.
//!
//! One ordered table of checks runs every frame. Solid checks push movers
//! out of immovable obstacles; trigger checks only test for overlap and hand
//! the pair to a handler. The order is part of the game rules: a coin is
//! collected after the hero has been pushed out of the platforms, and the
//! spider check comes last so a stomp sees the hero's settled velocity.

use rand::Rng;
use tracing::debug;

use crate::enemy;
use crate::entities::{
    Body, CoinBoxState, EntityId, EntityKind, GameEvent, GameSession, ItemBoxState, KeyColor,
    LevelWorld, NoticeKind, PendingLoad, ScoreText, SpringState,
};
use crate::hero::DOOR_WALK_MS;
use crate::level;
use crate::physics;
use crate::progression::{LifeOutcome, LIFE_SCORE, STAR_SCORE};
use crate::schedule::Deferred;

/// Gap between two coins paid out by a coin box.
pub const COIN_BOX_INTERVAL_MS: u64 = 100;
pub const STAR_TINT_INTERVAL_MS: u64 = 100;
/// Five seconds of colour cycling.
pub const STAR_TINT_STEPS: u32 = 50;
pub const SPRING_BOOST_MS: u64 = 167;
/// Score text sits still this long before it starts to fade.
pub const SCORE_TEXT_HOLD_MS: u64 = 2000;
pub const SCORE_TEXT_FADE_MS: u64 = 1500;
pub const SCORE_TEXT_RISE: f32 = 10.0;

const SCORE_TEXT_WIDTH: f32 = 60.0;
const SCORE_TEXT_HEIGHT: f32 = 26.0;
/// Item box rolls are uniform over `0..=ITEM_BOX_ROLLS`; the top roll is empty.
const ITEM_BOX_ROLLS: u32 = 5;

// ── Policy table ──────────────────────────────────────────────────────────────

/// Entity selector for one side of a check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Group {
    Spiders,
    Platforms,
    EnemyWalls,
    Springs,
    Tiles,
    ItemBoxes,
    CoinBoxes,
    Coins,
    LifePickups,
    Stars,
    Key(KeyColor),
    Door,
}

impl Group {
    pub fn matches(self, kind: &EntityKind) -> bool {
        match (self, kind) {
            (Group::Spiders, EntityKind::Spider(_))
            | (Group::Platforms, EntityKind::Platform(_))
            | (Group::EnemyWalls, EntityKind::EnemyWall)
            | (Group::Springs, EntityKind::Spring(_))
            | (Group::Tiles, EntityKind::Tile(_))
            | (Group::ItemBoxes, EntityKind::ItemBox(_))
            | (Group::CoinBoxes, EntityKind::CoinBox(_))
            | (Group::Coins, EntityKind::Coin)
            | (Group::LifePickups, EntityKind::LifePickup(_))
            | (Group::Stars, EntityKind::Star)
            | (Group::Door, EntityKind::Door { .. }) => true,
            (Group::Key(wanted), EntityKind::Key(color, _)) => wanted == *color,
            _ => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handler {
    ItemBox,
    CoinBox,
    Coin,
    LifePickup,
    Spring,
    Key,
    Star,
    Door,
    Spider,
}

/// Extra condition a trigger must pass before its handler runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Guard {
    /// All three keys held and the hero standing on something.
    DoorUnlocked,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Check {
    /// Entities of `movers` are pushed out of entities of `obstacles`.
    Solid { movers: Group, obstacles: Group },
    /// The hero is pushed out of `obstacles`; `handler` runs on contact.
    HeroSolid {
        obstacles: Group,
        handler: Option<Handler>,
    },
    /// Overlap only; nothing is moved.
    HeroTrigger {
        targets: Group,
        handler: Handler,
        guard: Option<Guard>,
    },
}

pub const CHECKS: [Check; 21] = [
    Check::Solid { movers: Group::Spiders, obstacles: Group::Platforms },
    Check::Solid { movers: Group::Spiders, obstacles: Group::EnemyWalls },
    Check::Solid { movers: Group::Spiders, obstacles: Group::Springs },
    Check::HeroSolid { obstacles: Group::Tiles, handler: None },
    Check::HeroSolid { obstacles: Group::Platforms, handler: None },
    Check::HeroSolid { obstacles: Group::ItemBoxes, handler: Some(Handler::ItemBox) },
    Check::HeroSolid { obstacles: Group::CoinBoxes, handler: Some(Handler::CoinBox) },
    Check::HeroTrigger { targets: Group::Coins, handler: Handler::Coin, guard: None },
    Check::HeroTrigger { targets: Group::LifePickups, handler: Handler::LifePickup, guard: None },
    Check::HeroSolid { obstacles: Group::Springs, handler: Some(Handler::Spring) },
    Check::HeroTrigger { targets: Group::Key(KeyColor::Copper), handler: Handler::Key, guard: None },
    Check::HeroTrigger { targets: Group::Stars, handler: Handler::Star, guard: None },
    Check::Solid { movers: Group::Stars, obstacles: Group::Platforms },
    Check::Solid { movers: Group::Stars, obstacles: Group::Tiles },
    Check::Solid { movers: Group::Stars, obstacles: Group::ItemBoxes },
    Check::Solid { movers: Group::Stars, obstacles: Group::CoinBoxes },
    Check::Solid { movers: Group::Stars, obstacles: Group::Springs },
    Check::HeroTrigger { targets: Group::Key(KeyColor::Silver), handler: Handler::Key, guard: None },
    Check::HeroTrigger { targets: Group::Key(KeyColor::Gold), handler: Handler::Key, guard: None },
    Check::HeroTrigger {
        targets: Group::Door,
        handler: Handler::Door,
        guard: Some(Guard::DoorUnlocked),
    },
    Check::HeroTrigger { targets: Group::Spiders, handler: Handler::Spider, guard: None },
];

// ── Resolution ────────────────────────────────────────────────────────────────

/// Run every check of the table, in order, against the session.
pub fn resolve(session: &mut GameSession, rng: &mut impl Rng) {
    for check in CHECKS {
        run_check(check, session, rng);
    }
}

pub fn run_check(check: Check, session: &mut GameSession, rng: &mut impl Rng) {
    match check {
        Check::Solid { movers, obstacles } => {
            let world = &mut session.world;
            let movers = members(world, movers);
            let obstacles = members(world, obstacles);
            for &m in &movers {
                for &o in &obstacles {
                    if m == o {
                        continue;
                    }
                    let (mover, obstacle) = pair_mut(&mut world.entities, m, o);
                    physics::separate(&mut mover.body, &mut obstacle.body);
                }
            }
        }
        Check::HeroSolid { obstacles, handler } => {
            if session.world.hero.removed {
                return;
            }
            for id in member_ids(&session.world, obstacles) {
                let world = &mut session.world;
                let Some(i) = world.index_of(id) else {
                    continue;
                };
                let hit = physics::separate(&mut world.hero.body, &mut world.entities[i].body);
                if let (true, Some(handler)) = (hit, handler) {
                    dispatch(handler, session, id, rng);
                }
            }
        }
        Check::HeroTrigger {
            targets,
            handler,
            guard,
        } => {
            if session.world.hero.removed {
                return;
            }
            for id in member_ids(&session.world, targets) {
                let Some(target) = session.world.find(id) else {
                    continue;
                };
                if !physics::overlaps(&session.world.hero.body, &target.body) {
                    continue;
                }
                if guard.is_some_and(|g| !guard_passes(g, session, id)) {
                    continue;
                }
                dispatch(handler, session, id, rng);
            }
        }
    }
}

fn guard_passes(guard: Guard, session: &GameSession, id: EntityId) -> bool {
    match guard {
        Guard::DoorUnlocked => {
            let closed = matches!(
                session.world.find(id).map(|e| e.kind),
                Some(EntityKind::Door { open: false })
            );
            closed && session.progression.keys.all() && session.world.hero.body.on_ground()
        }
    }
}

fn members(world: &LevelWorld, group: Group) -> Vec<usize> {
    world
        .entities
        .iter()
        .enumerate()
        .filter(|(_, e)| group.matches(&e.kind))
        .map(|(i, _)| i)
        .collect()
}

fn member_ids(world: &LevelWorld, group: Group) -> Vec<EntityId> {
    world
        .entities
        .iter()
        .filter(|e| group.matches(&e.kind))
        .map(|e| e.id)
        .collect()
}

/// Two distinct mutable elements of one slice.
fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> (&mut T, &mut T) {
    debug_assert_ne!(a, b);
    if a < b {
        let (left, right) = items.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = items.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────────

fn dispatch(handler: Handler, session: &mut GameSession, id: EntityId, rng: &mut impl Rng) {
    match handler {
        Handler::ItemBox => hero_vs_item_box(session, id, rng),
        Handler::CoinBox => hero_vs_coin_box(session, id, rng),
        Handler::Coin => hero_vs_coin(session, id),
        Handler::LifePickup => hero_vs_life(session, id),
        Handler::Spring => hero_vs_spring(session, id),
        Handler::Key => hero_vs_key(session, id),
        Handler::Star => hero_vs_star(session, id),
        Handler::Door => hero_vs_door(session, id),
        Handler::Spider => hero_vs_spider(session, id),
    }
}

/// Drop an entity together with anything it still has queued.
pub fn despawn(session: &mut GameSession, id: EntityId) {
    session.world.remove(id);
    session.schedule.cancel_owner(id);
}

/// "+N" text that hangs over a pickup, then rises and fades.
pub fn spawn_score_text(session: &mut GameSession, value: u64, x: f32, y: f32) -> EntityId {
    let mut body = Body::new(x, y, SCORE_TEXT_WIDTH, SCORE_TEXT_HEIGHT).floating();
    body.enabled = false;
    let text = ScoreText {
        value,
        fade_started_ms: None,
    };
    let id = session.world.spawn(body, EntityKind::ScoreText(text));
    session
        .schedule
        .after(SCORE_TEXT_HOLD_MS, Some(id), Deferred::FadeScoreText(id));
    id
}

/// Score text goes one body height above the pickup's centre.
fn score_text_over(session: &mut GameSession, value: u64, pickup: &Body) {
    spawn_score_text(
        session,
        value,
        pickup.center_x(),
        pickup.center_y() - pickup.height,
    );
}

fn hero_vs_item_box(session: &mut GameSession, id: EntityId, rng: &mut impl Rng) {
    let Some(entity) = session.world.find_mut(id) else {
        return;
    };
    let EntityKind::ItemBox(state) = &mut entity.kind else {
        return;
    };
    if *state != ItemBoxState::Active {
        return;
    }
    *state = ItemBoxState::Used;
    let body = entity.body;

    let roll = rng.gen_range(0..=ITEM_BOX_ROLLS);
    let spawned_star = roll < ITEM_BOX_ROLLS;
    if spawned_star {
        let label = if roll % 2 == 0 { "life" } else { "coin" };
        debug!(item_box = id.0, roll, label, "item_box_prize");
        level::spawn_star(
            &mut session.world,
            body.center_x(),
            body.center_y() - body.height * 3.0,
        );
        session.events.push(GameEvent::StarSpawned);
    } else {
        debug!(item_box = id.0, roll, "item_box_empty");
    }
    session
        .events
        .push(GameEvent::ItemBoxOpened { spawned_star });
}

fn hero_vs_coin_box(session: &mut GameSession, id: EntityId, rng: &mut impl Rng) {
    let Some(entity) = session.world.find_mut(id) else {
        return;
    };
    let EntityKind::CoinBox(state) = &mut entity.kind else {
        return;
    };
    if *state != CoinBoxState::Active {
        return;
    }
    *state = CoinBoxState::PayingOut;

    let coins = rng.gen_range(2..=11);
    debug!(coin_box = id.0, coins, "coin_box_opened");
    session.schedule.after(
        COIN_BOX_INTERVAL_MS,
        Some(id),
        Deferred::CoinBoxPayout {
            box_id: id,
            remaining: coins,
        },
    );
}

/// One coin from a paying coin box. The last coin spends the box and drops
/// a star two box-heights above it.
pub fn pay_box_coin(session: &mut GameSession, box_id: EntityId, remaining: u32) {
    let Some(entity) = session.world.find_mut(box_id) else {
        return;
    };
    if entity.kind != EntityKind::CoinBox(CoinBoxState::PayingOut) {
        return;
    }

    session.progression.collect_box_coin();
    session.events.push(GameEvent::BoxCoinCollected);

    let remaining = remaining.saturating_sub(1);
    if remaining > 0 {
        session.schedule.after(
            COIN_BOX_INTERVAL_MS,
            Some(box_id),
            Deferred::CoinBoxPayout { box_id, remaining },
        );
        return;
    }

    entity.kind = EntityKind::CoinBox(CoinBoxState::Spent);
    let body = entity.body;
    level::spawn_star(
        &mut session.world,
        body.center_x(),
        body.center_y() - body.height * 2.0,
    );
    session.events.push(GameEvent::StarSpawned);
}

fn hero_vs_coin(session: &mut GameSession, id: EntityId) {
    let Some(coin) = session.world.find(id).map(|e| e.body) else {
        return;
    };
    despawn(session, id);
    session.progression.collect_coin();
    score_text_over(session, crate::progression::COIN_SCORE, &coin);
    session.events.push(GameEvent::CoinCollected);
}

fn hero_vs_life(session: &mut GameSession, id: EntityId) {
    let Some(life) = session.world.find(id).map(|e| e.body) else {
        return;
    };
    despawn(session, id);
    session.progression.collect_life();
    score_text_over(session, LIFE_SCORE, &life);
    session.events.push(GameEvent::LifeCollected);
}

fn hero_vs_spring(session: &mut GameSession, id: EntityId) {
    let Some(spring) = session.world.find_mut(id) else {
        return;
    };
    spring.kind = EntityKind::Spring(SpringState::Boosting);
    session.world.hero.launch();
    session.schedule.cancel_owner(id);
    session
        .schedule
        .after(SPRING_BOOST_MS, Some(id), Deferred::SpringRest(id));
    session.events.push(GameEvent::SpringLaunched);
}

fn hero_vs_key(session: &mut GameSession, id: EntityId) {
    let Some(EntityKind::Key(color, _)) = session.world.find(id).map(|e| e.kind) else {
        return;
    };
    despawn(session, id);
    session.progression.keys.grant(color);
    debug!(key = ?color, "key_collected");
    session.events.push(GameEvent::KeyCollected(color));
}

fn hero_vs_star(session: &mut GameSession, id: EntityId) {
    let Some(star) = session.world.find(id).map(|e| e.body) else {
        return;
    };
    despawn(session, id);
    session.progression.add_score(STAR_SCORE);
    score_text_over(session, STAR_SCORE, &star);
    // A new star restarts the colour cycle rather than running a second one.
    session
        .schedule
        .cancel_where(|effect| matches!(effect, Deferred::StarTint { .. }));
    session.schedule.after(
        STAR_TINT_INTERVAL_MS,
        None,
        Deferred::StarTint {
            remaining: STAR_TINT_STEPS,
        },
    );
    session.events.push(GameEvent::StarCollected);
}

fn hero_vs_door(session: &mut GameSession, id: EntityId) {
    let Some(door) = session.world.find_mut(id) else {
        return;
    };
    door.kind = EntityKind::Door { open: true };
    let door_x = door.body.center_x();

    let hero = &mut session.world.hero;
    hero.freeze();
    hero.start_door_walk(door_x);
    session
        .schedule
        .after(DOOR_WALK_MS, None, Deferred::EnterNextLevel);
    debug!(level = session.world.index, "door_opened");
    session.events.push(GameEvent::DoorOpened);
}

/// Falling onto a spider kills it; any other contact hurts the hero.
fn hero_vs_spider(session: &mut GameSession, id: EntityId) {
    if session.world.hero.body.vy > 0.0 {
        let Some(spider) = session.world.find_mut(id) else {
            return;
        };
        if enemy::kill(spider, &mut session.schedule) {
            session.world.hero.bounce();
            debug!(spider = id.0, "spider_stomped");
            session.events.push(GameEvent::Stomped);
        }
        return;
    }
    injure_hero(session);
}

/// Take one point of health. Reaching zero, or being hit with none left,
/// costs a life.
pub fn injure_hero(session: &mut GameSession) {
    let hero = &mut session.world.hero;
    if hero.health > 0 {
        hero.health -= 1;
        if hero.health > 0 {
            hero.hurt(&mut session.schedule);
            let health = hero.health;
            debug!(health, "hero_hurt");
            session.events.push(GameEvent::HeroHurt { health });
            return;
        }
    }
    kill_hero(session);
}

fn kill_hero(session: &mut GameSession) {
    session.high_score = session.high_score.max(session.progression.score);
    let lives = session.progression.lives.saturating_sub(1);
    let outcome = session.progression.lose_life();
    let (restart_level, game_over) = match outcome {
        LifeOutcome::Retry => (session.world.index, false),
        LifeOutcome::GameOver => (0, true),
    };
    session
        .world
        .hero
        .die(&mut session.schedule, restart_level, game_over);

    debug!(lives, game_over, restart_level, "hero_died");
    session.events.push(GameEvent::HeroDied { lives });
    if game_over {
        session.events.push(GameEvent::GameOver);
    }
}

/// The load a finished death animation asks for.
pub fn restart_after_death(restart_level: usize, game_over: bool) -> PendingLoad {
    let notice = if game_over {
        NoticeKind::GameOver
    } else {
        NoticeKind::LevelStart(restart_level)
    };
    PendingLoad {
        index: restart_level,
        notice,
    }
}
