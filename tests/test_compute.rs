use std::sync::Arc;

use platform_game::compute::*;
use platform_game::entities::*;
use platform_game::enemy;
use platform_game::level::{LevelCatalog, LevelDefinition};
use platform_game::progression::STARTING_LIVES;

use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

const FLAT_LEVEL: &str = r#"{
    "hero": { "x": 100, "y": 525 },
    "spiders": [],
    "platforms": [
        { "image": "ground", "x": 0, "y": 546 },
        { "image": "grass:4x1", "x": 420, "y": 420 }
    ],
    "decoration": [],
    "bricks": [],
    "tiles": [],
    "coins": [],
    "itemboxes": [],
    "coinboxes": [],
    "springs": [],
    "copperkey": { "x": 900, "y": 100 },
    "silverkey": { "x": 920, "y": 100 },
    "goldkey": { "x": 940, "y": 100 },
    "door": { "x": 800, "y": 546 }
}"#;

fn flat_catalog(levels: usize) -> Arc<LevelCatalog> {
    let def = LevelDefinition::from_json("flat", FLAT_LEVEL).unwrap();
    Arc::new(LevelCatalog::from_definitions(vec![def; levels]).unwrap())
}

fn make_session() -> GameSession {
    new_session(flat_catalog(1), 0, 30, 0)
}

fn seeded_rng() -> StdRng {
    StdRng::seed_from_u64(42)
}

fn idle() -> FrameInput {
    FrameInput::default()
}

/// Tick until `pred` holds on the emitted events, at most `limit` frames.
fn tick_until(
    mut s: GameSession,
    input: &FrameInput,
    rng: &mut StdRng,
    limit: usize,
    pred: impl Fn(&[GameEvent]) -> bool,
) -> GameSession {
    for _ in 0..limit {
        s = tick(&s, input, rng);
        if pred(&s.events) {
            return s;
        }
    }
    panic!("condition not reached in {limit} frames");
}

fn spawn_spider_beside_hero(s: &mut GameSession) {
    let hero = s.world.hero.body;
    s.world.spawn(
        enemy::spider_body(hero.right() + 10.0, hero.bottom() - 16.0),
        EntityKind::Spider(SpiderState { alive: true }),
    );
}

// ── new_session ───────────────────────────────────────────────────────────────

#[test]
fn new_session_starts_fresh() {
    let s = new_session(flat_catalog(2), 1, 30, 777);
    assert_eq!(s.world.index, 1);
    assert_eq!(s.progression.lives, STARTING_LIVES);
    assert_eq!(s.high_score, 777);
    assert_eq!(s.events, vec![GameEvent::LevelStarted { index: 1 }]);
    assert_eq!(s.notice.map(|n| n.kind), Some(NoticeKind::LevelStart(1)));
}

#[test]
fn start_level_wraps_into_catalog() {
    let s = new_session(flat_catalog(2), 5, 30, 0);
    assert_eq!(s.world.index, 1);
}

#[test]
fn frame_length_follows_tick_rate() {
    assert_eq!(frame_dt_ms(30, 1), 33);
    assert_eq!(frame_dt_ms(30, 3), 34);
    assert_eq!(frame_dt_ms(0, 1), 1000);
    assert_eq!(frame_seconds(60), 1.0 / 60.0);
}

#[test]
fn one_second_of_frames_is_one_second_of_clock() {
    for hz in [24, 30, 60, 144, 240] {
        let total: u64 = (1..=u64::from(hz)).map(|frame| frame_dt_ms(hz, frame)).sum();
        assert_eq!(total, 1000, "tick rate {hz}");
    }
}

#[test]
fn session_clock_does_not_drift() {
    let mut s = new_session(flat_catalog(1), 0, 240, 0);
    let mut rng = seeded_rng();
    for _ in 0..240 * 3 {
        s = tick(&s, &idle(), &mut rng);
    }
    assert_eq!(s.clock_ms, 3000);
    assert_eq!(s.schedule.now_ms(), 3000);
}

// ── tick purity ───────────────────────────────────────────────────────────────

#[test]
fn tick_leaves_input_state_untouched() {
    let s = make_session();
    let before = s.clone();
    let next = tick(&s, &idle(), &mut seeded_rng());

    assert_eq!(s.world, before.world);
    assert_eq!(s.progression, before.progression);
    assert_eq!(s.frame, 0);
    assert_eq!(next.frame, 1);
    assert_eq!(next.clock_ms, 33);
}

#[test]
fn same_seed_same_session() {
    let catalog = Arc::new(LevelCatalog::builtin().unwrap());
    let mut a = new_session(Arc::clone(&catalog), 0, 30, 0);
    let mut b = new_session(catalog, 0, 30, 0);
    let mut rng_a = StdRng::seed_from_u64(7);
    let mut rng_b = StdRng::seed_from_u64(7);

    for frame in 0..240u64 {
        let input = FrameInput {
            right: true,
            jump: frame % 20 < 5,
            jump_held_ms: (frame % 20) * 33,
            ..FrameInput::default()
        };
        a = tick(&a, &input, &mut rng_a);
        b = tick(&b, &input, &mut rng_b);
    }
    assert_eq!(a.world, b.world);
    assert_eq!(a.progression, b.progression);
    assert_eq!(a.schedule, b.schedule);
}

// ── movement ──────────────────────────────────────────────────────────────────

#[test]
fn hero_settles_on_the_ground() {
    let mut s = make_session();
    let mut rng = seeded_rng();
    for _ in 0..10 {
        s = tick(&s, &idle(), &mut rng);
    }
    assert_eq!(s.world.hero.body.bottom(), 546.0);
    assert!(s.world.hero.body.on_ground());
    assert_eq!(s.world.hero.pose(), HeroPose::Standing);
}

#[test]
fn left_wins_over_right() {
    let s = make_session();
    let input = FrameInput {
        left: true,
        right: true,
        ..FrameInput::default()
    };
    let s = tick(&s, &input, &mut seeded_rng());
    assert_eq!(s.world.hero.body.vx, -200.0);
    assert_eq!(s.world.hero.facing, Facing::Left);
}

#[test]
fn speed_button_doubles_run_speed() {
    let s = make_session();
    let input = FrameInput {
        right: true,
        speed: true,
        ..FrameInput::default()
    };
    let s = tick(&s, &input, &mut seeded_rng());
    assert_eq!(s.world.hero.body.vx, 400.0);
}

#[test]
fn jump_event_fires_once_per_press() {
    let mut rng = seeded_rng();
    let s = tick(&make_session(), &idle(), &mut rng);

    let press = |held| FrameInput {
        jump: true,
        jump_held_ms: held,
        ..FrameInput::default()
    };
    let s = tick(&s, &press(0), &mut rng);
    assert_eq!(s.events, vec![GameEvent::Jumped]);
    assert_eq!(s.world.hero.body.vy, -400.0);

    let s = tick(&s, &press(33), &mut rng);
    assert!(s.events.is_empty());
    assert!(s.world.hero.is_boosting);
    assert_eq!(s.world.hero.body.vy, -400.0);

    let s = tick(&s, &press(JUMP_HOLD_MS), &mut rng);
    assert!(!s.world.hero.is_boosting);
    assert!(s.world.hero.body.vy > -400.0);
}

#[test]
fn spider_patrols_between_platform_walls() {
    let mut s = make_session();
    s.world.spawn(
        enemy::spider_body(504.0, 404.0),
        EntityKind::Spider(SpiderState { alive: true }),
    );
    let mut rng = seeded_rng();
    let mut turned = false;
    for _ in 0..300 {
        s = tick(&s, &idle(), &mut rng);
        let spider = s
            .world
            .entities
            .iter()
            .find(|e| matches!(e.kind, EntityKind::Spider(_)))
            .unwrap();
        assert!(spider.body.x >= 420.0 - 0.01, "x = {}", spider.body.x);
        assert!(spider.body.right() <= 588.0 + 0.01, "right = {}", spider.body.right());
        turned |= spider.body.vx < 0.0;
    }
    assert!(turned);
}

#[test]
fn keys_bob_around_their_spot() {
    let mut s = make_session();
    let mut rng = seeded_rng();
    let mut lowest = f32::MIN;
    let mut highest = f32::MAX;
    for _ in 0..60 {
        s = tick(&s, &idle(), &mut rng);
        let key = s
            .world
            .entities
            .iter()
            .find(|e| matches!(e.kind, EntityKind::Key(KeyColor::Gold, _)))
            .unwrap();
        lowest = lowest.max(key.body.center_y());
        highest = highest.min(key.body.center_y());
    }
    assert!(highest >= 97.0 - 0.01);
    assert!(lowest <= 103.0 + 0.01);
    assert!(lowest - highest > 5.0);
}

// ── progression through the loop ──────────────────────────────────────────────

#[test]
fn hundredth_coin_converts_at_end_of_tick() {
    let mut s = make_session();
    s.progression.coins = 99;
    s.world.spawn(
        Body::anchored(100.0, 520.0, 22.0, 22.0, Anchor::CENTER).floating(),
        EntityKind::Coin,
    );
    let s = tick(&s, &idle(), &mut seeded_rng());
    assert_eq!(s.progression.coins, 0);
    assert_eq!(s.progression.lives, STARTING_LIVES + 1);
    assert_eq!(
        s.events,
        vec![GameEvent::CoinCollected, GameEvent::ExtraLifeFromCoins]
    );
    assert_eq!(s.notice.map(|n| n.kind), Some(NoticeKind::ExtraLife));
}

#[test]
fn high_score_follows_score() {
    let mut s = make_session();
    s.progression.score = 5_000;
    let s = tick(&s, &idle(), &mut seeded_rng());
    assert_eq!(s.high_score, 5_000);
}

#[test]
fn score_text_fades_then_disappears() {
    let mut s = make_session();
    s.world.spawn(
        Body::anchored(100.0, 520.0, 22.0, 22.0, Anchor::CENTER).floating(),
        EntityKind::Coin,
    );
    let mut rng = seeded_rng();
    s = tick(&s, &idle(), &mut rng);
    let text_id = s
        .world
        .entities
        .iter()
        .find(|e| matches!(e.kind, EntityKind::ScoreText(_)))
        .map(|e| e.id)
        .unwrap();

    for _ in 0..65 {
        s = tick(&s, &idle(), &mut rng);
    }
    match s.world.find(text_id).map(|e| e.kind) {
        Some(EntityKind::ScoreText(text)) => {
            assert_eq!(text.value, 100);
            assert!(text.fade_started_ms.is_some());
            let (rise, alpha) = score_text_fade(&text, s.clock_ms);
            assert!(rise > 0.0 && alpha < 1.0);
        }
        other => panic!("score text missing: {other:?}"),
    }

    for _ in 0..50 {
        s = tick(&s, &idle(), &mut rng);
    }
    assert!(s.world.find(text_id).is_none());
}

#[test]
fn star_tint_runs_out() {
    let mut s = make_session();
    s.world.spawn(
        Body::anchored(100.0, 520.0, 30.0, 30.0, Anchor::CENTER).floating(),
        EntityKind::Star,
    );
    let mut rng = seeded_rng();
    for _ in 0..10 {
        s = tick(&s, &idle(), &mut rng);
    }
    assert!(s.world.hero.tint.is_some());

    for _ in 0..160 {
        s = tick(&s, &idle(), &mut rng);
    }
    assert_eq!(s.world.hero.tint, None);
}

#[test]
fn second_star_keeps_the_tint_running() {
    let star = || Body::anchored(100.0, 520.0, 30.0, 30.0, Anchor::CENTER).floating();
    let mut s = make_session();
    s.world.spawn(star(), EntityKind::Star);
    let mut rng = seeded_rng();
    for _ in 0..100 {
        s = tick(&s, &idle(), &mut rng);
    }
    s.world.spawn(star(), EntityKind::Star);

    // The first cycle alone would have ended around frame 155.
    for _ in 0..80 {
        s = tick(&s, &idle(), &mut rng);
        assert!(s.world.hero.tint.is_some());
    }
    for _ in 0..100 {
        s = tick(&s, &idle(), &mut rng);
    }
    assert_eq!(s.world.hero.tint, None);
}

#[test]
fn dead_spider_is_removed_after_its_animation() {
    let mut s = make_session();
    let id = s.world.spawn(
        enemy::spider_body(100.0, 530.0),
        EntityKind::Spider(SpiderState { alive: true }),
    );
    s.world.hero.body.y = 440.0;
    s.world.hero.body.prev_y = 440.0;
    s.world.hero.body.vy = 300.0;
    let mut rng = seeded_rng();

    s = tick_until(s, &idle(), &mut rng, 10, |ev| ev.contains(&GameEvent::Stomped));
    assert!(s.world.find(id).is_some());

    for _ in 0..31 {
        s = tick(&s, &idle(), &mut rng);
    }
    assert!(s.world.find(id).is_none());
}

// ── restarts ──────────────────────────────────────────────────────────────────

#[test]
fn death_restarts_same_level_while_lives_remain() {
    let mut s = new_session(flat_catalog(2), 1, 30, 0);
    let mut rng = seeded_rng();
    s.world.hero.health = 1;
    s.progression.keys.copper = true;
    s.progression.score = 300;
    spawn_spider_beside_hero(&mut s);
    s.world.hero.body.x += 20.0;
    s.world.hero.body.prev_x += 20.0;

    s = tick_until(s, &idle(), &mut rng, 5, |ev| {
        ev.contains(&GameEvent::HeroDied { lives: 2 })
    });
    s = tick_until(s, &idle(), &mut rng, 40, |ev| {
        ev.contains(&GameEvent::LevelStarted { index: 1 })
    });

    assert_eq!(s.world.index, 1);
    assert_eq!(s.progression.lives, 2);
    assert_eq!(s.progression.score, 300);
    assert!(!s.progression.keys.copper);
    assert_eq!(s.world.hero.health, 6);
    assert!(s.world.hero.alive);
    assert!(s.schedule.is_empty());
}

#[test]
fn losing_last_life_restarts_at_level_zero() {
    let mut s = new_session(flat_catalog(2), 1, 30, 0);
    let mut rng = seeded_rng();
    s.progression.lives = 1;
    s.progression.coins = 50;
    s.world.hero.health = 0;
    spawn_spider_beside_hero(&mut s);
    s.world.hero.body.x += 20.0;
    s.world.hero.body.prev_x += 20.0;

    s = tick_until(s, &idle(), &mut rng, 5, |ev| ev.contains(&GameEvent::GameOver));
    s = tick_until(s, &idle(), &mut rng, 40, |ev| {
        ev.contains(&GameEvent::LevelStarted { index: 0 })
    });

    assert_eq!(s.world.index, 0);
    assert_eq!(s.progression.lives, STARTING_LIVES);
    assert_eq!(s.progression.coins, 0);
    assert_eq!(s.notice.map(|n| n.kind), Some(NoticeKind::GameOver));
}

#[test]
fn door_leads_to_next_level() {
    let mut s = new_session(flat_catalog(2), 0, 30, 0);
    let mut rng = seeded_rng();
    for color in KeyColor::ALL {
        s.progression.keys.grant(color);
    }
    let door = s
        .world
        .entities
        .iter()
        .find(|e| matches!(e.kind, EntityKind::Door { .. }))
        .map(|e| e.body)
        .unwrap();
    s.world.hero.body.x = door.x;
    s.world.hero.body.prev_x = door.x;

    s = tick_until(s, &idle(), &mut rng, 3, |ev| ev.contains(&GameEvent::DoorOpened));
    assert!(s.world.hero.is_frozen);

    s = tick_until(s, &idle(), &mut rng, 30, |ev| {
        ev.contains(&GameEvent::LevelStarted { index: 1 })
    });
    assert_eq!(s.world.index, 1);
    assert!(!s.progression.keys.all());
    assert!(!s.world.hero.is_frozen);
}

#[test]
fn last_door_cycles_back_to_first_level() {
    let mut s = new_session(flat_catalog(2), 1, 30, 0);
    s.pending_level = None;
    apply_deferred(&mut s, platform_game::schedule::Deferred::EnterNextLevel, &mut seeded_rng());
    assert_eq!(s.pending_level.map(|p| p.index), Some(0));
}
