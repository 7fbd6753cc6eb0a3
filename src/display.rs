//! Rendering layer: all terminal I/O lives here.
//!
//! Each function receives a mutable writer and an immutable view of the
//! session. No game logic is performed; this module only translates state
//! into terminal commands. World pixels are mapped onto terminal cells
//! through a camera that follows the hero.

use std::io::Write;

use crossterm::{
    cursor,
    style::{self, Color, Print},
    terminal,
    QueueableCommand,
};
use platform_game::compute::score_text_fade;
use platform_game::entities::{
    Body, CoinBoxState, Entity, EntityKind, Facing, GameSession, HeroPose, ItemBoxState,
    KeyColor, NoticeKind, SpringState, TileKind,
};
use platform_game::level::PlatformImage;
use platform_game::progression::{hearts, HeartPip};

/// World pixels covered by one terminal cell.
const CELL_W: f32 = 12.0;
const CELL_H: f32 = 24.0;

// ── Colour palette ────────────────────────────────────────────────────────────

const C_HUD: Color = Color::White;
const C_SCORE: Color = Color::Yellow;
const C_HEART: Color = Color::Red;
const C_HEART_HALF: Color = Color::DarkRed;
const C_EMPTY: Color = Color::DarkGrey;
const C_HERO: Color = Color::White;
const C_SPIDER: Color = Color::Red;
const C_GROUND: Color = Color::DarkGreen;
const C_GRASS: Color = Color::Green;
const C_BRICK: Color = Color::DarkRed;
const C_COIN: Color = Color::Yellow;
const C_BOX: Color = Color::Yellow;
const C_SPRING: Color = Color::Cyan;
const C_STAR: Color = Color::Yellow;
const C_LIFE: Color = Color::Magenta;
const C_DOOR: Color = Color::DarkYellow;
const C_DECOR: Color = Color::DarkGreen;
const C_HINT: Color = Color::DarkGrey;

// ── Camera ────────────────────────────────────────────────────────────────────

/// Top-left world pixel shown at terminal cell (0, 1).
#[derive(Clone, Copy, Debug)]
struct Camera {
    x: f32,
    y: f32,
    cols: u16,
    rows: u16,
}

impl Camera {
    /// Centre on the hero, clamped to the level's extent.
    fn follow(session: &GameSession, cols: u16, rows: u16) -> Self {
        let view_w = cols as f32 * CELL_W;
        let view_h = rows as f32 * CELL_H;
        let hero = &session.world.hero.body;
        let max_x = (session.world.width - view_w).max(0.0);
        let max_y = (session.world.height - view_h).max(0.0);
        Camera {
            x: (hero.center_x() - view_w / 2.0).clamp(0.0, max_x),
            y: (hero.center_y() - view_h / 2.0).clamp(0.0, max_y),
            cols,
            rows,
        }
    }

    /// Terminal cell for a world point, if it is on screen.
    fn cell(&self, x: f32, y: f32) -> Option<(u16, u16)> {
        let col = ((x - self.x) / CELL_W).floor();
        let row = ((y - self.y) / CELL_H).floor();
        if col < 0.0 || row < 0.0 || col >= self.cols as f32 || row >= self.rows as f32 {
            return None;
        }
        // Row 0 belongs to the HUD.
        Some((col as u16, row as u16 + 1))
    }
}

// ── Public entry point ────────────────────────────────────────────────────────

/// Render one complete frame.
pub fn render<W: Write>(out: &mut W, session: &GameSession) -> std::io::Result<()> {
    let (width, height) = terminal::size()?;
    let camera = Camera::follow(session, width, height.saturating_sub(2));

    out.queue(terminal::Clear(terminal::ClearType::All))?;

    for entity in &session.world.entities {
        draw_entity(out, &camera, entity, session.clock_ms)?;
    }
    draw_hero(out, &camera, session)?;
    draw_hud(out, session, width)?;
    draw_notice(out, session, width, height)?;
    draw_controls_hint(out, height)?;

    // Park cursor in a harmless spot and flush
    out.queue(style::ResetColor)?;
    out.queue(cursor::MoveTo(0, height.saturating_sub(1)))?;
    out.flush()?;
    Ok(())
}

// ── Entities ──────────────────────────────────────────────────────────────────

fn put<W: Write>(out: &mut W, at: (u16, u16), color: Color, glyph: &str) -> std::io::Result<()> {
    out.queue(cursor::MoveTo(at.0, at.1))?;
    out.queue(style::SetForegroundColor(color))?;
    out.queue(Print(glyph))?;
    Ok(())
}

/// Fill every on-screen cell that the body covers.
fn fill<W: Write>(
    out: &mut W,
    camera: &Camera,
    body: &Body,
    color: Color,
    glyph: &str,
) -> std::io::Result<()> {
    let mut y = body.y;
    while y < body.bottom() {
        let mut x = body.x;
        while x < body.right() {
            if let Some(at) = camera.cell(x, y) {
                put(out, at, color, glyph)?;
            }
            x += CELL_W;
        }
        y += CELL_H;
    }
    Ok(())
}

/// Single glyph at the body's centre.
fn mark<W: Write>(
    out: &mut W,
    camera: &Camera,
    body: &Body,
    color: Color,
    glyph: &str,
) -> std::io::Result<()> {
    match camera.cell(body.center_x(), body.center_y()) {
        Some(at) => put(out, at, color, glyph),
        None => Ok(()),
    }
}

fn key_color(color: KeyColor) -> Color {
    match color {
        KeyColor::Copper => Color::DarkYellow,
        KeyColor::Silver => Color::Grey,
        KeyColor::Gold => Color::Yellow,
    }
}

fn draw_entity<W: Write>(
    out: &mut W,
    camera: &Camera,
    entity: &Entity,
    clock_ms: u64,
) -> std::io::Result<()> {
    let body = &entity.body;
    match entity.kind {
        EntityKind::Platform(PlatformImage::Ground) => fill(out, camera, body, C_GROUND, "▓"),
        EntityKind::Platform(_) => fill(out, camera, body, C_GRASS, "▀"),
        EntityKind::Tile(TileKind::Brick) => fill(out, camera, body, C_BRICK, "▒"),
        EntityKind::Tile(TileKind::Grass { .. }) => fill(out, camera, body, C_GRASS, "▓"),
        EntityKind::EnemyWall => Ok(()),
        EntityKind::Decoration { .. } => mark(out, camera, body, C_DECOR, "\""),
        EntityKind::Coin => mark(out, camera, body, C_COIN, "o"),
        EntityKind::ItemBox(ItemBoxState::Active) => mark(out, camera, body, C_BOX, "?"),
        EntityKind::ItemBox(ItemBoxState::Used) => mark(out, camera, body, C_EMPTY, "■"),
        EntityKind::CoinBox(CoinBoxState::Active) => mark(out, camera, body, C_BOX, "$"),
        EntityKind::CoinBox(CoinBoxState::PayingOut) => mark(out, camera, body, C_COIN, "¤"),
        EntityKind::CoinBox(CoinBoxState::Spent) => mark(out, camera, body, C_EMPTY, "■"),
        EntityKind::Spring(SpringState::Idle) => mark(out, camera, body, C_SPRING, "z"),
        EntityKind::Spring(SpringState::Boosting) => mark(out, camera, body, C_SPRING, "^"),
        EntityKind::Star => mark(out, camera, body, C_STAR, "*"),
        EntityKind::LifePickup(_) => mark(out, camera, body, C_LIFE, "♥"),
        EntityKind::Key(color, _) => mark(out, camera, body, key_color(color), "⚷"),
        EntityKind::Door { open: false } => mark(out, camera, body, C_DOOR, "▯"),
        EntityKind::Door { open: true } => mark(out, camera, body, C_DOOR, "▮"),
        EntityKind::Spider(state) if state.alive => mark(out, camera, body, C_SPIDER, "ж"),
        EntityKind::Spider(_) => mark(out, camera, body, C_EMPTY, "x"),
        EntityKind::ScoreText(text) => {
            let (rise, alpha) = score_text_fade(&text, clock_ms);
            if alpha < 0.1 {
                return Ok(());
            }
            let color = if alpha < 0.5 { C_EMPTY } else { C_SCORE };
            match camera.cell(body.x, body.y - rise) {
                Some(at) => put(out, at, color, &format!("+{}", text.value)),
                None => Ok(()),
            }
        }
    }
}

fn draw_hero<W: Write>(out: &mut W, camera: &Camera, session: &GameSession) -> std::io::Result<()> {
    let hero = &session.world.hero;
    let glyph = match hero.pose() {
        HeroPose::Dead => return Ok(()),
        HeroPose::Dying => "%",
        HeroPose::Jumping | HeroPose::Falling => "Å",
        HeroPose::Running => match hero.facing {
            Facing::Left => "◄",
            Facing::Right => "►",
        },
        HeroPose::Standing | HeroPose::Frozen => "@",
    };
    if hero.alpha < 0.1 {
        return Ok(());
    }
    let color = match hero.tint {
        Some(rgb) => Color::Rgb {
            r: (rgb >> 16) as u8,
            g: (rgb >> 8) as u8,
            b: rgb as u8,
        },
        None if hero.alpha < 0.5 => C_EMPTY,
        None => C_HERO,
    };
    mark(out, camera, &hero.body, color, glyph)
}

// ── HUD (row 0) ───────────────────────────────────────────────────────────────

fn draw_hud<W: Write>(out: &mut W, session: &GameSession, width: u16) -> std::io::Result<()> {
    let progression = &session.progression;

    // Keys, coins and lives: left
    out.queue(cursor::MoveTo(1, 0))?;
    for color in KeyColor::ALL {
        let held = progression.keys.has(color);
        out.queue(style::SetForegroundColor(if held {
            key_color(color)
        } else {
            C_EMPTY
        }))?;
        out.queue(Print("⚷"))?;
    }
    out.queue(style::SetForegroundColor(C_COIN))?;
    out.queue(Print(format!("  o x{:02}", progression.coins)))?;
    out.queue(style::SetForegroundColor(C_HUD))?;
    out.queue(Print(format!("  @ x{}  ", progression.lives)))?;

    for pip in hearts(session.world.hero.health) {
        let (color, glyph) = match pip {
            HeartPip::Full => (C_HEART, "♥"),
            HeartPip::Half => (C_HEART_HALF, "♥"),
            HeartPip::Empty => (C_EMPTY, "♡"),
        };
        out.queue(style::SetForegroundColor(color))?;
        out.queue(Print(glyph))?;
    }

    // Level: centre
    let level_str = format!("[ LEVEL {} ]", session.world.index + 1);
    let lx = (width / 2).saturating_sub(level_str.len() as u16 / 2);
    out.queue(cursor::MoveTo(lx, 0))?;
    out.queue(style::SetForegroundColor(C_HUD))?;
    out.queue(Print(&level_str))?;

    // Score and best: right
    let right_str = format!(
        "Hi:{:09}  {}",
        session.high_score.min(999_999_999),
        progression.score_display()
    );
    let rx = width.saturating_sub(right_str.chars().count() as u16 + 1);
    out.queue(cursor::MoveTo(rx, 0))?;
    out.queue(style::SetForegroundColor(C_SCORE))?;
    out.queue(Print(&right_str))?;

    Ok(())
}

fn draw_notice<W: Write>(
    out: &mut W,
    session: &GameSession,
    width: u16,
    height: u16,
) -> std::io::Result<()> {
    let Some(notice) = session.notice else {
        return Ok(());
    };
    let (text, color) = match notice.kind {
        NoticeKind::LevelStart(index) => (format!("══ LEVEL {} ══", index + 1), Color::Cyan),
        NoticeKind::GameOver => ("══ GAME  OVER ══".to_string(), Color::Red),
        NoticeKind::ExtraLife => ("1 UP!".to_string(), Color::Green),
    };
    let col = (width / 2).saturating_sub(text.chars().count() as u16 / 2);
    out.queue(cursor::MoveTo(col, height / 3))?;
    out.queue(style::SetForegroundColor(color))?;
    out.queue(Print(&text))?;
    Ok(())
}

// ── Controls hint (last row) ──────────────────────────────────────────────────

fn draw_controls_hint<W: Write>(out: &mut W, height: u16) -> std::io::Result<()> {
    out.queue(cursor::MoveTo(1, height.saturating_sub(1)))?;
    out.queue(style::SetForegroundColor(C_HINT))?;
    out.queue(Print(
        "← → / A D : Move   ↑ / W : Jump   X / SHIFT : Run   Q : Quit",
    ))?;
    Ok(())
}
