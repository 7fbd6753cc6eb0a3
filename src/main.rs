mod display;

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{stdout, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::{
    cursor,
    event::{
        self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    style::{self, Color, Print},
    terminal, ExecutableCommand, QueueableCommand,
};
use rand::thread_rng;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use platform_game::compute::{new_session, tick};
use platform_game::config::{ConfigError, GameConfig};
use platform_game::entities::{FrameInput, GameEvent, GameSession};
use platform_game::level::LevelCatalog;

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("terminal error: {0}")]
    Terminal(#[from] std::io::Error),
}

// ── Held keys ─────────────────────────────────────────────────────────────────

/// A key counts as held if its last press/repeat event arrived within this
/// window. Covers terminals that don't emit key-release events: the OS
/// key-repeat rate is ≥ 15 Hz, so the window is refreshed before it expires
/// whatever the tick rate.
const HOLD_WINDOW: Duration = Duration::from_millis(133);

/// Last sighting of every key, in wall-clock time.
#[derive(Default)]
struct HeldKeys {
    seen: HashMap<KeyCode, Instant>,
    shift_seen: Option<Instant>,
    jump_since: Option<Instant>,
}

impl HeldKeys {
    fn press(&mut self, code: KeyCode, modifiers: KeyModifiers, at: Instant) {
        self.seen.insert(code, at);
        if modifiers.contains(KeyModifiers::SHIFT) {
            self.shift_seen = Some(at);
        }
    }

    fn release(&mut self, code: KeyCode) {
        self.seen.remove(&code);
    }

    fn is_held(&self, key: &KeyCode, now: Instant) -> bool {
        self.seen
            .get(key)
            .is_some_and(|&last| now.saturating_duration_since(last) <= HOLD_WINDOW)
    }

    fn any_held(&self, keys: &[KeyCode], now: Instant) -> bool {
        keys.iter().any(|key| self.is_held(key, now))
    }

    /// Fold the keys held at `now` into one frame's input. The jump hold
    /// time runs from the first frame the jump key was seen held.
    fn input(&mut self, now: Instant) -> FrameInput {
        let jump = self.any_held(&JUMP_KEYS, now);
        self.jump_since = match (jump, self.jump_since) {
            (true, Some(since)) => Some(since),
            (true, None) => Some(now),
            (false, _) => None,
        };
        let shift = self
            .shift_seen
            .is_some_and(|at| now.saturating_duration_since(at) <= HOLD_WINDOW);
        FrameInput {
            left: self.any_held(&LEFT_KEYS, now),
            right: self.any_held(&RIGHT_KEYS, now),
            jump,
            jump_held_ms: self.jump_since.map_or(0, |since| {
                now.saturating_duration_since(since).as_millis() as u64
            }),
            speed: shift || self.any_held(&SPEED_KEYS, now),
            wall_jump: self.any_held(&WALL_JUMP_KEYS, now),
        }
    }
}

const LEFT_KEYS: [KeyCode; 3] = [KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const RIGHT_KEYS: [KeyCode; 3] = [KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const JUMP_KEYS: [KeyCode; 3] = [KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const SPEED_KEYS: [KeyCode; 2] = [KeyCode::Char('x'), KeyCode::Char('X')];
const WALL_JUMP_KEYS: [KeyCode; 1] = [KeyCode::Char(' ')];

// ── Files in $HOME ────────────────────────────────────────────────────────────

fn home_file(name: &str) -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(name)
}

fn load_high_score() -> u64 {
    std::fs::read_to_string(home_file(".platform_game_score"))
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0)
}

fn save_high_score(score: u64) {
    let path = home_file(".platform_game_score");
    if let Err(err) = std::fs::write(&path, score.to_string()) {
        warn!(path = %path.display(), error = %err, "high_score_not_saved");
    }
}

/// The terminal belongs to the game screen, so logs go to a file.
fn init_tracing(config: &GameConfig) -> Result<(), AppError> {
    let path = config
        .log_file
        .clone()
        .unwrap_or_else(|| home_file(".platform_game.log"));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|source| AppError::LogFile { path, source })?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .compact()
        .init();
    Ok(())
}

fn frame_duration(tick_rate_hz: u32) -> Duration {
    Duration::from_secs_f64(1.0 / f64::from(tick_rate_hz.max(1)))
}

// ── Menu ──────────────────────────────────────────────────────────────────────

enum MenuResult {
    Start,
    Quit,
}

fn show_menu<W: Write>(
    out: &mut W,
    rx: &mpsc::Receiver<Event>,
    high_score: u64,
    levels: usize,
) -> std::io::Result<MenuResult> {
    out.queue(terminal::Clear(terminal::ClearType::All))?;

    let (width, height) = terminal::size()?;
    let cx = width / 2;
    let cy = height / 2;

    let title = "▲  PLATFORM  GAME  ▲";
    out.queue(cursor::MoveTo(
        cx.saturating_sub(title.chars().count() as u16 / 2),
        cy.saturating_sub(6),
    ))?;
    out.queue(style::SetForegroundColor(Color::Cyan))?;
    out.queue(Print(title))?;

    if high_score > 0 {
        let hs_str = format!("Best Score: {:09}", high_score);
        out.queue(cursor::MoveTo(
            cx.saturating_sub(hs_str.chars().count() as u16 / 2),
            cy.saturating_sub(5),
        ))?;
        out.queue(style::SetForegroundColor(Color::Yellow))?;
        out.queue(Print(&hs_str))?;
    }

    let options: &[(&str, &str, Color)] = &[
        ("ENTER", "Start", Color::Green),
        ("Q", "Quit", Color::Red),
    ];
    for (i, (key, label, color)) in options.iter().enumerate() {
        let row = cy.saturating_sub(2) + i as u16;
        out.queue(cursor::MoveTo(cx.saturating_sub(10), row))?;
        out.queue(style::SetForegroundColor(Color::DarkGrey))?;
        out.queue(Print(format!("[{:^5}] ", key)))?;
        out.queue(style::SetForegroundColor(*color))?;
        out.queue(Print(*label))?;
    }

    out.queue(cursor::MoveTo(cx.saturating_sub(10), cy + 1))?;
    out.queue(style::SetForegroundColor(Color::DarkGrey))?;
    out.queue(Print(format!(
        "Collect all three keys, then reach the door. {levels} levels."
    )))?;

    let legend: &[(&str, Color, &str)] = &[
        ("o", Color::Yellow, " coin: 100 make a life"),
        ("⚷", Color::Yellow, " key: copper, silver, gold"),
        ("ж", Color::Red, " spider: land on it"),
        ("?", Color::Yellow, " item box"),
        ("$", Color::Yellow, " coin box"),
    ];
    for (i, (sym, color, desc)) in legend.iter().enumerate() {
        let row = cy + 3 + i as u16;
        out.queue(cursor::MoveTo(cx.saturating_sub(10), row))?;
        out.queue(style::SetForegroundColor(*color))?;
        out.queue(Print(sym))?;
        out.queue(style::SetForegroundColor(Color::DarkGrey))?;
        out.queue(Print(*desc))?;
    }

    out.queue(style::ResetColor)?;
    out.flush()?;

    // Block until the user makes a choice
    loop {
        match rx.recv() {
            Ok(Event::Key(KeyEvent {
                code,
                kind: KeyEventKind::Press,
                ..
            })) => match code {
                KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Char('1') => {
                    return Ok(MenuResult::Start)
                }
                KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                    return Ok(MenuResult::Quit);
                }
                _ => {}
            },
            Ok(_) => {}
            Err(_) => return Ok(MenuResult::Quit),
        }
    }
}

// ── Game loop ─────────────────────────────────────────────────────────────────

/// Returns `true` → quit program, `false` → back to menu.
///
/// Input model: `HeldKeys` records when each key was last pressed or
/// repeated. Each frame the fresh keys are folded into one `FrameInput`,
/// so running and jumping can be held together.
fn game_loop<W: Write>(
    out: &mut W,
    session: &mut GameSession,
    rx: &mpsc::Receiver<Event>,
) -> std::io::Result<bool> {
    let mut rng = thread_rng();
    let frame_len = frame_duration(session.tick_rate_hz);
    let mut held = HeldKeys::default();

    loop {
        let frame_start = Instant::now();

        // ── Drain all pending input events (non-blocking) ─────────────────────
        while let Ok(ev) = rx.try_recv() {
            let Event::Key(KeyEvent {
                code,
                kind,
                modifiers,
                ..
            }) = ev
            else {
                continue;
            };
            match kind {
                KeyEventKind::Press | KeyEventKind::Repeat => {
                    held.press(code, modifiers, frame_start);
                    match code {
                        KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(true),
                        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                            return Ok(true);
                        }
                        KeyCode::Esc => return Ok(false),
                        _ => {}
                    }
                }
                KeyEventKind::Release => held.release(code),
            }
        }

        let input = held.input(frame_start);
        *session = tick(session, &input, &mut rng);
        for event in &session.events {
            match event {
                GameEvent::GameOver => info!(high_score = session.high_score, "game_over"),
                _ => debug!(?event, "game_event"),
            }
        }

        display::render(out, session)?;

        let elapsed = frame_start.elapsed();
        if elapsed < frame_len {
            std::thread::sleep(frame_len - elapsed);
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let config = match GameConfig::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("platform_game: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = init_tracing(&config) {
        eprintln!("platform_game: {err}");
        return ExitCode::FAILURE;
    }
    let catalog = match config.catalog() {
        Ok(catalog) => Arc::new(catalog),
        Err(err) => {
            error!(error = %err, "startup_failed");
            eprintln!("platform_game: {err}");
            return ExitCode::FAILURE;
        }
    };
    info!(
        levels = catalog.len(),
        tick_rate_hz = config.tick_rate_hz,
        start_level = config.start_level,
        "startup"
    );

    match run_terminal(&config, catalog) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "terminal_failed");
            eprintln!("platform_game: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_terminal(config: &GameConfig, catalog: Arc<LevelCatalog>) -> Result<(), AppError> {
    let raw_out = stdout();
    let mut out = BufWriter::new(raw_out);

    terminal::enable_raw_mode()?;
    out.execute(terminal::EnterAlternateScreen)?;
    out.execute(cursor::Hide)?;

    // Request key-release (and key-repeat) events from the terminal.
    // Kitty-protocol terminals support this; others fall back gracefully.
    let keyboard_enhanced = out
        .execute(PushKeyboardEnhancementFlags(
            KeyboardEnhancementFlags::REPORT_EVENT_TYPES,
        ))
        .is_ok();

    // Dedicate a thread exclusively to blocking event reads, sending them
    // through a channel so the game loop never has to block on I/O.
    let (tx, rx) = mpsc::channel::<Event>();
    thread::spawn(move || {
        while let Ok(ev) = event::read() {
            if tx.send(ev).is_err() {
                break; // game loop has exited
            }
        }
    });

    let result = run(&mut out, &rx, config, catalog);

    // Always restore the terminal
    if keyboard_enhanced {
        let _ = out.execute(PopKeyboardEnhancementFlags);
    }
    let _ = out.execute(cursor::Show);
    let _ = out.execute(terminal::LeaveAlternateScreen);
    let _ = terminal::disable_raw_mode();

    result.map_err(AppError::from)
}

fn run<W: Write>(
    out: &mut W,
    rx: &mpsc::Receiver<Event>,
    config: &GameConfig,
    catalog: Arc<LevelCatalog>,
) -> std::io::Result<()> {
    let mut high_score = load_high_score();

    loop {
        match show_menu(out, rx, high_score, catalog.len())? {
            MenuResult::Quit => break,
            MenuResult::Start => {
                let mut session = new_session(
                    Arc::clone(&catalog),
                    config.start_level,
                    config.tick_rate_hz,
                    high_score,
                );
                let quit = game_loop(out, &mut session, rx)?;

                // Persist new high score if beaten
                if session.high_score > high_score {
                    high_score = session.high_score;
                    save_high_score(high_score);
                }

                if quit {
                    break;
                }
            }
        }
    }
    Ok(())
}
