//! Session counters: lives, coins, score and the keys held in this level.
//!
//! Lives, coins and score outlive level restarts; keys do not. A full game
//! over puts everything back to the starting values.

use crate::entities::KeyColor;

// ── Tuning ────────────────────────────────────────────────────────────────────

pub const STARTING_LIVES: u32 = 3;
/// Collecting this many coins trades them for one extra life.
pub const COINS_PER_LIFE: u32 = 100;
/// The score display never shows more than nine digits.
pub const SCORE_DISPLAY_MAX: u64 = 999_999_999;

pub const COIN_SCORE: u64 = 100;
pub const BOX_COIN_SCORE: u64 = 1000;
pub const LIFE_SCORE: u64 = 1000;
pub const STAR_SCORE: u64 = 1000;

// ── Keys ──────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyRing {
    pub copper: bool,
    pub silver: bool,
    pub gold: bool,
}

impl KeyRing {
    pub fn has(&self, color: KeyColor) -> bool {
        match color {
            KeyColor::Copper => self.copper,
            KeyColor::Silver => self.silver,
            KeyColor::Gold => self.gold,
        }
    }

    pub fn grant(&mut self, color: KeyColor) {
        match color {
            KeyColor::Copper => self.copper = true,
            KeyColor::Silver => self.silver = true,
            KeyColor::Gold => self.gold = true,
        }
    }

    /// The door only opens once this holds.
    pub fn all(&self) -> bool {
        self.copper && self.silver && self.gold
    }
}

// ── Progression ───────────────────────────────────────────────────────────────

/// What losing a life led to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifeOutcome {
    /// Lives remain; replay the same level.
    Retry,
    /// Last life gone; counters were reset and play restarts at level 0.
    GameOver,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progression {
    pub lives: u32,
    pub coins: u32,
    pub score: u64,
    pub keys: KeyRing,
}

impl Default for Progression {
    fn default() -> Self {
        Progression {
            lives: STARTING_LIVES,
            coins: 0,
            score: 0,
            keys: KeyRing::default(),
        }
    }
}

impl Progression {
    pub fn add_score(&mut self, points: u64) {
        self.score = self.score.saturating_add(points);
    }

    pub fn collect_coin(&mut self) {
        self.coins += 1;
        self.add_score(COIN_SCORE);
    }

    /// A coin paid out by a coin box is worth more than a loose one.
    pub fn collect_box_coin(&mut self) {
        self.coins += 1;
        self.add_score(BOX_COIN_SCORE);
    }

    pub fn collect_life(&mut self) {
        self.lives += 1;
        self.add_score(LIFE_SCORE);
    }

    /// Trade a full purse for a life. Returns whether a trade happened.
    pub fn convert_coins(&mut self) -> bool {
        if self.coins >= COINS_PER_LIFE {
            self.lives += 1;
            self.coins = 0;
            true
        } else {
            false
        }
    }

    pub fn lose_life(&mut self) -> LifeOutcome {
        self.lives = self.lives.saturating_sub(1);
        if self.lives > 0 {
            LifeOutcome::Retry
        } else {
            *self = Progression::default();
            LifeOutcome::GameOver
        }
    }

    /// Keys belong to a single level attempt.
    pub fn reset_for_level(&mut self) {
        self.keys = KeyRing::default();
    }

    /// Zero-padded nine-digit score, saturating at the maximum.
    pub fn score_display(&self) -> String {
        format!("{:09}", self.score.min(SCORE_DISPLAY_MAX))
    }
}

// ── Hearts ────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeartPip {
    Full,
    Half,
    Empty,
}

/// Three-heart display for a health value of 0..=6. The rightmost heart
/// drains first.
pub fn hearts(health: u8) -> [HeartPip; 3] {
    use HeartPip::{Empty, Full, Half};
    match health {
        6.. => [Full, Full, Full],
        5 => [Full, Full, Half],
        4 => [Full, Full, Empty],
        3 => [Full, Half, Empty],
        2 => [Full, Empty, Empty],
        1 => [Half, Empty, Empty],
        0 => [Empty, Empty, Empty],
    }
}
