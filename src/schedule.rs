//! Deferred effects: animation completions and timers, replayed on the
//! simulation tick instead of through callbacks.
//!
//! Each pending effect carries the time it becomes due and, optionally, the
//! entity that owns it. Removing an entity cancels everything it owns.

use crate::entities::EntityId;

/// A delayed piece of game logic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Deferred {
    /// The hero's injury animation ended.
    HeroRecover,
    /// The hero's death animation ended; the level must be reloaded.
    HeroRemoved { restart_level: usize, game_over: bool },
    RemoveEntity(EntityId),
    /// Pay one coin from a coin box, `remaining` coins still to go.
    CoinBoxPayout { box_id: EntityId, remaining: u32 },
    /// Next step of the star colour cycle.
    StarTint { remaining: u32 },
    /// A spring's boost animation ended.
    SpringRest(EntityId),
    FadeScoreText(EntityId),
    /// The door-enter walk finished.
    EnterNextLevel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Scheduled {
    pub due_ms: u64,
    seq: u64,
    pub owner: Option<EntityId>,
    pub effect: Deferred,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Scheduler {
    now_ms: u64,
    seq: u64,
    pending: Vec<Scheduled>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Milliseconds elapsed since the scheduler was created.
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Queue `effect` to fire `delay_ms` from now.
    pub fn after(&mut self, delay_ms: u64, owner: Option<EntityId>, effect: Deferred) {
        self.seq += 1;
        self.pending.push(Scheduled {
            due_ms: self.now_ms + delay_ms,
            seq: self.seq,
            owner,
            effect,
        });
    }

    /// Move the clock forward and hand back every effect that became due,
    /// oldest first; effects due at the same time keep insertion order.
    pub fn advance(&mut self, dt_ms: u64) -> Vec<Deferred> {
        self.now_ms += dt_ms;
        let now = self.now_ms;
        let (mut due, rest): (Vec<Scheduled>, Vec<Scheduled>) =
            self.pending.drain(..).partition(|s| s.due_ms <= now);
        self.pending = rest;
        due.sort_by_key(|s| (s.due_ms, s.seq));
        due.into_iter().map(|s| s.effect).collect()
    }

    /// Drop every pending effect owned by `id`.
    pub fn cancel_owner(&mut self, id: EntityId) {
        self.pending.retain(|s| s.owner != Some(id));
    }

    /// Drop every pending effect matching `pred`.
    pub fn cancel_where(&mut self, pred: impl Fn(&Deferred) -> bool) {
        self.pending.retain(|s| !pred(&s.effect));
    }

    pub fn pending(&self) -> impl Iterator<Item = &Scheduled> {
        self.pending.iter()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
