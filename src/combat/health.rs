//! Hit-point state for enemies and the player base.
//!
//! The death transition fires only when health crosses from a positive value
//! to zero, so it happens at most once per activation. Listeners registered
//! for that transition are one-shot: they are handed back to the caller when
//! death fires and are gone afterwards.

use serde::{Deserialize, Serialize};

use crate::constants::CRITICAL_HEALTH_FRACTION;

/// Who wants to hear about a death.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeathListener {
    /// Count the death down in the running wave
    WaveReport,
    /// The player base fell
    GameOver,
}

/// Fired exactly once on the >0 to 0 transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Death {
    pub listeners: Vec<DeathListener>,
}

/// Result of [`HealthState::take_damage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Non-positive amount, nothing happened
    Rejected,
    /// Target was already dead; no new death
    AlreadyDead,
    Damaged { dealt: i32, remaining: i32 },
    Killed { dealt: i32, death: Death },
}

impl DamageOutcome {
    pub fn is_dead(&self) -> bool {
        matches!(self, Self::AlreadyDead | Self::Killed { .. })
    }

    /// The death fired by this hit, if any.
    pub fn into_death(self) -> Option<Death> {
        match self {
            Self::Killed { death, .. } => Some(death),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthState {
    current: i32,
    max: i32,
    listeners: Vec<DeathListener>,
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new(100)
    }
}

impl HealthState {
    pub fn new(max: i32) -> Self {
        let max = max.max(1);
        Self {
            current: max,
            max,
            listeners: Vec::new(),
        }
    }

    pub fn current(&self) -> i32 {
        self.current
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    pub fn is_dead(&self) -> bool {
        self.current <= 0
    }

    pub fn percentage(&self) -> f32 {
        self.current as f32 / self.max as f32
    }

    pub fn is_critical(&self) -> bool {
        !self.is_dead() && self.percentage() < CRITICAL_HEALTH_FRACTION
    }

    /// Register a one-shot death listener. Returns false if it is already registered.
    pub fn subscribe_death(&mut self, listener: DeathListener) -> bool {
        if self.listeners.contains(&listener) {
            return false;
        }
        self.listeners.push(listener);
        true
    }

    pub fn has_listener(&self, listener: DeathListener) -> bool {
        self.listeners.contains(&listener)
    }

    /// Clamp to at least 1 and pull current health down if it now exceeds max.
    pub fn set_max(&mut self, value: i32) {
        self.max = value.max(1);
        if self.current > self.max {
            self.current = self.max;
        }
    }

    pub fn take_damage(&mut self, amount: i32) -> DamageOutcome {
        if amount <= 0 {
            return DamageOutcome::Rejected;
        }
        if self.is_dead() {
            return DamageOutcome::AlreadyDead;
        }

        let before = self.current;
        let death = self.assign(before - amount);
        let dealt = before - self.current;
        match death {
            Some(death) => DamageOutcome::Killed { dealt, death },
            None => DamageOutcome::Damaged {
                dealt,
                remaining: self.current,
            },
        }
    }

    /// Returns the amount actually restored.
    pub fn heal(&mut self, amount: i32) -> i32 {
        if amount <= 0 || self.is_dead() {
            return 0;
        }
        let before = self.current;
        self.current = (self.current.saturating_add(amount)).min(self.max);
        self.current - before
    }

    pub fn heal_to_full(&mut self) -> i32 {
        self.heal(self.max - self.current)
    }

    /// Raise max health and move the current fraction `heal_pct` of the way to full.
    pub fn increase_max_health(&mut self, additional: i32, heal_pct: f32) {
        if additional <= 0 {
            return;
        }
        let fraction = self.percentage();
        self.max += additional;
        let target = fraction + (1.0 - fraction) * heal_pct.clamp(0.0, 1.0);
        self.current = ((self.max as f32 * target).round_ties_even() as i32).clamp(0, self.max);
    }

    /// Direct assignment for (re)initialization. Still clamps and still
    /// evaluates the death transition.
    pub fn set_health(&mut self, value: i32) -> Option<Death> {
        self.assign(value)
    }

    pub fn kill(&mut self) -> Option<Death> {
        if self.is_dead() {
            return None;
        }
        self.assign(0)
    }

    /// Back to full health for a new activation. Listeners from the previous
    /// life are dropped.
    pub fn reset(&mut self) {
        self.listeners.clear();
        self.current = self.max;
    }

    fn assign(&mut self, value: i32) -> Option<Death> {
        let before = self.current;
        self.current = value.clamp(0, self.max);
        if before > 0 && self.current == 0 {
            Some(Death {
                listeners: std::mem::take(&mut self.listeners),
            })
        } else {
            None
        }
    }
}
