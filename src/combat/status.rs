//! Timed modifiers on a single entity: burn, slow and stun.
//!
//! All three run independently and concurrently. Each is a countdown advanced
//! once per tick by [`StatusEffectState::tick`]; nothing is scheduled outside
//! the tick loop.
//!
//! Stacking rules:
//! - Burn: stackable applications add dps, others replace it; remaining time
//!   is always the larger of old and new
//! - Slow: last writer wins unless stackable, in which case the speed
//!   reductions add up and remaining time takes the max
//! - Stun: a refreshable application extends to the longer timer, a
//!   non-refreshable one restarts it

use serde::{Deserialize, Serialize};

/// Smallest burn tick interval accepted.
const MIN_TICK_RATE: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BurnState {
    /// Combined damage per second of all stacks
    pub dps: i32,
    pub remaining: f32,
    pub tick_rate: f32,
    pub accumulator: f32,
    pub stacks: u32,
}

impl BurnState {
    pub fn damage_per_tick(&self) -> i32 {
        (self.dps as f32 * self.tick_rate).round_ties_even() as i32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlowState {
    /// Speed multiplier in [0, 1]
    pub multiplier: f32,
    pub remaining: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StunState {
    pub remaining: f32,
    pub refreshable: bool,
}

/// What one tick of status processing produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusTick {
    pub burn_damage: i32,
    pub burn_expired: bool,
    pub slow_expired: bool,
    pub stun_expired: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusEffectState {
    burn: Option<BurnState>,
    slow: Option<SlowState>,
    stun: Option<StunState>,
}

impl StatusEffectState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn burn(&self) -> Option<&BurnState> {
        self.burn.as_ref()
    }

    pub fn slow(&self) -> Option<&SlowState> {
        self.slow.as_ref()
    }

    pub fn stun(&self) -> Option<&StunState> {
        self.stun.as_ref()
    }

    pub fn is_burning(&self) -> bool {
        self.burn.is_some()
    }

    pub fn is_slowed(&self) -> bool {
        self.slow.is_some()
    }

    pub fn is_stunned(&self) -> bool {
        self.stun.is_some()
    }

    /// Current speed multiplier. Derived fresh each call, never cached.
    pub fn speed_multiplier(&self) -> f32 {
        self.slow.map_or(1.0, |s| s.multiplier)
    }

    /// Returns false when the application is ignored.
    pub fn apply_burn(&mut self, dps: i32, duration: f32, tick_rate: f32, stackable: bool) -> bool {
        if dps <= 0 || duration <= 0.0 {
            return false;
        }
        let tick_rate = tick_rate.max(MIN_TICK_RATE);

        match &mut self.burn {
            Some(burn) => {
                if stackable {
                    burn.dps += dps;
                    burn.stacks += 1;
                } else {
                    burn.dps = dps;
                    burn.stacks = 1;
                }
                burn.remaining = burn.remaining.max(duration);
                burn.tick_rate = tick_rate;
            }
            None => {
                self.burn = Some(BurnState {
                    dps,
                    remaining: duration,
                    tick_rate,
                    accumulator: 0.0,
                    stacks: 1,
                });
            }
        }
        true
    }

    pub fn apply_slow(&mut self, multiplier: f32, duration: f32, stackable: bool) -> bool {
        if duration <= 0.0 {
            return false;
        }
        let multiplier = multiplier.clamp(0.0, 1.0);

        match &mut self.slow {
            Some(slow) if stackable => {
                let reduction = (1.0 - slow.multiplier) + (1.0 - multiplier);
                slow.multiplier = (1.0 - reduction).clamp(0.0, 1.0);
                slow.remaining = slow.remaining.max(duration);
            }
            _ => {
                self.slow = Some(SlowState {
                    multiplier,
                    remaining: duration,
                });
            }
        }
        true
    }

    pub fn apply_stun(&mut self, duration: f32, refreshable: bool) -> bool {
        if duration <= 0.0 {
            return false;
        }

        match &mut self.stun {
            Some(stun) => {
                stun.remaining = if refreshable {
                    stun.remaining.max(duration)
                } else {
                    duration
                };
                stun.refreshable = refreshable;
            }
            None => {
                self.stun = Some(StunState {
                    remaining: duration,
                    refreshable,
                });
            }
        }
        true
    }

    /// Advance every countdown by `dt` and collect burn damage due this tick.
    /// A burn that runs out this tick expires without a final tick.
    pub fn tick(&mut self, dt: f32) -> StatusTick {
        let mut out = StatusTick::default();

        if let Some(burn) = &mut self.burn {
            burn.remaining -= dt;
            if burn.remaining <= 0.0 {
                self.burn = None;
                out.burn_expired = true;
            } else {
                burn.accumulator += dt;
                if burn.accumulator >= burn.tick_rate {
                    let ticks = (burn.accumulator / burn.tick_rate).floor();
                    burn.accumulator -= ticks * burn.tick_rate;
                    out.burn_damage = ticks as i32 * burn.damage_per_tick();
                }
            }
        }

        if let Some(slow) = &mut self.slow {
            slow.remaining -= dt;
            if slow.remaining <= 0.0 {
                self.slow = None;
                out.slow_expired = true;
            }
        }

        if let Some(stun) = &mut self.stun {
            stun.remaining -= dt;
            if stun.remaining <= 0.0 {
                self.stun = None;
                out.stun_expired = true;
            }
        }

        out
    }

    pub fn clear(&mut self) {
        self.burn = None;
        self.slow = None;
        self.stun = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burn_ticks_on_interval() {
        let mut status = StatusEffectState::new();
        assert!(status.apply_burn(10, 2.0, 0.5, false));

        let mut total = 0;
        let mut ticks_with_damage = 0;
        for _ in 0..8 {
            let tick = status.tick(0.25);
            if tick.burn_damage > 0 {
                ticks_with_damage += 1;
                assert_eq!(tick.burn_damage, 5);
            }
            total += tick.burn_damage;
        }
        // 0.5, 1.0, 1.5 tick; 2.0 expires first
        assert_eq!(ticks_with_damage, 3);
        assert_eq!(total, 15);
        assert!(!status.is_burning());
    }

    #[test]
    fn test_stackable_burn_sums_dps() {
        let mut status = StatusEffectState::new();
        status.apply_burn(10, 2.0, 0.5, true);
        status.tick(0.25);
        status.apply_burn(10, 3.0, 0.5, true);

        let burn = status.burn().unwrap();
        assert_eq!(burn.dps, 20);
        assert_eq!(burn.stacks, 2);
        assert!((burn.remaining - 3.0).abs() < 0.001);
        assert_eq!(burn.damage_per_tick(), 10);

        let mut total = 0;
        let mut elapsed: f32 = 0.25;
        while status.is_burning() {
            total += status.tick(0.25).burn_damage;
            elapsed += 0.25;
        }
        // expires with the longer duration, 3.25s after the first application
        assert!((elapsed - 3.25).abs() < 0.001);
        assert_eq!(total, 60);
    }

    #[test]
    fn test_non_stackable_burn_replaces_dps() {
        let mut status = StatusEffectState::new();
        status.apply_burn(10, 1.0, 0.5, false);
        status.apply_burn(4, 3.0, 0.5, false);
        let burn = status.burn().unwrap();
        assert_eq!(burn.dps, 4);
        assert_eq!(burn.stacks, 1);
        assert!((burn.remaining - 3.0).abs() < 0.001);
    }

    #[test]
    fn test_invalid_burn_ignored() {
        let mut status = StatusEffectState::new();
        assert!(!status.apply_burn(0, 2.0, 0.5, true));
        assert!(!status.apply_burn(5, 0.0, 0.5, true));
        assert!(!status.is_burning());
    }

    #[test]
    fn test_slow_last_writer_wins() {
        let mut status = StatusEffectState::new();
        status.apply_slow(0.5, 2.0, false);
        status.apply_slow(0.8, 0.5, false);
        let slow = status.slow().unwrap();
        assert!((slow.multiplier - 0.8).abs() < 0.001);
        assert!((slow.remaining - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_stackable_slow_accumulates() {
        let mut status = StatusEffectState::new();
        status.apply_slow(0.8, 1.0, true);
        status.apply_slow(0.7, 2.0, true);
        assert!((status.speed_multiplier() - 0.5).abs() < 0.001);
        assert!((status.slow().unwrap().remaining - 2.0).abs() < 0.001);

        status.apply_slow(0.1, 0.5, true);
        assert_eq!(status.speed_multiplier(), 0.0);
    }

    #[test]
    fn test_slow_expiry_restores_multiplier() {
        let mut status = StatusEffectState::new();
        status.apply_slow(0.5, 1.0, false);
        assert!((status.speed_multiplier() - 0.5).abs() < 0.001);
        let tick = status.tick(1.0);
        assert!(tick.slow_expired);
        assert_eq!(status.speed_multiplier(), 1.0);
    }

    #[test]
    fn test_refreshable_stun_extends() {
        let mut status = StatusEffectState::new();
        status.apply_stun(2.0, true);
        status.tick(0.5);
        status.apply_stun(1.0, true);
        assert!((status.stun().unwrap().remaining - 1.5).abs() < 0.001);
        status.apply_stun(3.0, true);
        assert!((status.stun().unwrap().remaining - 3.0).abs() < 0.001);
    }

    #[test]
    fn test_non_refreshable_stun_restarts() {
        let mut status = StatusEffectState::new();
        status.apply_stun(2.0, false);
        status.tick(0.5);
        status.apply_stun(1.0, false);
        assert!((status.stun().unwrap().remaining - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_stun_expires() {
        let mut status = StatusEffectState::new();
        status.apply_stun(0.5, true);
        assert!(status.is_stunned());
        assert!(!status.tick(0.25).stun_expired);
        assert!(status.tick(0.25).stun_expired);
        assert!(!status.is_stunned());
    }

    #[test]
    fn test_clear_removes_everything() {
        let mut status = StatusEffectState::new();
        status.apply_burn(5, 3.0, 0.5, true);
        status.apply_slow(0.5, 2.0, false);
        status.apply_stun(1.0, true);
        status.clear();
        assert_eq!(status, StatusEffectState::default());
        assert_eq!(status.speed_multiplier(), 1.0);
    }
}
