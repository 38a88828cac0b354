//! Endless wave loop.
//!
//! Idle → Resting → Spawning → AwaitingClear → Resting → ...
//!
//! The scheduler never touches enemies itself. Each tick it hands back
//! [`WaveSignal`]s; the owner spawns on `Spawn`, calls
//! [`WaveScheduler::confirm_spawn`] for every enemy that actually made it onto
//! the board and [`WaveScheduler::report_enemy_death`] when one leaves it.
//! A wave completes only once the alive count is back to zero and every
//! scheduled spawn has been issued.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constants::KEY_CURRENT_WAVE;
use crate::enemy::EnemyTypeConfig;
use crate::persistence::SaveStore;

/// Progression curve for count, cadence and rest time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveCurve {
    pub base_enemy_count: f32,
    pub enemy_count_increase: f32,
    pub max_enemies_per_wave: u32,

    pub base_rest_time: f32,
    pub rest_time_decrease: f32,
    pub min_rest_time: f32,

    pub base_spawn_interval: f32,
    pub spawn_interval_decrease: f32,
    pub min_spawn_interval: f32,

    /// Rescale weights every this many waves; 0 disables
    pub waves_to_increase_difficulty: u32,
    pub weight_increase_amount: f32,
}

impl Default for WaveCurve {
    fn default() -> Self {
        Self {
            base_enemy_count: 5.0,
            enemy_count_increase: 1.2,
            max_enemies_per_wave: 50,
            base_rest_time: 5.0,
            rest_time_decrease: 0.1,
            min_rest_time: 1.0,
            base_spawn_interval: 0.8,
            spawn_interval_decrease: 0.03,
            min_spawn_interval: 0.2,
            waves_to_increase_difficulty: 5,
            weight_increase_amount: 0.1,
        }
    }
}

impl WaveCurve {
    pub fn enemy_count(&self, wave: u32) -> u32 {
        let steps = wave.saturating_sub(1) as f32;
        let count = (self.base_enemy_count + steps * self.enemy_count_increase)
            .round_ties_even()
            .max(0.0) as u32;
        count.min(self.max_enemies_per_wave)
    }

    pub fn spawn_interval(&self, wave: u32) -> f32 {
        let steps = wave.saturating_sub(1) as f32;
        (self.base_spawn_interval - steps * self.spawn_interval_decrease).max(self.min_spawn_interval)
    }

    pub fn rest_time(&self, wave: u32) -> f32 {
        let steps = wave.saturating_sub(1) as f32;
        (self.base_rest_time - steps * self.rest_time_decrease).max(self.min_rest_time)
    }

    fn rescales_at(&self, wave: u32) -> bool {
        self.waves_to_increase_difficulty > 0 && wave % self.waves_to_increase_difficulty == 0
    }

    /// Number of difficulty steps taken by the time `wave` begins.
    fn rescale_steps(&self, wave: u32) -> u32 {
        wave.checked_div(self.waves_to_increase_difficulty).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum WavePhase {
    #[default]
    Idle,
    Spawning {
        remaining: u32,
        next_spawn_in: f32,
    },
    AwaitingClear,
    Resting {
        remaining: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveSignal {
    Started { wave: u32, enemy_count: u32 },
    /// Spawn one enemy of this enemy-type table index
    Spawn { enemy_type: usize },
    Completed { wave: u32 },
}

#[derive(Debug, Clone)]
pub struct WaveScheduler {
    curve: WaveCurve,
    base_weights: Vec<f32>,
    /// Derived from `base_weights` and the current wave
    weights: Vec<f32>,
    min_waves: Vec<u32>,
    phase: WavePhase,
    wave: u32,
    alive: u32,
    spawn_interval: f32,
}

impl WaveScheduler {
    pub fn new(curve: WaveCurve, enemy_types: &[EnemyTypeConfig]) -> Self {
        let base_weights: Vec<f32> = enemy_types.iter().map(|t| t.spawn_weight.max(0.0)).collect();
        Self {
            curve,
            weights: base_weights.clone(),
            base_weights,
            min_waves: enemy_types.iter().map(|t| t.min_wave).collect(),
            phase: WavePhase::Idle,
            wave: 0,
            alive: 0,
            spawn_interval: 0.0,
        }
    }

    pub fn curve(&self) -> &WaveCurve {
        &self.curve
    }

    pub fn phase(&self) -> WavePhase {
        self.phase
    }

    pub fn current_wave(&self) -> u32 {
        self.wave
    }

    pub fn enemies_alive(&self) -> u32 {
        self.alive
    }

    pub fn is_active(&self) -> bool {
        self.phase != WavePhase::Idle
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Resume the loop so the next tick begins `from_wave`. No-op while running.
    ///
    /// The live-enemy count is kept: enemies left on the board by a `stop`
    /// still report their deaths to the resumed wave.
    pub fn start(&mut self, from_wave: u32) -> bool {
        if self.is_active() {
            debug!(wave = self.wave, "wave loop already running");
            return false;
        }
        self.wave = from_wave.max(1) - 1;
        self.phase = WavePhase::Resting { remaining: 0.0 };
        info!(from_wave = self.wave + 1, "wave loop started");
        true
    }

    /// Halt the loop, discarding pending spawns and timers.
    pub fn stop(&mut self) {
        if self.is_active() {
            info!(wave = self.wave, "wave loop stopped");
        }
        self.phase = WavePhase::Idle;
    }

    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        dt: f32,
        store: &mut dyn SaveStore,
        rng: &mut R,
    ) -> Vec<WaveSignal> {
        let mut signals = Vec::new();

        match self.phase {
            WavePhase::Idle => {}
            WavePhase::Resting { remaining } => {
                let remaining = remaining - dt;
                if remaining <= 0.0 {
                    self.begin_wave(store, &mut signals);
                    self.spawn_due(0.0, rng, &mut signals);
                } else {
                    self.phase = WavePhase::Resting { remaining };
                }
            }
            WavePhase::Spawning { .. } => self.spawn_due(dt, rng, &mut signals),
            WavePhase::AwaitingClear => {
                if self.alive == 0 {
                    info!(wave = self.wave, "wave complete");
                    signals.push(WaveSignal::Completed { wave: self.wave });
                    self.phase = WavePhase::Resting {
                        remaining: self.curve.rest_time(self.wave),
                    };
                }
            }
        }

        signals
    }

    /// An enemy from a `Spawn` signal is now on the board.
    pub fn confirm_spawn(&mut self) {
        self.alive += 1;
    }

    /// An enemy left the board, killed or otherwise.
    pub fn report_enemy_death(&mut self) {
        self.alive = self.alive.saturating_sub(1);
    }

    /// Overwrite the live-enemy count after the board was changed wholesale.
    pub fn sync_alive(&mut self, alive: u32) {
        if alive != self.alive {
            debug!(from = self.alive, to = alive, "live enemy count resynced");
        }
        self.alive = alive;
    }

    /// Weighted pick among types unlocked at the current wave.
    pub fn pick_enemy_type<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<usize> {
        let eligible: Vec<usize> = (0..self.weights.len())
            .filter(|&i| self.min_waves[i] <= self.wave.max(1))
            .collect();
        let first = *eligible.first()?;

        let total: f32 = eligible.iter().map(|&i| self.weights[i]).sum();
        if total <= 0.0 {
            return Some(first);
        }

        let roll = rng.gen_range(0.0..=total);
        let mut cumulative = 0.0;
        for &i in &eligible {
            cumulative += self.weights[i];
            if roll <= cumulative {
                return Some(i);
            }
        }
        Some(first)
    }

    fn begin_wave(&mut self, store: &mut dyn SaveStore, signals: &mut Vec<WaveSignal>) {
        self.wave += 1;
        store.save_int(KEY_CURRENT_WAVE, self.wave as i32);

        let enemy_count = self.curve.enemy_count(self.wave);
        self.spawn_interval = self.curve.spawn_interval(self.wave);
        self.rescale_weights();

        info!(
            wave = self.wave,
            enemy_count,
            spawn_interval = self.spawn_interval,
            "wave started"
        );
        signals.push(WaveSignal::Started {
            wave: self.wave,
            enemy_count,
        });

        self.phase = if enemy_count == 0 {
            WavePhase::AwaitingClear
        } else {
            WavePhase::Spawning {
                remaining: enemy_count,
                next_spawn_in: 0.0,
            }
        };
    }

    fn spawn_due<R: Rng + ?Sized>(&mut self, dt: f32, rng: &mut R, signals: &mut Vec<WaveSignal>) {
        let WavePhase::Spawning {
            mut remaining,
            mut next_spawn_in,
        } = self.phase
        else {
            return;
        };

        next_spawn_in -= dt;
        while remaining > 0 && next_spawn_in <= 0.0 {
            if let Some(enemy_type) = self.pick_enemy_type(rng) {
                signals.push(WaveSignal::Spawn { enemy_type });
            }
            remaining -= 1;
            next_spawn_in += self.spawn_interval;
        }

        self.phase = if remaining == 0 {
            WavePhase::AwaitingClear
        } else {
            WavePhase::Spawning {
                remaining,
                next_spawn_in,
            }
        };
    }

    /// Late-gated types get heavier in proportion to their gate, once per
    /// cadence step reached. Depends only on the wave number, so beginning
    /// the same wave again yields the same weights.
    fn rescale_weights(&mut self) {
        let steps = self.curve.rescale_steps(self.wave) as f32;
        for (i, weight) in self.weights.iter_mut().enumerate() {
            let min_wave = self.min_waves[i];
            *weight = self.base_weights[i];
            if min_wave > 1 {
                *weight += self.curve.weight_increase_amount * min_wave as f32 * 0.5 * steps;
            }
        }
        if self.curve.rescales_at(self.wave) {
            debug!(wave = self.wave, weights = ?self.weights, "spawn weights rescaled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enemy::EnemyTemplate;
    use crate::persistence::MemoryStore;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn enemy_type(name: &str, min_wave: u32, weight: f32) -> EnemyTypeConfig {
        EnemyTypeConfig {
            template: EnemyTemplate {
                name: name.into(),
                max_health: 10,
                move_speed: 1.0,
                contact_damage: 1,
                reward: 1,
                radius: 0.5,
            },
            pool_tag: name.into(),
            pool_size: 5,
            min_wave,
            spawn_weight: weight,
        }
    }

    fn rng() -> Xoshiro256PlusPlus {
        Xoshiro256PlusPlus::seed_from_u64(7)
    }

    #[test]
    fn test_enemy_count_curve() {
        let curve = WaveCurve::default();
        assert_eq!(curve.enemy_count(1), 5);
        assert_eq!(curve.enemy_count(10), 16);
        assert_eq!(curve.enemy_count(40), 50);
    }

    #[test]
    fn test_interval_and_rest_hit_floor() {
        let curve = WaveCurve::default();
        assert!((curve.spawn_interval(1) - 0.8).abs() < 0.001);
        assert!((curve.spawn_interval(11) - 0.5).abs() < 0.001);
        assert!((curve.spawn_interval(100) - 0.2).abs() < 0.001);
        assert!((curve.rest_time(1) - 5.0).abs() < 0.001);
        assert!((curve.rest_time(100) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_full_wave_cycle() {
        let curve = WaveCurve {
            base_enemy_count: 2.0,
            enemy_count_increase: 0.0,
            base_spawn_interval: 0.5,
            spawn_interval_decrease: 0.0,
            base_rest_time: 1.0,
            rest_time_decrease: 0.0,
            ..Default::default()
        };
        let mut waves = WaveScheduler::new(curve, &[enemy_type("grunt", 1, 1.0)]);
        let mut store = MemoryStore::new();
        let mut rng = rng();

        assert!(waves.tick(0.25, &mut store, &mut rng).is_empty());
        assert!(waves.start(1));
        assert!(!waves.start(5));

        let signals = waves.tick(0.25, &mut store, &mut rng);
        assert_eq!(
            signals,
            vec![
                WaveSignal::Started {
                    wave: 1,
                    enemy_count: 2
                },
                WaveSignal::Spawn { enemy_type: 0 },
            ]
        );
        assert_eq!(store.get(KEY_CURRENT_WAVE), Some(1));
        waves.confirm_spawn();

        assert!(waves.tick(0.25, &mut store, &mut rng).is_empty());
        assert_eq!(
            waves.tick(0.25, &mut store, &mut rng),
            vec![WaveSignal::Spawn { enemy_type: 0 }]
        );
        waves.confirm_spawn();
        assert_eq!(waves.phase(), WavePhase::AwaitingClear);

        // blocked until the board is clear
        waves.report_enemy_death();
        assert!(waves.tick(0.25, &mut store, &mut rng).is_empty());
        waves.report_enemy_death();
        assert_eq!(
            waves.tick(0.25, &mut store, &mut rng),
            vec![WaveSignal::Completed { wave: 1 }]
        );

        // one second of rest, then wave 2
        assert!(waves.tick(0.5, &mut store, &mut rng).is_empty());
        let signals = waves.tick(0.5, &mut store, &mut rng);
        assert!(matches!(signals[0], WaveSignal::Started { wave: 2, .. }));
        assert_eq!(store.get(KEY_CURRENT_WAVE), Some(2));
    }

    #[test]
    fn test_stop_discards_pending_spawns() {
        let mut waves = WaveScheduler::new(WaveCurve::default(), &[enemy_type("grunt", 1, 1.0)]);
        let mut store = MemoryStore::new();
        let mut rng = rng();
        waves.start(3);
        waves.tick(0.25, &mut store, &mut rng);
        assert_eq!(waves.current_wave(), 3);
        assert!(matches!(waves.phase(), WavePhase::Spawning { .. }));

        waves.stop();
        assert!(!waves.is_active());
        assert!(waves.tick(10.0, &mut store, &mut rng).is_empty());
    }

    #[test]
    fn test_min_wave_gates_selection() {
        let types = [enemy_type("grunt", 1, 1.0), enemy_type("brute", 5, 100.0)];
        let mut waves = WaveScheduler::new(WaveCurve::default(), &types);
        let mut store = MemoryStore::new();
        let mut rng = rng();
        waves.start(1);
        waves.tick(0.0, &mut store, &mut rng);
        for _ in 0..50 {
            assert_eq!(waves.pick_enemy_type(&mut rng), Some(0));
        }
    }

    #[test]
    fn test_weighted_pick_follows_weights() {
        let types = [enemy_type("grunt", 1, 1.0), enemy_type("runner", 1, 3.0)];
        let waves = WaveScheduler::new(WaveCurve::default(), &types);
        let mut rng = rng();
        let runners = (0..4000)
            .filter(|_| waves.pick_enemy_type(&mut rng) == Some(1))
            .count();
        assert!(runners > 2700 && runners < 3300, "runners = {runners}");
    }

    #[test]
    fn test_no_types_means_no_pick() {
        let waves = WaveScheduler::new(WaveCurve::default(), &[]);
        assert_eq!(waves.pick_enemy_type(&mut rng()), None);
    }

    #[test]
    fn test_difficulty_rescale_on_cadence() {
        let types = [enemy_type("grunt", 1, 1.0), enemy_type("brute", 4, 1.0)];
        let mut waves = WaveScheduler::new(WaveCurve::default(), &types);
        let mut store = MemoryStore::new();
        let mut rng = rng();
        waves.start(5);
        waves.tick(0.0, &mut store, &mut rng);
        assert_eq!(waves.current_wave(), 5);
        assert!((waves.weights()[0] - 1.0).abs() < 0.001);
        // 1.0 + 0.1 * 4 * 0.5
        assert!((waves.weights()[1] - 1.2).abs() < 0.001);
        assert_eq!(types[1].spawn_weight, 1.0);
    }

    #[test]
    fn test_retrying_a_cadence_wave_keeps_weights() {
        let types = [enemy_type("grunt", 1, 1.0), enemy_type("brute", 4, 1.0)];
        let mut waves = WaveScheduler::new(WaveCurve::default(), &types);
        let mut store = MemoryStore::new();
        let mut rng = rng();

        for _ in 0..3 {
            waves.stop();
            waves.start(5);
            waves.tick(0.0, &mut store, &mut rng);
            assert_eq!(waves.current_wave(), 5);
            assert!((waves.weights()[1] - 1.2).abs() < 0.001);
        }

        // wave 10 is the second step
        waves.stop();
        waves.start(10);
        waves.tick(0.0, &mut store, &mut rng);
        assert!((waves.weights()[1] - 1.4).abs() < 0.001);

        // going back below the first step restores the table weights
        waves.stop();
        waves.start(2);
        waves.tick(0.0, &mut store, &mut rng);
        assert!((waves.weights()[1] - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_restart_keeps_live_enemies_counted() {
        let curve = WaveCurve {
            base_enemy_count: 2.0,
            enemy_count_increase: 0.0,
            base_spawn_interval: 0.0,
            spawn_interval_decrease: 0.0,
            min_spawn_interval: 0.0,
            ..Default::default()
        };
        let mut waves = WaveScheduler::new(curve, &[enemy_type("grunt", 1, 1.0)]);
        let mut store = MemoryStore::new();
        let mut rng = rng();

        waves.start(1);
        let spawns = waves
            .tick(0.0, &mut store, &mut rng)
            .into_iter()
            .filter(|s| matches!(s, WaveSignal::Spawn { .. }))
            .count();
        assert_eq!(spawns, 2);
        waves.confirm_spawn();
        waves.confirm_spawn();

        // two enemies from wave 1 stay on the board across the restart
        waves.stop();
        waves.start(2);
        assert_eq!(waves.enemies_alive(), 2);
        let signals = waves.tick(0.0, &mut store, &mut rng);
        assert!(matches!(signals[0], WaveSignal::Started { wave: 2, .. }));
        waves.confirm_spawn();
        waves.confirm_spawn();
        assert_eq!(waves.phase(), WavePhase::AwaitingClear);
        assert_eq!(waves.enemies_alive(), 4);

        // wave 1 leftovers die; wave 2 is still on the board
        waves.report_enemy_death();
        waves.report_enemy_death();
        assert!(waves.tick(0.1, &mut store, &mut rng).is_empty());
        assert_eq!(waves.phase(), WavePhase::AwaitingClear);

        waves.report_enemy_death();
        waves.report_enemy_death();
        assert_eq!(
            waves.tick(0.1, &mut store, &mut rng),
            vec![WaveSignal::Completed { wave: 2 }]
        );
    }

    #[test]
    fn test_sync_alive_overwrites_count() {
        let mut waves = WaveScheduler::new(WaveCurve::default(), &[enemy_type("grunt", 1, 1.0)]);
        waves.confirm_spawn();
        waves.confirm_spawn();
        waves.sync_alive(0);
        assert_eq!(waves.enemies_alive(), 0);
    }
}
