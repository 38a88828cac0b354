//! On-hit effects carried by projectiles and direct-strike skills.
//!
//! Magnitudes are scaled by the attacker's damage multiplier at the moment of
//! impact. Rounding is half-to-even throughout.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::combat::health::{DamageOutcome, Death};
use crate::constants::DEFAULT_STUN_REFRESHABLE;
use crate::enemy::EnemyInstance;

fn default_crit_multiplier() -> f32 {
    1.0
}

fn default_refreshable() -> bool {
    DEFAULT_STUN_REFRESHABLE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HitEffect {
    /// `round(base * multiplier)`, times `crit_multiplier` on a crit roll
    Damage {
        base: f32,
        #[serde(default)]
        crit_chance: f32,
        #[serde(default = "default_crit_multiplier")]
        crit_multiplier: f32,
    },
    Burn {
        dps: f32,
        duration: f32,
        tick_rate: f32,
        stackable: bool,
    },
    Slow {
        multiplier: f32,
        duration: f32,
        #[serde(default)]
        stackable: bool,
    },
    Stun {
        duration: f32,
        #[serde(default = "default_refreshable")]
        refreshable: bool,
    },
}

impl HitEffect {
    pub fn name(&self) -> &'static str {
        match self {
            HitEffect::Damage { .. } => "damage",
            HitEffect::Burn { .. } => "burn",
            HitEffect::Slow { .. } => "slow",
            HitEffect::Stun { .. } => "stun",
        }
    }
}

/// Totals from applying an effect list to one target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HitReport {
    pub damage_dealt: i32,
    pub crits: u32,
    pub statuses_applied: u32,
    /// Set if this hit killed the target
    pub death: Option<Death>,
}

/// Apply `effects` in order to `target`.
pub fn apply_hit_effects<R: Rng + ?Sized>(
    effects: &[HitEffect],
    target: &mut EnemyInstance,
    multiplier: f32,
    rng: &mut R,
) -> HitReport {
    let mut report = HitReport::default();

    for effect in effects {
        match *effect {
            HitEffect::Damage {
                base,
                crit_chance,
                crit_multiplier,
            } => {
                let mut amount = base * multiplier;
                if crit_chance > 0.0 && rng.gen::<f32>() < crit_chance {
                    amount *= crit_multiplier;
                    report.crits += 1;
                }
                let outcome = target.health.take_damage(amount.round_ties_even() as i32);
                match outcome {
                    DamageOutcome::Damaged { dealt, .. } => report.damage_dealt += dealt,
                    DamageOutcome::Killed { dealt, death } => {
                        report.damage_dealt += dealt;
                        report.death.get_or_insert(death);
                    }
                    DamageOutcome::Rejected | DamageOutcome::AlreadyDead => {}
                }
            }
            HitEffect::Burn {
                dps,
                duration,
                tick_rate,
                stackable,
            } => {
                let scaled = (dps * multiplier).round_ties_even() as i32;
                let scaled = if dps > 0.0 { scaled.max(1) } else { scaled };
                if target
                    .status
                    .apply_burn(scaled, duration, tick_rate, stackable)
                {
                    report.statuses_applied += 1;
                }
            }
            HitEffect::Slow {
                multiplier: slow,
                duration,
                stackable,
            } => {
                if target.status.apply_slow(slow, duration, stackable) {
                    report.statuses_applied += 1;
                }
            }
            HitEffect::Stun {
                duration,
                refreshable,
            } => {
                if target.status.apply_stun(duration, refreshable) {
                    report.statuses_applied += 1;
                }
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::health::DeathListener;
    use crate::pool::Poolable;
    use bevy::math::Vec2;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn target(hp: i32) -> EnemyInstance {
        let mut enemy = EnemyInstance::new("t");
        enemy.on_spawn(Vec2::ZERO, 0.0);
        enemy.health.set_max(hp);
        enemy.health.set_health(hp);
        enemy
    }

    fn rng() -> Xoshiro256PlusPlus {
        Xoshiro256PlusPlus::seed_from_u64(7)
    }

    #[test]
    fn test_damage_scales_with_multiplier() {
        let mut enemy = target(100);
        let effects = [HitEffect::Damage {
            base: 1.5,
            crit_chance: 0.0,
            crit_multiplier: 2.0,
        }];
        let report = apply_hit_effects(&effects, &mut enemy, 20.0, &mut rng());
        assert_eq!(report.damage_dealt, 30);
        assert_eq!(report.crits, 0);
        assert_eq!(enemy.health.current(), 70);
    }

    #[test]
    fn test_guaranteed_crit() {
        let mut enemy = target(100);
        let effects = [HitEffect::Damage {
            base: 1.0,
            crit_chance: 1.0,
            crit_multiplier: 2.0,
        }];
        let report = apply_hit_effects(&effects, &mut enemy, 10.0, &mut rng());
        assert_eq!(report.crits, 1);
        assert_eq!(report.damage_dealt, 20);
    }

    #[test]
    fn test_lethal_hit_reports_death_once() {
        let mut enemy = target(10);
        enemy.health.subscribe_death(DeathListener::WaveReport);
        let effects = [
            HitEffect::Damage {
                base: 1.0,
                crit_chance: 0.0,
                crit_multiplier: 1.0,
            },
            HitEffect::Damage {
                base: 1.0,
                crit_chance: 0.0,
                crit_multiplier: 1.0,
            },
        ];
        let report = apply_hit_effects(&effects, &mut enemy, 50.0, &mut rng());
        assert_eq!(report.damage_dealt, 10);
        let death = report.death.unwrap();
        assert_eq!(death.listeners, vec![DeathListener::WaveReport]);
    }

    #[test]
    fn test_status_effects_applied_in_order() {
        let mut enemy = target(100);
        let effects = [
            HitEffect::Burn {
                dps: 0.5,
                duration: 3.0,
                tick_rate: 0.5,
                stackable: true,
            },
            HitEffect::Slow {
                multiplier: 0.5,
                duration: 2.0,
                stackable: false,
            },
            HitEffect::Stun {
                duration: 1.5,
                refreshable: true,
            },
        ];
        let report = apply_hit_effects(&effects, &mut enemy, 10.0, &mut rng());
        assert_eq!(report.statuses_applied, 3);
        assert_eq!(enemy.status.burn().unwrap().dps, 5);
        assert!(enemy.status.is_slowed());
        assert!(enemy.status.is_stunned());
    }

    #[test]
    fn test_tiny_burn_rounds_up_to_one() {
        let mut enemy = target(100);
        let effects = [HitEffect::Burn {
            dps: 0.01,
            duration: 1.0,
            tick_rate: 0.5,
            stackable: false,
        }];
        apply_hit_effects(&effects, &mut enemy, 1.0, &mut rng());
        assert_eq!(enemy.status.burn().unwrap().dps, 1);
    }

    #[test]
    fn test_effect_deserializes_with_defaults() {
        let effect: HitEffect = ron::from_str("Stun(duration: 1.5)").unwrap();
        assert_eq!(
            effect,
            HitEffect::Stun {
                duration: 1.5,
                refreshable: true
            }
        );
        assert_eq!(effect.name(), "stun");
    }
}
