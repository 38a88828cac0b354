//! Tower models and the active tower.
//!
//! The player controls one tower at a fixed position. It swaps between
//! [`TowerModel`]s; its [`TowerRuntimeStats`] are recomputed wholesale on
//! every model switch or upgrade and never patched in place.
//!
//! Fire mode priority: spread buff, then multi-shot buff, then single.

pub mod stats;

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use crate::constants::{BASE_MANA_REGEN, BASE_MAX_MANA, PARALLEL_SHOT_SPACING};
use crate::enemy::EnemyHandle;
use crate::shooter::ShotPattern;
use crate::targeting::{TargetFinder, TargetPriority};

pub use stats::{GlobalIncrements, TowerRuntimeStats, UpgradeLevels, UpgradeStat};

fn default_max_mana() -> f32 {
    BASE_MAX_MANA
}

fn default_mana_regen() -> f32 {
    BASE_MANA_REGEN
}

/// A per-shot price for towers whose attacks consume a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCost {
    pub resource: String,
    pub amount: i32,
}

/// Immutable balance record for one tower model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TowerModel {
    pub id: String,
    pub name: String,

    // Base combat stats
    pub base_damage: f32,
    pub base_attack_speed: f32,
    pub base_range: f32,
    #[serde(default = "default_max_mana")]
    pub base_max_mana: f32,
    #[serde(default = "default_mana_regen")]
    pub base_mana_regen: f32,

    // Per-level deltas
    pub damage_per_level: f32,
    pub attack_speed_per_level: f32,
    pub range_per_level: f32,
    #[serde(default)]
    pub max_mana_per_level: f32,
    #[serde(default)]
    pub mana_regen_per_level: f32,

    // Economy
    pub build_cost: i32,
    pub base_upgrade_cost: i32,
    pub upgrade_cost_multiplier: f32,
    pub sell_value_multiplier: f32,
    pub max_level: u32,

    pub default_priority: TargetPriority,
    /// Projectile template fired by default
    pub projectile_id: String,
    #[serde(default)]
    pub attack_cost: Option<ResourceCost>,
}

impl Default for TowerModel {
    fn default() -> Self {
        Self {
            id: "basic".into(),
            name: "Basic Tower".into(),
            base_damage: 30.0,
            base_attack_speed: 1.0,
            base_range: 10.0,
            base_max_mana: BASE_MAX_MANA,
            base_mana_regen: BASE_MANA_REGEN,
            damage_per_level: 5.0,
            attack_speed_per_level: 0.1,
            range_per_level: 1.0,
            max_mana_per_level: 0.0,
            mana_regen_per_level: 0.0,
            build_cost: 100,
            base_upgrade_cost: 50,
            upgrade_cost_multiplier: 1.5,
            sell_value_multiplier: 0.7,
            max_level: 10,
            default_priority: TargetPriority::Nearest,
            projectile_id: "bolt".into(),
            attack_cost: None,
        }
    }
}

impl TowerModel {
    /// Price of going from `level` to `level + 1`.
    pub fn upgrade_cost(&self, level: u32) -> i32 {
        let cost = self.base_upgrade_cost as f32 * self.upgrade_cost_multiplier.powi(level as i32);
        cost.round_ties_even() as i32
    }

    /// Build cost plus every upgrade up to `levels`.
    pub fn total_investment(&self, levels: u32) -> i32 {
        (0..levels).fold(self.build_cost, |total, level| {
            total.saturating_add(self.upgrade_cost(level))
        })
    }

    pub fn sell_value(&self, levels: u32) -> i32 {
        (self.total_investment(levels) as f32 * self.sell_value_multiplier).floor() as i32
    }

    pub fn is_max_level(&self, level: u32) -> bool {
        level >= self.max_level
    }
}

/// Timed fire-mode buff granted by a skill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShotBuff {
    pub count: u32,
    pub angle_deg: f32,
    pub remaining: f32,
}

#[derive(Debug, Clone)]
pub struct Tower {
    pub position: Vec2,
    pub model_index: usize,
    pub stats: TowerRuntimeStats,
    pub finder: TargetFinder,
    pub target: Option<EnemyHandle>,
    projectile_override: Option<String>,
    multi_shot: Option<ShotBuff>,
    spread_shot: Option<ShotBuff>,
    last_attack: Option<f64>,
}

impl Tower {
    pub fn new(position: Vec2, model_index: usize, model: &TowerModel, stats: TowerRuntimeStats) -> Self {
        Self {
            position,
            model_index,
            stats,
            finder: TargetFinder::new(model.default_priority),
            target: None,
            projectile_override: None,
            multi_shot: None,
            spread_shot: None,
            last_attack: None,
        }
    }

    /// Swap the active model. Buffs and overrides stay.
    pub fn set_model(&mut self, model_index: usize, model: &TowerModel, stats: TowerRuntimeStats) {
        self.model_index = model_index;
        self.stats = stats;
        self.finder.set_priority(model.default_priority);
    }

    pub fn enable_multi_shot(&mut self, count: u32, duration: f32) {
        self.multi_shot = Some(ShotBuff {
            count: count.max(1),
            angle_deg: 0.0,
            remaining: duration,
        });
    }

    pub fn enable_spread_shot(&mut self, count: u32, angle_deg: f32, duration: f32) {
        self.spread_shot = Some(ShotBuff {
            count: count.max(1),
            angle_deg,
            remaining: duration,
        });
    }

    pub fn set_projectile_override(&mut self, projectile_id: Option<String>) {
        self.projectile_override = projectile_id;
    }

    pub fn projectile_override(&self) -> Option<&str> {
        self.projectile_override.as_deref()
    }

    pub fn multi_shot(&self) -> Option<&ShotBuff> {
        self.multi_shot.as_ref()
    }

    pub fn spread_shot(&self) -> Option<&ShotBuff> {
        self.spread_shot.as_ref()
    }

    /// Count down timed fire-mode buffs.
    pub fn tick_buffs(&mut self, dt: f32) {
        for buff in [&mut self.multi_shot, &mut self.spread_shot] {
            let expired = match buff {
                Some(active) => {
                    active.remaining -= dt;
                    active.remaining <= 0.0
                }
                None => false,
            };
            if expired {
                *buff = None;
            }
        }
    }

    pub fn shot_pattern(&self) -> ShotPattern {
        if let Some(spread) = self.spread_shot {
            ShotPattern::Spread {
                count: spread.count,
                angle_deg: spread.angle_deg,
            }
        } else if let Some(multi) = self.multi_shot {
            ShotPattern::Parallel {
                count: multi.count,
                spacing: PARALLEL_SHOT_SPACING,
            }
        } else {
            ShotPattern::Single
        }
    }

    pub fn can_attack(&self, now: f64) -> bool {
        let interval = self.stats.attack_interval();
        if !interval.is_finite() {
            return false;
        }
        self.last_attack
            .map_or(true, |last| now - last >= interval as f64)
    }

    pub fn mark_attack(&mut self, now: f64) {
        self.last_attack = Some(now);
    }

    /// Drop buffs, overrides, target and attack history.
    pub fn reset_combat_state(&mut self) {
        self.target = None;
        self.projectile_override = None;
        self.multi_shot = None;
        self.spread_shot = None;
        self.last_attack = None;
    }
}
