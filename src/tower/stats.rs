//! Runtime stat composition.
//!
//! Every stat is `base + model_level * per_level + global_level * increment`.
//! [`compute`] is pure: no hidden inputs, so the same levels always give
//! bit-identical stats and a recompute never drifts.

use serde::{Deserialize, Serialize};

use crate::constants::{
    GLOBAL_ATTACK_SPEED_PER_LEVEL, GLOBAL_DAMAGE_PER_LEVEL, GLOBAL_MANA_REGEN_PER_LEVEL,
    GLOBAL_MAX_MANA_PER_LEVEL, GLOBAL_RANGE_PER_LEVEL,
};
use crate::persistence::SaveStore;
use crate::tower::TowerModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpgradeStat {
    Damage,
    AttackSpeed,
    Range,
    MaxMana,
    ManaRegen,
}

impl UpgradeStat {
    pub const ALL: [UpgradeStat; 5] = [
        UpgradeStat::Damage,
        UpgradeStat::AttackSpeed,
        UpgradeStat::Range,
        UpgradeStat::MaxMana,
        UpgradeStat::ManaRegen,
    ];

    /// Name used inside persistence keys.
    pub fn key_name(&self) -> &'static str {
        match self {
            UpgradeStat::Damage => "Damage",
            UpgradeStat::AttackSpeed => "AttackSpeed",
            UpgradeStat::Range => "Range",
            UpgradeStat::MaxMana => "MaxMana",
            UpgradeStat::ManaRegen => "ManaRegen",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeLevels {
    pub damage: u32,
    pub attack_speed: u32,
    pub range: u32,
    pub max_mana: u32,
    pub mana_regen: u32,
}

impl UpgradeLevels {
    pub fn get(&self, stat: UpgradeStat) -> u32 {
        match stat {
            UpgradeStat::Damage => self.damage,
            UpgradeStat::AttackSpeed => self.attack_speed,
            UpgradeStat::Range => self.range,
            UpgradeStat::MaxMana => self.max_mana,
            UpgradeStat::ManaRegen => self.mana_regen,
        }
    }

    pub fn set(&mut self, stat: UpgradeStat, level: u32) {
        match stat {
            UpgradeStat::Damage => self.damage = level,
            UpgradeStat::AttackSpeed => self.attack_speed = level,
            UpgradeStat::Range => self.range = level,
            UpgradeStat::MaxMana => self.max_mana = level,
            UpgradeStat::ManaRegen => self.mana_regen = level,
        }
    }

    /// Read every level through `key_for`, defaulting missing keys to 0.
    pub fn load(store: &dyn SaveStore, key_for: impl Fn(UpgradeStat) -> String) -> Self {
        let mut levels = Self::default();
        for stat in UpgradeStat::ALL {
            let level = store.load_int(&key_for(stat), 0).max(0) as u32;
            levels.set(stat, level);
        }
        levels
    }
}

/// Per-level bonus granted by global (account-wide) upgrades.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlobalIncrements {
    pub damage: f32,
    pub attack_speed: f32,
    pub range: f32,
    pub max_mana: f32,
    pub mana_regen: f32,
}

impl Default for GlobalIncrements {
    fn default() -> Self {
        Self {
            damage: GLOBAL_DAMAGE_PER_LEVEL,
            attack_speed: GLOBAL_ATTACK_SPEED_PER_LEVEL,
            range: GLOBAL_RANGE_PER_LEVEL,
            max_mana: GLOBAL_MAX_MANA_PER_LEVEL,
            mana_regen: GLOBAL_MANA_REGEN_PER_LEVEL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TowerRuntimeStats {
    pub attack: f32,
    /// Attacks per second
    pub attack_speed: f32,
    pub range: f32,
    pub damage_multiplier: f32,
    pub max_mana: f32,
    pub mana_regen: f32,
}

impl TowerRuntimeStats {
    /// Seconds between attacks. Infinite when the tower cannot attack.
    pub fn attack_interval(&self) -> f32 {
        if self.attack_speed > 0.0 {
            1.0 / self.attack_speed
        } else {
            f32::INFINITY
        }
    }

    /// Multiplier handed to projectiles at launch.
    pub fn projectile_multiplier(&self) -> f32 {
        self.attack * self.damage_multiplier
    }
}

pub fn compute(
    model: &TowerModel,
    global: &UpgradeLevels,
    model_levels: &UpgradeLevels,
    increments: &GlobalIncrements,
) -> TowerRuntimeStats {
    let stat = |base: f32, per_level: f32, level: u32, global_level: u32, increment: f32| {
        base + level as f32 * per_level + global_level as f32 * increment
    };

    TowerRuntimeStats {
        attack: stat(
            model.base_damage,
            model.damage_per_level,
            model_levels.damage,
            global.damage,
            increments.damage,
        ),
        attack_speed: stat(
            model.base_attack_speed,
            model.attack_speed_per_level,
            model_levels.attack_speed,
            global.attack_speed,
            increments.attack_speed,
        ),
        range: stat(
            model.base_range,
            model.range_per_level,
            model_levels.range,
            global.range,
            increments.range,
        ),
        damage_multiplier: 1.0,
        max_mana: stat(
            model.base_max_mana,
            model.max_mana_per_level,
            model_levels.max_mana,
            global.max_mana,
            increments.max_mana,
        ),
        mana_regen: stat(
            model.base_mana_regen,
            model.mana_regen_per_level,
            model_levels.mana_regen,
            global.mana_regen,
            increments.mana_regen,
        ),
    }
}
