//! Startup configuration: balance tables, board layout and run parameters.
//!
//! Loaded once from RON or JSON, validated, then treated as read-only for the
//! lifetime of a [`Simulation`](crate::engine::Simulation).

use std::path::Path;

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use crate::combat::effects::HitEffect;
use crate::constants::{DEFAULT_PLAYER_MONEY, RESOURCE_MANA};
use crate::enemy::{EnemyTemplate, EnemyTypeConfig};
use crate::projectile::ProjectileTemplate;
use crate::skills::{SkillDefinition, SkillEffect};
use crate::targeting::{LayerMask, TargetPriority};
use crate::tower::{GlobalIncrements, TowerModel};
use crate::waves::WaveCurve;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid RON: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Plain serializable point; converts to [`Vec2`] at use sites.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<Point2> for Vec2 {
    fn from(p: Point2) -> Self {
        Vec2::new(p.x, p.y)
    }
}

impl From<Vec2> for Point2 {
    fn from(v: Vec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

/// Price curve for account-wide upgrades.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlobalUpgradeCosts {
    pub base_cost: i32,
    pub cost_multiplier: f32,
    pub max_level: u32,
}

impl Default for GlobalUpgradeCosts {
    fn default() -> Self {
        Self {
            base_cost: 100,
            cost_multiplier: 1.5,
            max_level: 20,
        }
    }
}

impl GlobalUpgradeCosts {
    pub fn cost(&self, level: u32) -> i32 {
        (self.base_cost as f32 * self.cost_multiplier.powi(level as i32)).round_ties_even() as i32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Seed for every random roll in the run
    pub seed: u64,
    /// Fixed ticks per second used by the headless runner
    pub tick_rate: u32,
    /// Begin the wave loop as soon as the simulation is built
    #[serde(default = "default_auto_start")]
    pub auto_start: bool,

    pub wave_curve: WaveCurve,
    pub enemy_types: Vec<EnemyTypeConfig>,
    pub spawn_points: Vec<Point2>,

    pub base_position: Point2,
    pub base_health: i32,
    /// Distance from the base at which an enemy counts as arrived
    pub base_reach_distance: f32,

    pub tower_position: Point2,
    pub tower_models: Vec<TowerModel>,
    pub projectiles: Vec<ProjectileTemplate>,
    pub skills: Vec<SkillDefinition>,

    #[serde(default)]
    pub global_increments: GlobalIncrements,
    #[serde(default)]
    pub global_upgrades: GlobalUpgradeCosts,
    #[serde(default = "default_starting_money")]
    pub starting_money: i32,
}

fn default_auto_start() -> bool {
    true
}

fn default_starting_money() -> i32 {
    DEFAULT_PLAYER_MONEY
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            tick_rate: 30,
            auto_start: true,
            wave_curve: WaveCurve::default(),
            enemy_types: vec![
                enemy_type("Grunt", 60, 2.0, 5, 5, 1, 1.0),
                enemy_type("Runner", 35, 3.5, 3, 4, 3, 0.6),
                enemy_type("Brute", 200, 1.2, 15, 15, 6, 0.3),
            ],
            spawn_points: vec![
                Point2::new(-20.0, 0.0),
                Point2::new(0.0, 20.0),
                Point2::new(20.0, 0.0),
            ],
            base_position: Point2::new(0.0, 0.0),
            base_health: 100,
            base_reach_distance: 1.0,
            tower_position: Point2::new(0.0, 0.0),
            tower_models: vec![
                TowerModel::default(),
                TowerModel {
                    id: "cannon".into(),
                    name: "Cannon".into(),
                    base_damage: 45.0,
                    base_attack_speed: 0.5,
                    base_range: 12.0,
                    damage_per_level: 8.0,
                    attack_speed_per_level: 0.05,
                    default_priority: TargetPriority::Strongest,
                    projectile_id: "shell".into(),
                    ..TowerModel::default()
                },
                TowerModel {
                    id: "frost".into(),
                    name: "Frost Spire".into(),
                    base_damage: 15.0,
                    base_attack_speed: 1.5,
                    base_range: 9.0,
                    damage_per_level: 3.0,
                    default_priority: TargetPriority::Farthest,
                    projectile_id: "frost".into(),
                    ..TowerModel::default()
                },
            ],
            projectiles: vec![
                ProjectileTemplate::default(),
                ProjectileTemplate {
                    id: "shell".into(),
                    speed: 14.0,
                    lifetime: 3.0,
                    homing: false,
                    radius: 0.4,
                    effects: vec![
                        HitEffect::Damage {
                            base: 1.0,
                            crit_chance: 0.0,
                            crit_multiplier: 1.0,
                        },
                        HitEffect::Stun {
                            duration: 0.5,
                            refreshable: true,
                        },
                    ],
                    pool_tag: "shell".into(),
                    pool_size: 10,
                    target_layers: LayerMask::ENEMY,
                },
                ProjectileTemplate {
                    id: "frost".into(),
                    speed: 12.0,
                    effects: vec![
                        HitEffect::Damage {
                            base: 1.0,
                            crit_chance: 0.0,
                            crit_multiplier: 1.0,
                        },
                        HitEffect::Slow {
                            multiplier: 0.5,
                            duration: 2.0,
                            stackable: false,
                        },
                    ],
                    pool_tag: "frost".into(),
                    ..ProjectileTemplate::default()
                },
                ProjectileTemplate {
                    id: "fire".into(),
                    speed: 11.0,
                    effects: vec![
                        HitEffect::Damage {
                            base: 0.5,
                            crit_chance: 0.0,
                            crit_multiplier: 1.0,
                        },
                        HitEffect::Burn {
                            dps: 0.2,
                            duration: 3.0,
                            tick_rate: 0.5,
                            stackable: true,
                        },
                    ],
                    pool_tag: "fire".into(),
                    ..ProjectileTemplate::default()
                },
            ],
            skills: vec![
                skill("volley", "Volley", 30, 8.0, vec![SkillEffect::MultiShot {
                    count: 3,
                    duration: 5.0,
                }]),
                skill("fan", "Fan of Bolts", 40, 10.0, vec![SkillEffect::SpreadShot {
                    count: 5,
                    angle_deg: 60.0,
                    duration: 4.0,
                }]),
                skill("ignite", "Ignite", 25, 12.0, vec![SkillEffect::ChangeProjectile {
                    projectile_id: "fire".into(),
                }]),
                skill("smite", "Smite", 50, 15.0, vec![SkillEffect::StrikeTarget {
                    effects: vec![
                        HitEffect::Damage {
                            base: 2.0,
                            crit_chance: 0.0,
                            crit_multiplier: 1.0,
                        },
                        HitEffect::Stun {
                            duration: 1.0,
                            refreshable: true,
                        },
                    ],
                }]),
            ],
            global_increments: GlobalIncrements::default(),
            global_upgrades: GlobalUpgradeCosts::default(),
            starting_money: DEFAULT_PLAYER_MONEY,
        }
    }
}

fn enemy_type(
    name: &str,
    max_health: i32,
    move_speed: f32,
    contact_damage: i32,
    reward: i32,
    min_wave: u32,
    spawn_weight: f32,
) -> EnemyTypeConfig {
    EnemyTypeConfig {
        template: EnemyTemplate {
            name: name.into(),
            max_health,
            move_speed,
            contact_damage,
            reward,
            radius: 0.5,
        },
        pool_tag: name.to_lowercase(),
        pool_size: 16,
        min_wave,
        spawn_weight,
    }
}

fn skill(id: &str, name: &str, cost: i32, cooldown: f32, effects: Vec<SkillEffect>) -> SkillDefinition {
    SkillDefinition {
        id: id.into(),
        name: name.into(),
        resource_type: RESOURCE_MANA.into(),
        cost,
        cooldown,
        effects,
    }
}

impl SimConfig {
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// `.json` files parse as JSON, anything else as RON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&text),
            _ => Self::from_ron(&text),
        }
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.tick_rate == 0 {
            return invalid("tick_rate must be positive".into());
        }
        if self.enemy_types.is_empty() {
            return invalid("enemy_types is empty".into());
        }
        if self.spawn_points.is_empty() {
            return invalid("spawn_points is empty".into());
        }
        if self.tower_models.is_empty() {
            return invalid("tower_models is empty".into());
        }
        if self.base_health <= 0 {
            return invalid("base_health must be positive".into());
        }
        for model in &self.tower_models {
            if self.projectile_index(&model.projectile_id).is_none() {
                return invalid(format!(
                    "tower model '{}' fires unknown projectile '{}'",
                    model.id, model.projectile_id
                ));
            }
        }
        for skill in &self.skills {
            for effect in &skill.effects {
                if let SkillEffect::ChangeProjectile { projectile_id } = effect {
                    if self.projectile_index(projectile_id).is_none() {
                        return invalid(format!(
                            "skill '{}' switches to unknown projectile '{}'",
                            skill.id, projectile_id
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn projectile_index(&self, id: &str) -> Option<usize> {
        self.projectiles.iter().position(|p| p.id == id)
    }

    pub fn tick_seconds(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }
}
