//! Pooled projectiles.
//!
//! A projectile carries its template's on-hit effects, a damage multiplier
//! and an optional target. It leaves the board in exactly one of three ways:
//! - hit: first overlap with a live enemy on its target layers
//! - expired: lifetime ran out before any hit
//! - missed: reached the aim point (ballistic) or the last known position of
//!   a lost target (homing) without touching anything
//!
//! Collision is a swept circle test along the segment travelled this tick,
//! so fast projectiles cannot tunnel through small enemies.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use crate::combat::effects::HitEffect;
use crate::combat::status::StatusEffectState;
use crate::constants::PROJECTILE_REACH_DISTANCE;
use crate::enemy::{EnemyHandle, EnemyInstance};
use crate::movement::{MoveMode, MoveTarget, Mover};
use crate::pool::{EntityKind, Handle, Poolable};
use crate::targeting::LayerMask;

pub type ProjectileHandle = Handle<ActiveProjectile>;

fn default_projectile_radius() -> f32 {
    0.2
}

fn default_target_layers() -> LayerMask {
    LayerMask::ENEMY
}

/// Immutable balance record for one projectile type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileTemplate {
    pub id: String,
    pub speed: f32,
    /// Seconds before the projectile returns itself unhit
    pub lifetime: f32,
    pub homing: bool,
    #[serde(default = "default_projectile_radius")]
    pub radius: f32,
    /// Applied in order on hit
    pub effects: Vec<HitEffect>,
    pub pool_tag: String,
    pub pool_size: usize,
    #[serde(default = "default_target_layers")]
    pub target_layers: LayerMask,
}

impl Default for ProjectileTemplate {
    fn default() -> Self {
        Self {
            id: "bolt".into(),
            speed: 10.0,
            lifetime: 5.0,
            homing: true,
            radius: default_projectile_radius(),
            effects: vec![HitEffect::Damage {
                base: 1.0,
                crit_chance: 0.1,
                crit_multiplier: 2.0,
            }],
            pool_tag: "bolt".into(),
            pool_size: 20,
            target_layers: LayerMask::ENEMY,
        }
    }
}

/// How the projectile fared this tick, before collision is considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightStatus {
    Flying,
    Expired,
    /// Arrived at its aim point or lost target's last position
    Arrived,
}

#[derive(Debug, Clone)]
pub struct ActiveProjectile {
    pub pool_tag: String,
    pub template_index: Option<usize>,
    pub position: Vec2,
    pub rotation: f32,
    pub mover: Mover,
    pub target: Option<EnemyHandle>,
    pub last_known_target: Option<Vec2>,
    pub damage_multiplier: f32,
    pub elapsed: f32,
    pub lifetime: f32,
    pub has_hit: bool,
    pub radius: f32,
    pub target_layers: LayerMask,
    aim_distance: Option<f32>,
    travelled: f32,
    /// Projectiles never carry status effects; the mover still wants one.
    calm: StatusEffectState,
}

impl ActiveProjectile {
    pub fn new(pool_tag: &str) -> Self {
        Self {
            pool_tag: pool_tag.to_string(),
            template_index: None,
            position: Vec2::ZERO,
            rotation: 0.0,
            mover: Mover::default(),
            target: None,
            last_known_target: None,
            damage_multiplier: 1.0,
            elapsed: 0.0,
            lifetime: 0.0,
            has_hit: false,
            radius: default_projectile_radius(),
            target_layers: LayerMask::ENEMY,
            aim_distance: None,
            travelled: 0.0,
            calm: StatusEffectState::new(),
        }
    }

    /// Bind template, multiplier and target. `heading` overrides the frozen
    /// direction of a ballistic projectile.
    pub fn launch(
        &mut self,
        template_index: usize,
        template: &ProjectileTemplate,
        damage_multiplier: f32,
        target: Option<EnemyHandle>,
        target_position: Option<Vec2>,
        heading: Option<Vec2>,
    ) {
        self.template_index = Some(template_index);
        self.damage_multiplier = damage_multiplier;
        self.lifetime = template.lifetime;
        self.radius = template.radius;
        self.target_layers = template.target_layers;
        self.target = target;
        self.last_known_target = target_position;

        let mode = if template.homing {
            MoveMode::Homing
        } else {
            MoveMode::Ballistic
        };
        self.mover.configure(mode, template.speed);
        self.mover.set_stop_on_reach(false, 0.0);
        let move_target = match target {
            Some(handle) => Some(MoveTarget::Enemy(handle)),
            None => target_position.map(MoveTarget::Point),
        };
        self.mover
            .set_target(move_target, self.position, target_position);
        if mode == MoveMode::Homing && target.is_none() {
            self.fall_back_to_last_known();
        }

        if mode == MoveMode::Ballistic {
            if let Some(direction) = heading {
                self.mover.freeze_direction(direction);
            }
            self.aim_distance = target_position.map(|p| p.distance(self.position));
        }
    }

    pub fn template_index(&self) -> Option<usize> {
        self.template_index
    }

    /// Move one tick. `target_position` is the live target's location, `None`
    /// once it died or was recycled.
    pub fn advance(&mut self, dt: f32, target_position: Option<Vec2>) -> FlightStatus {
        self.elapsed += dt;

        let goal = match self.mover.mode() {
            MoveMode::Homing => match target_position {
                Some(position) if self.target.is_some() => {
                    self.last_known_target = Some(position);
                    Some(position)
                }
                _ => {
                    if self.target.take().is_some() {
                        self.fall_back_to_last_known();
                    }
                    self.last_known_target
                }
            },
            MoveMode::Ballistic => target_position,
        };

        let step = self.mover.tick(dt, &mut self.position, goal, &self.calm);
        self.travelled += step.distance_moved;
        let velocity = self.mover.velocity();
        if velocity != Vec2::ZERO {
            self.rotation = velocity.y.atan2(velocity.x);
        }

        if step.reached {
            return FlightStatus::Arrived;
        }
        if let Some(distance) = self.aim_distance {
            if self.travelled >= distance {
                return FlightStatus::Arrived;
            }
        }
        if self.mover.mode() == MoveMode::Homing
            && self.target.is_none()
            && self.last_known_target.is_none()
        {
            return FlightStatus::Arrived;
        }
        if self.elapsed >= self.lifetime {
            return FlightStatus::Expired;
        }
        FlightStatus::Flying
    }

    /// Latch the hit. Returns false if this projectile already hit something.
    pub fn register_hit(&mut self) -> bool {
        if self.has_hit {
            return false;
        }
        self.has_hit = true;
        true
    }

    fn fall_back_to_last_known(&mut self) {
        if let Some(point) = self.last_known_target {
            self.mover
                .set_target(Some(MoveTarget::Point(point)), self.position, Some(point));
            self.mover.set_stop_on_reach(true, PROJECTILE_REACH_DISTANCE);
        }
    }
}

impl Poolable for ActiveProjectile {
    const KIND: EntityKind = EntityKind::Projectile;

    fn on_spawn(&mut self, position: Vec2, rotation: f32) {
        self.position = position;
        self.rotation = rotation;
        self.template_index = None;
        self.target = None;
        self.last_known_target = None;
        self.damage_multiplier = 1.0;
        self.elapsed = 0.0;
        self.has_hit = false;
        self.aim_distance = None;
        self.travelled = 0.0;
        self.mover.reset();
    }

    fn on_despawn(&mut self) {
        self.target = None;
        self.mover.reset();
    }
}

/// Whether the segment `from..to`, thickened by `radius`, touches `center`.
pub fn segment_hits_circle(from: Vec2, to: Vec2, center: Vec2, radius: f32) -> bool {
    let segment = to - from;
    let length_sq = segment.length_squared();
    let t = if length_sq > 0.0 {
        ((center - from).dot(segment) / length_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let closest = from + segment * t;
    closest.distance_squared(center) <= radius * radius
}

/// First live enemy on `layers` touched along `from..to`, closest to `from`.
pub fn find_collision<'a, I>(
    from: Vec2,
    to: Vec2,
    radius: f32,
    layers: LayerMask,
    enemies: I,
) -> Option<EnemyHandle>
where
    I: IntoIterator<Item = (EnemyHandle, &'a EnemyInstance)>,
{
    let mut best: Option<(EnemyHandle, f32)> = None;
    for (handle, enemy) in enemies {
        if !enemy.is_alive() || !enemy.layers.intersects(layers) {
            continue;
        }
        if !segment_hits_circle(from, to, enemy.position, radius + enemy.radius) {
            continue;
        }
        let distance = from.distance_squared(enemy.position);
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((handle, distance));
        }
    }
    best.map(|(handle, _)| handle)
}
