//! Enemy templates and pooled enemy instances.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use crate::combat::health::HealthState;
use crate::combat::status::StatusEffectState;
use crate::movement::{MoveMode, MoveTarget, Mover};
use crate::pool::{EntityKind, Handle, Poolable};
use crate::targeting::LayerMask;

pub type EnemyHandle = Handle<EnemyInstance>;

fn default_radius() -> f32 {
    0.5
}

/// Immutable balance record for one enemy type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyTemplate {
    pub name: String,
    pub max_health: i32,
    pub move_speed: f32,
    /// Damage dealt to the base on arrival
    pub contact_damage: i32,
    /// Currency credited when the tower kills it
    pub reward: i32,
    #[serde(default = "default_radius")]
    pub radius: f32,
}

/// Row of the enemy-type table: template plus pooling and spawn gating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyTypeConfig {
    pub template: EnemyTemplate,
    pub pool_tag: String,
    pub pool_size: usize,
    /// First wave this type may appear in
    pub min_wave: u32,
    pub spawn_weight: f32,
}

/// One pooled enemy. Built once per slot and re-initialized on every activation.
#[derive(Debug, Clone)]
pub struct EnemyInstance {
    pub pool_tag: String,
    /// Index into the enemy-type table, set by the spawner
    pub type_index: Option<usize>,
    pub position: Vec2,
    pub health: HealthState,
    pub status: StatusEffectState,
    pub mover: Mover,
    pub contact_damage: i32,
    pub reward: i32,
    pub radius: f32,
    pub layers: LayerMask,
}

impl EnemyInstance {
    pub fn new(pool_tag: &str) -> Self {
        Self {
            pool_tag: pool_tag.to_string(),
            type_index: None,
            position: Vec2::ZERO,
            health: HealthState::default(),
            status: StatusEffectState::new(),
            mover: Mover::new(MoveMode::Homing, 0.0),
            contact_damage: 0,
            reward: 0,
            radius: default_radius(),
            layers: LayerMask::ENEMY,
        }
    }

    /// Inject template stats and point the enemy at the base.
    pub fn apply_template(
        &mut self,
        type_index: usize,
        template: &EnemyTemplate,
        base_position: Vec2,
        stop_distance: f32,
    ) {
        self.type_index = Some(type_index);
        self.health.set_max(template.max_health);
        self.health.set_health(template.max_health);
        self.contact_damage = template.contact_damage;
        self.reward = template.reward;
        self.radius = template.radius;

        self.mover.configure(MoveMode::Homing, template.move_speed);
        self.mover.set_stop_on_reach(true, stop_distance);
        self.mover.set_target(
            Some(MoveTarget::Point(base_position)),
            self.position,
            Some(base_position),
        );
    }

    pub fn is_alive(&self) -> bool {
        !self.health.is_dead()
    }
}

impl Poolable for EnemyInstance {
    const KIND: EntityKind = EntityKind::Enemy;

    fn on_spawn(&mut self, position: Vec2, _rotation: f32) {
        self.position = position;
        self.health.reset();
        self.status.clear();
        self.mover.reset();
    }

    fn on_despawn(&mut self) {
        self.status.clear();
        self.mover.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::EntityPool;

    fn grunt() -> EnemyTemplate {
        EnemyTemplate {
            name: "Grunt".into(),
            max_health: 40,
            move_speed: 2.0,
            contact_damage: 5,
            reward: 3,
            radius: 0.5,
        }
    }

    #[test]
    fn test_apply_template_sets_stats() {
        let mut enemy = EnemyInstance::new("grunt");
        enemy.on_spawn(Vec2::new(-10.0, 0.0), 0.0);
        enemy.apply_template(0, &grunt(), Vec2::ZERO, 1.0);

        assert_eq!(enemy.type_index, Some(0));
        assert_eq!(enemy.health.max(), 40);
        assert_eq!(enemy.health.current(), 40);
        assert_eq!(enemy.contact_damage, 5);
        assert_eq!(enemy.mover.base_speed(), 2.0);
        assert_eq!(enemy.mover.target(), Some(MoveTarget::Point(Vec2::ZERO)));
    }

    #[test]
    fn test_reacquire_resets_gameplay_state() {
        let mut pool = EntityPool::new();
        pool.register("grunt", Box::new(|| EnemyInstance::new("grunt")), 1)
            .unwrap();

        let handle = pool.acquire("grunt", Vec2::ZERO, 0.0, None).unwrap();
        {
            let enemy = pool.get_mut(handle).unwrap();
            enemy.apply_template(0, &grunt(), Vec2::new(10.0, 0.0), 1.0);
            enemy.health.take_damage(25);
            enemy.status.apply_slow(0.5, 3.0, false);
            enemy.status.apply_burn(4, 3.0, 0.5, true);
        }
        pool.release("grunt", handle).unwrap();

        let again = pool.acquire("grunt", Vec2::ZERO, 0.0, None).unwrap();
        let enemy = pool.get(again).unwrap();
        assert_eq!(enemy.health.current(), enemy.health.max());
        assert!(!enemy.status.is_slowed());
        assert!(!enemy.status.is_burning());
        assert!(enemy.mover.target().is_none());
    }
}
