//! Enemy placement.
//!
//! Pulls an instance from the enemy pool at a random spawn point, injects the
//! template for the requested type and subscribes the one-shot wave report.

use bevy::math::Vec2;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, warn};

use crate::combat::health::DeathListener;
use crate::enemy::{EnemyHandle, EnemyInstance, EnemyTypeConfig};
use crate::pool::{EntityPool, Factory, PoolError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpawnError {
    #[error("enemy type index {0} is not in the enemy table")]
    UnknownType(usize),
    #[error("no spawn points configured")]
    NoSpawnPoints,
    #[error(transparent)]
    Pool(#[from] PoolError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spawner {
    spawn_points: Vec<Vec2>,
    base_position: Vec2,
    /// How close to the base an enemy gets before it counts as arrived
    stop_distance: f32,
}

impl Spawner {
    pub fn new(spawn_points: Vec<Vec2>, base_position: Vec2, stop_distance: f32) -> Self {
        Self {
            spawn_points,
            base_position,
            stop_distance,
        }
    }

    pub fn spawn_points(&self) -> &[Vec2] {
        &self.spawn_points
    }

    pub fn base_position(&self) -> Vec2 {
        self.base_position
    }

    /// Pre-allocate one pool per enemy type. Shared tags are registered once.
    pub fn register_pools(pool: &mut EntityPool<EnemyInstance>, enemy_types: &[EnemyTypeConfig]) {
        for config in enemy_types {
            if pool.contains_tag(&config.pool_tag) {
                continue;
            }
            let tag = config.pool_tag.clone();
            let factory: Factory<EnemyInstance> = Box::new(move || EnemyInstance::new(&tag));
            if let Err(err) = pool.register(&config.pool_tag, factory, config.pool_size) {
                warn!(tag = %config.pool_tag, %err, "enemy pool registration skipped");
            }
        }
    }

    pub fn spawn<R: Rng + ?Sized>(
        &self,
        pool: &mut EntityPool<EnemyInstance>,
        enemy_types: &[EnemyTypeConfig],
        type_index: usize,
        rng: &mut R,
    ) -> Result<EnemyHandle, SpawnError> {
        let config = enemy_types
            .get(type_index)
            .ok_or(SpawnError::UnknownType(type_index))?;
        let point = *self
            .spawn_points
            .choose(rng)
            .ok_or(SpawnError::NoSpawnPoints)?;

        let tag = config.pool_tag.clone();
        let fallback: Factory<EnemyInstance> = Box::new(move || EnemyInstance::new(&tag));
        let handle = pool.acquire(&config.pool_tag, point, 0.0, Some(fallback))?;

        let Some(enemy) = pool.get_mut(handle) else {
            return Err(SpawnError::Pool(PoolError::NotActive {
                index: handle.index(),
                generation: handle.generation(),
            }));
        };
        enemy.apply_template(type_index, &config.template, self.base_position, self.stop_distance);
        enemy.health.subscribe_death(DeathListener::WaveReport);

        debug!(
            enemy = %config.template.name,
            x = point.x,
            y = point.y,
            "enemy spawned"
        );
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enemy::EnemyTemplate;
    use crate::pool::Poolable;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn types() -> Vec<EnemyTypeConfig> {
        vec![EnemyTypeConfig {
            template: EnemyTemplate {
                name: "Grunt".into(),
                max_health: 40,
                move_speed: 2.0,
                contact_damage: 5,
                reward: 3,
                radius: 0.5,
            },
            pool_tag: "grunt".into(),
            pool_size: 2,
            min_wave: 1,
            spawn_weight: 1.0,
        }]
    }

    #[test]
    fn test_spawn_places_enemy_at_spawn_point() {
        let enemy_types = types();
        let mut pool = EntityPool::new();
        Spawner::register_pools(&mut pool, &enemy_types);
        assert_eq!(pool.allocated("grunt"), 2);

        let spawner = Spawner::new(vec![Vec2::new(-10.0, 0.0)], Vec2::ZERO, 1.0);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        let handle = spawner.spawn(&mut pool, &enemy_types, 0, &mut rng).unwrap();

        let enemy = pool.get(handle).unwrap();
        assert_eq!(enemy.position, Vec2::new(-10.0, 0.0));
        assert_eq!(enemy.health.max(), 40);
        assert!(enemy.health.has_listener(DeathListener::WaveReport));
    }

    #[test]
    fn test_death_reports_exactly_once() {
        let enemy_types = types();
        let mut pool = EntityPool::new();
        Spawner::register_pools(&mut pool, &enemy_types);
        let spawner = Spawner::new(vec![Vec2::ZERO], Vec2::new(5.0, 0.0), 1.0);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        let handle = spawner.spawn(&mut pool, &enemy_types, 0, &mut rng).unwrap();

        let enemy = pool.get_mut(handle).unwrap();
        let death = enemy.health.take_damage(100).into_death().unwrap();
        assert_eq!(death.listeners, vec![DeathListener::WaveReport]);
        assert!(enemy.health.take_damage(100).into_death().is_none());
        assert!(!enemy.health.has_listener(DeathListener::WaveReport));
    }

    #[test]
    fn test_respawn_resubscribes_once() {
        let enemy_types = types();
        let mut pool = EntityPool::new();
        Spawner::register_pools(&mut pool, &enemy_types);
        let spawner = Spawner::new(vec![Vec2::ZERO], Vec2::new(5.0, 0.0), 1.0);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);

        let first = spawner.spawn(&mut pool, &enemy_types, 0, &mut rng).unwrap();
        pool.release("grunt", first).unwrap();
        let second = spawner.spawn(&mut pool, &enemy_types, 0, &mut rng).unwrap();
        let death = pool.get_mut(second).unwrap().health.kill().unwrap();
        assert_eq!(death.listeners.len(), 1);
    }

    #[test]
    fn test_spawn_errors() {
        let enemy_types = types();
        let mut pool = EntityPool::new();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);

        let spawner = Spawner::new(vec![Vec2::ZERO], Vec2::ZERO, 1.0);
        assert_eq!(
            spawner.spawn(&mut pool, &enemy_types, 3, &mut rng),
            Err(SpawnError::UnknownType(3))
        );

        let nowhere = Spawner::new(Vec::new(), Vec2::ZERO, 1.0);
        assert_eq!(
            nowhere.spawn(&mut pool, &enemy_types, 0, &mut rng),
            Err(SpawnError::NoSpawnPoints)
        );
    }

    #[test]
    fn test_unregistered_pool_uses_fallback() {
        let enemy_types = types();
        let mut pool: EntityPool<EnemyInstance> = EntityPool::new();
        let spawner = Spawner::new(vec![Vec2::ZERO], Vec2::ZERO, 1.0);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        let handle = spawner.spawn(&mut pool, &enemy_types, 0, &mut rng).unwrap();
        assert!(pool.contains_tag("grunt"));
        assert_eq!(pool.get(handle).unwrap().pool_tag, "grunt");
        assert_eq!(EnemyInstance::KIND.as_str(), "enemy");
    }
}
