use bevy::prelude::Event;

use crate::enemy::EnemyHandle;
use crate::projectile::ProjectileHandle;
use crate::skills::ActivationRefusal;
use crate::tower::TowerRuntimeStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathCause {
    /// Health ran out under tower fire, a skill or a burn
    Killed,
    /// Walked into the base
    ReachedBase,
}

/// Everything the host may want to react to, in the order it happened.
#[derive(Debug, Clone, PartialEq, Event)]
pub enum SimEvent {
    WaveStarted {
        wave: u32,
        enemy_count: u32,
    },
    WaveCompleted {
        wave: u32,
    },
    EnemySpawned {
        enemy: EnemyHandle,
        enemy_type: usize,
    },
    EnemyDied {
        enemy: EnemyHandle,
        cause: DeathCause,
        reward: i32,
    },
    EnemyCountChanged {
        alive: u32,
    },
    BaseDamaged {
        amount: i32,
        remaining: i32,
    },
    GameOver {
        wave: u32,
    },
    ProjectileFired {
        projectile_id: String,
        count: usize,
    },
    ProjectileHit {
        projectile: ProjectileHandle,
        enemy: EnemyHandle,
        damage: i32,
    },
    ProjectileExpired {
        projectile: ProjectileHandle,
    },
    /// Reached its aim point without touching anything
    ProjectileMissed {
        projectile: ProjectileHandle,
    },
    SkillActivated {
        skill_id: String,
    },
    SkillRefused {
        skill_id: String,
        reason: ActivationRefusal,
    },
    StatsChanged {
        stats: TowerRuntimeStats,
    },
    MoneyChanged {
        balance: i32,
    },
}
