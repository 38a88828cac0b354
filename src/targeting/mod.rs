//! Target selection among live candidates in range.
//!
//! Ties resolve to the first candidate in scan order. Strict comparisons keep
//! that order stable, so repeated queries over the same board pick the same
//! target.

use std::ops::BitOr;

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use crate::enemy::{EnemyHandle, EnemyInstance};

/// Collision/query layer bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NONE: LayerMask = LayerMask(0);
    pub const ENEMY: LayerMask = LayerMask(1);
    pub const PROJECTILE: LayerMask = LayerMask(1 << 1);
    pub const ALL: LayerMask = LayerMask(u32::MAX);

    pub fn intersects(self, other: LayerMask) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for LayerMask {
    type Output = LayerMask;

    fn bitor(self, rhs: LayerMask) -> LayerMask {
        LayerMask(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetPriority {
    #[default]
    Nearest,
    Farthest,
    Strongest,
    Weakest,
}

impl TargetPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetPriority::Nearest => "nearest",
            TargetPriority::Farthest => "farthest",
            TargetPriority::Strongest => "strongest",
            TargetPriority::Weakest => "weakest",
        }
    }
}

/// Snapshot of one queryable entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub handle: EnemyHandle,
    pub position: Vec2,
    pub health: i32,
    pub alive: bool,
    pub layers: LayerMask,
}

impl Candidate {
    pub fn from_enemy(handle: EnemyHandle, enemy: &EnemyInstance) -> Self {
        Self {
            handle,
            position: enemy.position,
            health: enemy.health.current(),
            alive: enemy.is_alive(),
            layers: enemy.layers,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetFinder {
    priority: TargetPriority,
}

impl TargetFinder {
    pub fn new(priority: TargetPriority) -> Self {
        Self { priority }
    }

    pub fn priority(&self) -> TargetPriority {
        self.priority
    }

    /// Affects later queries only.
    pub fn set_priority(&mut self, priority: TargetPriority) {
        self.priority = priority;
    }

    pub fn find_best<I>(
        &self,
        origin: Vec2,
        range: f32,
        filter: LayerMask,
        candidates: I,
    ) -> Option<EnemyHandle>
    where
        I: IntoIterator<Item = Candidate>,
    {
        let live: Vec<Candidate> = candidates
            .into_iter()
            .filter(|c| c.alive && c.health > 0)
            .filter(|c| c.layers.intersects(filter))
            .filter(|c| c.position.distance(origin) <= range)
            .collect();
        let first = live.first()?.handle;

        let best = match self.priority {
            TargetPriority::Nearest => {
                let mut best = None;
                let mut best_distance = f32::INFINITY;
                for c in &live {
                    let d = c.position.distance(origin);
                    if d < best_distance {
                        best_distance = d;
                        best = Some(c.handle);
                    }
                }
                best
            }
            TargetPriority::Farthest => {
                let mut best = None;
                let mut best_distance = f32::NEG_INFINITY;
                for c in &live {
                    let d = c.position.distance(origin);
                    if d > best_distance {
                        best_distance = d;
                        best = Some(c.handle);
                    }
                }
                best
            }
            TargetPriority::Strongest => {
                let mut best = None;
                let mut best_health = 0;
                for c in &live {
                    if c.health > best_health {
                        best_health = c.health;
                        best = Some(c.handle);
                    }
                }
                best
            }
            TargetPriority::Weakest => {
                let mut best = None;
                let mut best_health = i32::MAX;
                for c in &live {
                    if c.health < best_health {
                        best_health = c.health;
                        best = Some(c.handle);
                    }
                }
                best
            }
        };

        best.or(Some(first))
    }
}
