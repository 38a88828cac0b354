//! Per-tick movement toward a target.
//!
//! Two algorithms:
//! - Homing: re-aims at the live target position every tick
//! - Ballistic: freezes its direction when the target is assigned and keeps
//!   flying that way no matter where the target goes afterwards
//!
//! Stun beats everything: a stunned mover reports `Stunned` and has zero
//! velocity. Effective speed is recomputed every tick from the base speed and
//! the current slow multiplier, so nothing drifts after a slow expires.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use crate::combat::status::StatusEffectState;
use crate::enemy::EnemyHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveMode {
    Homing,
    Ballistic,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoverState {
    #[default]
    Idle,
    Moving,
    Stunned,
    ReachedTarget,
}

/// What a mover is heading for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveTarget {
    Enemy(EnemyHandle),
    Point(Vec2),
}

/// Result of one movement step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MoveStep {
    /// True only on the tick the reach transition happens
    pub reached: bool,
    pub distance_moved: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mover {
    mode: MoveMode,
    base_speed: f32,
    stop_on_reach: bool,
    stop_distance: f32,
    target: Option<MoveTarget>,
    frozen_direction: Option<Vec2>,
    velocity: Vec2,
    state: MoverState,
}

impl Default for Mover {
    fn default() -> Self {
        Self {
            mode: MoveMode::Homing,
            base_speed: 0.0,
            stop_on_reach: false,
            stop_distance: 0.0,
            target: None,
            frozen_direction: None,
            velocity: Vec2::ZERO,
            state: MoverState::Idle,
        }
    }
}

impl Mover {
    pub fn new(mode: MoveMode, speed: f32) -> Self {
        let mut mover = Self::default();
        mover.configure(mode, speed);
        mover
    }

    pub fn configure(&mut self, mode: MoveMode, speed: f32) {
        if mode != self.mode {
            self.frozen_direction = None;
        }
        self.mode = mode;
        self.base_speed = speed.max(0.0);
    }

    pub fn set_stop_on_reach(&mut self, enabled: bool, distance: f32) {
        self.stop_on_reach = enabled;
        self.stop_distance = distance.max(0.0);
    }

    /// Assign a new target (or clear it). Always drops any frozen direction;
    /// a ballistic mover re-freezes toward `target_position` right away.
    pub fn set_target(
        &mut self,
        target: Option<MoveTarget>,
        from: Vec2,
        target_position: Option<Vec2>,
    ) {
        self.target = target;
        self.frozen_direction = None;
        self.velocity = Vec2::ZERO;
        self.state = MoverState::Idle;

        if self.mode == MoveMode::Ballistic && target.is_some() {
            if let Some(goal) = target_position {
                self.frozen_direction = Some((goal - from).normalize_or_zero());
            }
        }
    }

    /// Override the frozen ballistic heading, e.g. for fan shots.
    pub fn freeze_direction(&mut self, direction: Vec2) {
        self.frozen_direction = Some(direction.normalize_or_zero());
    }

    pub fn reset(&mut self) {
        self.target = None;
        self.frozen_direction = None;
        self.velocity = Vec2::ZERO;
        self.state = MoverState::Idle;
    }

    pub fn mode(&self) -> MoveMode {
        self.mode
    }

    pub fn target(&self) -> Option<MoveTarget> {
        self.target
    }

    pub fn state(&self) -> MoverState {
        self.state
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn base_speed(&self) -> f32 {
        self.base_speed
    }

    pub fn frozen_direction(&self) -> Option<Vec2> {
        self.frozen_direction
    }

    pub fn current_speed(&self, status: &StatusEffectState) -> f32 {
        if status.is_stunned() {
            0.0
        } else {
            self.base_speed * status.speed_multiplier()
        }
    }

    /// Advance `position` by one tick. `target_position` is the resolved
    /// location of the current target, `None` if it no longer exists.
    pub fn tick(
        &mut self,
        dt: f32,
        position: &mut Vec2,
        target_position: Option<Vec2>,
        status: &StatusEffectState,
    ) -> MoveStep {
        if status.is_stunned() {
            self.velocity = Vec2::ZERO;
            self.state = MoverState::Stunned;
            return MoveStep::default();
        }
        if self.target.is_none() {
            self.halt();
            return MoveStep::default();
        }
        if self.state == MoverState::ReachedTarget {
            self.velocity = Vec2::ZERO;
            return MoveStep::default();
        }

        let speed = self.current_speed(status);
        let direction = match self.mode {
            MoveMode::Homing => {
                let Some(goal) = target_position else {
                    self.halt();
                    return MoveStep::default();
                };
                if self.within_stop_distance(*position, goal) {
                    return self.reach();
                }
                (goal - *position).normalize_or_zero()
            }
            MoveMode::Ballistic => match self.frozen_direction {
                Some(direction) => direction,
                None => {
                    let Some(goal) = target_position else {
                        self.halt();
                        return MoveStep::default();
                    };
                    let direction = (goal - *position).normalize_or_zero();
                    self.frozen_direction = Some(direction);
                    direction
                }
            },
        };

        let mut step = speed * dt;
        if self.stop_on_reach {
            if let Some(goal) = target_position {
                step = step.min(position.distance(goal));
            }
        }

        self.velocity = direction * speed;
        *position += direction * step;
        self.state = MoverState::Moving;

        let arrived = target_position.is_some_and(|goal| self.within_stop_distance(*position, goal));
        if arrived {
            let mut out = self.reach();
            out.distance_moved = step;
            return out;
        }
        MoveStep {
            reached: false,
            distance_moved: step,
        }
    }

    fn within_stop_distance(&self, position: Vec2, goal: Vec2) -> bool {
        self.stop_on_reach && position.distance(goal) <= self.stop_distance
    }

    fn reach(&mut self) -> MoveStep {
        self.velocity = Vec2::ZERO;
        self.state = MoverState::ReachedTarget;
        MoveStep {
            reached: true,
            distance_moved: 0.0,
        }
    }

    fn halt(&mut self) {
        self.velocity = Vec2::ZERO;
        self.state = MoverState::Idle;
    }
}
