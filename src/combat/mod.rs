//! Damage, healing and timed status effects.

pub mod effects;
pub mod health;
pub mod status;

pub use effects::{apply_hit_effects, HitEffect, HitReport};
pub use health::{DamageOutcome, Death, DeathListener, HealthState};
pub use status::{BurnState, SlowState, StatusEffectState, StatusTick, StunState};
