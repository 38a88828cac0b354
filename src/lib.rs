//! Tower Defense - Combat Simulation Core
//!
//! Deterministic, engine-agnostic logic for an endless tower defense:
//! - Entity pooling with generation-checked handles
//! - Health, death listeners, and timed status effects
//! - Escalating wave schedule with weighted enemy selection
//! - Target selection (nearest, farthest, strongest, weakest)
//! - Projectiles (homing and ballistic) and shot patterns
//! - Tower models, upgrades, and derived runtime stats
//! - Resource-gated, cooldown-gated skills
//! - Bevy plugin wrapper for hosting the simulation in an app

pub mod combat;
pub mod constants;
pub mod enemy;
pub mod engine;
pub mod logging;
pub mod movement;
pub mod persistence;
pub mod pool;
pub mod projectile;
pub mod resources;
pub mod shooter;
pub mod skills;
pub mod spawner;
pub mod targeting;
pub mod tower;
pub mod waves;
