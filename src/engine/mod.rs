//! Simulation root and engine embedding.
//!
//! [`Simulation`] owns every service (pools, wave loop, tower, skills,
//! resources, save store) and advances them in one fixed order per tick:
//!
//! 1. clock, mana regen, tower buff countdowns
//! 2. wave loop, then spawns it asked for
//! 3. enemy status effects; burn deaths resolve immediately
//! 4. enemy movement; arrivals damage the base and resolve as deaths
//! 5. projectile flight, collision, expiry and misses
//! 6. tower retarget and attack
//! 7. wallet flush to the save store
//!
//! A death is fully processed (listeners, reward, events) before the entity
//! goes back to its pool, so nothing later in the same tick sees it active.
//!
//! [`SimulationPlugin`] wraps it for a Bevy app.

pub mod config;
pub mod events;
pub mod plugin;
pub mod simulation;

pub use config::{ConfigError, GlobalUpgradeCosts, Point2, SimConfig};
pub use events::{DeathCause, SimEvent};
pub use plugin::{SimulationPlugin, SimulationResource};
pub use simulation::{Simulation, UpgradeRefusal};
