//! Centralized balance constants for the defense core.
//!
//! Defaults for templates and the wave curve live in `engine::config`;
//! these are the fixed numbers shared across modules.

// =====================================================
// Persistence keys
// =====================================================

/// Persisted wave counter
pub const KEY_CURRENT_WAVE: &str = "CurrentWave";

/// Persisted index of the active tower model
pub const KEY_ACTIVE_MODEL: &str = "LastActiveModel";

/// Persisted player currency
pub const KEY_PLAYER_MONEY: &str = "PlayerMoney";

/// Wave number used when nothing is persisted
pub const DEFAULT_START_WAVE: i32 = 1;

/// Currency granted on a fresh save
pub const DEFAULT_PLAYER_MONEY: i32 = 100;

// =====================================================
// Resources
// =====================================================

/// Resource type string for the tower's mana pool
pub const RESOURCE_MANA: &str = "Mana";

/// Resource type string for the player wallet
pub const RESOURCE_MONEY: &str = "Money";

// =====================================================
// Global upgrade increments
// =====================================================

/// Flat damage per global damage level
pub const GLOBAL_DAMAGE_PER_LEVEL: f32 = 5.0;

/// Attacks per second per global attack-speed level
pub const GLOBAL_ATTACK_SPEED_PER_LEVEL: f32 = 0.1;

/// Range per global range level
pub const GLOBAL_RANGE_PER_LEVEL: f32 = 10.0;

/// Max mana before any upgrades
pub const BASE_MAX_MANA: f32 = 100.0;

/// Max mana per global mana level
pub const GLOBAL_MAX_MANA_PER_LEVEL: f32 = 10.0;

/// Mana per second before any upgrades
pub const BASE_MANA_REGEN: f32 = 1.0;

/// Mana per second per global regen level
pub const GLOBAL_MANA_REGEN_PER_LEVEL: f32 = 0.2;

// =====================================================
// Health
// =====================================================

/// Below this fraction of max health an entity is considered critical
pub const CRITICAL_HEALTH_FRACTION: f32 = 0.25;

// =====================================================
// Pooling
// =====================================================

/// Slots pre-allocated when a tag is first seen through a fallback factory
pub const FALLBACK_POOL_SIZE: usize = 10;

// =====================================================
// Movement & collision
// =====================================================

/// Distance at which a projectile counts as having reached a point
pub const PROJECTILE_REACH_DISTANCE: f32 = 0.1;

/// Spacing between parallel shots
pub const PARALLEL_SHOT_SPACING: f32 = 0.3;

/// Stun policy used when an effect record does not say otherwise
pub const DEFAULT_STUN_REFRESHABLE: bool = true;
