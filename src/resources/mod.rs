//! Player-side resource holders: the tower's mana pool and the currency wallet.
//!
//! Consumers see them only through [`ResourceProvider`], keyed by a resource
//! type string (`"Mana"`, `"Money"`). Unknown types are never affordable.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::{RESOURCE_MANA, RESOURCE_MONEY};

pub trait ResourceProvider {
    fn has_resource(&self, kind: &str, amount: i32) -> bool;

    /// Returns false without spending anything if the amount is not available.
    fn spend_resource(&mut self, kind: &str, amount: i32) -> bool;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManaPool {
    current: f32,
    max: f32,
    regen_per_sec: f32,
}

impl ManaPool {
    pub fn new(max: f32, regen_per_sec: f32) -> Self {
        let max = max.max(0.0);
        Self {
            current: max,
            max,
            regen_per_sec: regen_per_sec.max(0.0),
        }
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn regen_per_sec(&self) -> f32 {
        self.regen_per_sec
    }

    pub fn regenerate(&mut self, dt: f32) {
        self.current = (self.current + self.regen_per_sec * dt).min(self.max);
    }

    pub fn refill(&mut self) {
        self.current = self.max;
    }

    /// New limits from recomputed stats; current mana is clamped, not refilled.
    pub fn set_limits(&mut self, max: f32, regen_per_sec: f32) {
        self.max = max.max(0.0);
        self.regen_per_sec = regen_per_sec.max(0.0);
        self.current = self.current.min(self.max);
    }

    pub fn has(&self, amount: f32) -> bool {
        self.current >= amount
    }

    pub fn spend(&mut self, amount: f32) -> bool {
        if amount <= 0.0 {
            return true;
        }
        if !self.has(amount) {
            return false;
        }
        self.current -= amount;
        true
    }
}

/// Currency balance. `dirty` marks a change not yet flushed to the save store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    money: i32,
    #[serde(skip)]
    dirty: bool,
}

impl Wallet {
    pub fn new(money: i32) -> Self {
        Self {
            money: money.max(0),
            dirty: false,
        }
    }

    pub fn balance(&self) -> i32 {
        self.money
    }

    pub fn add(&mut self, amount: i32) {
        if amount <= 0 {
            return;
        }
        self.money = self.money.saturating_add(amount);
        self.dirty = true;
    }

    pub fn spend(&mut self, amount: i32) -> bool {
        if amount <= 0 {
            return true;
        }
        if self.money < amount {
            return false;
        }
        self.money -= amount;
        self.dirty = true;
        true
    }

    /// Returns whether there was an unflushed change, and clears the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerResources {
    pub mana: ManaPool,
    pub wallet: Wallet,
}

impl PlayerResources {
    pub fn new(mana: ManaPool, wallet: Wallet) -> Self {
        Self { mana, wallet }
    }
}

impl ResourceProvider for PlayerResources {
    fn has_resource(&self, kind: &str, amount: i32) -> bool {
        match kind {
            RESOURCE_MANA => self.mana.has(amount as f32),
            RESOURCE_MONEY => self.wallet.balance() >= amount,
            _ => {
                warn!(kind, "unknown resource type");
                false
            }
        }
    }

    fn spend_resource(&mut self, kind: &str, amount: i32) -> bool {
        match kind {
            RESOURCE_MANA => self.mana.spend(amount as f32),
            RESOURCE_MONEY => self.wallet.spend(amount),
            _ => {
                warn!(kind, "unknown resource type");
                false
            }
        }
    }
}
