//! Key/integer save store seam.
//!
//! The host owns the real storage. The simulation only ever reads and writes
//! flat integers through [`SaveStore`]; absent keys fall back to the default
//! the caller passes in.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engine::config::ConfigError;

pub trait SaveStore: Send + Sync {
    fn load_int(&self, key: &str, default: i32) -> i32;
    fn save_int(&mut self, key: &str, value: i32);
}

/// Key for a global upgrade level, e.g. `Global_Damage_Level`.
pub fn global_stat_key(stat: &str) -> String {
    format!("Global_{stat}_Level")
}

/// Key for a per-model upgrade level, e.g. `Model_cannon_Range_Level`.
pub fn model_stat_key(model_id: &str, stat: &str) -> String {
    format!("Model_{model_id}_{stat}_Level")
}

/// In-process store, used by the headless runner and in tests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStore {
    values: BTreeMap<String, i32>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, i32)>,
        K: Into<String>,
    {
        Self {
            values: values.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<i32> {
        self.values.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string(self)?)
    }

    /// A malformed snapshot is an error, never an empty store.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl SaveStore for MemoryStore {
    fn load_int(&self, key: &str, default: i32) -> i32 {
        self.values.get(key).copied().unwrap_or(default)
    }

    fn save_int(&mut self, key: &str, value: i32) {
        self.values.insert(key.to_string(), value);
    }
}
