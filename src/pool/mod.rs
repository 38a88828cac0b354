//! Tag-keyed entity recycling.
//!
//! Instances are allocated once and afterwards only flip between active and
//! inactive. An exhausted tag grows by exactly one slot per acquire; the new
//! slot joins the free queue the first time it is released.
//!
//! Handles carry a generation counter that is bumped on every release, so a
//! reference held past an instance's death never resolves to its next life.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use bevy::math::Vec2;
use tracing::{debug, warn};

use crate::constants::FALLBACK_POOL_SIZE;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("no pool registered for tag '{0}'")]
    PoolNotFound(String),
    #[error("pool tag '{0}' is already registered")]
    AlreadyRegistered(String),
    #[error("slot {index} (generation {generation}) is not active")]
    NotActive { index: u32, generation: u32 },
    #[error("instance belongs to tag '{actual}', not '{requested}'")]
    TagMismatch { requested: String, actual: String },
}

/// What a pooled instance is, fixed at compile time per pooled type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Enemy,
    Projectile,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Enemy => "enemy",
            EntityKind::Projectile => "projectile",
        }
    }
}

/// Hooks a pooled type runs at the edges of its activation cycle.
pub trait Poolable {
    const KIND: EntityKind;

    /// Reset gameplay state to activation defaults at the given placement.
    fn on_spawn(&mut self, position: Vec2, rotation: f32);

    fn on_despawn(&mut self) {}
}

pub type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;

/// Generation-checked reference to a pooled instance.
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}v{})", self.index, self.generation)
    }
}

struct Slot<T> {
    tag: usize,
    generation: u32,
    active: bool,
    value: T,
}

struct TagQueue<T> {
    name: String,
    factory: Factory<T>,
    free: VecDeque<usize>,
    allocated: usize,
}

/// Recycling store for one pooled type, partitioned by tag.
pub struct EntityPool<T> {
    slots: Vec<Slot<T>>,
    tags: Vec<TagQueue<T>>,
    by_name: HashMap<String, usize>,
}

impl<T> Default for EntityPool<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            tags: Vec::new(),
            by_name: HashMap::new(),
        }
    }
}

impl<T: Poolable> EntityPool<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-allocate `initial_size` inactive instances under `tag`.
    pub fn register(
        &mut self,
        tag: &str,
        factory: Factory<T>,
        initial_size: usize,
    ) -> Result<(), PoolError> {
        if self.by_name.contains_key(tag) {
            warn!(tag, kind = T::KIND.as_str(), "pool already registered, ignoring");
            return Err(PoolError::AlreadyRegistered(tag.to_string()));
        }

        let tag_index = self.tags.len();
        let mut queue = TagQueue {
            name: tag.to_string(),
            factory,
            free: VecDeque::with_capacity(initial_size),
            allocated: 0,
        };
        for _ in 0..initial_size {
            let slot_index = self.slots.len();
            self.slots.push(Slot {
                tag: tag_index,
                generation: 0,
                active: false,
                value: (queue.factory)(),
            });
            queue.free.push_back(slot_index);
            queue.allocated += 1;
        }

        debug!(tag, initial_size, "pool registered");
        self.tags.push(queue);
        self.by_name.insert(tag.to_string(), tag_index);
        Ok(())
    }

    /// Activate an instance of `tag` at the given placement.
    ///
    /// An unregistered tag is registered on the fly when `fallback` is given.
    /// An empty queue synthesizes one extra instance from `fallback`, or the
    /// registered factory when no fallback is supplied.
    pub fn acquire(
        &mut self,
        tag: &str,
        position: Vec2,
        rotation: f32,
        fallback: Option<Factory<T>>,
    ) -> Result<Handle<T>, PoolError> {
        let mut fallback = fallback;
        let tag_index = match self.by_name.get(tag).copied() {
            Some(index) => index,
            None => {
                let Some(factory) = fallback.take() else {
                    warn!(tag, "acquire from unregistered pool");
                    return Err(PoolError::PoolNotFound(tag.to_string()));
                };
                self.register(tag, factory, FALLBACK_POOL_SIZE)?;
                self.tags.len() - 1
            }
        };

        let slot_index = match self.tags[tag_index].free.pop_front() {
            Some(index) => index,
            None => {
                let queue = &mut self.tags[tag_index];
                let value = match &fallback {
                    Some(factory) => factory(),
                    None => (queue.factory)(),
                };
                queue.allocated += 1;
                debug!(
                    tag,
                    kind = T::KIND.as_str(),
                    allocated = queue.allocated,
                    "pool exhausted, grew by one"
                );
                self.slots.push(Slot {
                    tag: tag_index,
                    generation: 0,
                    active: false,
                    value,
                });
                self.slots.len() - 1
            }
        };

        let slot = &mut self.slots[slot_index];
        slot.active = true;
        slot.value.on_spawn(position, rotation);
        Ok(Handle::new(slot_index as u32, slot.generation))
    }

    /// Deactivate `handle` and queue it for reuse under `tag`.
    pub fn release(&mut self, tag: &str, handle: Handle<T>) -> Result<(), PoolError> {
        let Some(&tag_index) = self.by_name.get(tag) else {
            warn!(tag, ?handle, "release to unregistered pool");
            return Err(PoolError::PoolNotFound(tag.to_string()));
        };

        let slot = match self.slots.get_mut(handle.index as usize) {
            Some(slot) if slot.active && slot.generation == handle.generation => slot,
            _ => {
                warn!(tag, ?handle, "release of inactive instance ignored");
                return Err(PoolError::NotActive {
                    index: handle.index,
                    generation: handle.generation,
                });
            }
        };

        if slot.tag != tag_index {
            let actual = self.tags[slot.tag].name.clone();
            warn!(tag, actual = %actual, "release to wrong pool ignored");
            return Err(PoolError::TagMismatch {
                requested: tag.to_string(),
                actual,
            });
        }

        slot.active = false;
        slot.generation = slot.generation.wrapping_add(1);
        slot.value.on_despawn();
        self.tags[tag_index].free.push_back(handle.index as usize);
        Ok(())
    }

    /// Release using the tag the instance was acquired under.
    pub fn release_handle(&mut self, handle: Handle<T>) -> Result<(), PoolError> {
        let tag = self
            .tag_of(handle)
            .map(str::to_string)
            .ok_or(PoolError::NotActive {
                index: handle.index,
                generation: handle.generation,
            })?;
        self.release(&tag, handle)
    }

    /// Force-release every active instance across all tags.
    pub fn reset_all(&mut self) -> usize {
        let mut released = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if !slot.active {
                continue;
            }
            slot.active = false;
            slot.generation = slot.generation.wrapping_add(1);
            slot.value.on_despawn();
            self.tags[slot.tag].free.push_back(index);
            released += 1;
        }
        debug!(released, "pool reset");
        released
    }
}

impl<T> EntityPool<T> {
    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        self.slots
            .get(handle.index as usize)
            .filter(|s| s.active && s.generation == handle.generation)
            .map(|s| &s.value)
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|s| s.active && s.generation == handle.generation)
            .map(|s| &mut s.value)
    }

    pub fn is_active(&self, handle: Handle<T>) -> bool {
        self.get(handle).is_some()
    }

    pub fn tag_of(&self, handle: Handle<T>) -> Option<&str> {
        self.slots
            .get(handle.index as usize)
            .filter(|s| s.active && s.generation == handle.generation)
            .map(|s| self.tags[s.tag].name.as_str())
    }

    pub fn iter_active(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.active)
            .map(|(i, s)| (Handle::new(i as u32, s.generation), &s.value))
    }

    /// Snapshot of active handles, for loops that need other borrows per step.
    pub fn active_handles(&self) -> Vec<Handle<T>> {
        self.iter_active().map(|(handle, _)| handle).collect()
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.active).count()
    }

    pub fn contains_tag(&self, tag: &str) -> bool {
        self.by_name.contains_key(tag)
    }

    /// Total instances ever allocated for `tag`.
    pub fn allocated(&self, tag: &str) -> usize {
        self.by_name
            .get(tag)
            .map_or(0, |&index| self.tags[index].allocated)
    }

    /// Instances currently queued for `tag`.
    pub fn available(&self, tag: &str) -> usize {
        self.by_name
            .get(tag)
            .map_or(0, |&index| self.tags[index].free.len())
    }
}
