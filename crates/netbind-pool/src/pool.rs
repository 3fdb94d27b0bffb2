//! Generic slot pool with init/cleanup hooks and bounded capacity.
//!
//! Elements are never dropped while the pool lives: a released element
//! is cleaned up in place and handed out again by a later `acquire`.
//! Reuse is LIFO, so the most recently released slot is the next one
//! handed out.

use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::key::SlotKey;
use tracing::trace;

/// An element type that can live in a [`SlotPool`].
///
/// `E` is the environment the hooks need (typically mutable access to
/// whatever the element holds references into).
pub trait Poolable<E: ?Sized>: Default {
    /// Runs once when a slot is first allocated.
    fn on_init(&mut self, _env: &mut E) {}

    /// Runs on every release, and on every in-use element when the pool
    /// is swept. Must leave the element ready for reuse.
    fn on_cleanup(&mut self, env: &mut E);
}

struct Slot<T> {
    generation: u32,
    occupied: bool,
    value: T,
}

/// A bounded or unbounded pool of recycled elements addressed by
/// generation-tagged [`SlotKey`]s.
///
/// Stale keys (released, or from a previous generation) resolve to
/// `None`. Double release is a safe no-op.
pub struct SlotPool<T> {
    name: &'static str,
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
    in_use: usize,
    max_in_use: Option<usize>,
}

impl<T> SlotPool<T> {
    /// Create a pool. Storage for `config.preallocate` slots is reserved
    /// up front.
    pub fn new(name: &'static str, config: &PoolConfig) -> Result<Self, PoolError> {
        let mut slots = Vec::new();
        let mut free_list = Vec::new();
        slots
            .try_reserve(config.preallocate)
            .and_then(|()| free_list.try_reserve(config.preallocate))
            .map_err(|_| PoolError::AllocationFailed { pool: name })?;
        Ok(Self {
            name,
            slots,
            free_list,
            in_use: 0,
            max_in_use: config.max_in_use,
        })
    }

    /// Pool name, used in errors and logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of elements currently acquired.
    pub fn in_use(&self) -> usize {
        self.in_use
    }

    /// Number of slots ever allocated (in use, free, or retired).
    pub fn allocated(&self) -> usize {
        self.slots.len()
    }

    /// Configured maximum number of elements in use.
    pub fn capacity(&self) -> Option<usize> {
        self.max_in_use
    }

    /// Acquire a clean element and return its key.
    ///
    /// Reuses the most recently released slot when one is free; otherwise
    /// grows the storage and runs [`Poolable::on_init`] on the new
    /// element.
    pub fn acquire<E: ?Sized>(&mut self, env: &mut E) -> Result<SlotKey, PoolError>
    where
        T: Poolable<E>,
    {
        if let Some(max) = self.max_in_use {
            if self.in_use >= max {
                return Err(PoolError::Exhausted {
                    pool: self.name,
                    capacity: max,
                });
            }
        }

        let key = if let Some(slot_idx) = self.free_list.pop() {
            let slot = &mut self.slots[slot_idx as usize];
            slot.occupied = true;
            SlotKey::new(slot_idx, slot.generation)
        } else {
            let slot_idx = u32::try_from(self.slots.len())
                .map_err(|_| PoolError::AllocationFailed { pool: self.name })?;
            self.slots
                .try_reserve(1)
                .and_then(|()| self.free_list.try_reserve(1))
                .map_err(|_| PoolError::AllocationFailed { pool: self.name })?;
            let mut value = T::default();
            value.on_init(env);
            self.slots.push(Slot {
                generation: 0,
                occupied: true,
                value,
            });
            SlotKey::new(slot_idx, 0)
        };
        self.in_use += 1;
        trace!(pool = self.name, %key, "acquired");
        Ok(key)
    }

    /// Whether `key` refers to an element that is currently acquired.
    pub fn contains(&self, key: SlotKey) -> bool {
        self.get(key).is_some()
    }

    /// Shared access to an acquired element.
    pub fn get(&self, key: SlotKey) -> Option<&T> {
        let slot = self.slots.get(key.slot() as usize)?;
        if !slot.occupied || slot.generation != key.generation() {
            return None;
        }
        Some(&slot.value)
    }

    /// Mutable access to an acquired element.
    pub fn get_mut(&mut self, key: SlotKey) -> Option<&mut T> {
        let slot = self.slots.get_mut(key.slot() as usize)?;
        if !slot.occupied || slot.generation != key.generation() {
            return None;
        }
        Some(&mut slot.value)
    }

    /// Release an element: run [`Poolable::on_cleanup`] and return the
    /// slot to the free list.
    ///
    /// Returns `false` for stale keys. A slot whose generation would wrap
    /// to 0 is retired instead of recycled, so keys from generation 0 can
    /// never resolve again.
    pub fn release<E: ?Sized>(&mut self, key: SlotKey, env: &mut E) -> bool
    where
        T: Poolable<E>,
    {
        let Some(slot) = self.slots.get_mut(key.slot() as usize) else {
            return false;
        };
        if !slot.occupied || slot.generation != key.generation() {
            return false;
        }
        slot.value.on_cleanup(env);
        slot.occupied = false;
        slot.generation = slot.generation.wrapping_add(1);
        if slot.generation != 0 {
            self.free_list.push(key.slot());
        }
        self.in_use -= 1;
        trace!(pool = self.name, %key, "released");
        true
    }

    /// Keys of every acquired element, in slot order.
    pub fn keys(&self) -> Vec<SlotKey> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.occupied)
            .map(|(idx, slot)| SlotKey::new(idx as u32, slot.generation))
            .collect()
    }

    /// Release every acquired element. Returns how many were released.
    pub fn sweep<E: ?Sized>(&mut self, env: &mut E) -> usize
    where
        T: Poolable<E>,
    {
        let keys = self.keys();
        keys.into_iter().filter(|&key| self.release(key, env)).count()
    }
}
