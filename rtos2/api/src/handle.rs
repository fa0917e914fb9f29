//! Typed object ids over generation-checked arenas.
//!
//! An id names a slot and the generation the slot had when the object was
//! created. Deleting an object bumps the generation, so a stale id never
//! resolves to whatever object reuses the slot later.

use alloc::vec::Vec;
use core::cell::RefCell;

use critical_section::Mutex;

/// Slot index plus generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Key {
    index: u32,
    generation: u32,
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot arena with a free list
pub(crate) struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
}

impl<T> Arena<T> {
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    pub(crate) fn insert(&mut self, value: T) -> Key {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return Key {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        Key { index, generation: 0 }
    }

    pub(crate) fn get(&self, key: Key) -> Option<&T> {
        let slot = self.slots.get(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.value.as_ref()
    }

    pub(crate) fn remove(&mut self, key: Key) -> Option<T> {
        let slot = self.slots.get_mut(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(key.index);
        Some(value)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (Key, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|value| {
                (
                    Key {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    value,
                )
            })
        })
    }
}

/// Arena shared between threads and interrupt handlers
pub(crate) struct Registry<T> {
    arena: Mutex<RefCell<Arena<T>>>,
}

impl<T> Registry<T> {
    pub(crate) const fn new() -> Self {
        Self {
            arena: Mutex::new(RefCell::new(Arena::new())),
        }
    }

    pub(crate) fn with<R>(&self, f: impl FnOnce(&mut Arena<T>) -> R) -> R {
        critical_section::with(|cs| f(&mut self.arena.borrow_ref_mut(cs)))
    }

    pub(crate) fn insert(&self, value: T) -> Key {
        self.with(|arena| arena.insert(value))
    }

    pub(crate) fn remove(&self, key: Key) -> Option<T> {
        self.with(|arena| arena.remove(key))
    }
}

impl<T: Copy> Registry<T> {
    /// Copy of the record named by `key`, if it is still live
    pub(crate) fn lookup(&self, key: Key) -> Option<T> {
        self.with(|arena| arena.get(key).copied())
    }
}

macro_rules! object_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub(crate) Key);
    };
}

object_id!(
    /// Thread created through the layer
    ThreadId
);
object_id!(
    /// Event flags object
    EventFlagsId
);
object_id!(
    /// Counting semaphore
    SemaphoreId
);
object_id!(
    /// Message queue
    MessageQueueId
);
