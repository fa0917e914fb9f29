//! Primitives this layer does not provide.
//!
//! Mutexes, timers, memory pools and thread flags keep their full API so
//! application code compiles unchanged, but no object of these kinds can
//! ever exist. Creation always yields `None`. The id types wrap the empty
//! [`Unsupported`] type, so every other operation can only be called with
//! `None` and fails with `OsError::Unsupported`, reports 0 or `false`.

use core::fmt;

use rtos2_core::{
    FlagsOptions, MemoryPoolAttr, MutexAttr, NativeKernel, OsError, OsResult, TimerAttr, TimerType, Timeout,
};

use crate::handle::ThreadId;
use crate::thread::Threads;

/// Uninhabited; no value of this type can be constructed
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unsupported {}

impl fmt::Debug for Unsupported {
    fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

macro_rules! unsupported_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(Unsupported);
    };
}

unsupported_id!(
    /// Mutex id; never produced
    MutexId
);
unsupported_id!(
    /// Timer id; never produced
    TimerId
);
unsupported_id!(
    /// Memory pool id; never produced
    MemoryPoolId
);

/// Timer callback; receives the argument given at creation
pub type TimerFunc = fn(usize);

/// Mutex facade
#[derive(Debug, Clone, Copy, Default)]
pub struct Mutexes;

impl Mutexes {
    pub fn create(&self, _attr: Option<MutexAttr>) -> Option<MutexId> {
        None
    }

    pub fn get_name(&self, id: Option<MutexId>) -> Option<&'static str> {
        match id {
            None => None,
            Some(MutexId(never)) => match never {},
        }
    }

    pub fn acquire(&self, id: Option<MutexId>, _timeout: Timeout) -> OsResult {
        fail(id.map(|MutexId(never)| never))
    }

    pub fn release(&self, id: Option<MutexId>) -> OsResult {
        fail(id.map(|MutexId(never)| never))
    }

    pub fn get_owner(&self, id: Option<MutexId>) -> Option<ThreadId> {
        match id {
            None => None,
            Some(MutexId(never)) => match never {},
        }
    }

    pub fn delete(&self, id: Option<MutexId>) -> OsResult {
        fail(id.map(|MutexId(never)| never))
    }
}

/// Software timer facade
#[derive(Debug, Clone, Copy, Default)]
pub struct Timers;

impl Timers {
    pub fn create(
        &self,
        _func: Option<TimerFunc>,
        _kind: TimerType,
        _argument: usize,
        _attr: Option<TimerAttr>,
    ) -> Option<TimerId> {
        None
    }

    pub fn get_name(&self, id: Option<TimerId>) -> Option<&'static str> {
        match id {
            None => None,
            Some(TimerId(never)) => match never {},
        }
    }

    pub fn start(&self, id: Option<TimerId>, _ticks: u32) -> OsResult {
        fail(id.map(|TimerId(never)| never))
    }

    pub fn stop(&self, id: Option<TimerId>) -> OsResult {
        fail(id.map(|TimerId(never)| never))
    }

    pub fn is_running(&self, id: Option<TimerId>) -> bool {
        match id {
            None => false,
            Some(TimerId(never)) => match never {},
        }
    }

    pub fn delete(&self, id: Option<TimerId>) -> OsResult {
        fail(id.map(|TimerId(never)| never))
    }
}

/// Fixed-size block pool facade
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryPools;

impl MemoryPools {
    pub fn create(&self, _block_count: u32, _block_size: u32, _attr: Option<MemoryPoolAttr>) -> Option<MemoryPoolId> {
        None
    }

    pub fn get_name(&self, id: Option<MemoryPoolId>) -> Option<&'static str> {
        match id {
            None => None,
            Some(MemoryPoolId(never)) => match never {},
        }
    }

    /// Never hands out a block
    pub fn alloc(&self, id: Option<MemoryPoolId>, _timeout: Timeout) -> Option<&'static mut [u8]> {
        match id {
            None => None,
            Some(MemoryPoolId(never)) => match never {},
        }
    }

    pub fn free(&self, id: Option<MemoryPoolId>, _block: &'static mut [u8]) -> OsResult {
        fail(id.map(|MemoryPoolId(never)| never))
    }

    pub fn get_capacity(&self, id: Option<MemoryPoolId>) -> u32 {
        zero(id)
    }

    pub fn get_block_size(&self, id: Option<MemoryPoolId>) -> u32 {
        zero(id)
    }

    pub fn get_count(&self, id: Option<MemoryPoolId>) -> u32 {
        zero(id)
    }

    pub fn get_space(&self, id: Option<MemoryPoolId>) -> u32 {
        zero(id)
    }

    pub fn delete(&self, id: Option<MemoryPoolId>) -> OsResult {
        fail(id.map(|MemoryPoolId(never)| never))
    }
}

fn fail(id: Option<Unsupported>) -> OsResult {
    match id {
        None => Err(OsError::Unsupported),
        Some(never) => match never {},
    }
}

fn zero(id: Option<MemoryPoolId>) -> u32 {
    match id {
        None => 0,
        Some(MemoryPoolId(never)) => match never {},
    }
}

/// Thread flags are not provided; every call fails with `Unsupported`,
/// whose flags encoding is `0xFFFF_FFFF`.
impl<'a, K: NativeKernel> Threads<'a, K> {
    pub fn flags_set(&self, _id: ThreadId, _flags: u32) -> OsResult<u32> {
        Err(OsError::Unsupported)
    }

    pub fn flags_clear(&self, _flags: u32) -> OsResult<u32> {
        Err(OsError::Unsupported)
    }

    pub fn flags_get(&self) -> OsResult<u32> {
        Err(OsError::Unsupported)
    }

    pub fn flags_wait(&self, _flags: u32, _options: FlagsOptions, _timeout: Timeout) -> OsResult<u32> {
        Err(OsError::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creation_yields_nothing() {
        assert!(Mutexes.create(None).is_none());
        assert!(Timers.create(None, TimerType::Periodic, 0, None).is_none());
        assert!(MemoryPools.create(4, 16, None).is_none());
    }

    #[test]
    fn test_absent_ids_fail() {
        assert_eq!(Mutexes.acquire(None, Timeout::FOREVER), Err(OsError::Unsupported));
        assert_eq!(Timers.start(None, 10), Err(OsError::Unsupported));
        assert!(!Timers.is_running(None));
        assert_eq!(MemoryPools.get_capacity(None), 0);
        assert!(MemoryPools.alloc(None, Timeout::POLL).is_none());
    }
}
