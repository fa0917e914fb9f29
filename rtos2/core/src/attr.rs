//! Creation attributes for RTOS2 objects.
//!
//! Every attribute block carries optional caller-provided memory. A region
//! that is `Some` and non-empty selects static storage; `None` or an empty
//! slice leaves the allocation to the kernel heap.

use crate::{MutexAttrBits, Priority, ThreadAttrBits};

/// Returns the region when it selects static storage
pub fn static_region(mem: Option<&'static mut [u8]>) -> Option<&'static mut [u8]> {
    mem.filter(|region| !region.is_empty())
}

/// Length of an optional region, zero when absent
pub fn region_len(mem: &Option<&'static mut [u8]>) -> usize {
    mem.as_ref().map_or(0, |region| region.len())
}

/// Thread creation attributes
#[derive(Debug, Default)]
pub struct ThreadAttr {
    pub name: Option<&'static str>,
    pub attr_bits: ThreadAttrBits,
    /// Control block memory
    pub cb_mem: Option<&'static mut [u8]>,
    /// Stack memory; its length is the stack size in bytes
    pub stack_mem: Option<&'static mut [u8]>,
    /// Stack size in bytes when no stack memory is given
    pub stack_size: usize,
    /// Defaults to `Priority::NORMAL` when unset
    pub priority: Option<Priority>,
}

impl ThreadAttr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = bytes;
        self
    }

    pub fn joinable(mut self) -> Self {
        self.attr_bits |= ThreadAttrBits::JOINABLE;
        self
    }

    /// Place the control block and the stack in caller memory
    pub fn static_memory(mut self, cb_mem: &'static mut [u8], stack_mem: &'static mut [u8]) -> Self {
        self.cb_mem = Some(cb_mem);
        self.stack_mem = Some(stack_mem);
        self
    }
}

/// Event flags creation attributes
#[derive(Debug, Default)]
pub struct EventFlagsAttr {
    pub name: Option<&'static str>,
    pub cb_mem: Option<&'static mut [u8]>,
}

impl EventFlagsAttr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }

    pub fn cb_mem(mut self, cb_mem: &'static mut [u8]) -> Self {
        self.cb_mem = Some(cb_mem);
        self
    }
}

/// Semaphore creation attributes
#[derive(Debug, Default)]
pub struct SemaphoreAttr {
    pub name: Option<&'static str>,
    pub cb_mem: Option<&'static mut [u8]>,
}

impl SemaphoreAttr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }

    pub fn cb_mem(mut self, cb_mem: &'static mut [u8]) -> Self {
        self.cb_mem = Some(cb_mem);
        self
    }
}

/// Message queue creation attributes
#[derive(Debug, Default)]
pub struct MessageQueueAttr {
    pub name: Option<&'static str>,
    pub cb_mem: Option<&'static mut [u8]>,
    /// Message storage; must hold `msg_count * msg_size` bytes
    pub mq_mem: Option<&'static mut [u8]>,
}

impl MessageQueueAttr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }

    pub fn static_memory(mut self, cb_mem: &'static mut [u8], mq_mem: &'static mut [u8]) -> Self {
        self.cb_mem = Some(cb_mem);
        self.mq_mem = Some(mq_mem);
        self
    }
}

/// Mutex creation attributes
#[derive(Debug, Default)]
pub struct MutexAttr {
    pub name: Option<&'static str>,
    pub attr_bits: MutexAttrBits,
    pub cb_mem: Option<&'static mut [u8]>,
}

/// Timer creation attributes
#[derive(Debug, Default)]
pub struct TimerAttr {
    pub name: Option<&'static str>,
    pub cb_mem: Option<&'static mut [u8]>,
}

/// Memory pool creation attributes
#[derive(Debug, Default)]
pub struct MemoryPoolAttr {
    pub name: Option<&'static str>,
    pub cb_mem: Option<&'static mut [u8]>,
    pub mp_mem: Option<&'static mut [u8]>,
}

/// Timer behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerType {
    Once,
    Periodic,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_region_is_dynamic() {
        let empty: &'static mut [u8] = &mut [];
        assert!(static_region(Some(empty)).is_none());
        assert!(static_region(None).is_none());
    }

    #[test]
    fn test_thread_attr_builder() {
        let attr = ThreadAttr::new().name("worker").priority(Priority::HIGH).stack_size(1024);
        assert_eq!(attr.name, Some("worker"));
        assert_eq!(attr.priority, Some(Priority::HIGH));
        assert_eq!(attr.stack_size, 1024);
        assert!(!attr.attr_bits.contains(ThreadAttrBits::JOINABLE));
    }
}
