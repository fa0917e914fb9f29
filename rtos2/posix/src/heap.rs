//! Accounting model of the native heap.
//!
//! Only sizes are tracked; the simulated objects keep their memory in Rust
//! collections. What matters is that dynamic creation fails the same way it
//! does on target: before heap regions are defined, and once they run out.

use rtos2_core::{HeapRegion, NativeError, NativeResult};

#[derive(Debug, Default)]
pub(crate) struct Heap {
    capacity: usize,
    used: usize,
}

impl Heap {
    /// Replace the heap with the given regions
    pub(crate) fn define(&mut self, regions: &[HeapRegion]) {
        self.capacity = regions.iter().map(|region| region.size).sum();
        self.used = 0;
    }

    pub(crate) fn allocate(&mut self, bytes: usize) -> NativeResult {
        let used = self.used.checked_add(bytes).ok_or(NativeError::AllocFailed)?;
        if used > self.capacity {
            return Err(NativeError::AllocFailed);
        }
        self.used = used;
        Ok(())
    }

    pub(crate) fn release(&mut self, bytes: usize) {
        self.used = self.used.saturating_sub(bytes);
    }

    pub(crate) fn free_bytes(&self) -> usize {
        self.capacity - self.used
    }
}
