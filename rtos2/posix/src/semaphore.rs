//! Simulated counting semaphores.

use rtos2_core::{NativeError, NativeResult, SemaphoreHandle, Storage, Ticks};

use crate::{Shared, LOG_TARGET};

pub(crate) struct Semaphore {
    count: u32,
    max: u32,
    heap_bytes: usize,
    _storage: Storage,
}

impl Shared {
    pub(crate) fn create_semaphore(&self, max: u32, initial: u32, storage: Storage) -> NativeResult<SemaphoreHandle> {
        if max == 0 || initial > max {
            return Err(NativeError::Invalid);
        }
        let heap_bytes = self.block_cost(&storage, self.config.semaphore_cb_size)?;
        let mut guard = self.state.lock();
        guard.heap.allocate(heap_bytes)?;
        let raw = guard.semaphores.insert(Semaphore {
            count: initial,
            max,
            heap_bytes,
            _storage: storage,
        });
        log::trace!(target: LOG_TARGET, "semaphore {} created ({}/{})", raw, initial, max);
        Ok(SemaphoreHandle::new(raw))
    }

    pub(crate) fn take(&self, sem: SemaphoreHandle, ticks: Ticks) -> NativeResult {
        let mut guard = self.state.lock();
        self.checkpoint(&mut guard);
        self.block_on(&mut guard, ticks, |state| {
            let Some(record) = state.semaphores.get_mut(sem.raw()) else {
                return Some(Err(NativeError::Invalid));
            };
            if record.count == 0 {
                return None;
            }
            record.count -= 1;
            Some(Ok(()))
        })
        .unwrap_or(Err(NativeError::WouldBlock))
    }

    pub(crate) fn take_from_isr(&self, sem: SemaphoreHandle) -> NativeResult<bool> {
        let mut guard = self.state.lock();
        let record = guard.semaphores.get_mut(sem.raw()).ok_or(NativeError::Invalid)?;
        if record.count == 0 {
            return Err(NativeError::Empty);
        }
        record.count -= 1;
        let woken = guard.any_blocked();
        drop(guard);
        self.notify();
        Ok(woken)
    }

    /// Returns whether a blocked task may have been woken
    pub(crate) fn give(&self, sem: SemaphoreHandle) -> NativeResult<bool> {
        let mut guard = self.state.lock();
        let record = guard.semaphores.get_mut(sem.raw()).ok_or(NativeError::Invalid)?;
        if record.count >= record.max {
            return Err(NativeError::Full);
        }
        record.count += 1;
        let woken = guard.any_blocked();
        drop(guard);
        self.notify();
        Ok(woken)
    }

    pub(crate) fn semaphore_count(&self, sem: SemaphoreHandle) -> u32 {
        let guard = self.state.lock();
        guard.semaphores.get(sem.raw()).map_or(0, |record| record.count)
    }

    pub(crate) fn delete_semaphore(&self, sem: SemaphoreHandle) {
        let mut guard = self.state.lock();
        if let Some(record) = guard.semaphores.remove(sem.raw()) {
            guard.heap.release(record.heap_bytes);
            drop(guard);
            self.notify();
            log::trace!(target: LOG_TARGET, "semaphore {} deleted", sem.raw());
        }
    }
}
