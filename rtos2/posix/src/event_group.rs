//! Simulated event groups.

use rtos2_core::{EventGroupHandle, NativeError, NativeResult, Storage, Ticks};

use crate::{Shared, LOG_TARGET};

pub(crate) struct EventGroup {
    bits: u32,
    heap_bytes: usize,
    _storage: Storage,
}

impl Shared {
    pub(crate) fn create_event_group(&self, storage: Storage) -> NativeResult<EventGroupHandle> {
        let heap_bytes = self.block_cost(&storage, self.config.event_group_cb_size)?;
        let mut guard = self.state.lock();
        guard.heap.allocate(heap_bytes)?;
        let raw = guard.groups.insert(EventGroup {
            bits: 0,
            heap_bytes,
            _storage: storage,
        });
        log::trace!(target: LOG_TARGET, "event group {} created", raw);
        Ok(EventGroupHandle::new(raw))
    }

    pub(crate) fn set_bits(&self, group: EventGroupHandle, bits: u32) -> u32 {
        let mask = self.config.event_bits_mask();
        let mut guard = self.state.lock();
        let Some(record) = guard.groups.get_mut(group.raw()) else {
            return 0;
        };
        record.bits |= bits & mask;
        let now = record.bits;
        drop(guard);
        self.notify();
        now
    }

    pub(crate) fn set_bits_from_isr(&self, group: EventGroupHandle, bits: u32) -> NativeResult<bool> {
        let mask = self.config.event_bits_mask();
        let mut guard = self.state.lock();
        let record = guard.groups.get_mut(group.raw()).ok_or(NativeError::Invalid)?;
        record.bits |= bits & mask;
        let woken = guard.any_blocked();
        drop(guard);
        self.notify();
        Ok(woken)
    }

    pub(crate) fn clear_bits(&self, group: EventGroupHandle, bits: u32) -> u32 {
        let mut guard = self.state.lock();
        match guard.groups.get_mut(group.raw()) {
            Some(record) => {
                let before = record.bits;
                record.bits &= !bits;
                before
            }
            None => 0,
        }
    }

    pub(crate) fn clear_bits_from_isr(&self, group: EventGroupHandle, bits: u32) -> NativeResult {
        let mut guard = self.state.lock();
        let record = guard.groups.get_mut(group.raw()).ok_or(NativeError::Invalid)?;
        record.bits &= !bits;
        Ok(())
    }

    pub(crate) fn get_bits(&self, group: EventGroupHandle) -> u32 {
        let guard = self.state.lock();
        guard.groups.get(group.raw()).map_or(0, |record| record.bits)
    }

    pub(crate) fn wait_bits(
        &self,
        group: EventGroupHandle,
        bits: u32,
        clear_on_exit: bool,
        wait_all: bool,
        ticks: Ticks,
    ) -> u32 {
        let mut guard = self.state.lock();
        self.checkpoint(&mut guard);
        let matched = self.block_on(&mut guard, ticks, |state| {
            let Some(record) = state.groups.get_mut(group.raw()) else {
                return Some(0);
            };
            let current = record.bits;
            let satisfied = if wait_all {
                current & bits == bits
            } else {
                current & bits != 0
            };
            if !satisfied {
                return None;
            }
            if clear_on_exit {
                record.bits &= !bits;
            }
            Some(current)
        });
        match matched {
            Some(value) => value,
            None => guard.groups.get(group.raw()).map_or(0, |record| record.bits),
        }
    }

    pub(crate) fn delete_event_group(&self, group: EventGroupHandle) {
        let mut guard = self.state.lock();
        if let Some(record) = guard.groups.remove(group.raw()) {
            guard.heap.release(record.heap_bytes);
            drop(guard);
            self.notify();
            log::trace!(target: LOG_TARGET, "event group {} deleted", group.raw());
        }
    }
}
