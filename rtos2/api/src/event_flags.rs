//! Event flags over native event groups.

use rtos2_core::{
    is_flags_error, EventFlagsAttr, EventGroupHandle, FlagsOptions, NativeKernel, OsError, OsResult, Timeout,
};

use crate::handle::EventFlagsId;
use crate::{storage, ExecPath, Os, LOG_TARGET};

#[derive(Debug, Clone, Copy)]
pub(crate) struct EventFlagsRecord {
    pub(crate) group: EventGroupHandle,
}

/// Event flags manager facade
pub struct EventFlags<'a, K: NativeKernel> {
    os: &'a Os<K>,
}

impl<'a, K: NativeKernel> EventFlags<'a, K> {
    pub(crate) fn new(os: &'a Os<K>) -> Self {
        Self { os }
    }

    /// Create an event flags object with all flags cleared
    pub fn create(&self, attr: Option<EventFlagsAttr>) -> Option<EventFlagsId> {
        self.os.ensure_thread().ok()?;
        let native = self.os.native();
        let attr = attr.unwrap_or_default();
        let storage = match storage::single(attr.cb_mem, native.config().event_group_cb_size) {
            Ok(storage) => storage,
            Err(err) => {
                log::warn!(target: LOG_TARGET, "event flags memory rejected: {}", err);
                return None;
            }
        };
        let group = native.event_group_create(storage).ok()?;
        let id = EventFlagsId(self.os.event_flags.insert(EventFlagsRecord { group }));
        log::trace!(target: LOG_TARGET, "event flags {:?} created", id);
        Some(id)
    }

    fn group(&self, id: EventFlagsId) -> OsResult<EventGroupHandle> {
        self.os
            .event_flags
            .lookup(id.0)
            .map(|record| record.group)
            .ok_or(OsError::Parameter)
    }

    /// Event groups carry no name
    pub fn get_name(&self, _id: EventFlagsId) -> Option<&'static str> {
        None
    }

    /// Set `flags`.
    ///
    /// From a thread this returns the flags after the set. From an interrupt
    /// handler the set is deferred to the timer service task, so the flags
    /// passed in are returned.
    pub fn set(&self, id: EventFlagsId, flags: u32) -> OsResult<u32> {
        let group = self.group(id)?;
        if is_flags_error(flags) {
            return Err(OsError::Parameter);
        }
        let native = self.os.native();
        match self.os.exec_path() {
            ExecPath::Thread => Ok(native.event_group_set_bits(group, flags)),
            ExecPath::Isr => match native.event_group_set_bits_from_isr(group, flags) {
                Ok(woken) => {
                    native.yield_from_isr(woken);
                    Ok(flags)
                }
                Err(_) => Err(OsError::Resource),
            },
        }
    }

    /// Clear `flags`; returns the flags before the clear
    pub fn clear(&self, id: EventFlagsId, flags: u32) -> OsResult<u32> {
        let group = self.group(id)?;
        if is_flags_error(flags) {
            return Err(OsError::Parameter);
        }
        let native = self.os.native();
        match self.os.exec_path() {
            ExecPath::Thread => Ok(native.event_group_clear_bits(group, flags)),
            ExecPath::Isr => {
                let before = native.event_group_get_bits_from_isr(group);
                native
                    .event_group_clear_bits_from_isr(group, flags)
                    .map(|()| before)
                    .map_err(|_| OsError::Resource)
            }
        }
    }

    pub fn get(&self, id: EventFlagsId) -> u32 {
        let Ok(group) = self.group(id) else {
            return 0;
        };
        let native = self.os.native();
        match self.os.exec_path() {
            ExecPath::Thread => native.event_group_get_bits(group),
            ExecPath::Isr => native.event_group_get_bits_from_isr(group),
        }
    }

    /// Wait for any or all of `flags`.
    ///
    /// Matched flags are cleared on return unless `NO_CLEAR` is given. An
    /// unsatisfied wait fails with `Timeout`, or with `Resource` when polled.
    pub fn wait(&self, id: EventFlagsId, flags: u32, options: FlagsOptions, timeout: Timeout) -> OsResult<u32> {
        self.os.ensure_thread()?;
        let group = self.group(id)?;
        if is_flags_error(flags) {
            return Err(OsError::Parameter);
        }
        let wait_all = options.wait_all();
        let value = self.os.native().event_group_wait_bits(
            group,
            flags,
            options.clear_on_exit(),
            wait_all,
            timeout.to_native(),
        );
        let satisfied = if wait_all {
            value & flags == flags
        } else {
            value & flags != 0
        };
        if satisfied {
            Ok(value)
        } else if timeout.is_poll() {
            Err(OsError::Resource)
        } else {
            Err(OsError::Timeout)
        }
    }

    pub fn delete(&self, id: EventFlagsId) -> OsResult {
        self.os.ensure_thread()?;
        let record = self.os.event_flags.remove(id.0).ok_or(OsError::Parameter)?;
        self.os.native().event_group_delete(record.group);
        log::trace!(target: LOG_TARGET, "event flags {:?} deleted", id);
        Ok(())
    }
}
