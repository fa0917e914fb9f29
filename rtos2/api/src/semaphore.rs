//! Counting semaphores.

use rtos2_core::{NativeError, NativeKernel, OsError, OsResult, SemaphoreAttr, SemaphoreHandle, Timeout};

use crate::handle::SemaphoreId;
use crate::{storage, ExecPath, Os, LOG_TARGET};

#[derive(Debug, Clone, Copy)]
pub(crate) struct SemaphoreRecord {
    pub(crate) sem: SemaphoreHandle,
}

/// Semaphore manager facade
pub struct Semaphores<'a, K: NativeKernel> {
    os: &'a Os<K>,
}

impl<'a, K: NativeKernel> Semaphores<'a, K> {
    pub(crate) fn new(os: &'a Os<K>) -> Self {
        Self { os }
    }

    /// Create a semaphore holding `initial` of at most `max` tokens
    pub fn create(&self, max: u32, initial: u32, attr: Option<SemaphoreAttr>) -> Option<SemaphoreId> {
        self.os.ensure_thread().ok()?;
        if max == 0 || initial > max {
            return None;
        }
        let native = self.os.native();
        let attr = attr.unwrap_or_default();
        let storage = match storage::single(attr.cb_mem, native.config().semaphore_cb_size) {
            Ok(storage) => storage,
            Err(err) => {
                log::warn!(target: LOG_TARGET, "semaphore memory rejected: {}", err);
                return None;
            }
        };
        let sem = native.semaphore_create(max, initial, storage).ok()?;
        let id = SemaphoreId(self.os.semaphores.insert(SemaphoreRecord { sem }));
        log::trace!(target: LOG_TARGET, "semaphore {:?} created", id);
        Some(id)
    }

    fn sem(&self, id: SemaphoreId) -> OsResult<SemaphoreHandle> {
        self.os
            .semaphores
            .lookup(id.0)
            .map(|record| record.sem)
            .ok_or(OsError::Parameter)
    }

    pub fn get_name(&self, _id: SemaphoreId) -> Option<&'static str> {
        None
    }

    /// Take one token, waiting up to `timeout`
    pub fn acquire(&self, id: SemaphoreId, timeout: Timeout) -> OsResult {
        let sem = self.sem(id)?;
        let native = self.os.native();
        match self.os.path_for_timeout(timeout)? {
            ExecPath::Isr => match native.semaphore_take_from_isr(sem) {
                Ok(woken) => {
                    native.yield_from_isr(woken);
                    Ok(())
                }
                Err(_) => Err(OsError::Resource),
            },
            ExecPath::Thread => native
                .semaphore_take(sem, timeout.to_native())
                .map_err(|_| if timeout.is_poll() { OsError::Resource } else { OsError::Timeout }),
        }
    }

    /// Give one token back; fails with `Resource` at the maximum count
    pub fn release(&self, id: SemaphoreId) -> OsResult {
        let sem = self.sem(id)?;
        let native = self.os.native();
        let result = match self.os.exec_path() {
            ExecPath::Thread => native.semaphore_give(sem),
            ExecPath::Isr => native.semaphore_give_from_isr(sem).map(|woken| native.yield_from_isr(woken)),
        };
        result.map_err(|err| {
            if err != NativeError::Full {
                log::debug!(target: LOG_TARGET, "semaphore give failed: {}", err);
            }
            OsError::Resource
        })
    }

    pub fn get_count(&self, id: SemaphoreId) -> u32 {
        let Ok(sem) = self.sem(id) else {
            return 0;
        };
        let native = self.os.native();
        match self.os.exec_path() {
            ExecPath::Thread => native.semaphore_count(sem),
            ExecPath::Isr => native.semaphore_count_from_isr(sem),
        }
    }

    /// Delete a semaphore.
    ///
    /// Deleting from an interrupt handler is a contract violation; it is
    /// logged and the deletion still goes ahead.
    pub fn delete(&self, id: SemaphoreId) -> OsResult {
        if self.os.is_isr_context() {
            log::warn!(target: LOG_TARGET, "semaphore {:?} deleted from interrupt context", id);
        }
        let record = self.os.semaphores.remove(id.0).ok_or(OsError::Parameter)?;
        self.os.native().semaphore_delete(record.sem);
        log::trace!(target: LOG_TARGET, "semaphore {:?} deleted", id);
        Ok(())
    }
}
