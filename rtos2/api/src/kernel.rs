//! Kernel controller: lifecycle, scheduler lock and tick queries.

use rtos2_core::{
    KernelState, LockState, NativeKernel, OsError, OsResult, SchedulerState, SystemTaskMemory,
    TaskBuffers, Ticks, Version,
};

use crate::{ExecPath, Os, LOG_TARGET};

/// Versions reported by [`Kernel::get_info`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelInfo {
    pub api: Version,
    pub kernel: Version,
}

/// Kernel controller facade
pub struct Kernel<'a, K: NativeKernel> {
    os: &'a Os<K>,
}

impl<'a, K: NativeKernel> Kernel<'a, K> {
    pub(crate) fn new(os: &'a Os<K>) -> Self {
        Self { os }
    }

    /// Bring the kernel from `Inactive` to `Ready`.
    ///
    /// Registers the configured heap regions when the port supports dynamic
    /// allocation.
    pub fn initialize(&self) -> OsResult {
        self.os.ensure_thread()?;
        if self.os.local_state() != KernelState::Inactive {
            return Err(OsError::State);
        }
        let native = self.os.native();
        if native.config().support_dynamic_allocation {
            native.define_heap_regions(&self.os.config().heap_regions);
        }
        self.os.set_local_state(KernelState::Ready);
        log::debug!(target: LOG_TARGET, "kernel initialized");
        Ok(())
    }

    /// Report versions and copy the NUL-terminated kernel id into `id_buf`.
    ///
    /// A buffer too small for the id fails with `NoMemory` and nothing is
    /// copied.
    pub fn get_info(&self, id_buf: Option<&mut [u8]>) -> OsResult<KernelInfo> {
        let config = self.os.native().config();
        let id = config.kernel_id.as_bytes();
        if let Some(buf) = id_buf {
            if buf.len() < id.len() + 1 {
                return Err(OsError::NoMemory);
            }
            buf[..id.len()].copy_from_slice(id);
            buf[id.len()] = 0;
        }
        Ok(KernelInfo {
            api: self.os.config().api_version,
            kernel: config.kernel_version,
        })
    }

    /// Kernel id string of the native kernel
    pub fn id(&self) -> &'static str {
        self.os.native().config().kernel_id
    }

    pub fn get_state(&self) -> KernelState {
        match self.os.local_state() {
            KernelState::Running => match self.os.native().scheduler_state() {
                SchedulerState::Running => KernelState::Running,
                SchedulerState::NotStarted => KernelState::Ready,
                SchedulerState::Suspended => KernelState::Locked,
            },
            state => state,
        }
    }

    /// Start the scheduler.
    ///
    /// On hardware ports this does not return once scheduling begins. The
    /// state is `Running` from this point on, even if the native scheduler
    /// fails to start.
    pub fn start(&self) -> OsResult {
        self.os.ensure_thread()?;
        if self.os.local_state() != KernelState::Ready {
            return Err(OsError::State);
        }
        self.os.set_local_state(KernelState::Running);
        log::debug!(target: LOG_TARGET, "kernel running");

        let native = self.os.native();
        let system = critical_section::with(|cs| {
            let mut slot = self.os.system_memory.borrow_ref_mut(cs);
            if native.config().support_static_allocation && slot.is_none() {
                *slot = Some(system_task_memory(native));
            }
            slot.take()
        });
        let result = native.start_scheduler(system.as_ref());
        // Keep the buffers alive for as long as the layer
        critical_section::with(|cs| *self.os.system_memory.borrow_ref_mut(cs) = system);

        result.map_err(|err| {
            log::error!(target: LOG_TARGET, "native scheduler failed to start: {}", err);
            OsError::Error
        })
    }

    /// Suspend task switching; returns the previous lock state
    pub fn lock(&self) -> OsResult<LockState> {
        self.os.ensure_thread()?;
        match self.get_state() {
            KernelState::Locked => Ok(LockState::Locked),
            KernelState::Running => {
                self.os.native().suspend_all();
                Ok(LockState::Unlocked)
            }
            _ => Err(OsError::State),
        }
    }

    /// Resume task switching; returns the previous lock state
    pub fn unlock(&self) -> OsResult<LockState> {
        self.os.ensure_thread()?;
        match self.get_state() {
            KernelState::Locked => {
                self.resume_scheduler();
                Ok(LockState::Locked)
            }
            KernelState::Running => Ok(LockState::Unlocked),
            _ => Err(OsError::State),
        }
    }

    /// Restore a lock state returned by [`lock`](Self::lock) or
    /// [`unlock`](Self::unlock); only the codes 0 and 1 are accepted.
    pub fn restore_lock(&self, lock: i32) -> OsResult<LockState> {
        self.os.ensure_thread()?;
        if self.os.local_state() != KernelState::Running {
            return Err(OsError::State);
        }
        match LockState::from_code(lock) {
            Some(LockState::Locked) => {
                self.os.native().suspend_all();
                Ok(LockState::Locked)
            }
            Some(LockState::Unlocked) => {
                self.resume_scheduler();
                Ok(LockState::Unlocked)
            }
            None => Err(OsError::Error),
        }
    }

    fn resume_scheduler(&self) {
        let native = self.os.native();
        if !native.resume_all() {
            native.yield_now();
        }
    }

    /// Tickless idle entry; not provided, always reports zero sleep ticks
    pub fn suspend(&self) -> u32 {
        0
    }

    /// Tickless idle exit; not provided
    pub fn resume(&self, _sleep_ticks: u32) {}

    pub fn get_tick_count(&self) -> Ticks {
        let native = self.os.native();
        match self.os.exec_path() {
            ExecPath::Thread => native.tick_count(),
            ExecPath::Isr => native.tick_count_from_isr(),
        }
    }

    pub fn get_tick_freq(&self) -> u32 {
        self.os.native().config().tick_rate_hz
    }

    pub fn get_sys_timer_count(&self) -> u32 {
        self.get_tick_count()
    }

    pub fn get_sys_timer_freq(&self) -> u32 {
        self.get_tick_freq()
    }
}

/// Idle and timer service task buffers sized for `native`
fn system_task_memory<K: NativeKernel>(native: &K) -> SystemTaskMemory {
    let config = native.config();
    SystemTaskMemory {
        idle: TaskBuffers::zeroed(config.task_cb_size, config.stack_bytes(config.minimal_stack_depth)),
        timer: TaskBuffers::zeroed(config.task_cb_size, config.stack_bytes(config.timer_task_stack_depth)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtos2_posix::PosixKernel;

    #[test]
    fn test_system_task_memory_sizes() {
        let kernel = PosixKernel::new();
        let memory = system_task_memory(&kernel);
        let config = kernel.config();
        assert_eq!(memory.idle.control_block.len(), config.task_cb_size);
        assert_eq!(memory.idle.stack.len(), 128 * 4);
        assert_eq!(memory.timer.stack.len(), config.stack_bytes(config.timer_task_stack_depth));
    }

    #[test]
    fn test_lock_requires_running() {
        let os = Os::new(PosixKernel::new());
        assert_eq!(os.kernel().lock(), Err(OsError::State));
        assert_eq!(os.kernel().unlock(), Err(OsError::State));
        assert_eq!(os.kernel().restore_lock(1), Err(OsError::State));
    }
}
