#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

//! # RTOS2 API
//!
//! CMSIS-RTOS2 style compatibility layer over a FreeRTOS-style native
//! kernel. All layer state lives in one [`Os`] value that owns the native
//! kernel port; the managers returned by [`Os::kernel`], [`Os::threads`],
//! [`Os::event_flags`], [`Os::semaphores`] and [`Os::message_queues`] are
//! borrowing facades over it.
//!
//! Every operation first asks the context classifier whether it runs in an
//! interrupt handler and then takes either the thread path (may block) or
//! the ISR path (never blocks, uses the native ISR-safe calls).
//!
//! ```no_run
//! use rtos2_api::{Os, Priority, ThreadAttr, Timeout};
//! use rtos2_posix::PosixKernel;
//!
//! let os = Os::new(PosixKernel::new());
//! os.kernel().initialize().unwrap();
//! let attr = ThreadAttr::new().name("worker").priority(Priority::ABOVE_NORMAL);
//! os.threads().spawn(|| { /* thread body */ }, Some(attr));
//! os.kernel().start().unwrap();
//! os.delay(Timeout::from(10).ticks()).unwrap();
//! ```

extern crate alloc;

use core::cell::Cell;

pub mod config;
pub mod context;
pub mod event_flags;
mod handle;
pub mod kernel;
pub mod message_queue;
pub mod semaphore;
mod storage;
pub mod thread;
pub mod unsupported;
pub mod wait;

pub use rtos2_core::*;

pub use config::{OsConfig, OsConfigBuilder};
pub use context::{ExecPath, IsrContext, IsrGuard};
pub use event_flags::EventFlags;
pub use handle::{EventFlagsId, MessageQueueId, SemaphoreId, ThreadId};
pub use kernel::{Kernel, KernelInfo};
pub use message_queue::MessageQueues;
pub use semaphore::Semaphores;
pub use thread::{ThreadFunc, Threads};
pub use unsupported::{MemoryPoolId, MemoryPools, MutexId, Mutexes, TimerFunc, TimerId, Timers, Unsupported};

use handle::Registry;

pub(crate) const LOG_TARGET: &str = "rtos2";

/// The compatibility layer's single state object.
///
/// Owns the native kernel, the interrupt nesting counter, the kernel state
/// and one arena per object family. Share it between threads by reference
/// or through an `Arc`.
pub struct Os<K: NativeKernel> {
    native: K,
    config: OsConfig,
    context: IsrContext,
    state: critical_section::Mutex<Cell<KernelState>>,
    system_memory: critical_section::Mutex<core::cell::RefCell<Option<SystemTaskMemory>>>,
    threads: Registry<thread::ThreadRecord>,
    event_flags: Registry<event_flags::EventFlagsRecord>,
    semaphores: Registry<semaphore::SemaphoreRecord>,
    queues: Registry<message_queue::QueueRecord>,
}

impl<K: NativeKernel> Os<K> {
    /// Layer over `native` with the default configuration
    pub fn new(native: K) -> Self {
        Self::with_config(native, OsConfig::default())
    }

    pub fn with_config(native: K, config: OsConfig) -> Self {
        Self {
            native,
            config,
            context: IsrContext::new(),
            state: critical_section::Mutex::new(Cell::new(KernelState::Inactive)),
            system_memory: critical_section::Mutex::new(core::cell::RefCell::new(None)),
            threads: Registry::new(),
            event_flags: Registry::new(),
            semaphores: Registry::new(),
            queues: Registry::new(),
        }
    }

    /// The native kernel port
    pub fn native(&self) -> &K {
        &self.native
    }

    pub fn config(&self) -> &OsConfig {
        &self.config
    }

    pub fn kernel(&self) -> Kernel<'_, K> {
        Kernel::new(self)
    }

    pub fn threads(&self) -> Threads<'_, K> {
        Threads::new(self)
    }

    pub fn event_flags(&self) -> EventFlags<'_, K> {
        EventFlags::new(self)
    }

    pub fn semaphores(&self) -> Semaphores<'_, K> {
        Semaphores::new(self)
    }

    pub fn message_queues(&self) -> MessageQueues<'_, K> {
        MessageQueues::new(self)
    }

    pub fn mutexes(&self) -> Mutexes {
        Mutexes
    }

    pub fn timers(&self) -> Timers {
        Timers
    }

    pub fn memory_pools(&self) -> MemoryPools {
        MemoryPools
    }

    /// Interrupt entry hook
    pub fn isr_enter(&self) {
        self.context.enter();
    }

    /// Interrupt exit hook
    pub fn isr_exit(&self) {
        self.context.exit();
    }

    /// True while an interrupt handler is executing
    pub fn is_isr_context(&self) -> bool {
        self.context.is_active()
    }

    /// Run `f` as if it were an interrupt handler
    pub fn in_isr<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = IsrGuard::new(&self.context);
        f()
    }

    pub(crate) fn exec_path(&self) -> ExecPath {
        self.context.path()
    }

    /// Fails with `Isr` in interrupt context
    pub(crate) fn ensure_thread(&self) -> OsResult {
        match self.exec_path() {
            ExecPath::Thread => Ok(()),
            ExecPath::Isr => {
                log::warn!(target: LOG_TARGET, "call rejected in interrupt context");
                Err(OsError::Isr)
            }
        }
    }

    /// Path for a call that may wait; interrupt handlers may only poll
    pub(crate) fn path_for_timeout(&self, timeout: Timeout) -> OsResult<ExecPath> {
        match self.exec_path() {
            ExecPath::Isr if !timeout.is_poll() => {
                log::warn!(target: LOG_TARGET, "interrupt handler asked to wait {}", timeout);
                Err(OsError::Parameter)
            }
            path => Ok(path),
        }
    }

    pub(crate) fn local_state(&self) -> KernelState {
        critical_section::with(|cs| self.state.borrow(cs).get())
    }

    pub(crate) fn set_local_state(&self, state: KernelState) {
        critical_section::with(|cs| self.state.borrow(cs).set(state));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtos2_posix::PosixKernel;

    #[test]
    fn test_ensure_thread() {
        let os = Os::new(PosixKernel::new());
        assert_eq!(os.ensure_thread(), Ok(()));
        os.isr_enter();
        assert_eq!(os.ensure_thread(), Err(OsError::Isr));
        os.isr_exit();
    }

    #[test]
    fn test_path_for_timeout() {
        let os = Os::new(PosixKernel::new());
        assert_eq!(os.path_for_timeout(Timeout::FOREVER), Ok(ExecPath::Thread));
        os.in_isr(|| {
            assert_eq!(os.path_for_timeout(Timeout::POLL), Ok(ExecPath::Isr));
            assert_eq!(os.path_for_timeout(Timeout::from(1)), Err(OsError::Parameter));
        });
        assert!(!os.is_isr_context());
    }
}
