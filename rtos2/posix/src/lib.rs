//! Hosted simulation of a FreeRTOS-style kernel.
//!
//! Every native task runs on its own host thread. Tasks created before the
//! scheduler starts are held at a start gate. All kernel objects live behind
//! one lock, and a single condition variable wakes blocked tasks whenever
//! kernel state changes.
//!
//! Deleting a task marks it deleted; the task's host thread unwinds out of
//! its entry function at its next kernel call. Suspension takes effect the
//! same way. Code that never calls into the kernel keeps running until it
//! does.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Condvar, Mutex, MutexGuard};
use rtos2_core::{
    EventGroupHandle, HeapRegion, NativeError, NativeKernel, NativeResult, PortConfig,
    QueueHandle, QueueStorage, SchedulerState, SemaphoreHandle, Storage, SystemTaskMemory,
    TaskBuffers, TaskHandle, TaskName, TaskSpec, TaskState, TaskStorage, Ticks,
};
use thiserror::Error;

mod event_group;
mod heap;
mod queue;
mod semaphore;
mod task;

pub mod logger;
pub mod time;

use heap::Heap;
pub use time::TickClock;

pub(crate) const LOG_TARGET: &str = "rtos2::posix";

static NEXT_KERNEL_ID: AtomicU64 = AtomicU64::new(1);

/// Rejected simulation kernel configurations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("tick rate {0} Hz out of range (1..=10000)")]
    TickRate(u32),
    #[error("stack word size must be non-zero")]
    StackWordSize,
    #[error("event groups need 1..=32 usable bits, got {0}")]
    EventBits(u32),
    #[error("neither static nor dynamic allocation is enabled")]
    NoAllocationMode,
}

/// Slot table for simulated kernel objects; raw handles are `index + 1`
pub(crate) struct Table<T> {
    slots: Vec<Option<T>>,
}

impl<T> Table<T> {
    fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub(crate) fn insert(&mut self, value: T) -> u32 {
        self.slots.push(Some(value));
        self.slots.len() as u32
    }

    pub(crate) fn get(&self, raw: u32) -> Option<&T> {
        let index = raw.checked_sub(1)? as usize;
        self.slots.get(index)?.as_ref()
    }

    pub(crate) fn get_mut(&mut self, raw: u32) -> Option<&mut T> {
        let index = raw.checked_sub(1)? as usize;
        self.slots.get_mut(index)?.as_mut()
    }

    pub(crate) fn remove(&mut self, raw: u32) -> Option<T> {
        let index = raw.checked_sub(1)? as usize;
        self.slots.get_mut(index)?.take()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|value| (index as u32 + 1, value)))
    }
}

pub(crate) struct State {
    started: bool,
    suspend_depth: u32,
    heap: Heap,
    tasks: Table<task::TaskRecord>,
    groups: Table<event_group::EventGroup>,
    semaphores: Table<semaphore::Semaphore>,
    queues: Table<queue::Queue>,
}

impl State {
    /// True when some task is waiting; reported as "higher priority task woken"
    fn any_blocked(&self) -> bool {
        self.tasks.iter().any(|(_, task)| task.blocked && !task.deleted)
    }
}

pub(crate) struct Shared {
    id: u64,
    config: PortConfig,
    clock: TickClock,
    state: Mutex<State>,
    changed: Condvar,
}

impl Shared {
    pub(crate) fn current(&self) -> Option<TaskHandle> {
        task::current_for(self.id)
    }

    fn notify(&self) {
        self.changed.notify_all();
    }

    /// Heap cost of a single-block object, validating static memory
    fn block_cost(&self, storage: &Storage, cb_size: usize) -> NativeResult<usize> {
        match storage {
            Storage::Static(block) => {
                if !self.config.support_static_allocation {
                    return Err(NativeError::Unsupported);
                }
                if block.len() < cb_size {
                    return Err(NativeError::Invalid);
                }
                Ok(0)
            }
            Storage::Heap => {
                if !self.config.support_dynamic_allocation {
                    return Err(NativeError::Unsupported);
                }
                Ok(cb_size)
            }
        }
    }

    /// Park a deleted or suspended calling task
    pub(crate) fn checkpoint(&self, guard: &mut MutexGuard<'_, State>) {
        let Some(me) = self.current() else {
            return;
        };
        loop {
            match guard.tasks.get(me.raw()) {
                Some(record) if record.deleted => task::exit_current(),
                Some(record) if record.suspended => self.changed.wait(guard),
                _ => return,
            }
        }
    }

    /// Block the caller until `poll` yields a value or `ticks` expire
    pub(crate) fn block_on<T>(
        &self,
        guard: &mut MutexGuard<'_, State>,
        ticks: Ticks,
        mut poll: impl FnMut(&mut State) -> Option<T>,
    ) -> Option<T> {
        let deadline = self.clock.deadline(ticks);
        let me = self.current();
        loop {
            if let Some(done) = poll(&mut **guard) {
                return Some(done);
            }
            if ticks == 0 || deadline.is_some_and(|at| Instant::now() >= at) {
                return None;
            }
            self.set_blocked(guard, me, true);
            match deadline {
                Some(at) => {
                    self.changed.wait_until(guard, at);
                }
                None => self.changed.wait(guard),
            }
            self.set_blocked(guard, me, false);
            self.checkpoint(guard);
        }
    }

    fn set_blocked(&self, state: &mut State, me: Option<TaskHandle>, blocked: bool) {
        if let Some(record) = me.and_then(|handle| state.tasks.get_mut(handle.raw())) {
            record.blocked = blocked;
        }
    }

    fn shutdown(&self) {
        let mut guard = self.state.lock();
        let handles: Vec<u32> = guard.tasks.iter().map(|(raw, _)| raw).collect();
        for raw in handles {
            task::mark_deleted(&mut guard, TaskHandle::new(raw));
        }
        drop(guard);
        self.notify();
    }
}

fn check_buffers(buffers: &TaskBuffers, cb_size: usize, stack_bytes: usize) -> NativeResult {
    if buffers.control_block.len() < cb_size || buffers.stack.len() < stack_bytes {
        Err(NativeError::Invalid)
    } else {
        Ok(())
    }
}

/// Builder for the simulated kernel
#[derive(Debug, Clone, Default)]
pub struct PosixKernelBuilder {
    config: PortConfig,
    tick_offset: Ticks,
}

impl PosixKernelBuilder {
    /// Sets the port configuration.
    pub fn config(mut self, config: PortConfig) -> Self {
        self.config = config;
        self
    }

    /// Starts the tick counter at `ticks` instead of zero.
    pub fn tick_offset(mut self, ticks: Ticks) -> Self {
        self.tick_offset = ticks;
        self
    }

    pub fn build(self) -> Result<PosixKernel, ConfigError> {
        let config = self.config;
        if config.tick_rate_hz == 0 || config.tick_rate_hz > 10_000 {
            return Err(ConfigError::TickRate(config.tick_rate_hz));
        }
        if config.stack_word_size == 0 {
            return Err(ConfigError::StackWordSize);
        }
        if config.event_bits == 0 || config.event_bits > 32 {
            return Err(ConfigError::EventBits(config.event_bits));
        }
        if !config.support_static_allocation && !config.support_dynamic_allocation {
            return Err(ConfigError::NoAllocationMode);
        }

        Ok(PosixKernel::from_parts(config, self.tick_offset))
    }
}

/// FreeRTOS-style kernel simulated on host threads
pub struct PosixKernel {
    shared: Arc<Shared>,
}

impl PosixKernel {
    /// Creates a new kernel builder.
    pub fn builder() -> PosixKernelBuilder {
        PosixKernelBuilder::default()
    }

    /// Kernel with the default port configuration
    pub fn new() -> Self {
        Self::from_parts(PortConfig::default(), 0)
    }

    fn from_parts(config: PortConfig, tick_offset: Ticks) -> Self {
        let clock = TickClock::new(config.tick_rate_hz, tick_offset);
        let shared = Shared {
            id: NEXT_KERNEL_ID.fetch_add(1, Ordering::Relaxed),
            config,
            clock,
            state: Mutex::new(State {
                started: false,
                suspend_depth: 0,
                heap: Heap::default(),
                tasks: Table::new(),
                groups: Table::new(),
                semaphores: Table::new(),
                queues: Table::new(),
            }),
            changed: Condvar::new(),
        };
        PosixKernel {
            shared: Arc::new(shared),
        }
    }

    pub fn clock(&self) -> &TickClock {
        &self.shared.clock
    }

    /// Bytes left in the simulated heap
    pub fn heap_free(&self) -> usize {
        self.shared.state.lock().heap.free_bytes()
    }
}

impl Default for PosixKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PosixKernel {
    fn drop(&mut self) {
        self.shared.shutdown();
    }
}

impl NativeKernel for PosixKernel {
    fn config(&self) -> &PortConfig {
        &self.shared.config
    }

    fn define_heap_regions(&self, regions: &[HeapRegion]) {
        self.shared.state.lock().heap.define(regions);
        log::trace!(target: LOG_TARGET, "heap defined with {} region(s)", regions.len());
    }

    fn start_scheduler(&self, system: Option<&SystemTaskMemory>) -> NativeResult {
        let config = &self.shared.config;
        let idle_stack = config.stack_bytes(config.minimal_stack_depth);
        let timer_stack = config.stack_bytes(config.timer_task_stack_depth);

        let mut guard = self.shared.state.lock();
        if guard.started {
            return Err(NativeError::Invalid);
        }
        if config.support_static_allocation {
            let memory = system.ok_or(NativeError::Invalid)?;
            check_buffers(&memory.idle, config.task_cb_size, idle_stack)?;
            check_buffers(&memory.timer, config.task_cb_size, timer_stack)?;
        } else {
            let bytes = 2 * config.task_cb_size + idle_stack + timer_stack;
            guard.heap.allocate(bytes)?;
        }
        guard.started = true;
        drop(guard);

        self.shared.notify();
        log::debug!(target: LOG_TARGET, "scheduler started at {} Hz", config.tick_rate_hz);
        Ok(())
    }

    fn scheduler_state(&self) -> SchedulerState {
        let guard = self.shared.state.lock();
        if !guard.started {
            SchedulerState::NotStarted
        } else if guard.suspend_depth > 0 {
            SchedulerState::Suspended
        } else {
            SchedulerState::Running
        }
    }

    fn suspend_all(&self) {
        self.shared.state.lock().suspend_depth += 1;
    }

    fn resume_all(&self) -> bool {
        let mut guard = self.shared.state.lock();
        guard.suspend_depth = guard.suspend_depth.saturating_sub(1);
        false
    }

    fn yield_now(&self) {
        let mut guard = self.shared.state.lock();
        self.shared.checkpoint(&mut guard);
        drop(guard);
        std::thread::yield_now();
    }

    fn yield_from_isr(&self, higher_priority_woken: bool) {
        if higher_priority_woken {
            std::thread::yield_now();
        }
    }

    fn tick_count(&self) -> Ticks {
        self.shared.clock.now()
    }

    fn tick_count_from_isr(&self) -> Ticks {
        self.shared.clock.now()
    }

    fn delay(&self, ticks: Ticks) {
        let mut guard = self.shared.state.lock();
        self.shared.checkpoint(&mut guard);
        if ticks == 0 {
            drop(guard);
            std::thread::yield_now();
            return;
        }
        let _ = self.shared.block_on(&mut guard, ticks, |_| None::<()>);
    }

    fn delay_until(&self, previous_wake: &mut Ticks, increment: Ticks) {
        let elapsed = self.tick_count().wrapping_sub(*previous_wake);
        *previous_wake = previous_wake.wrapping_add(increment);
        if elapsed < increment {
            self.delay(increment - elapsed);
        }
    }

    fn task_create(&self, spec: TaskSpec, storage: TaskStorage) -> NativeResult<TaskHandle> {
        self.shared.create_task(spec, storage)
    }

    fn task_delete(&self, task: TaskHandle) {
        self.shared.delete_task(task);
    }

    fn task_delete_self(&self) {
        self.shared.delete_self();
    }

    fn task_suspend(&self, task: TaskHandle) {
        self.shared.suspend_task(task);
    }

    fn task_resume(&self, task: TaskHandle) {
        self.shared.resume_task(task);
    }

    fn task_priority_get(&self, task: TaskHandle) -> u32 {
        self.shared.task_priority(task)
    }

    fn task_priority_set(&self, task: TaskHandle, priority: u32) {
        self.shared.set_task_priority(task, priority);
    }

    fn task_state(&self, task: TaskHandle) -> TaskState {
        self.shared.task_state(task)
    }

    fn task_name(&self, task: TaskHandle) -> Option<TaskName> {
        self.shared.task_name(task)
    }

    fn current_task(&self) -> Option<TaskHandle> {
        self.shared.current()
    }

    fn stack_high_water_mark(&self, task: TaskHandle) -> u32 {
        self.shared.stack_high_water_mark(task)
    }

    fn task_count(&self) -> usize {
        self.shared.task_count()
    }

    fn system_state(&self, out: &mut [TaskHandle]) -> usize {
        self.shared.system_state(out)
    }

    fn event_group_create(&self, storage: Storage) -> NativeResult<EventGroupHandle> {
        self.shared.create_event_group(storage)
    }

    fn event_group_set_bits(&self, group: EventGroupHandle, bits: u32) -> u32 {
        self.shared.set_bits(group, bits)
    }

    fn event_group_set_bits_from_isr(&self, group: EventGroupHandle, bits: u32) -> NativeResult<bool> {
        self.shared.set_bits_from_isr(group, bits)
    }

    fn event_group_clear_bits(&self, group: EventGroupHandle, bits: u32) -> u32 {
        self.shared.clear_bits(group, bits)
    }

    fn event_group_clear_bits_from_isr(&self, group: EventGroupHandle, bits: u32) -> NativeResult {
        self.shared.clear_bits_from_isr(group, bits)
    }

    fn event_group_get_bits(&self, group: EventGroupHandle) -> u32 {
        self.shared.get_bits(group)
    }

    fn event_group_get_bits_from_isr(&self, group: EventGroupHandle) -> u32 {
        self.shared.get_bits(group)
    }

    fn event_group_wait_bits(
        &self,
        group: EventGroupHandle,
        bits: u32,
        clear_on_exit: bool,
        wait_all: bool,
        ticks: Ticks,
    ) -> u32 {
        self.shared.wait_bits(group, bits, clear_on_exit, wait_all, ticks)
    }

    fn event_group_delete(&self, group: EventGroupHandle) {
        self.shared.delete_event_group(group);
    }

    fn semaphore_create(&self, max: u32, initial: u32, storage: Storage) -> NativeResult<SemaphoreHandle> {
        self.shared.create_semaphore(max, initial, storage)
    }

    fn semaphore_take(&self, sem: SemaphoreHandle, ticks: Ticks) -> NativeResult {
        self.shared.take(sem, ticks)
    }

    fn semaphore_take_from_isr(&self, sem: SemaphoreHandle) -> NativeResult<bool> {
        self.shared.take_from_isr(sem)
    }

    fn semaphore_give(&self, sem: SemaphoreHandle) -> NativeResult {
        self.shared.give(sem).map(|_| ())
    }

    fn semaphore_give_from_isr(&self, sem: SemaphoreHandle) -> NativeResult<bool> {
        self.shared.give(sem)
    }

    fn semaphore_count(&self, sem: SemaphoreHandle) -> u32 {
        self.shared.semaphore_count(sem)
    }

    fn semaphore_count_from_isr(&self, sem: SemaphoreHandle) -> u32 {
        self.shared.semaphore_count(sem)
    }

    fn semaphore_delete(&self, sem: SemaphoreHandle) {
        self.shared.delete_semaphore(sem);
    }

    fn queue_create(&self, length: u32, item_size: u32, storage: QueueStorage) -> NativeResult<QueueHandle> {
        self.shared.create_queue(length, item_size, storage)
    }

    fn queue_send(&self, queue: QueueHandle, item: &[u8], ticks: Ticks) -> NativeResult {
        self.shared.send(queue, item, ticks)
    }

    fn queue_send_from_isr(&self, queue: QueueHandle, item: &[u8]) -> NativeResult<bool> {
        self.shared.send_from_isr(queue, item)
    }

    fn queue_receive(&self, queue: QueueHandle, out: &mut [u8], ticks: Ticks) -> NativeResult {
        self.shared.receive(queue, out, ticks)
    }

    fn queue_receive_from_isr(&self, queue: QueueHandle, out: &mut [u8]) -> NativeResult<bool> {
        self.shared.receive_from_isr(queue, out)
    }

    fn queue_messages_waiting(&self, queue: QueueHandle) -> u32 {
        self.shared.messages_waiting(queue)
    }

    fn queue_messages_waiting_from_isr(&self, queue: QueueHandle) -> u32 {
        self.shared.messages_waiting(queue)
    }

    fn queue_spaces_available(&self, queue: QueueHandle) -> u32 {
        self.shared.spaces_available(queue)
    }

    fn queue_reset(&self, queue: QueueHandle) -> NativeResult {
        self.shared.reset_queue(queue)
    }

    fn queue_delete(&self, queue: QueueHandle) {
        self.shared.delete_queue(queue);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_rejects_bad_tick_rate() {
        let config = PortConfig::builder().tick_rate_hz(0).build();
        assert_eq!(PosixKernel::builder().config(config).build().err(), Some(ConfigError::TickRate(0)));
    }

    #[test]
    fn test_builder_rejects_no_allocation_mode() {
        let config = PortConfig::builder()
            .static_allocation(false)
            .dynamic_allocation(false)
            .build();
        assert_eq!(
            PosixKernel::builder().config(config).build().err(),
            Some(ConfigError::NoAllocationMode)
        );
    }

    #[test]
    fn test_table_handles_are_never_reused() {
        let mut table = Table::new();
        let first = table.insert(1u8);
        assert_eq!(table.remove(first), Some(1));
        let second = table.insert(2u8);
        assert_ne!(first, second);
        assert!(table.get(first).is_none());
        assert!(table.get(0).is_none());
    }

    #[test]
    fn test_scheduler_suspend_nesting() {
        let kernel = PosixKernel::new();
        kernel.define_heap_regions(&[HeapRegion { start: 0, size: 4096 }]);
        assert_eq!(kernel.scheduler_state(), SchedulerState::NotStarted);
        let config = kernel.config().clone();
        let system = SystemTaskMemory {
            idle: TaskBuffers::zeroed(config.task_cb_size, config.stack_bytes(config.minimal_stack_depth)),
            timer: TaskBuffers::zeroed(config.task_cb_size, config.stack_bytes(config.timer_task_stack_depth)),
        };
        assert_eq!(kernel.start_scheduler(Some(&system)), Ok(()));
        kernel.suspend_all();
        kernel.suspend_all();
        assert!(!kernel.resume_all());
        assert_eq!(kernel.scheduler_state(), SchedulerState::Suspended);
        kernel.resume_all();
        assert_eq!(kernel.scheduler_state(), SchedulerState::Running);
    }
}
