//! Simulated tasks on host threads.

use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use rtos2_core::{NativeError, NativeResult, TaskEntry, TaskHandle, TaskName, TaskSpec, TaskState, TaskStorage};

use crate::{Shared, State, LOG_TARGET};

thread_local! {
    /// Kernel id and handle of the task running on this host thread
    static CURRENT: Cell<Option<(u64, TaskHandle)>> = const { Cell::new(None) };
}

/// Unwind payload that ends the host thread of a deleted task
struct TaskExit;

pub(crate) fn current_for(kernel: u64) -> Option<TaskHandle> {
    match CURRENT.with(Cell::get) {
        Some((id, handle)) if id == kernel => Some(handle),
        _ => None,
    }
}

pub(crate) fn exit_current() -> ! {
    panic::resume_unwind(Box::new(TaskExit))
}

pub(crate) struct TaskRecord {
    pub(crate) name: TaskName,
    pub(crate) priority: u32,
    pub(crate) stack_depth: u32,
    pub(crate) heap_bytes: usize,
    pub(crate) blocked: bool,
    pub(crate) suspended: bool,
    pub(crate) deleted: bool,
    /// Caller memory stays borrowed until the task is deleted
    storage: TaskStorage,
}

/// Mark a task deleted and give back its memory; false if it already was
pub(crate) fn mark_deleted(state: &mut State, handle: TaskHandle) -> bool {
    let Some(record) = state.tasks.get_mut(handle.raw()) else {
        return false;
    };
    if record.deleted {
        return false;
    }
    record.deleted = true;
    record.blocked = false;
    record.storage = TaskStorage::Heap;
    let bytes = std::mem::take(&mut record.heap_bytes);
    state.heap.release(bytes);
    true
}

impl Shared {
    pub(crate) fn create_task(self: &Arc<Self>, spec: TaskSpec, storage: TaskStorage) -> NativeResult<TaskHandle> {
        let stack_bytes = self.config.stack_bytes(spec.stack_depth);
        let heap_bytes = match &storage {
            TaskStorage::Static { control_block, stack } => {
                if !self.config.support_static_allocation {
                    return Err(NativeError::Unsupported);
                }
                if control_block.len() < self.config.task_cb_size || stack.len() < stack_bytes {
                    return Err(NativeError::Invalid);
                }
                0
            }
            TaskStorage::Heap => {
                if !self.config.support_dynamic_allocation {
                    return Err(NativeError::Unsupported);
                }
                self.config.task_cb_size + stack_bytes
            }
        };

        let TaskSpec {
            entry,
            name,
            stack_depth,
            priority,
        } = spec;

        let handle = {
            let mut guard = self.state.lock();
            guard.heap.allocate(heap_bytes)?;
            TaskHandle::new(guard.tasks.insert(TaskRecord {
                name: name.clone(),
                priority,
                stack_depth,
                heap_bytes,
                blocked: false,
                suspended: false,
                deleted: false,
                storage,
            }))
        };

        let shared = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || shared.run_task(handle, entry));
        if let Err(err) = spawned {
            log::error!(target: LOG_TARGET, "failed to spawn host thread for task '{}': {}", name, err);
            let mut guard = self.state.lock();
            if let Some(record) = guard.tasks.remove(handle.raw()) {
                guard.heap.release(record.heap_bytes);
            }
            return Err(NativeError::AllocFailed);
        }

        log::trace!(target: LOG_TARGET, "task {} '{}' created at priority {}", handle.raw(), name, priority);
        Ok(handle)
    }

    fn run_task(self: Arc<Self>, handle: TaskHandle, entry: TaskEntry) {
        CURRENT.with(|current| current.set(Some((self.id, handle))));

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.wait_for_start();
            entry();
        }));
        match outcome {
            Ok(()) => {
                log::warn!(target: LOG_TARGET, "task {} returned from its entry function", handle.raw());
            }
            Err(payload) if payload.is::<TaskExit>() => {}
            Err(_) => {
                log::error!(target: LOG_TARGET, "task {} panicked", handle.raw());
            }
        }

        let mut guard = self.state.lock();
        mark_deleted(&mut guard, handle);
        drop(guard);
        self.notify();
        CURRENT.with(|current| current.set(None));
    }

    fn wait_for_start(&self) {
        let mut guard = self.state.lock();
        loop {
            self.checkpoint(&mut guard);
            if guard.started {
                return;
            }
            self.changed.wait(&mut guard);
        }
    }

    pub(crate) fn delete_task(&self, handle: TaskHandle) {
        if self.current() == Some(handle) {
            self.delete_self();
            return;
        }
        let mut guard = self.state.lock();
        if mark_deleted(&mut guard, handle) {
            drop(guard);
            self.notify();
            log::trace!(target: LOG_TARGET, "task {} deleted", handle.raw());
        }
    }

    pub(crate) fn delete_self(&self) {
        let Some(me) = self.current() else {
            log::warn!(target: LOG_TARGET, "self-delete requested outside of a task");
            return;
        };
        let mut guard = self.state.lock();
        mark_deleted(&mut guard, me);
        drop(guard);
        self.notify();
        log::trace!(target: LOG_TARGET, "task {} deleted itself", me.raw());
        exit_current()
    }

    pub(crate) fn suspend_task(&self, handle: TaskHandle) {
        let mut guard = self.state.lock();
        match guard.tasks.get_mut(handle.raw()) {
            Some(record) if !record.deleted => record.suspended = true,
            _ => return,
        }
        self.notify();
        if self.current() == Some(handle) {
            self.checkpoint(&mut guard);
        }
    }

    pub(crate) fn resume_task(&self, handle: TaskHandle) {
        let mut guard = self.state.lock();
        if let Some(record) = guard.tasks.get_mut(handle.raw()) {
            record.suspended = false;
        }
        drop(guard);
        self.notify();
    }

    pub(crate) fn task_priority(&self, handle: TaskHandle) -> u32 {
        let guard = self.state.lock();
        match guard.tasks.get(handle.raw()) {
            Some(record) if !record.deleted => record.priority,
            _ => 0,
        }
    }

    pub(crate) fn set_task_priority(&self, handle: TaskHandle, priority: u32) {
        let mut guard = self.state.lock();
        if let Some(record) = guard.tasks.get_mut(handle.raw()) {
            record.priority = priority;
        }
    }

    pub(crate) fn task_state(&self, handle: TaskHandle) -> TaskState {
        let guard = self.state.lock();
        match guard.tasks.get(handle.raw()) {
            None => TaskState::Invalid,
            Some(record) if record.deleted => TaskState::Deleted,
            Some(_) if self.current() == Some(handle) => TaskState::Running,
            Some(record) if record.suspended => TaskState::Suspended,
            Some(record) if record.blocked => TaskState::Blocked,
            Some(_) => TaskState::Ready,
        }
    }

    pub(crate) fn task_name(&self, handle: TaskHandle) -> Option<TaskName> {
        let guard = self.state.lock();
        guard
            .tasks
            .get(handle.raw())
            .filter(|record| !record.deleted)
            .map(|record| record.name.clone())
    }

    /// Host threads never report stack usage, so the whole stack is free
    pub(crate) fn stack_high_water_mark(&self, handle: TaskHandle) -> u32 {
        let guard = self.state.lock();
        match guard.tasks.get(handle.raw()) {
            Some(record) if !record.deleted => record.stack_depth,
            _ => 0,
        }
    }

    pub(crate) fn task_count(&self) -> usize {
        let guard = self.state.lock();
        guard.tasks.iter().filter(|(_, record)| !record.deleted).count()
    }

    pub(crate) fn system_state(&self, out: &mut [TaskHandle]) -> usize {
        let guard = self.state.lock();
        let live = guard
            .tasks
            .iter()
            .filter(|(_, record)| !record.deleted)
            .map(|(raw, _)| TaskHandle::new(raw));
        let mut written = 0;
        for (slot, handle) in out.iter_mut().zip(live) {
            *slot = handle;
            written += 1;
        }
        written
    }
}
