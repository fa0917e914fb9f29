//! Thread manager.
//!
//! Threads map one-to-one onto native tasks. The layer records each task it
//! creates in a generation-checked arena, so a [`ThreadId`] that outlived
//! its thread is detected instead of reaching the native kernel.

use alloc::boxed::Box;
use alloc::vec::Vec;

use rtos2_core::{
    task_name, NativeKernel, OsError, OsResult, Priority, TaskEntry, TaskHandle, TaskName, TaskSpec,
    TaskState, ThreadAttr, ThreadAttrBits, ThreadState,
};

use crate::handle::ThreadId;
use crate::{storage, Os, LOG_TARGET};

/// Thread entry function; receives the argument given at creation
pub type ThreadFunc = fn(usize);

#[derive(Debug, Clone, Copy)]
pub(crate) struct ThreadRecord {
    pub(crate) task: TaskHandle,
}

/// Thread manager facade
pub struct Threads<'a, K: NativeKernel> {
    os: &'a Os<K>,
}

impl<'a, K: NativeKernel> Threads<'a, K> {
    pub(crate) fn new(os: &'a Os<K>) -> Self {
        Self { os }
    }

    /// Create a thread running `func(argument)`.
    ///
    /// Without attributes the thread gets the default name, the minimal
    /// stack and `Priority::NORMAL`. Returns `None` when any check fails or
    /// the native kernel cannot create the task.
    pub fn create(&self, func: Option<ThreadFunc>, argument: usize, attr: Option<ThreadAttr>) -> Option<ThreadId> {
        self.os.ensure_thread().ok()?;
        let func = func?;
        self.create_task(Box::new(move || func(argument)), attr)
    }

    /// Create a thread running a closure
    pub fn spawn<F>(&self, body: F, attr: Option<ThreadAttr>) -> Option<ThreadId>
    where
        F: FnOnce() + Send + 'static,
    {
        self.os.ensure_thread().ok()?;
        self.create_task(Box::new(body), attr)
    }

    fn create_task(&self, entry: TaskEntry, attr: Option<ThreadAttr>) -> Option<ThreadId> {
        let native = self.os.native();
        let config = native.config();
        let attr = attr.unwrap_or_default();

        let priority = match attr.priority {
            None | Some(Priority::NONE) => Priority::NORMAL,
            Some(priority) => priority,
        };
        if !priority.is_valid() {
            log::warn!(target: LOG_TARGET, "thread priority {} out of range", priority);
            return None;
        }

        let stack_bytes = match attr.stack_mem.as_deref() {
            Some(stack) if !stack.is_empty() => stack.len(),
            _ => attr.stack_size,
        };
        let stack_depth = if stack_bytes == 0 {
            config.minimal_stack_depth
        } else {
            u32::try_from(stack_bytes / config.stack_word_size).unwrap_or(u32::MAX)
        };
        if stack_depth < config.minimal_stack_depth {
            log::warn!(target: LOG_TARGET, "thread stack of {} words below minimum", stack_depth);
            return None;
        }

        if attr.attr_bits.contains(ThreadAttrBits::JOINABLE) {
            log::warn!(target: LOG_TARGET, "joinable threads are not supported");
            return None;
        }

        let storage = match storage::task(attr.cb_mem, attr.stack_mem, config.task_cb_size) {
            Ok(storage) => storage,
            Err(err) => {
                log::warn!(target: LOG_TARGET, "thread memory rejected: {}", err);
                return None;
            }
        };

        let spec = TaskSpec {
            entry,
            name: task_name(attr.name.unwrap_or("")),
            stack_depth,
            priority: priority.to_native(),
        };
        let task = match native.task_create(spec, storage) {
            Ok(task) => task,
            Err(err) => {
                log::debug!(target: LOG_TARGET, "native task creation failed: {}", err);
                return None;
            }
        };
        let id = ThreadId(self.os.threads.insert(ThreadRecord { task }));
        log::trace!(target: LOG_TARGET, "thread {:?} created", id);
        Some(id)
    }

    fn task(&self, id: ThreadId) -> OsResult<TaskHandle> {
        self.os
            .threads
            .lookup(id.0)
            .map(|record| record.task)
            .ok_or(OsError::Parameter)
    }

    /// Name of a thread; `None` in interrupt context or for stale ids
    pub fn get_name(&self, id: ThreadId) -> Option<TaskName> {
        self.os.ensure_thread().ok()?;
        let task = self.task(id).ok()?;
        self.os.native().task_name(task)
    }

    /// Id of the calling thread
    pub fn get_id(&self) -> Option<ThreadId> {
        self.os.ensure_thread().ok()?;
        let current = self.os.native().current_task()?;
        self.os.threads.with(|arena| {
            arena
                .iter()
                .find(|(_, record)| record.task == current)
                .map(|(key, _)| ThreadId(key))
        })
    }

    pub fn get_state(&self, id: ThreadId) -> ThreadState {
        if self.os.ensure_thread().is_err() {
            return ThreadState::Error;
        }
        match self.task(id) {
            Ok(task) => ThreadState::from(self.os.native().task_state(task)),
            Err(_) => ThreadState::Error,
        }
    }

    /// Stack size is not tracked by the native kernel; always 0
    pub fn get_stack_size(&self, _id: ThreadId) -> u32 {
        0
    }

    /// Unused stack in words, from the native high-water mark
    pub fn get_stack_space(&self, id: ThreadId) -> u32 {
        if self.os.ensure_thread().is_err() {
            return 0;
        }
        match self.task(id) {
            Ok(task) => self.os.native().stack_high_water_mark(task),
            Err(_) => 0,
        }
    }

    pub fn set_priority(&self, id: ThreadId, priority: Priority) -> OsResult {
        self.os.ensure_thread()?;
        let task = self.task(id)?;
        if !priority.is_valid() {
            return Err(OsError::Parameter);
        }
        self.os.native().task_priority_set(task, priority.to_native());
        Ok(())
    }

    pub fn get_priority(&self, id: ThreadId) -> Priority {
        if self.os.ensure_thread().is_err() {
            return Priority::ERROR;
        }
        match self.task(id) {
            Ok(task) => Priority::from_native(self.os.native().task_priority_get(task)),
            Err(_) => Priority::ERROR,
        }
    }

    pub fn yield_now(&self) -> OsResult {
        self.os.ensure_thread()?;
        self.os.native().yield_now();
        Ok(())
    }

    pub fn suspend(&self, id: ThreadId) -> OsResult {
        self.os.ensure_thread()?;
        let task = self.task(id)?;
        log::debug!(target: LOG_TARGET, "thread {:?} suspended", id);
        self.os.native().task_suspend(task);
        Ok(())
    }

    pub fn resume(&self, id: ThreadId) -> OsResult {
        self.os.ensure_thread()?;
        let task = self.task(id)?;
        self.os.native().task_resume(task);
        log::debug!(target: LOG_TARGET, "thread {:?} resumed", id);
        Ok(())
    }

    /// Threads are always detached; fails with `Error`
    pub fn detach(&self, _id: ThreadId) -> OsResult {
        Err(OsError::Error)
    }

    /// Joining is not provided; fails with `Error`
    pub fn join(&self, _id: ThreadId) -> OsResult {
        Err(OsError::Error)
    }

    /// Terminate the calling thread
    pub fn exit_current(&self) -> ! {
        let native = self.os.native();
        if let Some(current) = native.current_task() {
            self.os.threads.with(|arena| {
                let key = arena
                    .iter()
                    .find(|(_, record)| record.task == current)
                    .map(|(key, _)| key);
                if let Some(key) = key {
                    arena.remove(key);
                }
            });
        }
        if native.config().include_task_delete {
            native.task_delete_self();
        }
        loop {
            core::hint::spin_loop();
        }
    }

    /// Delete another thread
    pub fn terminate(&self, id: ThreadId) -> OsResult {
        self.os.ensure_thread()?;
        let native = self.os.native();
        if !native.config().include_task_delete {
            return Err(OsError::Error);
        }
        let task = self.task(id).map_err(|_| OsError::Resource)?;
        match native.task_state(task) {
            TaskState::Deleted | TaskState::Invalid => {
                self.os.threads.remove(id.0);
                Err(OsError::Resource)
            }
            _ => {
                self.os.threads.remove(id.0);
                native.task_delete(task);
                log::trace!(target: LOG_TARGET, "thread {:?} terminated", id);
                Ok(())
            }
        }
    }

    /// Number of native tasks, 0 in interrupt context
    pub fn get_count(&self) -> u32 {
        if self.os.ensure_thread().is_err() {
            return 0;
        }
        u32::try_from(self.os.native().task_count()).unwrap_or(u32::MAX)
    }

    /// Fill `out` with ids of live threads; returns how many were written.
    ///
    /// Native tasks not created through the layer are skipped. Returns 0
    /// when the native task snapshot cannot be allocated.
    pub fn enumerate(&self, out: &mut [ThreadId]) -> u32 {
        if self.os.ensure_thread().is_err() || out.is_empty() {
            return 0;
        }
        let native = self.os.native();
        let count = native.task_count();
        let mut snapshot: Vec<TaskHandle> = Vec::new();
        if snapshot.try_reserve_exact(count).is_err() {
            return 0;
        }
        snapshot.resize(count, TaskHandle::new(0));
        let filled = native.system_state(&mut snapshot);
        snapshot.truncate(filled);

        self.os.threads.with(|arena| {
            let ids = snapshot.iter().filter_map(|task| {
                arena
                    .iter()
                    .find(|(_, record)| record.task == *task)
                    .map(|(key, _)| ThreadId(key))
            });
            let mut written = 0;
            for (slot, id) in out.iter_mut().zip(ids) {
                *slot = id;
                written += 1;
            }
            written
        })
    }
}
