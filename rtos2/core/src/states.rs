//! Kernel, scheduler and thread state enumerations

use core::fmt;

/// RTOS2 kernel state as seen by applications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelState {
    /// `initialize` has not been called yet
    Inactive,
    /// Initialized, scheduler not started
    Ready,
    /// Scheduler running
    Running,
    /// Scheduler running with task switching suspended
    Locked,
    /// Reserved by the API, never reported by this layer
    Suspended,
    /// Reserved by the API, never reported by this layer
    Error,
}

impl KernelState {
    /// Signed value as reported by the C API (`osKernelState_t`)
    pub const fn code(self) -> i32 {
        match self {
            KernelState::Inactive => 0,
            KernelState::Ready => 1,
            KernelState::Running => 2,
            KernelState::Locked => 3,
            KernelState::Suspended => 4,
            KernelState::Error => -1,
        }
    }
}

/// State of the native scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchedulerState {
    NotStarted,
    Running,
    /// Running, task switching suspended by `suspend_all`
    Suspended,
}

/// Previous lock state returned by kernel lock operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum LockState {
    Unlocked = 0,
    Locked = 1,
}

impl LockState {
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Parse a lock value previously returned by `lock`/`unlock`
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(LockState::Unlocked),
            1 => Some(LockState::Locked),
            _ => None,
        }
    }
}

/// State of a native task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    Running,
    Ready,
    Blocked,
    Suspended,
    Deleted,
    /// Handle does not name a task
    Invalid,
}

/// RTOS2 thread state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreadState {
    Inactive,
    Ready,
    Running,
    /// Waiting on an object, delayed or suspended
    Blocked,
    Terminated,
    Error,
}

impl ThreadState {
    /// Signed value as reported by the C API (`osThreadState_t`)
    pub const fn code(self) -> i32 {
        match self {
            ThreadState::Inactive => 0,
            ThreadState::Ready => 1,
            ThreadState::Running => 2,
            ThreadState::Blocked => 3,
            ThreadState::Terminated => 4,
            ThreadState::Error => -1,
        }
    }
}

impl From<TaskState> for ThreadState {
    fn from(state: TaskState) -> Self {
        match state {
            TaskState::Running => ThreadState::Running,
            TaskState::Ready => ThreadState::Ready,
            TaskState::Blocked | TaskState::Suspended => ThreadState::Blocked,
            TaskState::Deleted => ThreadState::Terminated,
            TaskState::Invalid => ThreadState::Error,
        }
    }
}

impl fmt::Display for KernelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KernelState::Inactive => "inactive",
            KernelState::Ready => "ready",
            KernelState::Running => "running",
            KernelState::Locked => "locked",
            KernelState::Suspended => "suspended",
            KernelState::Error => "error",
        };
        f.write_str(name)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for KernelState {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "KernelState({})", self.code());
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ThreadState {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "ThreadState({})", self.code());
    }
}
