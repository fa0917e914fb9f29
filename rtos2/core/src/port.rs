//! Native kernel port interface.
//!
//! A port wraps one FreeRTOS-style kernel behind [`NativeKernel`]. The
//! compatibility layer only ever talks to the kernel through this trait, so
//! the same layer runs on hardware ports and on the hosted simulation.
//!
//! Functions with a `_from_isr` suffix are the interrupt-safe variants: they
//! never block and report whether a higher priority task was woken.

use alloc::boxed::Box;
use core::fmt;

use heapless::String;

use crate::{SchedulerState, TaskState, Ticks};

/// Maximum task name length, including the terminator slot
pub const MAX_TASK_NAME_LEN: usize = 16;

/// Task name as stored by the native kernel
pub type TaskName = String<{ MAX_TASK_NAME_LEN - 1 }>;

/// Build a native task name, truncating on a character boundary
pub fn task_name(name: &str) -> TaskName {
    let mut out = TaskName::new();
    for ch in name.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}

/// Result of a native kernel call
pub type NativeResult<T = ()> = Result<T, NativeError>;

/// Failures reported by a native kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeError {
    /// Heap allocation failed
    AllocFailed,
    /// Allocation mode is not compiled into the kernel
    Unsupported,
    /// Operation would block and no wait was allowed, or the wait timed out
    WouldBlock,
    /// Queue or semaphore is full
    Full,
    /// Queue or semaphore is empty
    Empty,
    /// Handle or argument rejected
    Invalid,
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeError::AllocFailed => write!(f, "Native heap exhausted"),
            NativeError::Unsupported => write!(f, "Allocation mode not supported"),
            NativeError::WouldBlock => write!(f, "Operation would block"),
            NativeError::Full => write!(f, "Object is full"),
            NativeError::Empty => write!(f, "Object is empty"),
            NativeError::Invalid => write!(f, "Invalid native handle or argument"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for NativeError {}

macro_rules! native_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u32);

        impl $name {
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            pub const fn raw(self) -> u32 {
                self.0
            }
        }
    };
}

native_handle!(
    /// Native task handle
    TaskHandle
);
native_handle!(
    /// Native event group handle
    EventGroupHandle
);
native_handle!(
    /// Native counting semaphore handle
    SemaphoreHandle
);
native_handle!(
    /// Native queue handle
    QueueHandle
);

/// Kernel release number, encoded as `major * 10_000_000 + minor * 10_000 + rev`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub rev: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, rev: u32) -> Self {
        Self { major, minor, rev }
    }

    pub const fn encode(self) -> u32 {
        self.major * 10_000_000 + self.minor * 10_000 + self.rev
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.rev)
    }
}

/// One region handed to the native heap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapRegion {
    pub start: usize,
    pub size: usize,
}

/// Control block and stack for a kernel-owned system task
#[derive(Debug)]
pub struct TaskBuffers {
    pub control_block: Box<[u8]>,
    pub stack: Box<[u8]>,
}

impl TaskBuffers {
    pub fn zeroed(control_block: usize, stack: usize) -> Self {
        Self {
            control_block: alloc::vec![0u8; control_block].into_boxed_slice(),
            stack: alloc::vec![0u8; stack].into_boxed_slice(),
        }
    }
}

/// Memory for the idle and timer service tasks when static allocation is on
#[derive(Debug)]
pub struct SystemTaskMemory {
    pub idle: TaskBuffers,
    pub timer: TaskBuffers,
}

/// Task body handed to the native kernel
pub type TaskEntry = Box<dyn FnOnce() + Send + 'static>;

/// Everything a native task needs besides its memory
pub struct TaskSpec {
    pub entry: TaskEntry,
    pub name: TaskName,
    /// Stack depth in native stack words
    pub stack_depth: u32,
    pub priority: u32,
}

impl fmt::Debug for TaskSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSpec")
            .field("name", &self.name)
            .field("stack_depth", &self.stack_depth)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Where a task's control block and stack live
#[derive(Debug)]
pub enum TaskStorage {
    Static {
        control_block: &'static mut [u8],
        stack: &'static mut [u8],
    },
    Heap,
}

/// Where a queue's control block and message buffer live
#[derive(Debug)]
pub enum QueueStorage {
    Static {
        control_block: &'static mut [u8],
        buffer: &'static mut [u8],
    },
    Heap,
}

/// Where a single-block object (event group, semaphore) lives
#[derive(Debug)]
pub enum Storage {
    Static(&'static mut [u8]),
    Heap,
}

impl Storage {
    pub fn is_static(&self) -> bool {
        matches!(self, Storage::Static(_))
    }
}

/// Build-time configuration of a native kernel port
#[derive(Debug, Clone)]
pub struct PortConfig {
    pub kernel_id: &'static str,
    pub kernel_version: Version,
    pub tick_rate_hz: u32,
    /// Smallest task stack, in stack words
    pub minimal_stack_depth: u32,
    /// Size of one stack word in bytes
    pub stack_word_size: usize,
    /// Stack depth of the timer service task, in stack words
    pub timer_task_stack_depth: u32,
    /// Number of native priority levels
    pub max_priorities: u32,
    /// Usable bits in an event group
    pub event_bits: u32,
    pub task_cb_size: usize,
    pub event_group_cb_size: usize,
    pub semaphore_cb_size: usize,
    pub queue_cb_size: usize,
    pub support_static_allocation: bool,
    pub support_dynamic_allocation: bool,
    pub include_task_delete: bool,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            kernel_id: "FreeRTOSv10.2.0",
            kernel_version: Version::new(10, 2, 0),
            tick_rate_hz: 1000,
            minimal_stack_depth: 128,
            stack_word_size: 4,
            timer_task_stack_depth: 256,
            max_priorities: 57,
            event_bits: 24,
            task_cb_size: 96,
            event_group_cb_size: 32,
            semaphore_cb_size: 80,
            queue_cb_size: 80,
            support_static_allocation: true,
            support_dynamic_allocation: true,
            include_task_delete: true,
        }
    }
}

impl PortConfig {
    /// Creates a new port configuration builder.
    pub fn builder() -> PortConfigBuilder {
        PortConfigBuilder::default()
    }

    /// Bytes taken by a stack of `depth` words
    pub const fn stack_bytes(&self, depth: u32) -> usize {
        depth as usize * self.stack_word_size
    }

    /// Mask of the usable event group bits
    pub const fn event_bits_mask(&self) -> u32 {
        if self.event_bits >= 32 {
            u32::MAX
        } else {
            (1u32 << self.event_bits) - 1
        }
    }
}

/// Builder for port configurations
#[derive(Debug, Clone, Default)]
pub struct PortConfigBuilder {
    config: PortConfig,
}

impl PortConfigBuilder {
    pub fn kernel_id(mut self, id: &'static str, version: Version) -> Self {
        self.config.kernel_id = id;
        self.config.kernel_version = version;
        self
    }

    pub fn tick_rate_hz(mut self, rate: u32) -> Self {
        self.config.tick_rate_hz = rate;
        self
    }

    /// Sets the minimal stack depth (words) and the stack word size (bytes).
    pub fn stack(mut self, minimal_depth: u32, word_size: usize) -> Self {
        self.config.minimal_stack_depth = minimal_depth;
        self.config.stack_word_size = word_size;
        self
    }

    pub fn timer_task_stack_depth(mut self, depth: u32) -> Self {
        self.config.timer_task_stack_depth = depth;
        self
    }

    pub fn max_priorities(mut self, max: u32) -> Self {
        self.config.max_priorities = max;
        self
    }

    pub fn event_bits(mut self, bits: u32) -> Self {
        self.config.event_bits = bits;
        self
    }

    /// Sets the control block sizes for tasks, event groups, semaphores and queues.
    pub fn control_blocks(mut self, task: usize, event_group: usize, semaphore: usize, queue: usize) -> Self {
        self.config.task_cb_size = task;
        self.config.event_group_cb_size = event_group;
        self.config.semaphore_cb_size = semaphore;
        self.config.queue_cb_size = queue;
        self
    }

    pub fn static_allocation(mut self, enabled: bool) -> Self {
        self.config.support_static_allocation = enabled;
        self
    }

    pub fn dynamic_allocation(mut self, enabled: bool) -> Self {
        self.config.support_dynamic_allocation = enabled;
        self
    }

    pub fn task_delete(mut self, enabled: bool) -> Self {
        self.config.include_task_delete = enabled;
        self
    }

    pub fn build(self) -> PortConfig {
        self.config
    }
}

/// Operations a native kernel port provides to the compatibility layer
pub trait NativeKernel: Send + Sync {
    /// Build-time configuration of this port
    fn config(&self) -> &PortConfig;

    // Scheduler

    fn define_heap_regions(&self, regions: &[HeapRegion]);
    /// Start scheduling; on hardware this only returns on failure
    fn start_scheduler(&self, system: Option<&SystemTaskMemory>) -> NativeResult;
    fn scheduler_state(&self) -> SchedulerState;
    fn suspend_all(&self);
    /// Returns true when resuming already caused a context switch
    fn resume_all(&self) -> bool;
    fn yield_now(&self);
    fn yield_from_isr(&self, higher_priority_woken: bool);
    fn tick_count(&self) -> Ticks;
    fn tick_count_from_isr(&self) -> Ticks;
    fn delay(&self, ticks: Ticks);
    /// Block until `*previous_wake + increment`, then advance `previous_wake`
    fn delay_until(&self, previous_wake: &mut Ticks, increment: Ticks);

    // Tasks

    fn task_create(&self, spec: TaskSpec, storage: TaskStorage) -> NativeResult<TaskHandle>;
    fn task_delete(&self, task: TaskHandle);
    /// Delete the calling task; does not return when called from a task
    fn task_delete_self(&self);
    fn task_suspend(&self, task: TaskHandle);
    fn task_resume(&self, task: TaskHandle);
    fn task_priority_get(&self, task: TaskHandle) -> u32;
    fn task_priority_set(&self, task: TaskHandle, priority: u32);
    fn task_state(&self, task: TaskHandle) -> TaskState;
    fn task_name(&self, task: TaskHandle) -> Option<TaskName>;
    fn current_task(&self) -> Option<TaskHandle>;
    /// Smallest amount of free stack seen so far, in stack words
    fn stack_high_water_mark(&self, task: TaskHandle) -> u32;
    fn task_count(&self) -> usize;
    /// Fill `out` with live task handles, returns how many were written
    fn system_state(&self, out: &mut [TaskHandle]) -> usize;

    // Event groups

    fn event_group_create(&self, storage: Storage) -> NativeResult<EventGroupHandle>;
    /// Returns the bits after the set (and after any waiters consumed them)
    fn event_group_set_bits(&self, group: EventGroupHandle, bits: u32) -> u32;
    fn event_group_set_bits_from_isr(&self, group: EventGroupHandle, bits: u32) -> NativeResult<bool>;
    /// Returns the bits before the clear
    fn event_group_clear_bits(&self, group: EventGroupHandle, bits: u32) -> u32;
    fn event_group_clear_bits_from_isr(&self, group: EventGroupHandle, bits: u32) -> NativeResult;
    fn event_group_get_bits(&self, group: EventGroupHandle) -> u32;
    fn event_group_get_bits_from_isr(&self, group: EventGroupHandle) -> u32;
    /// Returns the bits at the moment the wait ended, before any clear
    fn event_group_wait_bits(
        &self,
        group: EventGroupHandle,
        bits: u32,
        clear_on_exit: bool,
        wait_all: bool,
        ticks: Ticks,
    ) -> u32;
    fn event_group_delete(&self, group: EventGroupHandle);

    // Counting semaphores

    fn semaphore_create(&self, max: u32, initial: u32, storage: Storage) -> NativeResult<SemaphoreHandle>;
    fn semaphore_take(&self, sem: SemaphoreHandle, ticks: Ticks) -> NativeResult;
    fn semaphore_take_from_isr(&self, sem: SemaphoreHandle) -> NativeResult<bool>;
    fn semaphore_give(&self, sem: SemaphoreHandle) -> NativeResult;
    fn semaphore_give_from_isr(&self, sem: SemaphoreHandle) -> NativeResult<bool>;
    fn semaphore_count(&self, sem: SemaphoreHandle) -> u32;
    fn semaphore_count_from_isr(&self, sem: SemaphoreHandle) -> u32;
    fn semaphore_delete(&self, sem: SemaphoreHandle);

    // Queues

    fn queue_create(&self, length: u32, item_size: u32, storage: QueueStorage) -> NativeResult<QueueHandle>;
    /// Copies `item_size` bytes from `item` to the back of the queue
    fn queue_send(&self, queue: QueueHandle, item: &[u8], ticks: Ticks) -> NativeResult;
    fn queue_send_from_isr(&self, queue: QueueHandle, item: &[u8]) -> NativeResult<bool>;
    /// Copies the front item into the first `item_size` bytes of `out`
    fn queue_receive(&self, queue: QueueHandle, out: &mut [u8], ticks: Ticks) -> NativeResult;
    fn queue_receive_from_isr(&self, queue: QueueHandle, out: &mut [u8]) -> NativeResult<bool>;
    fn queue_messages_waiting(&self, queue: QueueHandle) -> u32;
    fn queue_messages_waiting_from_isr(&self, queue: QueueHandle) -> u32;
    fn queue_spaces_available(&self, queue: QueueHandle) -> u32;
    fn queue_reset(&self, queue: QueueHandle) -> NativeResult;
    fn queue_delete(&self, queue: QueueHandle);
}
