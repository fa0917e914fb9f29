//! Storage mode resolution for object creation.
//!
//! An object is either fully static (every region supplied by the caller)
//! or fully dynamic (nothing supplied). Anything in between is rejected
//! before the native kernel is involved.

use rtos2_core::{static_region, QueueStorage, Storage, TaskStorage};

/// Why caller memory was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StorageError {
    ControlBlockTooSmall { given: usize, required: usize },
    BufferTooSmall { given: usize, required: usize },
    /// Some regions static, others dynamic
    Mixed,
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StorageError::ControlBlockTooSmall { given, required } => {
                write!(f, "control block of {} bytes, {} required", given, required)
            }
            StorageError::BufferTooSmall { given, required } => {
                write!(f, "buffer of {} bytes, {} required", given, required)
            }
            StorageError::Mixed => write!(f, "mixed static and dynamic memory"),
        }
    }
}

fn check_block(block: &[u8], required: usize) -> Result<(), StorageError> {
    if block.len() < required {
        Err(StorageError::ControlBlockTooSmall {
            given: block.len(),
            required,
        })
    } else {
        Ok(())
    }
}

/// Single control block (event flags, semaphores)
pub(crate) fn single(cb_mem: Option<&'static mut [u8]>, cb_size: usize) -> Result<Storage, StorageError> {
    match static_region(cb_mem) {
        Some(block) => {
            check_block(block, cb_size)?;
            Ok(Storage::Static(block))
        }
        None => Ok(Storage::Heap),
    }
}

/// Control block plus stack
pub(crate) fn task(
    cb_mem: Option<&'static mut [u8]>,
    stack_mem: Option<&'static mut [u8]>,
    cb_size: usize,
) -> Result<TaskStorage, StorageError> {
    let control_block = static_region(cb_mem);
    if let Some(block) = control_block.as_deref() {
        check_block(block, cb_size)?;
    }
    match (control_block, static_region(stack_mem)) {
        (Some(control_block), Some(stack)) => Ok(TaskStorage::Static { control_block, stack }),
        (None, None) => Ok(TaskStorage::Heap),
        _ => Err(StorageError::Mixed),
    }
}

/// Control block plus message buffer of `buffer_size` bytes
pub(crate) fn queue(
    cb_mem: Option<&'static mut [u8]>,
    mq_mem: Option<&'static mut [u8]>,
    cb_size: usize,
    buffer_size: usize,
) -> Result<QueueStorage, StorageError> {
    let control_block = static_region(cb_mem);
    if let Some(block) = control_block.as_deref() {
        check_block(block, cb_size)?;
    }
    let buffer = static_region(mq_mem);
    if let Some(region) = buffer.as_deref() {
        if region.len() < buffer_size {
            return Err(StorageError::BufferTooSmall {
                given: region.len(),
                required: buffer_size,
            });
        }
    }
    match (control_block, buffer) {
        (Some(control_block), Some(buffer)) => Ok(QueueStorage::Static { control_block, buffer }),
        (None, None) => Ok(QueueStorage::Heap),
        _ => Err(StorageError::Mixed),
    }
}
