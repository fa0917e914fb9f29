//! Simulated fixed-size message queues.

use rtos2_core::{NativeError, NativeResult, QueueHandle, QueueStorage, Ticks};

use crate::{Shared, LOG_TARGET};

enum Buffer {
    Static(&'static mut [u8]),
    Heap(Vec<u8>),
}

impl Buffer {
    fn as_slice(&self) -> &[u8] {
        match self {
            Buffer::Static(region) => region,
            Buffer::Heap(bytes) => bytes,
        }
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        match self {
            Buffer::Static(region) => region,
            Buffer::Heap(bytes) => bytes,
        }
    }
}

/// Ring of `length` items, `item_size` bytes each
pub(crate) struct Queue {
    length: u32,
    item_size: usize,
    head: u32,
    count: u32,
    buffer: Buffer,
    heap_bytes: usize,
    _control_block: Option<&'static mut [u8]>,
}

impl Queue {
    fn slot(&self, index: u32) -> core::ops::Range<usize> {
        let start = (index % self.length) as usize * self.item_size;
        start..start + self.item_size
    }

    fn check_len(&self, len: usize) -> NativeResult {
        if len < self.item_size {
            Err(NativeError::Invalid)
        } else {
            Ok(())
        }
    }

    fn push(&mut self, item: &[u8]) -> bool {
        if self.count == self.length {
            return false;
        }
        let range = self.slot(self.head + self.count);
        self.buffer.as_mut_slice()[range].copy_from_slice(&item[..self.item_size]);
        self.count += 1;
        true
    }

    fn pop(&mut self, out: &mut [u8]) -> bool {
        if self.count == 0 {
            return false;
        }
        let range = self.slot(self.head);
        out[..self.item_size].copy_from_slice(&self.buffer.as_slice()[range]);
        self.head = (self.head + 1) % self.length;
        self.count -= 1;
        true
    }
}

impl Shared {
    pub(crate) fn create_queue(&self, length: u32, item_size: u32, storage: QueueStorage) -> NativeResult<QueueHandle> {
        if length == 0 || item_size == 0 {
            return Err(NativeError::Invalid);
        }
        let item_size = item_size as usize;
        let buffer_bytes = (length as usize)
            .checked_mul(item_size)
            .ok_or(NativeError::Invalid)?;

        let (region, control_block, heap_bytes) = match storage {
            QueueStorage::Static { control_block, buffer } => {
                if !self.config.support_static_allocation {
                    return Err(NativeError::Unsupported);
                }
                if control_block.len() < self.config.queue_cb_size || buffer.len() < buffer_bytes {
                    return Err(NativeError::Invalid);
                }
                (Some(buffer), Some(control_block), 0)
            }
            QueueStorage::Heap => {
                if !self.config.support_dynamic_allocation {
                    return Err(NativeError::Unsupported);
                }
                (None, None, self.config.queue_cb_size + buffer_bytes)
            }
        };

        let mut guard = self.state.lock();
        guard.heap.allocate(heap_bytes)?;
        let buffer = match region {
            Some(region) => Buffer::Static(region),
            None => Buffer::Heap(vec![0u8; buffer_bytes]),
        };
        let raw = guard.queues.insert(Queue {
            length,
            item_size,
            head: 0,
            count: 0,
            buffer,
            heap_bytes,
            _control_block: control_block,
        });
        log::trace!(target: LOG_TARGET, "queue {} created ({} x {} bytes)", raw, length, item_size);
        Ok(QueueHandle::new(raw))
    }

    pub(crate) fn send(&self, queue: QueueHandle, item: &[u8], ticks: Ticks) -> NativeResult {
        let mut guard = self.state.lock();
        self.checkpoint(&mut guard);
        let sent = self.block_on(&mut guard, ticks, |state| {
            let Some(record) = state.queues.get_mut(queue.raw()) else {
                return Some(Err(NativeError::Invalid));
            };
            if let Err(err) = record.check_len(item.len()) {
                return Some(Err(err));
            }
            record.push(item).then_some(Ok(()))
        });
        drop(guard);
        let result = sent.unwrap_or(Err(NativeError::Full));
        if result.is_ok() {
            self.notify();
        }
        result
    }

    pub(crate) fn send_from_isr(&self, queue: QueueHandle, item: &[u8]) -> NativeResult<bool> {
        let mut guard = self.state.lock();
        let record = guard.queues.get_mut(queue.raw()).ok_or(NativeError::Invalid)?;
        record.check_len(item.len())?;
        if !record.push(item) {
            return Err(NativeError::Full);
        }
        let woken = guard.any_blocked();
        drop(guard);
        self.notify();
        Ok(woken)
    }

    pub(crate) fn receive(&self, queue: QueueHandle, out: &mut [u8], ticks: Ticks) -> NativeResult {
        let mut guard = self.state.lock();
        self.checkpoint(&mut guard);
        let received = self.block_on(&mut guard, ticks, |state| {
            let Some(record) = state.queues.get_mut(queue.raw()) else {
                return Some(Err(NativeError::Invalid));
            };
            if let Err(err) = record.check_len(out.len()) {
                return Some(Err(err));
            }
            record.pop(out).then_some(Ok(()))
        });
        drop(guard);
        let result = received.unwrap_or(Err(NativeError::Empty));
        if result.is_ok() {
            self.notify();
        }
        result
    }

    pub(crate) fn receive_from_isr(&self, queue: QueueHandle, out: &mut [u8]) -> NativeResult<bool> {
        let mut guard = self.state.lock();
        let record = guard.queues.get_mut(queue.raw()).ok_or(NativeError::Invalid)?;
        record.check_len(out.len())?;
        if !record.pop(out) {
            return Err(NativeError::Empty);
        }
        let woken = guard.any_blocked();
        drop(guard);
        self.notify();
        Ok(woken)
    }

    pub(crate) fn messages_waiting(&self, queue: QueueHandle) -> u32 {
        let guard = self.state.lock();
        guard.queues.get(queue.raw()).map_or(0, |record| record.count)
    }

    pub(crate) fn spaces_available(&self, queue: QueueHandle) -> u32 {
        let guard = self.state.lock();
        guard
            .queues
            .get(queue.raw())
            .map_or(0, |record| record.length - record.count)
    }

    pub(crate) fn reset_queue(&self, queue: QueueHandle) -> NativeResult {
        let mut guard = self.state.lock();
        let record = guard.queues.get_mut(queue.raw()).ok_or(NativeError::Invalid)?;
        record.head = 0;
        record.count = 0;
        drop(guard);
        self.notify();
        Ok(())
    }

    pub(crate) fn delete_queue(&self, queue: QueueHandle) {
        let mut guard = self.state.lock();
        if let Some(record) = guard.queues.remove(queue.raw()) {
            guard.heap.release(record.heap_bytes);
            drop(guard);
            self.notify();
            log::trace!(target: LOG_TARGET, "queue {} deleted", queue.raw());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue(length: u32, item_size: usize) -> Queue {
        Queue {
            length,
            item_size,
            head: 0,
            count: 0,
            buffer: Buffer::Heap(vec![0u8; length as usize * item_size]),
            heap_bytes: 0,
            _control_block: None,
        }
    }

    #[test]
    fn test_ring_wraps_in_fifo_order() {
        let mut ring = queue(2, 4);
        let mut out = [0u8; 4];
        assert!(ring.push(&1u32.to_le_bytes()));
        assert!(ring.push(&2u32.to_le_bytes()));
        assert!(!ring.push(&3u32.to_le_bytes()));
        assert!(ring.pop(&mut out));
        assert_eq!(u32::from_le_bytes(out), 1);
        assert!(ring.push(&3u32.to_le_bytes()));
        assert!(ring.pop(&mut out));
        assert_eq!(u32::from_le_bytes(out), 2);
        assert!(ring.pop(&mut out));
        assert_eq!(u32::from_le_bytes(out), 3);
        assert!(!ring.pop(&mut out));
    }
}
