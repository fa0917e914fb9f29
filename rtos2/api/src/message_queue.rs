//! Fixed-size message queues.
//!
//! Messages are copied in and out of fixed-size slots and delivered in
//! strict FIFO order. The message priority argument is accepted for API
//! compatibility and ignored; `get` always reports priority 0.

use rtos2_core::{MessageQueueAttr, NativeKernel, OsError, OsResult, QueueHandle, Timeout};

use crate::handle::MessageQueueId;
use crate::{storage, ExecPath, Os, LOG_TARGET};

#[derive(Debug, Clone, Copy)]
pub(crate) struct QueueRecord {
    pub(crate) queue: QueueHandle,
    pub(crate) msg_count: u32,
    pub(crate) msg_size: u32,
}

impl QueueRecord {
    fn msg_len(&self) -> usize {
        self.msg_size as usize
    }
}

/// Message queue manager facade
pub struct MessageQueues<'a, K: NativeKernel> {
    os: &'a Os<K>,
}

impl<'a, K: NativeKernel> MessageQueues<'a, K> {
    pub(crate) fn new(os: &'a Os<K>) -> Self {
        Self { os }
    }

    /// Create a queue of `msg_count` slots of `msg_size` bytes each.
    ///
    /// Caller memory must cover both the control block and the message
    /// buffer, or neither.
    pub fn create(&self, msg_count: u32, msg_size: u32, attr: Option<MessageQueueAttr>) -> Option<MessageQueueId> {
        self.os.ensure_thread().ok()?;
        if msg_count == 0 || msg_size == 0 {
            return None;
        }
        let buffer_size = (msg_count as usize).checked_mul(msg_size as usize)?;
        let native = self.os.native();
        let attr = attr.unwrap_or_default();
        let storage = match storage::queue(attr.cb_mem, attr.mq_mem, native.config().queue_cb_size, buffer_size) {
            Ok(storage) => storage,
            Err(err) => {
                log::warn!(target: LOG_TARGET, "message queue memory rejected: {}", err);
                return None;
            }
        };
        let queue = match native.queue_create(msg_count, msg_size, storage) {
            Ok(queue) => queue,
            Err(err) => {
                log::debug!(target: LOG_TARGET, "native queue creation failed: {}", err);
                return None;
            }
        };
        let id = MessageQueueId(self.os.queues.insert(QueueRecord {
            queue,
            msg_count,
            msg_size,
        }));
        log::trace!(target: LOG_TARGET, "message queue {:?} created", id);
        Some(id)
    }

    fn record(&self, id: MessageQueueId) -> OsResult<QueueRecord> {
        self.os.queues.lookup(id.0).ok_or(OsError::Parameter)
    }

    pub fn get_name(&self, _id: MessageQueueId) -> Option<&'static str> {
        None
    }

    /// Append a message, waiting up to `timeout` for a free slot.
    ///
    /// `msg` must hold at least one slot's worth of bytes; exactly that many
    /// are copied.
    pub fn put(&self, id: MessageQueueId, msg: &[u8], _msg_prio: u8, timeout: Timeout) -> OsResult {
        let record = self.record(id)?;
        let msg = msg.get(..record.msg_len()).ok_or(OsError::Parameter)?;
        let native = self.os.native();
        match self.os.path_for_timeout(timeout)? {
            ExecPath::Isr => match native.queue_send_from_isr(record.queue, msg) {
                Ok(woken) => {
                    native.yield_from_isr(woken);
                    Ok(())
                }
                Err(_) => Err(OsError::Resource),
            },
            ExecPath::Thread => native
                .queue_send(record.queue, msg, timeout.to_native())
                .map_err(|_| if timeout.is_poll() { OsError::Resource } else { OsError::Timeout }),
        }
    }

    /// Remove the oldest message into `msg`, waiting up to `timeout` for one
    pub fn get(&self, id: MessageQueueId, msg: &mut [u8], msg_prio: Option<&mut u8>, timeout: Timeout) -> OsResult {
        let record = self.record(id)?;
        let msg = msg.get_mut(..record.msg_len()).ok_or(OsError::Parameter)?;
        let native = self.os.native();
        let result = match self.os.path_for_timeout(timeout)? {
            ExecPath::Isr => match native.queue_receive_from_isr(record.queue, msg) {
                Ok(woken) => {
                    native.yield_from_isr(woken);
                    Ok(())
                }
                Err(_) => Err(OsError::Resource),
            },
            ExecPath::Thread => native
                .queue_receive(record.queue, msg, timeout.to_native())
                .map_err(|_| if timeout.is_poll() { OsError::Resource } else { OsError::Timeout }),
        };
        if result.is_ok() {
            if let Some(prio) = msg_prio {
                *prio = 0;
            }
        }
        result
    }

    /// Number of slots, 0 for a stale id
    pub fn get_capacity(&self, id: MessageQueueId) -> u32 {
        self.record(id).map_or(0, |record| record.msg_count)
    }

    pub fn get_msg_size(&self, id: MessageQueueId) -> u32 {
        self.record(id).map_or(0, |record| record.msg_size)
    }

    /// Messages currently queued
    pub fn get_count(&self, id: MessageQueueId) -> u32 {
        let Ok(record) = self.record(id) else {
            return 0;
        };
        let native = self.os.native();
        match self.os.exec_path() {
            ExecPath::Thread => native.queue_messages_waiting(record.queue),
            ExecPath::Isr => native.queue_messages_waiting_from_isr(record.queue),
        }
    }

    /// Free slots; always 0 from an interrupt handler
    pub fn get_space(&self, id: MessageQueueId) -> u32 {
        if self.os.is_isr_context() {
            return 0;
        }
        match self.record(id) {
            Ok(record) => self.os.native().queue_spaces_available(record.queue),
            Err(_) => 0,
        }
    }

    /// Discard every queued message
    pub fn reset(&self, id: MessageQueueId) -> OsResult {
        self.os.ensure_thread()?;
        let record = self.record(id)?;
        self.os
            .native()
            .queue_reset(record.queue)
            .map_err(|_| OsError::Resource)
    }

    pub fn delete(&self, id: MessageQueueId) -> OsResult {
        self.os.ensure_thread()?;
        let record = self.os.queues.remove(id.0).ok_or(OsError::Parameter)?;
        self.os.native().queue_delete(record.queue);
        log::trace!(target: LOG_TARGET, "message queue {:?} deleted", id);
        Ok(())
    }
}
