//! Message queue tests over the simulated kernel

use std::sync::Arc;
use std::time::{Duration, Instant};

use rtos2_api::{MessageQueueAttr, NativeKernel, Os, OsError, Timeout};
use rtos2_posix::PosixKernel;

fn running() -> Arc<Os<PosixKernel>> {
    let os = Arc::new(Os::new(PosixKernel::new()));
    os.kernel().initialize().unwrap();
    os.kernel().start().unwrap();
    os
}

fn region(len: usize) -> &'static mut [u8] {
    Box::leak(vec![0u8; len].into_boxed_slice())
}

#[test]
fn test_fifo_ignores_priority() {
    let os = running();
    let queues = os.message_queues();
    let id = queues.create(2, 4, None).unwrap();

    assert_eq!(queues.put(id, b"msgA", 0, Timeout::POLL), Ok(()));
    assert_eq!(queues.put(id, b"msgB", 7, Timeout::POLL), Ok(()));
    assert_eq!(queues.get_count(id), 2);
    assert_eq!(queues.get_space(id), 0);

    let mut out = [0u8; 4];
    let mut prio = 0xFF;
    assert_eq!(queues.get(id, &mut out, Some(&mut prio), Timeout::POLL), Ok(()));
    assert_eq!(&out, b"msgA");
    assert_eq!(prio, 0);
    assert_eq!(queues.get(id, &mut out, None, Timeout::POLL), Ok(()));
    assert_eq!(&out, b"msgB");
    assert_eq!(queues.get_count(id), 0);
}

#[test]
fn test_backpressure() {
    let os = running();
    let queues = os.message_queues();
    let id = queues.create(2, 4, None).unwrap();
    queues.put(id, b"msgA", 0, Timeout::POLL).unwrap();
    queues.put(id, b"msgB", 0, Timeout::POLL).unwrap();

    assert_eq!(queues.put(id, b"msgC", 0, Timeout::POLL), Err(OsError::Resource));
    let started = Instant::now();
    assert_eq!(queues.put(id, b"msgC", 0, Timeout::from(20)), Err(OsError::Timeout));
    assert!(started.elapsed() >= Duration::from_millis(15));
    assert_eq!(queues.get_count(id), 2);
}

#[test]
fn test_get_from_empty() {
    let os = running();
    let queues = os.message_queues();
    let id = queues.create(1, 8, None).unwrap();
    let mut out = [0u8; 8];

    assert_eq!(queues.get(id, &mut out, None, Timeout::POLL), Err(OsError::Resource));
    assert_eq!(queues.get(id, &mut out, None, Timeout::from(10)), Err(OsError::Timeout));
}

#[test]
fn test_get_woken_by_put() {
    let os = running();
    let id = os.message_queues().create(1, 4, None).unwrap();

    let inner = Arc::clone(&os);
    os.threads()
        .spawn(
            move || {
                inner.delay(10).unwrap();
                inner.message_queues().put(id, &7u32.to_le_bytes(), 0, Timeout::FOREVER).unwrap();
            },
            None,
        )
        .unwrap();

    let mut out = [0u8; 4];
    assert_eq!(os.message_queues().get(id, &mut out, None, Timeout::FOREVER), Ok(()));
    assert_eq!(u32::from_le_bytes(out), 7);
}

#[test]
fn test_message_length_checked() {
    let os = running();
    let queues = os.message_queues();
    let id = queues.create(2, 4, None).unwrap();

    assert_eq!(queues.put(id, b"abc", 0, Timeout::POLL), Err(OsError::Parameter));
    // Longer buffers are fine; only one slot's worth is copied
    assert_eq!(queues.put(id, b"abcdef", 0, Timeout::POLL), Ok(()));

    let mut short = [0u8; 3];
    assert_eq!(queues.get(id, &mut short, None, Timeout::POLL), Err(OsError::Parameter));
    let mut long = [0u8; 6];
    assert_eq!(queues.get(id, &mut long, None, Timeout::POLL), Ok(()));
    assert_eq!(&long, b"abcd\0\0");
}

#[test]
fn test_queries() {
    let os = running();
    let queues = os.message_queues();
    let id = queues.create(3, 16, None).unwrap();
    queues.put(id, &[1u8; 16], 0, Timeout::POLL).unwrap();

    assert_eq!(queues.get_capacity(id), 3);
    assert_eq!(queues.get_msg_size(id), 16);
    assert_eq!(queues.get_count(id), 1);
    assert_eq!(queues.get_space(id), 2);
    assert!(queues.get_name(id).is_none());

    os.in_isr(|| {
        assert_eq!(queues.get_count(id), 1);
        assert_eq!(queues.get_space(id), 0);
    });
}

#[test]
fn test_storage_modes() {
    let os = running();
    let queues = os.message_queues();
    let cb_size = os.native().config().queue_cb_size;

    let cb_only = MessageQueueAttr {
        cb_mem: Some(region(cb_size)),
        ..MessageQueueAttr::default()
    };
    assert!(queues.create(2, 4, Some(cb_only)).is_none());

    let buffer_only = MessageQueueAttr {
        mq_mem: Some(region(8)),
        ..MessageQueueAttr::default()
    };
    assert!(queues.create(2, 4, Some(buffer_only)).is_none());

    let short_buffer = MessageQueueAttr::new().static_memory(region(cb_size), region(7));
    assert!(queues.create(2, 4, Some(short_buffer)).is_none());

    let small_cb = MessageQueueAttr::new().static_memory(region(cb_size - 1), region(8));
    assert!(queues.create(2, 4, Some(small_cb)).is_none());

    let free = os.native().heap_free();
    let fully_static = MessageQueueAttr::new().static_memory(region(cb_size), region(8));
    let id = queues.create(2, 4, Some(fully_static)).unwrap();
    assert_eq!(os.native().heap_free(), free);
    queues.put(id, b"data", 0, Timeout::POLL).unwrap();
    assert_eq!(queues.get_count(id), 1);

    assert!(queues.create(0, 4, None).is_none());
    assert!(queues.create(2, 0, None).is_none());
}

#[test]
fn test_reset_and_delete() {
    let os = running();
    let queues = os.message_queues();
    let id = queues.create(2, 4, None).unwrap();
    queues.put(id, b"msgA", 0, Timeout::POLL).unwrap();

    assert_eq!(os.in_isr(|| queues.reset(id)), Err(OsError::Isr));
    assert_eq!(queues.reset(id), Ok(()));
    assert_eq!(queues.get_count(id), 0);

    assert_eq!(os.in_isr(|| queues.delete(id)), Err(OsError::Isr));
    assert_eq!(queues.delete(id), Ok(()));
    assert_eq!(queues.delete(id), Err(OsError::Parameter));
    assert_eq!(queues.put(id, b"msgA", 0, Timeout::POLL), Err(OsError::Parameter));
    assert_eq!(queues.get_capacity(id), 0);
}

#[test]
fn test_isr_paths() {
    let os = running();
    let queues = os.message_queues();
    let id = queues.create(1, 4, None).unwrap();
    let mut out = [0u8; 4];

    os.in_isr(|| {
        assert!(queues.create(1, 4, None).is_none());
        assert_eq!(queues.put(id, b"isr!", 0, Timeout::from(1)), Err(OsError::Parameter));
        assert_eq!(queues.put(id, b"isr!", 0, Timeout::POLL), Ok(()));
        assert_eq!(queues.put(id, b"isr!", 0, Timeout::POLL), Err(OsError::Resource));
        assert_eq!(queues.get(id, &mut out, None, Timeout::FOREVER), Err(OsError::Parameter));
        assert_eq!(queues.get(id, &mut out, None, Timeout::POLL), Ok(()));
        assert_eq!(queues.get(id, &mut out, None, Timeout::POLL), Err(OsError::Resource));
    });
    assert_eq!(&out, b"isr!");
}
