//! Event groups, semaphores and queues of the simulated kernel

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rtos2_core::{HeapRegion, NativeError, NativeKernel, PortConfig, QueueStorage, Storage, MAX_DELAY};
use rtos2_posix::PosixKernel;

fn kernel() -> PosixKernel {
    let kernel = PosixKernel::new();
    kernel.define_heap_regions(&[HeapRegion { start: 0x1000_0000, size: 8192 }]);
    kernel
}

#[test]
fn test_event_bits_are_masked() {
    let kernel = kernel();
    let group = kernel.event_group_create(Storage::Heap).unwrap();
    assert_eq!(kernel.event_group_set_bits(group, 0xFF00_0001), 0x0000_0001);

    let config = PortConfig::builder().event_bits(32).build();
    let wide = PosixKernel::builder().config(config).build().unwrap();
    wide.define_heap_regions(&[HeapRegion { start: 0, size: 1024 }]);
    let group = wide.event_group_create(Storage::Heap).unwrap();
    assert_eq!(wide.event_group_set_bits(group, 0xFF00_0001), 0xFF00_0001);
}

#[test]
fn test_wait_bits_reports_value_before_clear() {
    let kernel = kernel();
    let group = kernel.event_group_create(Storage::Heap).unwrap();
    kernel.event_group_set_bits(group, 0b111);

    assert_eq!(kernel.event_group_wait_bits(group, 0b011, true, true, 0), 0b111);
    assert_eq!(kernel.event_group_get_bits(group), 0b100);
    assert_eq!(kernel.event_group_clear_bits(group, 0b100), 0b100);
    assert_eq!(kernel.event_group_get_bits_from_isr(group), 0);
}

#[test]
fn test_wait_bits_times_out_with_current_value() {
    let kernel = kernel();
    let group = kernel.event_group_create(Storage::Heap).unwrap();
    kernel.event_group_set_bits(group, 0b01);

    let started = Instant::now();
    assert_eq!(kernel.event_group_wait_bits(group, 0b11, true, true, 15), 0b01);
    assert!(started.elapsed() >= Duration::from_millis(10));
    assert_eq!(kernel.event_group_get_bits(group), 0b01);
}

#[test]
fn test_semaphore_limits() {
    let kernel = kernel();
    assert_eq!(kernel.semaphore_create(0, 0, Storage::Heap), Err(NativeError::Invalid));

    let sem = kernel.semaphore_create(1, 0, Storage::Heap).unwrap();
    assert_eq!(kernel.semaphore_take(sem, 0), Err(NativeError::WouldBlock));
    assert_eq!(kernel.semaphore_take_from_isr(sem), Err(NativeError::Empty));
    assert_eq!(kernel.semaphore_give(sem), Ok(()));
    assert_eq!(kernel.semaphore_give(sem), Err(NativeError::Full));
    assert_eq!(kernel.semaphore_count_from_isr(sem), 1);
}

#[test]
fn test_semaphore_wakes_host_waiter() {
    let kernel = Arc::new(kernel());
    let sem = kernel.semaphore_create(1, 0, Storage::Heap).unwrap();

    let giver = Arc::clone(&kernel);
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(10));
        giver.semaphore_give(sem).unwrap();
    });

    assert_eq!(kernel.semaphore_take(sem, MAX_DELAY), Ok(()));
    handle.join().unwrap();
}

#[test]
fn test_queue_ring_wraps() {
    let kernel = kernel();
    let queue = kernel.queue_create(2, 2, QueueStorage::Heap).unwrap();
    let mut out = [0u8; 2];

    for round in 0u8..5 {
        kernel.queue_send(queue, &[round, round], 0).unwrap();
        kernel.queue_send(queue, &[round, round + 1], 0).unwrap();
        assert_eq!(kernel.queue_send(queue, &[0, 0], 0), Err(NativeError::Full));
        assert_eq!(kernel.queue_spaces_available(queue), 0);

        kernel.queue_receive(queue, &mut out, 0).unwrap();
        assert_eq!(out, [round, round]);
        assert_eq!(kernel.queue_receive_from_isr(queue, &mut out), Ok(false));
        assert_eq!(out, [round, round + 1]);
    }
    assert_eq!(kernel.queue_receive(queue, &mut out, 0), Err(NativeError::Empty));
}

#[test]
fn test_queue_static_and_reset() {
    let kernel = kernel();
    let config = kernel.config().clone();
    let storage = QueueStorage::Static {
        control_block: Box::leak(vec![0u8; config.queue_cb_size].into_boxed_slice()),
        buffer: Box::leak(vec![0u8; 12].into_boxed_slice()),
    };
    let free = kernel.heap_free();
    let queue = kernel.queue_create(3, 4, storage).unwrap();
    assert_eq!(kernel.heap_free(), free);

    kernel.queue_send_from_isr(queue, b"abcd").unwrap();
    assert_eq!(kernel.queue_messages_waiting(queue), 1);
    assert_eq!(kernel.queue_send(queue, b"ab", 0), Err(NativeError::Invalid));
    kernel.queue_reset(queue).unwrap();
    assert_eq!(kernel.queue_messages_waiting_from_isr(queue), 0);

    kernel.queue_delete(queue);
    assert_eq!(kernel.queue_reset(queue), Err(NativeError::Invalid));
}

#[test]
fn test_dynamic_creation_needs_heap() {
    let kernel = PosixKernel::new();
    assert_eq!(kernel.queue_create(1, 4, QueueStorage::Heap), Err(NativeError::AllocFailed));
    assert_eq!(kernel.event_group_create(Storage::Heap), Err(NativeError::AllocFailed));
}
