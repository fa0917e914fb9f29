//! Event flags tests over the simulated kernel

use std::sync::Arc;
use std::time::{Duration, Instant};

use rtos2_api::{EventFlagsAttr, FlagsOptions, NativeKernel, Os, OsError, Timeout, FLAGS_ERROR};
use rtos2_posix::PosixKernel;

fn running() -> Arc<Os<PosixKernel>> {
    let os = Arc::new(Os::new(PosixKernel::new()));
    os.kernel().initialize().unwrap();
    os.kernel().start().unwrap();
    os
}

#[test]
fn test_set_clear_get() {
    let os = running();
    let flags = os.event_flags();
    let id = flags.create(None).unwrap();

    assert_eq!(flags.get(id), 0);
    assert_eq!(flags.set(id, 0b01), Ok(0b01));
    assert_eq!(flags.set(id, 0b10), Ok(0b11));
    assert_eq!(flags.clear(id, 0b01), Ok(0b11));
    assert_eq!(flags.get(id), 0b10);
    assert!(flags.get_name(id).is_none());
}

#[test]
fn test_sentinel_bit_rejected() {
    let os = running();
    let flags = os.event_flags();
    let id = flags.create(None).unwrap();
    flags.set(id, 0b100).unwrap();

    assert_eq!(flags.set(id, FLAGS_ERROR | 1), Err(OsError::Parameter));
    assert_eq!(flags.clear(id, FLAGS_ERROR), Err(OsError::Parameter));
    assert_eq!(
        flags.wait(id, FLAGS_ERROR | 0b100, FlagsOptions::WAIT_ANY, Timeout::POLL),
        Err(OsError::Parameter)
    );
    assert_eq!(flags.get(id), 0b100);
}

#[test]
fn test_wait_any_clears_by_default() {
    let os = running();
    let flags = os.event_flags();
    let id = flags.create(None).unwrap();
    flags.set(id, 0b0010).unwrap();

    assert_eq!(flags.wait(id, 0b0110, FlagsOptions::WAIT_ANY, Timeout::POLL), Ok(0b0010));
    assert_eq!(flags.get(id), 0);
    assert_eq!(
        flags.wait(id, 0b0110, FlagsOptions::WAIT_ANY, Timeout::POLL),
        Err(OsError::Resource)
    );
}

#[test]
fn test_wait_no_clear() {
    let os = running();
    let flags = os.event_flags();
    let id = flags.create(None).unwrap();
    flags.set(id, 0b11).unwrap();

    let options = FlagsOptions::WAIT_ALL | FlagsOptions::NO_CLEAR;
    assert_eq!(flags.wait(id, 0b11, options, Timeout::POLL), Ok(0b11));
    assert_eq!(flags.get(id), 0b11);
}

#[test]
fn test_wait_all_partial_times_out() {
    let os = running();
    let flags = os.event_flags();
    let id = flags.create(None).unwrap();
    flags.set(id, 0b01).unwrap();

    assert_eq!(
        flags.wait(id, 0b11, FlagsOptions::WAIT_ALL, Timeout::POLL),
        Err(OsError::Resource)
    );

    let started = Instant::now();
    assert_eq!(
        flags.wait(id, 0b11, FlagsOptions::WAIT_ALL, Timeout::from(20)),
        Err(OsError::Timeout)
    );
    assert!(started.elapsed() >= Duration::from_millis(15));
    // The partial match is left untouched
    assert_eq!(flags.get(id), 0b01);
}

#[test]
fn test_wait_woken_by_thread() {
    let os = running();
    let id = os.event_flags().create(None).unwrap();

    let inner = Arc::clone(&os);
    os.threads()
        .spawn(
            move || {
                inner.delay(10).unwrap();
                inner.event_flags().set(id, 0b100).unwrap();
            },
            None,
        )
        .unwrap();

    let value = os
        .event_flags()
        .wait(id, 0b100, FlagsOptions::WAIT_ALL, Timeout::FOREVER)
        .unwrap();
    assert_eq!(value & 0b100, 0b100);
    assert_eq!(os.event_flags().get(id), 0);
}

#[test]
fn test_isr_paths() {
    let os = running();
    let flags = os.event_flags();
    let id = flags.create(None).unwrap();

    os.in_isr(|| {
        assert!(flags.create(None).is_none());
        assert_eq!(flags.set(id, 0b101), Ok(0b101));
        assert_eq!(flags.get(id), 0b101);
        assert_eq!(flags.clear(id, 0b001), Ok(0b101));
        assert_eq!(flags.get(id), 0b100);
        assert_eq!(
            flags.wait(id, 0b100, FlagsOptions::WAIT_ANY, Timeout::POLL),
            Err(OsError::Isr)
        );
        assert_eq!(flags.delete(id), Err(OsError::Isr));
    });
    assert_eq!(flags.get(id), 0b100);
}

#[test]
fn test_static_control_block() {
    let os = running();
    let cb_size = os.native().config().event_group_cb_size;
    let small = Box::leak(vec![0u8; cb_size - 1].into_boxed_slice());
    assert!(os.event_flags().create(Some(EventFlagsAttr::new().cb_mem(small))).is_none());

    let block = Box::leak(vec![0u8; cb_size].into_boxed_slice());
    let attr = EventFlagsAttr::new().name("events").cb_mem(block);
    assert!(os.event_flags().create(Some(attr)).is_some());
}

#[test]
fn test_delete() {
    let os = running();
    let flags = os.event_flags();
    let id = flags.create(None).unwrap();

    assert_eq!(flags.delete(id), Ok(()));
    assert_eq!(flags.delete(id), Err(OsError::Parameter));
    assert_eq!(flags.set(id, 1), Err(OsError::Parameter));
    assert_eq!(
        flags.wait(id, 1, FlagsOptions::WAIT_ANY, Timeout::POLL),
        Err(OsError::Parameter)
    );

    // A new object reusing the slot is not reachable through the old id
    let fresh = flags.create(None).unwrap();
    assert_ne!(fresh, id);
    flags.set(fresh, 1).unwrap();
    assert_eq!(flags.get(id), 0);
}
