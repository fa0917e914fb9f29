//! Delay functions from thread context

use std::time::{Duration, Instant};

use rtos2_api::{NativeKernel, Os, OsError, PortConfig, Ticks, Timeout};
use rtos2_posix::PosixKernel;

/// One tick per second, so the counter holds still for the test
fn slow_clock(offset: Ticks) -> Os<PosixKernel> {
    let config = PortConfig::builder().tick_rate_hz(1).build();
    let native = PosixKernel::builder().config(config).tick_offset(offset).build().unwrap();
    Os::new(native)
}

#[test]
fn test_layer_types_are_exported() {
    let os = Os::new(PosixKernel::new());
    let status: Result<(), OsError> = os.in_isr(|| os.delay(Timeout::from(5).ticks()));
    assert_eq!(status, Err(OsError::Isr));
    assert_eq!(os.native().config().tick_rate_hz, 1000);
}

#[test]
fn test_delay_until_current_tick_returns() {
    let os = slow_clock(500);
    let start = Instant::now();
    assert_eq!(os.delay_until(500), Ok(()));
    assert!(start.elapsed() < Duration::from_millis(500));
}

#[test]
fn test_delay_until_future_tick() {
    let os = Os::new(PosixKernel::builder().tick_offset(500).build().unwrap());
    let target = os.kernel().get_tick_count().wrapping_add(20);
    assert_eq!(os.delay_until(target), Ok(()));
    assert!(os.kernel().get_tick_count().wrapping_sub(target) < Ticks::MAX / 2);
}

#[test]
fn test_delay_blocks_for_ticks() {
    let os = Os::new(PosixKernel::new());
    let start = Instant::now();
    assert_eq!(os.delay(20), Ok(()));
    assert!(start.elapsed() >= Duration::from_millis(20));
}
