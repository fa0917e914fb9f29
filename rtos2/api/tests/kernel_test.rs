//! Kernel controller tests over the simulated kernel

use rtos2_api::{KernelState, LockState, NativeKernel, Os, OsConfig, OsError, PortConfig, Version};
use rtos2_posix::PosixKernel;

#[test]
fn test_lifecycle_round_trip() {
    let os = Os::new(PosixKernel::new());
    let kernel = os.kernel();

    assert_eq!(kernel.get_state(), KernelState::Inactive);
    assert_eq!(kernel.initialize(), Ok(()));
    assert_eq!(kernel.get_state(), KernelState::Ready);
    assert_eq!(kernel.initialize(), Err(OsError::State));

    assert_eq!(kernel.start(), Ok(()));
    assert_eq!(kernel.get_state(), KernelState::Running);
    assert_eq!(kernel.start(), Err(OsError::State));

    assert_eq!(kernel.lock(), Ok(LockState::Unlocked));
    assert_eq!(kernel.get_state(), KernelState::Locked);
    assert_eq!(kernel.lock(), Ok(LockState::Locked));

    assert_eq!(kernel.unlock(), Ok(LockState::Locked));
    assert_eq!(kernel.get_state(), KernelState::Running);
    assert_eq!(kernel.unlock(), Ok(LockState::Unlocked));
}

#[test]
fn test_restore_lock() {
    let os = Os::new(PosixKernel::new());
    let kernel = os.kernel();
    kernel.initialize().unwrap();
    assert_eq!(kernel.restore_lock(0), Err(OsError::State));
    kernel.start().unwrap();

    assert_eq!(kernel.restore_lock(1), Ok(LockState::Locked));
    assert_eq!(kernel.get_state(), KernelState::Locked);
    assert_eq!(kernel.restore_lock(0), Ok(LockState::Unlocked));
    assert_eq!(kernel.get_state(), KernelState::Running);
    assert_eq!(kernel.restore_lock(2), Err(OsError::Error));
    assert_eq!(kernel.restore_lock(-1), Err(OsError::Error));
}

#[test]
fn test_get_info() {
    let os = Os::new(PosixKernel::new());
    let kernel = os.kernel();

    let info = kernel.get_info(None).unwrap();
    assert_eq!(info.api, Version::new(0, 0, 1));
    assert_eq!(info.api.encode(), 1);
    assert_eq!(info.kernel.encode(), 100_020_000);

    let id = "FreeRTOSv10.2.0";
    assert_eq!(kernel.id(), id);

    let mut exact = [0xAAu8; 16];
    assert!(kernel.get_info(Some(&mut exact)).is_ok());
    assert_eq!(&exact[..15], id.as_bytes());
    assert_eq!(exact[15], 0);

    let mut short = [0xAAu8; 15];
    assert_eq!(kernel.get_info(Some(&mut short)), Err(OsError::NoMemory));
    assert!(short.iter().all(|&b| b == 0xAA));
}

#[test]
fn test_tick_queries() {
    let os = Os::new(PosixKernel::builder().tick_offset(500).build().unwrap());
    let kernel = os.kernel();
    assert_eq!(kernel.get_tick_freq(), 1000);
    assert_eq!(kernel.get_sys_timer_freq(), 1000);
    assert!(kernel.get_tick_count() >= 500);
    assert!(os.in_isr(|| kernel.get_tick_count()) >= 500);
    assert!(kernel.get_sys_timer_count() >= 500);
}

#[test]
fn test_tickless_hooks() {
    let os = Os::new(PosixKernel::new());
    assert_eq!(os.kernel().suspend(), 0);
    os.kernel().resume(10);
}

#[test]
fn test_start_failure_is_reported() {
    let config = PortConfig::builder().static_allocation(false).build();
    let native = PosixKernel::builder().config(config).build().unwrap();
    // Too small for the idle and timer tasks
    let os = Os::with_config(native, OsConfig::builder().heap_size(64).build());
    let kernel = os.kernel();

    kernel.initialize().unwrap();
    assert_eq!(kernel.start(), Err(OsError::Error));
    assert_eq!(os.native().scheduler_state(), rtos2_api::SchedulerState::NotStarted);
    assert_eq!(kernel.get_state(), KernelState::Ready);
}

#[test]
fn test_dynamic_only_start() {
    let config = PortConfig::builder().static_allocation(false).build();
    let native = PosixKernel::builder().config(config).build().unwrap();
    let os = Os::new(native);
    os.kernel().initialize().unwrap();
    let free = os.native().heap_free();
    assert_eq!(os.kernel().start(), Ok(()));
    assert!(os.native().heap_free() < free);
}
