//! Blinky on the RTOS2 compatibility layer
//!
//! One thread, "MSM", toggles a simulated LED once per second. The startup
//! sequence is the usual one: initialize the kernel, bring up the
//! application module, create its thread with caller-provided memory and
//! start the scheduler. Press Ctrl-C to stop.

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc;

use rtos2_api::{NativeKernel, Os, Priority, ThreadAttr};
use rtos2_posix::{logger, PosixKernel};

/// Blink period in kernel ticks
const BLINK_TICKS: u32 = 1000;
/// MSM thread stack size in bytes
const MSM_STACK_SIZE: usize = 1024;

/// Simulated LED output pin
static LED: AtomicBool = AtomicBool::new(false);
static TOGGLES: AtomicU32 = AtomicU32::new(0);

fn led_toggle() {
    let on = !LED.fetch_xor(true, Ordering::SeqCst);
    let count = TOGGLES.fetch_add(1, Ordering::Relaxed) + 1;
    log::info!(target: "blinky", "LED {} ({} toggles)", if on { "on" } else { "off" }, count);
}

fn msm_init() {
    LED.store(false, Ordering::SeqCst);
}

fn msm_thread(os: &'static Os<PosixKernel>) {
    let mut wake = os.kernel().get_tick_count();
    loop {
        wake = wake.wrapping_add(BLINK_TICKS);
        if os.delay_until(wake).is_err() {
            log::error!(target: "blinky", "delay failed, MSM thread exiting");
            os.threads().exit_current();
        }
        led_toggle();
    }
}

/// Startup wrapper; any failure is reported as a nonzero exit code
fn application_run(os: &'static Os<PosixKernel>) -> Result<(), &'static str> {
    os.kernel().initialize().map_err(|_| "kernel initialize failed")?;

    msm_init();

    let cb_size = os.native().config().task_cb_size;
    let cb_mem: &'static mut [u8] = Box::leak(vec![0u8; cb_size].into_boxed_slice());
    let stack_mem: &'static mut [u8] = Box::leak(vec![0u8; MSM_STACK_SIZE].into_boxed_slice());
    let attr = ThreadAttr::new()
        .name("MSM")
        .priority(Priority::NORMAL)
        .static_memory(cb_mem, stack_mem);
    os.threads()
        .spawn(move || msm_thread(os), Some(attr))
        .ok_or("MSM thread creation failed")?;

    os.kernel().start().map_err(|_| "kernel start failed")?;
    Ok(())
}

fn main() -> ExitCode {
    if let Err(err) = logger::init_from_env(log::LevelFilter::Info) {
        eprintln!("logger: {}", err);
    }

    let os: &'static Os<PosixKernel> = Box::leak(Box::new(Os::new(PosixKernel::new())));
    let info = os.kernel().get_info(None);
    if let Ok(info) = info {
        log::info!(target: "blinky", "{} {} (API {})", os.kernel().id(), info.kernel, info.api);
    }

    let (stop_tx, stop_rx) = mpsc::channel();
    if let Err(err) = ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    }) {
        log::warn!(target: "blinky", "Ctrl-C handler not installed: {}", err);
    }

    if let Err(reason) = application_run(os) {
        log::error!(target: "blinky", "{}", reason);
        return ExitCode::FAILURE;
    }

    let _ = stop_rx.recv();
    log::info!(target: "blinky", "stopped after {} toggles", TOGGLES.load(Ordering::Relaxed));
    ExitCode::SUCCESS
}
