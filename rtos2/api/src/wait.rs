//! Generic wait functions.

use rtos2_core::{delay_until_interval, NativeKernel, OsResult, Ticks};

use crate::Os;

impl<K: NativeKernel> Os<K> {
    /// Block the calling thread for `ticks` kernel ticks; 0 returns at once
    pub fn delay(&self, ticks: Ticks) -> OsResult {
        self.ensure_thread()?;
        if ticks != 0 {
            self.native().delay(ticks);
        }
        Ok(())
    }

    /// Block until the tick counter reaches `target`.
    ///
    /// A target already in the past is treated as lying after a counter
    /// wrap, so the thread sleeps for nearly a full counter period. Only a
    /// target equal to the current tick returns immediately.
    pub fn delay_until(&self, target: Ticks) -> OsResult {
        self.ensure_thread()?;
        let native = self.native();
        let mut wake = native.tick_count();
        if let Some(interval) = delay_until_interval(wake, target) {
            // Anchored at the tick read above
            native.delay_until(&mut wake, interval);
        }
        Ok(())
    }
}
