//! Simulated tick clock.
//!
//! The tick counter is derived from a monotonic clock at the configured rate,
//! so it never drifts and needs no ticker thread. An optional start offset
//! lets tests begin close to the 32-bit wrap.

use std::time::{Duration, Instant};

use rtos2_core::{Ticks, MAX_DELAY};

/// Nanoseconds per second
const NSEC_PER_SEC: u64 = 1_000_000_000;

/// Monotonic tick source for the simulated kernel
#[derive(Debug, Clone)]
pub struct TickClock {
    origin: Instant,
    rate_hz: u32,
    offset: Ticks,
}

impl TickClock {
    /// Create a clock ticking at `rate_hz`, starting at `offset`
    pub fn new(rate_hz: u32, offset: Ticks) -> Self {
        TickClock {
            origin: Instant::now(),
            rate_hz,
            offset,
        }
    }

    pub fn rate_hz(&self) -> u32 {
        self.rate_hz
    }

    /// Get the tick period as a Duration
    pub fn period(&self) -> Duration {
        Duration::from_nanos(NSEC_PER_SEC / u64::from(self.rate_hz))
    }

    /// Current tick count, wrapping at 32 bits
    pub fn now(&self) -> Ticks {
        let elapsed = self.origin.elapsed().as_nanos();
        let ticks = elapsed * u128::from(self.rate_hz) / u128::from(NSEC_PER_SEC);
        // Truncation is the wrap of the native counter.
        (ticks as u32).wrapping_add(self.offset)
    }

    /// Duration of `ticks` kernel ticks
    pub fn ticks_to_duration(&self, ticks: Ticks) -> Duration {
        Duration::from_nanos(u64::from(ticks) * NSEC_PER_SEC / u64::from(self.rate_hz))
    }

    /// Instant at which a wait of `ticks` started now expires; `None` blocks forever
    pub fn deadline(&self, ticks: Ticks) -> Option<Instant> {
        if ticks == MAX_DELAY {
            None
        } else {
            Instant::now().checked_add(self.ticks_to_duration(ticks))
        }
    }
}
