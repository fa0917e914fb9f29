//! Tick counts and wait timeouts

use core::fmt;

/// Native tick counter value
pub type Ticks = u32;

/// Largest native delay; the kernel treats it as "block forever"
pub const MAX_DELAY: Ticks = Ticks::MAX;

/// Wait timeout in kernel ticks.
///
/// `POLL` never blocks and `FOREVER` blocks until the resource becomes
/// available. Any other value is a bounded wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timeout(u32);

impl Timeout {
    /// Return immediately if the resource is unavailable
    pub const POLL: Self = Self(0);

    /// Wait without limit
    pub const FOREVER: Self = Self(u32::MAX);

    /// Create a timeout from a tick count
    pub const fn from_ticks(ticks: Ticks) -> Self {
        Self(ticks)
    }

    /// Get the raw tick count
    pub const fn ticks(self) -> Ticks {
        self.0
    }

    pub const fn is_poll(self) -> bool {
        self.0 == 0
    }

    pub const fn is_forever(self) -> bool {
        self.0 == u32::MAX
    }

    /// Tick count handed to the native kernel
    pub const fn to_native(self) -> Ticks {
        if self.is_forever() {
            MAX_DELAY
        } else {
            self.0
        }
    }
}

impl From<u32> for Timeout {
    fn from(ticks: u32) -> Self {
        Self(ticks)
    }
}

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_forever() {
            write!(f, "forever")
        } else {
            write!(f, "{}ticks", self.0)
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Timeout {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{}ticks", self.0);
    }
}

/// Interval to block for so that a delay ends at absolute tick `target`.
///
/// Returns `None` when `target` equals `now`. A target behind `now` is
/// treated as lying past the next counter wrap.
pub const fn delay_until_interval(now: Ticks, target: Ticks) -> Option<Ticks> {
    if now == target {
        None
    } else if now > target {
        Some(Ticks::MAX - now + target)
    } else {
        Some(target - now)
    }
}
