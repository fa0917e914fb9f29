//! Thread priority levels

use core::fmt;
use crate::{OsError, OsResult};

/// RTOS2 thread priority.
///
/// Levels come in bands of eight: `LOW` through `LOW.plus(7)`, `BELOW_NORMAL`
/// through `BELOW_NORMAL.plus(7)` and so on up to `REALTIME.plus(7)`. Valid
/// thread priorities lie in `IDLE..=ISR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(i32);

impl Priority {
    /// No priority (not initialized)
    pub const NONE: Priority = Priority(0);
    /// Reserved for the idle thread
    pub const IDLE: Priority = Priority(1);
    pub const LOW: Priority = Priority(8);
    pub const BELOW_NORMAL: Priority = Priority(16);
    pub const NORMAL: Priority = Priority(24);
    pub const ABOVE_NORMAL: Priority = Priority(32);
    pub const HIGH: Priority = Priority(40);
    pub const REALTIME: Priority = Priority(48);
    /// Reserved for ISR deferred threads
    pub const ISR: Priority = Priority(56);
    /// Illegal priority, reported when a query fails
    pub const ERROR: Priority = Priority(-1);

    /// Create a priority after checking it lies in `IDLE..=ISR`
    pub fn new(priority: i32) -> OsResult<Self> {
        let prio = Priority(priority);
        if prio.is_valid() {
            Ok(prio)
        } else {
            Err(OsError::Parameter)
        }
    }

    /// Create priority without validation (const fn)
    pub const fn from_raw(priority: i32) -> Self {
        Priority(priority)
    }

    /// Sub-level within a band, e.g. `NORMAL.plus(3)` is "Normal3"
    pub const fn plus(self, step: i32) -> Self {
        Priority(self.0 + step)
    }

    /// Get the raw priority value
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Check if this priority can be assigned to a thread
    pub const fn is_valid(self) -> bool {
        self.0 >= Self::IDLE.0 && self.0 <= Self::ISR.0
    }

    /// Native priority number; only meaningful for valid priorities
    pub const fn to_native(self) -> u32 {
        if self.0 < 0 {
            0
        } else {
            self.0 as u32
        }
    }

    /// Map a native priority back, anything out of range becomes `ERROR`
    pub fn from_native(priority: u32) -> Self {
        match i32::try_from(priority) {
            Ok(raw) if Priority(raw).is_valid() => Priority(raw),
            _ => Self::ERROR,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Priority({})", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Priority {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "Priority({})", self.0);
    }
}

/// Macro to create compile-time priority constants
#[macro_export]
macro_rules! priority {
    ($value:literal) => {
        $crate::Priority::from_raw($value)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_bounds() {
        assert!(Priority::new(0).is_err());
        assert!(Priority::new(1).is_ok());
        assert!(Priority::new(56).is_ok());
        assert!(Priority::new(57).is_err());
    }

    #[test]
    fn test_native_round_trip_rejects_out_of_range() {
        assert_eq!(Priority::from_native(24), Priority::NORMAL);
        assert_eq!(Priority::from_native(0), Priority::ERROR);
        assert_eq!(Priority::from_native(u32::MAX), Priority::ERROR);
    }
}
