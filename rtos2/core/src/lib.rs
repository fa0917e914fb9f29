#![no_std]
#![forbid(unsafe_code)]

//! # RTOS2 Core
//!
//! Core types shared by the RTOS2 compatibility layer and the kernel ports
//! underneath it. This crate provides the status vocabulary, priority and
//! tick types, object attributes and the [`NativeKernel`] trait that every
//! port implements.

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

use core::fmt;

pub mod attr;
pub mod flags;
pub mod port;
pub mod priorities;
pub mod states;
pub mod time;

pub use attr::*;
pub use flags::*;
pub use port::*;
pub use priorities::*;
pub use states::*;
pub use time::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type used throughout the compatibility layer
pub type OsResult<T = ()> = Result<T, OsError>;

/// Status codes reported by RTOS2 operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsError {
    /// Unspecified failure
    Error,
    /// Operation is not allowed from interrupt context
    Isr,
    /// Kernel is in the wrong state for the operation
    State,
    /// Invalid argument or handle
    Parameter,
    /// Resource not available right now
    Resource,
    /// Timed out waiting for a resource
    Timeout,
    /// Out of memory, or the caller's buffer is too small
    NoMemory,
    /// Primitive is not provided by this build
    Unsupported,
}

impl OsError {
    /// Signed status code as reported by the C API (`osStatus_t`)
    pub const fn code(self) -> i32 {
        match self {
            OsError::Error | OsError::State | OsError::Unsupported => -1,
            OsError::Timeout => -2,
            OsError::Resource => -3,
            OsError::Parameter => -4,
            OsError::NoMemory => -5,
            OsError::Isr => -6,
        }
    }

    /// Error code in the flags encoding (high bit set)
    pub const fn flags_code(self) -> u32 {
        match self {
            OsError::Timeout => 0xFFFF_FFFE,
            OsError::Resource => 0xFFFF_FFFD,
            OsError::Parameter => 0xFFFF_FFFC,
            OsError::Isr => 0xFFFF_FFFA,
            OsError::Error | OsError::State | OsError::NoMemory | OsError::Unsupported => {
                0xFFFF_FFFF
            }
        }
    }
}

/// Status code of a successful operation
pub const OS_OK: i32 = 0;

/// Convert an operation result into its C status code
pub fn status_code<T>(result: &OsResult<T>) -> i32 {
    match result {
        Ok(_) => OS_OK,
        Err(err) => err.code(),
    }
}

impl fmt::Display for OsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsError::Error => write!(f, "Unspecified RTOS error"),
            OsError::Isr => write!(f, "Not allowed in interrupt context"),
            OsError::State => write!(f, "Kernel is in the wrong state"),
            OsError::Parameter => write!(f, "Invalid parameter"),
            OsError::Resource => write!(f, "Resource not available"),
            OsError::Timeout => write!(f, "Operation timed out"),
            OsError::NoMemory => write!(f, "Out of memory"),
            OsError::Unsupported => write!(f, "Primitive not supported"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for OsError {}

#[cfg(feature = "defmt")]
impl defmt::Format for OsError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            OsError::Error => defmt::write!(fmt, "Error"),
            OsError::Isr => defmt::write!(fmt, "Isr"),
            OsError::State => defmt::write!(fmt, "State"),
            OsError::Parameter => defmt::write!(fmt, "Parameter"),
            OsError::Resource => defmt::write!(fmt, "Resource"),
            OsError::Timeout => defmt::write!(fmt, "Timeout"),
            OsError::NoMemory => defmt::write!(fmt, "NoMemory"),
            OsError::Unsupported => defmt::write!(fmt, "Unsupported"),
        }
    }
}
