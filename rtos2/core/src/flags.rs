//! Event flag masks and wait options

use bitflags::bitflags;

/// Bit 31 of a flags value; set means the value is an error code
pub const FLAGS_ERROR: u32 = 0x8000_0000;

/// Flags accepted by set/clear/wait: every bit except the sentinel
pub const FLAGS_VALID_MASK: u32 = !FLAGS_ERROR;

/// Returns true when `flags` carries the error sentinel
pub const fn is_flags_error(flags: u32) -> bool {
    flags & FLAGS_ERROR != 0
}

bitflags! {
    /// Options for event flag waits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FlagsOptions: u32 {
        /// Wait until every requested flag is set
        const WAIT_ALL = 0x0000_0001;
        /// Leave the flags set after a successful wait
        const NO_CLEAR = 0x0000_0002;
    }
}

impl FlagsOptions {
    /// Wait until any requested flag is set
    pub const WAIT_ANY: Self = Self::empty();

    pub const fn wait_all(self) -> bool {
        self.contains(Self::WAIT_ALL)
    }

    pub const fn clear_on_exit(self) -> bool {
        !self.contains(Self::NO_CLEAR)
    }
}

bitflags! {
    /// Thread attribute bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ThreadAttrBits: u32 {
        /// Thread can be joined; not provided by this layer
        const JOINABLE = 0x0000_0001;
    }
}

bitflags! {
    /// Mutex attribute bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MutexAttrBits: u32 {
        const RECURSIVE = 0x0000_0001;
        const PRIO_INHERIT = 0x0000_0002;
        const ROBUST = 0x0000_0008;
    }
}
