//! Interrupt context classification.
//!
//! Every operation asks the classifier which execution path applies. The
//! interrupt glue of a port calls [`Os::isr_enter`](crate::Os::isr_enter) and
//! [`Os::isr_exit`](crate::Os::isr_exit) around each handler; nesting is
//! counted so a nested handler exit does not end interrupt context early.

use core::sync::atomic::{AtomicU32, Ordering};

/// Which variant of a primitive a call must use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecPath {
    /// May block, uses the native blocking calls
    Thread,
    /// Never blocks, uses the native `_from_isr` calls
    Isr,
}

/// Interrupt nesting counter
#[derive(Debug, Default)]
pub struct IsrContext {
    nesting: AtomicU32,
}

impl IsrContext {
    pub const fn new() -> Self {
        Self {
            nesting: AtomicU32::new(0),
        }
    }

    pub fn enter(&self) {
        self.nesting.fetch_add(1, Ordering::AcqRel);
    }

    pub fn exit(&self) {
        let _ = self
            .nesting
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |depth| depth.checked_sub(1));
    }

    pub fn is_active(&self) -> bool {
        self.nesting.load(Ordering::Acquire) != 0
    }

    pub fn depth(&self) -> u32 {
        self.nesting.load(Ordering::Acquire)
    }

    pub fn path(&self) -> ExecPath {
        if self.is_active() {
            ExecPath::Isr
        } else {
            ExecPath::Thread
        }
    }
}

/// Leaves interrupt context when dropped
pub struct IsrGuard<'a> {
    context: &'a IsrContext,
}

impl<'a> IsrGuard<'a> {
    pub fn new(context: &'a IsrContext) -> Self {
        context.enter();
        Self { context }
    }
}

impl Drop for IsrGuard<'_> {
    fn drop(&mut self) {
        self.context.exit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nesting() {
        let context = IsrContext::new();
        assert_eq!(context.path(), ExecPath::Thread);
        context.enter();
        context.enter();
        context.exit();
        assert_eq!(context.path(), ExecPath::Isr);
        context.exit();
        assert_eq!(context.path(), ExecPath::Thread);
    }

    #[test]
    fn test_exit_without_enter_saturates() {
        let context = IsrContext::new();
        context.exit();
        assert_eq!(context.depth(), 0);
    }

    #[test]
    fn test_guard_leaves_on_drop() {
        let context = IsrContext::new();
        {
            let _guard = IsrGuard::new(&context);
            assert!(context.is_active());
        }
        assert!(!context.is_active());
    }
}
