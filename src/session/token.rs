//! Liveness flag shared with in-flight acquisitions.

use std::cell::Cell;
use std::rc::Rc;

/// Cancellation token checked before an async result is applied.
///
/// Cancelling does not interrupt the underlying platform call; it only
/// tells the task to discard (and release) whatever the call returns.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Rc<Cell<bool>>,
}

impl CancelToken {
    /// Creates a live token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the token cancelled for every clone.
    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    /// Returns true once [`Self::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let token = CancelToken::new();
        let observer = token.clone();
        assert!(!observer.is_cancelled());

        token.cancel();
        assert!(observer.is_cancelled());
    }
}
