//! Reason-tagged input lock.
//!
//! Overlapping animations may each lock input. Only the holder whose reason is
//! currently stored can release it, so a short-lived animation finishing early
//! cannot re-enable input that a longer one still needs locked.
use serde::{Deserialize, Serialize};

/// Lock reason held while a search animation plays.
pub const LOCK_SEARCH: &str = "delay";
/// Lock reason held while a solution reveal plays.
pub const LOCK_REVEAL: &str = "showSolution";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InputLock {
    reason: Option<String>,
}

impl InputLock {
    #[must_use]
    pub const fn new() -> Self {
        Self { reason: None }
    }

    /// Lock input, replacing any reason already held.
    pub fn acquire(&mut self, reason: impl Into<String>) {
        self.reason = Some(reason.into());
    }

    /// Unlock input if `reason` is the one currently held. Returns whether the
    /// lock was released.
    pub fn release(&mut self, reason: &str) -> bool {
        if self.reason.as_deref() != Some(reason) {
            return false;
        }
        debug_assert!(self.reason.is_some());
        self.reason = None;
        true
    }

    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.reason.is_some()
    }

    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}
