//! Reentrancy guard

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{KernelError, Result};

/// Mutex flag rejecting nested entry
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    entered: AtomicBool,
}

/// Held for the duration of a guarded call; releases the guard on drop
#[must_use]
pub struct ReentrancyLock<'a> {
    guard: &'a ReentrancyGuard,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&self) -> Result<ReentrancyLock<'_>> {
        if self.entered.swap(true, Ordering::SeqCst) {
            return Err(KernelError::Reentrancy);
        }
        Ok(ReentrancyLock { guard: self })
    }

    pub fn is_entered(&self) -> bool {
        self.entered.load(Ordering::SeqCst)
    }
}

impl Drop for ReentrancyLock<'_> {
    fn drop(&mut self) {
        self.guard.entered.store(false, Ordering::SeqCst);
    }
}
