//! Cooperative interruption shared by forked engines.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Interrupt flag wrapping an `Arc<AtomicBool>`.
///
/// Engines check it at the start of `propagate()`; setting it makes every
/// engine sharing the flag fail its next propagation.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag {
    raised: Arc<AtomicBool>,
}

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.raised.store(true, Ordering::Relaxed);
    }

    pub fn clear(&self) {
        self.raised.store(false, Ordering::Relaxed);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Relaxed)
    }

    /// Whether both handles observe the same flag.
    pub fn shares_with(&self, other: &InterruptFlag) -> bool {
        Arc::ptr_eq(&self.raised, &other.raised)
    }
}
