//! Round-robin selection.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::backend::Backend;

/// Round-robin selector.
/// Stores the shared cursor used to rotate through backends.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the next cursor value and return the first alive backend at or
    /// after it, scanning exactly one lap.
    pub fn next_server(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        if backends.is_empty() {
            return None;
        }

        // Each caller owns the value it got back from fetch_add.
        let start = self.counter.fetch_add(1, Ordering::Relaxed);
        let len = backends.len();

        (0..len)
            .map(|i| &backends[start.wrapping_add(i) % len])
            .find(|backend| backend.is_alive())
            .cloned()
    }

    /// Current cursor value.
    pub fn position(&self) -> usize {
        self.counter.load(Ordering::Relaxed)
    }
}
