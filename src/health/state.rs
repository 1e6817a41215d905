//! Backend liveness flag.
//!
//! # States
//! - Alive: backend receives traffic
//! - Dead: backend skipped by selection until a probe or caller revives it
//!
//! # Design Decisions
//! - Last writer wins; health sweeps and request failures race freely
//! - The atomic is private, only `get`/`set` are exposed

use std::sync::atomic::{AtomicBool, Ordering};

/// Synchronized alive/dead flag for a single backend.
#[derive(Debug)]
pub struct AliveFlag(AtomicBool);

impl AliveFlag {
    pub fn new(alive: bool) -> Self {
        Self(AtomicBool::new(alive))
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Store a new value, returning the previous one.
    pub fn set(&self, alive: bool) -> bool {
        self.0.swap(alive, Ordering::AcqRel)
    }
}

impl Default for AliveFlag {
    fn default() -> Self {
        Self::new(true)
    }
}
