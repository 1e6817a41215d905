//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Forwarding attempt fails:
//!     → retries.rs (RetryContext::record_failure against RetryPolicy)
//!         RetrySame → backoff.rs (sleep, then same backend)
//!         Failover  → mark backend dead, select next peer
//!         Exhausted → 503
//! ```
//!
//! # Design Decisions
//! - Retries happen only before any response bytes reach the client
//! - Attempts are bounded per backend and per request

pub mod backoff;
pub mod retries;

pub use retries::{RetryContext, RetryDecision, RetryPolicy};
