//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer
//!     → ServerPool::health_check
//!     → probe.rs (TCP connect per backend, concurrently, each with a deadline)
//!     → state.rs (alive flag written)
//!
//! Passive failure detection (http::dispatcher):
//!     Forwarding fails max_retries times against one backend
//!     → ServerPool::mark_backend_status(address, false)
//! ```
//!
//! # Design Decisions
//! - A single probe result decides the state; no hysteresis
//! - Health state is per-backend, not per-pool
//! - A backend failing a probe mid-request does not abort that request

pub mod active;
pub mod probe;
pub mod state;

pub use active::HealthMonitor;
pub use state::AliveFlag;
