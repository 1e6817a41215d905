//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher asks for a peer
//!     → pool.rs (ordered, immutable backend registry)
//!     → round_robin.rs (claim cursor, scan one lap for an alive backend)
//!     → backend.rs (liveness flag + forwarding handle)
//!     → transport.rs (rewrite URI, send upstream, classify failure)
//! ```
//!
//! # Design Decisions
//! - The backend list is fixed after startup; the hot path takes no locks
//! - The cursor is a single atomic counter shared by all requests
//! - Dead backends are skipped, never removed

pub mod backend;
pub mod pool;
pub mod round_robin;
pub mod transport;

pub use backend::{Backend, BackendError};
pub use pool::{PoolError, ServerPool, SweepSummary};
pub use round_robin::RoundRobin;
pub use transport::{ForwardError, HttpTransport, Transport};
