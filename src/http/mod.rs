//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, catch-all route)
//!     → request.rs (request ID + span)
//!     → dispatcher.rs (select backend, forward, retry / fail over / 503)
//!     → backend response streamed to client
//! ```

pub mod dispatcher;
pub mod request;
pub mod server;

pub use dispatcher::Dispatcher;
pub use request::{assign_request_id, RequestId, RequestIdExt};
pub use server::HttpServer;
