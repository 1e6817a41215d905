//! Round-robin HTTP load balancer.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │                    LOAD BALANCER                      │
//!  Client         │  ┌──────────┐    ┌────────────┐    ┌──────────────┐  │
//!  ───────────────┼─▶│   http   │───▶│ dispatcher │───▶│  ServerPool  │  │
//!                 │  │  server  │    │ retry/fail │    │ round-robin  │  │
//!                 │  └──────────┘    │   over     │    └──────┬───────┘  │
//!                 │                  └─────┬──────┘           │          │
//!                 │                        ▼                  ▼          │
//!  ◀──────────────┼───────────────── Backend::forward ◀── alive flag ◀───┼── HealthMonitor
//!                 │                        │                             │   (TCP probes)
//!                 └────────────────────────┼─────────────────────────────┘
//!                                          ▼
//!                                   backend servers
//! ```

pub mod admin;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod resilience;

pub use config::LbConfig;
pub use http::{Dispatcher, HttpServer};
pub use lifecycle::Shutdown;
pub use load_balancer::{Backend, ServerPool};
