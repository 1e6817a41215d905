//! Retry and failover policy.
//!
//! # Responsibilities
//! - Count attempts per request, both against the current backend and in total
//! - Decide after each failure: retry the same backend, fail over, or give up
//!
//! # Design Decisions
//! - The context is a plain value owned by the request handler, never shared
//! - A backend that used up its retries is always marked dead, even when the
//!   request-wide cap is reached on the same attempt
//! - The request-wide cap defaults to `max_retries * pool size`

use std::time::Duration;

use crate::config::RetryConfig;
use crate::resilience::backoff::calculate_backoff;

/// Limits applied to every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts against one backend before it is marked dead.
    pub max_retries: u32,
    /// Explicit cap on attempts for a whole request; `None` derives it from the pool size.
    pub max_total_attempts: Option<u32>,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries.max(1),
            max_total_attempts: (config.max_total_attempts > 0).then_some(config.max_total_attempts),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }

    /// Request-wide attempt cap for a pool of `pool_size` backends.
    pub fn total_budget(&self, pool_size: usize) -> u32 {
        match self.max_total_attempts {
            Some(cap) => cap.max(1),
            None => {
                let size = u32::try_from(pool_size).unwrap_or(u32::MAX).max(1);
                self.max_retries.saturating_mul(size)
            }
        }
    }

    /// Delay before the given retry against the same backend (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        calculate_backoff(
            retry,
            self.base_delay.as_millis() as u64,
            self.max_delay.as_millis() as u64,
        )
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// What the dispatcher does after a failed forwarding attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try the same backend again.
    RetrySame,
    /// Mark the backend dead and select another one.
    Failover,
    /// Stop and answer 503. `mark_dead` is set when the current backend also
    /// ran out of retries on this attempt.
    Exhausted { mark_dead: bool },
}

/// Per-request attempt bookkeeping.
#[derive(Debug, Clone)]
pub struct RetryContext {
    attempts: u32,
    total_attempts: u32,
    budget: u32,
}

impl RetryContext {
    pub fn new(budget: u32) -> Self {
        Self {
            attempts: 0,
            total_attempts: 0,
            budget: budget.max(1),
        }
    }

    /// Attempts made against the current backend.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Attempts made across the whole request.
    pub fn total_attempts(&self) -> u32 {
        self.total_attempts
    }

    /// Record a failed attempt and decide what happens next.
    pub fn record_failure(&mut self, policy: &RetryPolicy) -> RetryDecision {
        self.attempts += 1;
        self.total_attempts += 1;

        let backend_spent = self.attempts >= policy.max_retries;
        let request_spent = self.total_attempts >= self.budget;

        match (backend_spent, request_spent) {
            (_, true) => RetryDecision::Exhausted {
                mark_dead: backend_spent,
            },
            (true, false) => RetryDecision::Failover,
            (false, false) => RetryDecision::RetrySame,
        }
    }

    /// Start counting afresh for a newly selected backend.
    pub fn reset_backend(&mut self) {
        self.attempts = 0;
    }
}
