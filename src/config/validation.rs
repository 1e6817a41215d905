//! Configuration validation.
//!
//! Serde handles syntax; this module checks meaning. Validation is a pure
//! function `&LbConfig -> Result<(), Vec<ValidationError>>` and reports every
//! problem, not just the first.

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::LbConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("backend url {url:?} is invalid: {reason}")]
    InvalidBackendUrl { url: String, reason: String },

    #[error("backend url {url:?} uses unsupported scheme {scheme:?} (only http is supported)")]
    UnsupportedScheme { url: String, scheme: String },

    #[error("backend url {0:?} is listed more than once")]
    DuplicateBackend(String),

    #[error("{field} address {value:?} is not a valid socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("retries.max_delay_ms ({max}) is smaller than retries.base_delay_ms ({base})")]
    DelayRange { base: u64, max: u64 },

    #[error("admin.api_key must be set when the admin API is enabled")]
    MissingAdminKey,
}

/// Parse a configured backend address into a URL the transport can use.
pub fn parse_backend_url(raw: &str) -> Result<Url, ValidationError> {
    let url = Url::parse(raw).map_err(|e| ValidationError::InvalidBackendUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    if url.scheme() != "http" {
        return Err(ValidationError::UnsupportedScheme {
            url: raw.to_string(),
            scheme: url.scheme().to_string(),
        });
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(ValidationError::InvalidBackendUrl {
            url: raw.to_string(),
            reason: "missing host".to_string(),
        });
    }

    Ok(url)
}

/// Validate a configuration, collecting all errors.
pub fn validate_config(config: &LbConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);

    let mut seen = HashSet::new();
    for backend in &config.backends {
        match parse_backend_url(&backend.url) {
            Ok(url) => {
                if !seen.insert(url) {
                    errors.push(ValidationError::DuplicateBackend(backend.url.clone()));
                }
            }
            Err(e) => errors.push(e),
        }
    }

    if config.health_check.enabled {
        if config.health_check.interval_secs == 0 {
            errors.push(ValidationError::Zero("health_check.interval_secs"));
        }
        if config.health_check.timeout_secs == 0 {
            errors.push(ValidationError::Zero("health_check.timeout_secs"));
        }
    }

    if config.retries.max_retries == 0 {
        errors.push(ValidationError::Zero("retries.max_retries"));
    }
    if config.retries.max_delay_ms < config.retries.base_delay_ms {
        errors.push(ValidationError::DelayRange {
            base: config.retries.base_delay_ms,
            max: config.retries.max_delay_ms,
        });
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.connect_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }

    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.is_empty() {
            errors.push(ValidationError::MissingAdminKey);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}
