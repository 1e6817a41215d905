//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server
//! - Track liveness (alive/dead)
//! - Own the forwarding transport bound to the backend's address

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use thiserror::Error;
use url::Url;

use crate::health::state::AliveFlag;
use crate::load_balancer::transport::{ForwardError, HttpTransport, Transport};

/// Errors building a backend from its address.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend url {0} has no host")]
    MissingHost(Url),

    #[error("backend url {0} has no port and its scheme has no default")]
    MissingPort(Url),
}

/// A single backend server.
#[derive(Debug)]
pub struct Backend {
    name: String,
    address: Url,
    /// `host:port` dialled by health probes.
    probe_target: String,
    alive: AliveFlag,
    transport: Arc<dyn Transport>,
}

impl Backend {
    /// Create a backend with an explicit transport. Starts out alive.
    pub fn new(address: Url, transport: Arc<dyn Transport>) -> Result<Self, BackendError> {
        let host = address
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| BackendError::MissingHost(address.clone()))?;
        let port = address
            .port_or_known_default()
            .ok_or_else(|| BackendError::MissingPort(address.clone()))?;
        let probe_target = format!("{}:{}", host, port);

        Ok(Self {
            name: address.to_string(),
            address,
            probe_target,
            alive: AliveFlag::default(),
            transport,
        })
    }

    /// Create a backend forwarding over the shared HTTP client.
    pub fn http(
        address: Url,
        client: Client<HttpConnector, Body>,
        request_timeout: Duration,
    ) -> Result<Self, BackendError> {
        let transport = Arc::new(HttpTransport::new(address.clone(), client, request_timeout));
        Self::new(address, transport)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &Url {
        &self.address
    }

    pub fn probe_target(&self) -> &str {
        &self.probe_target
    }

    pub fn is_alive(&self) -> bool {
        self.alive.get()
    }

    /// Set the liveness flag, returning the previous value.
    pub fn set_alive(&self, alive: bool) -> bool {
        self.alive.set(alive)
    }

    /// Forward a request to this backend.
    pub async fn forward(&self, request: Request<Body>) -> Result<Response<Body>, ForwardError> {
        self.transport.forward(request).await
    }
}
