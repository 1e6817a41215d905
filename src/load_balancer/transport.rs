//! Request forwarding transport.
//!
//! # Responsibilities
//! - Rewrite the inbound URI onto a backend's base URL
//! - Send the request upstream and return the response head
//! - Classify failures instead of handling them; retry policy belongs to the caller
//!
//! # Design Decisions
//! - One shared pooled HTTP client; each backend holds a cheap clone bound to its URL
//! - The timeout covers the wait for response headers only; bodies stream through
//! - Method, headers and body pass through untouched

use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::time::Duration;

use axum::body::Body;
use axum::http::{uri::PathAndQuery, Request, Response, Uri, Version};
use futures_util::future::BoxFuture;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use tokio::time;
use url::Url;

/// Why a forwarding attempt failed.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The backend could not be reached (refused, unreachable, DNS failure).
    #[error("connection to backend failed: {0}")]
    Connect(String),

    /// The connect or the response head did not arrive in time.
    #[error("backend timed out: {0}")]
    Timeout(String),

    /// The exchange broke after the connection was established.
    #[error("upstream protocol error: {0}")]
    Protocol(String),
}

impl ForwardError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ForwardError::Connect(_) => "connect",
            ForwardError::Timeout(_) => "timeout",
            ForwardError::Protocol(_) => "protocol",
        }
    }
}

/// A forwarding handle bound to one backend address.
pub trait Transport: Send + Sync + fmt::Debug {
    fn forward(&self, request: Request<Body>) -> BoxFuture<'_, Result<Response<Body>, ForwardError>>;
}

/// Build the HTTP client shared by every backend transport.
pub fn build_client(connect_timeout: Duration) -> Client<HttpConnector, Body> {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(Some(connect_timeout));
    connector.set_nodelay(true);
    Client::builder(TokioExecutor::new()).build(connector)
}

/// Reverse-proxy transport over HTTP/1.1.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    target: Url,
    authority: String,
    client: Client<HttpConnector, Body>,
    request_timeout: Duration,
}

impl HttpTransport {
    pub fn new(target: Url, client: Client<HttpConnector, Body>, request_timeout: Duration) -> Self {
        let host = target.host_str().unwrap_or_default();
        let authority = match target.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        Self {
            target,
            authority,
            client,
            request_timeout,
        }
    }

    /// Map an inbound request URI onto the backend's base URL.
    pub fn rewrite_uri(&self, uri: &Uri) -> Result<Uri, ForwardError> {
        let path = join_path(self.target.path(), uri.path());
        let path_and_query = match merge_query(self.target.query(), uri.query()) {
            Some(query) => format!("{}?{}", path, query),
            None => path,
        };
        let path_and_query = PathAndQuery::try_from(path_and_query)
            .map_err(|e| ForwardError::Protocol(e.to_string()))?;

        Uri::builder()
            .scheme(self.target.scheme())
            .authority(self.authority.as_str())
            .path_and_query(path_and_query)
            .build()
            .map_err(|e| ForwardError::Protocol(e.to_string()))
    }
}

impl Transport for HttpTransport {
    fn forward(&self, mut request: Request<Body>) -> BoxFuture<'_, Result<Response<Body>, ForwardError>> {
        Box::pin(async move {
            *request.uri_mut() = self.rewrite_uri(request.uri())?;
            *request.version_mut() = Version::HTTP_11;

            match time::timeout(self.request_timeout, self.client.request(request)).await {
                Ok(Ok(response)) => Ok(response.map(Body::new)),
                Ok(Err(e)) if is_timeout(&e) => Err(ForwardError::Timeout(e.to_string())),
                Ok(Err(e)) if e.is_connect() => Err(ForwardError::Connect(e.to_string())),
                Ok(Err(e)) => Err(ForwardError::Protocol(e.to_string())),
                Err(_) => Err(ForwardError::Timeout(format!(
                    "no response within {:?}",
                    self.request_timeout
                ))),
            }
        })
    }
}

/// Whether any error in the source chain is an I/O timeout. The connector
/// reports an expired connect timeout this way.
fn is_timeout(error: &(dyn StdError + 'static)) -> bool {
    let mut source = Some(error);
    while let Some(e) = source {
        if let Some(io_error) = e.downcast_ref::<io::Error>() {
            if io_error.kind() == io::ErrorKind::TimedOut {
                return true;
            }
        }
        source = e.source();
    }
    false
}

/// Join two URL paths with exactly one slash between them.
fn join_path(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}

fn merge_query(base: Option<&str>, query: Option<&str>) -> Option<String> {
    match (base.filter(|q| !q.is_empty()), query.filter(|q| !q.is_empty())) {
        (Some(b), Some(q)) => Some(format!("{}&{}", b, q)),
        (Some(b), None) => Some(b.to_string()),
        (None, Some(q)) => Some(q.to_string()),
        (None, None) => None,
    }
}
