//! # Transport Layer
//!
//! How the client reaches the gateway and feedback endpoints.
//!
//! The [`Connector`] trait is the seam between connection policy (retry,
//! persistence, locking) and the actual TCP+TLS plumbing in [`tls`]. Tests
//! plug in in-memory connectors to observe connection churn.

use std::fmt;

use futures::future::BoxFuture;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Result;
use crate::service::credentials::Credential;

pub mod tls;

/// Host and port of a remote service
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new<S: Into<String>>(host: S, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Opens authenticated byte streams to an endpoint
pub trait Connector: Send + Sync + 'static {
    /// Stream produced by a successful connect
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Open a new stream to `endpoint`, presenting `credential`
    fn connect<'a>(
        &'a self,
        endpoint: &'a Endpoint,
        credential: &'a Credential,
    ) -> BoxFuture<'a, Result<Self::Stream>>;
}
