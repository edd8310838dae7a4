//! # Connection Manager
//!
//! Owns the single gateway connection and runs units of work against it.
//!
//! ## Lifecycle
//! - The connection is opened lazily, on the first unit of work or when the
//!   previous one was discarded.
//! - Under [`ConnectionStrategy::TransientPerCall`] it is closed after every
//!   unit of work. Under [`ConnectionStrategy::PersistentAcrossCalls`] it
//!   stays open for the next call.
//! - Any retryable failure discards the connection before the next attempt,
//!   so a broken stream is never reused.
//! - Before a persistent connection is reused, it is polled once without
//!   blocking. A peer that has closed or reset it gets a new connection
//!   instead of frames written into a dead session.
//! - A persistent connection is reused only for the target it was opened
//!   for. Sending to a different target closes it and connects again with
//!   that target's credential.
//!
//! The manager is not synchronized itself; [`PushClient`](crate::service::client::PushClient)
//! keeps it behind the lock that serializes all sends.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::{debug, error, info, instrument, warn};

use crate::error::{ProtocolError, Result};
use crate::service::credentials::Credential;
use crate::transport::{Connector, Endpoint};
use crate::utils::metrics::Metrics;
use crate::utils::timeout::{with_timeout, CLOSE_TIMEOUT};

/// What happens to the connection once a unit of work is done
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStrategy {
    /// Close after every call
    #[default]
    TransientPerCall,
    /// Keep open until a failure or until persistence is stopped
    PersistentAcrossCalls,
}

impl ConnectionStrategy {
    pub fn from_persistent(persistent: bool) -> Self {
        if persistent {
            Self::PersistentAcrossCalls
        } else {
            Self::TransientPerCall
        }
    }

    pub fn is_persistent(self) -> bool {
        self == Self::PersistentAcrossCalls
    }
}

/// A live connection and the target it was opened for
struct Connection<S> {
    stream: S,
    target: String,
    id: u64,
}

/// Opens, reuses, retries and closes the gateway connection
pub struct ConnectionManager<C: Connector> {
    connector: Arc<C>,
    endpoint: Endpoint,
    strategy: ConnectionStrategy,
    max_attempts: u32,
    current: Option<Connection<C::Stream>>,
    opened: u64,
    metrics: Arc<Metrics>,
}

impl<C: Connector> ConnectionManager<C> {
    /// Create a manager; `max_attempts` below 1 is treated as 1
    pub fn new(
        connector: Arc<C>,
        endpoint: Endpoint,
        strategy: ConnectionStrategy,
        max_attempts: u32,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            connector,
            endpoint,
            strategy,
            max_attempts: max_attempts.max(1),
            current: None,
            opened: 0,
            metrics,
        }
    }

    pub fn strategy(&self) -> ConnectionStrategy {
        self.strategy
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Whether a connection is currently held open
    pub fn is_connected(&self) -> bool {
        self.current.is_some()
    }

    /// Sequence number of the open connection (1 for the first one opened)
    pub fn connection_id(&self) -> Option<u64> {
        self.current.as_ref().map(|c| c.id)
    }

    /// Target the open connection was authenticated for
    pub fn connected_target(&self) -> Option<&str> {
        self.current.as_ref().map(|c| c.target.as_str())
    }

    /// Switch strategy. Disabling persistence closes the open connection at once.
    pub async fn set_persistent(&mut self, enabled: bool) {
        self.strategy = ConnectionStrategy::from_persistent(enabled);
        debug!(persistent = enabled, "Connection strategy changed");

        if !enabled {
            self.disconnect().await;
        }
    }

    /// Disable persistence and close the open connection, if any
    pub async fn stop_persistence(&mut self) {
        self.set_persistent(false).await;
    }

    /// Close and discard the open connection, if any
    pub async fn disconnect(&mut self) {
        if let Some(conn) = self.current.take() {
            Self::close(&self.metrics, conn).await;
        }
    }

    /// Run `work` against an open connection, retrying transport failures.
    ///
    /// Up to `max_attempts` attempts are made. Each failed attempt discards
    /// the connection; the next one reconnects with `credential`. Errors that
    /// are not retryable, and the error of the last attempt, are returned
    /// unchanged.
    #[instrument(skip(self, credential, work), fields(target = %credential.target, endpoint = %self.endpoint))]
    pub async fn run_with_connection<F, T>(&mut self, credential: &Credential, mut work: F) -> Result<T>
    where
        F: for<'c> FnMut(&'c mut C::Stream) -> BoxFuture<'c, Result<T>>,
    {
        let mut attempt = 1;

        loop {
            let outcome = match self.ensure_connected(credential).await {
                Ok(stream) => work(stream).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(value) => {
                    if !self.strategy.is_persistent() {
                        self.disconnect().await;
                    }
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    warn!(attempt, max_attempts = self.max_attempts, error = %e, "Attempt failed, reconnecting");
                    self.disconnect().await;
                    self.metrics.retry();
                    attempt += 1;
                }
                Err(e) => {
                    error!(attempt, error = %e, "Giving up");
                    self.disconnect().await;
                    return Err(e);
                }
            }
        }
    }

    /// Return the open stream for `credential`, connecting first if needed
    async fn ensure_connected(&mut self, credential: &Credential) -> Result<&mut C::Stream> {
        let reusable = match self.current.as_mut() {
            None => false,
            Some(conn) if conn.target != credential.target => {
                info!(
                    previous = %conn.target,
                    next = %credential.target,
                    "Target changed, reconnecting"
                );
                false
            }
            Some(conn) => {
                let closed = peer_closed(&mut conn.stream);
                if closed {
                    info!(connection = conn.id, "Gateway closed the connection, reconnecting");
                }
                !closed
            }
        };

        if !reusable {
            if let Some(stale) = self.current.take() {
                Self::close(&self.metrics, stale).await;
            }

            let stream = match self.connector.connect(&self.endpoint, credential).await {
                Ok(stream) => stream,
                Err(e) => {
                    self.metrics.connect_failed();
                    return Err(e);
                }
            };

            self.opened += 1;
            self.metrics.connection_opened();
            info!(connection = self.opened, "Gateway connection opened");

            self.current = Some(Connection {
                stream,
                target: credential.target.clone(),
                id: self.opened,
            });
        }

        match self.current.as_mut() {
            Some(conn) => Ok(&mut conn.stream),
            None => Err(ProtocolError::ConnectionClosed),
        }
    }

    async fn close(metrics: &Metrics, mut conn: Connection<C::Stream>) {
        // Best effort: the peer may already be gone
        let shutdown = with_timeout(CLOSE_TIMEOUT, async {
            conn.stream.shutdown().await?;
            Ok(())
        })
        .await;

        if let Err(e) = shutdown {
            debug!(connection = conn.id, error = %e, "Shutdown failed");
        }

        metrics.connection_closed();
        debug!(connection = conn.id, target = %conn.target, "Gateway connection closed");
    }
}

/// Whether the peer has closed, reset or written to an idle stream.
///
/// Polls one read without blocking. The gateway only ever writes right
/// before it drops a connection, so readable data counts as closed too.
fn peer_closed<S: AsyncRead + Unpin>(stream: &mut S) -> bool {
    let mut byte = [0u8; 1];
    match stream.read(&mut byte).now_or_never() {
        None => false,
        Some(Ok(0)) | Some(Err(_)) => true,
        Some(Ok(_)) => {
            debug!("Unexpected bytes from the gateway on an idle connection");
            true
        }
    }
}
