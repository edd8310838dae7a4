//! Timeout defaults and helpers.
//!
//! The gateway protocol defines no timeouts. These bound how long one
//! attempt may block, and therefore how long a full retry cycle can take:
//! at most `max_attempts * (connect + write)`.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{ProtocolError, Result};

/// TCP connect plus TLS handshake
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Writing one batch of frames
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Waiting for the next feedback record
pub const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Sending close_notify and shutting down a stream being discarded
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Run `fut`, failing with [`ProtocolError::Timeout`] if it does not finish in time
pub async fn with_timeout<F, T>(duration: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(timeout_ms = duration.as_millis() as u64, "Operation timed out");
            Err(ProtocolError::Timeout)
        }
    }
}
