//! # Error Types
//!
//! Error handling for the push gateway client.
//!
//! Every operation in the crate returns [`Result`], whose error side is
//! [`ProtocolError`]. Variants fall into three classes:
//!
//! ## Error Categories
//! - **Configuration**: missing credential mappings, missing certificate files,
//!   unparsable key material. Raised before any network activity, never retried.
//! - **Encoding**: oversized payloads, malformed device tokens, payload bodies
//!   that fail to serialize. Never retried.
//! - **Transport**: TCP and TLS failures, timeouts, peer closes. Retried by the
//!   connection manager up to the configured attempt budget, then surfaced as-is.
//!
//! Exhausting the feedback stream is not an error; it is how the read loop ends.
//!
//! ## Example Usage
//! ```rust
//! use apns_protocol::error::{ProtocolError, Result};
//!
//! fn check(payload: &[u8]) -> Result<()> {
//!     if payload.len() > 256 {
//!         return Err(ProtocolError::PayloadTooLarge { size: payload.len(), max: 256 });
//!     }
//!     Ok(())
//! }
//!
//! let err = check(&[0u8; 300]).unwrap_err();
//! assert!(!err.is_retryable());
//! ```

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Configuration errors
    pub const ERR_NO_CREDENTIALS: &str =
        "No certificate paths configured (set gateway.pems = { target = \"/path/to/cert.pem\" })";

    /// Credential errors
    pub const ERR_NO_CERTIFICATE: &str = "No certificate found in PEM file";
    pub const ERR_NO_PRIVATE_KEY: &str = "No supported private key found in PEM file";
    pub const ERR_PASSPHRASE_REQUIRED: &str = "Private key is encrypted but no passphrase is set";
}

// ProtocolError is the primary error type for all client operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Credential error: {0}")]
    CredentialError(String),

    #[error("Payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Invalid device token: {0}")]
    InvalidToken(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("TLS error: {0}")]
    TlsError(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Timeout occurred")]
    Timeout,
}

impl ProtocolError {
    /// Whether the connection manager may discard the connection and try again.
    ///
    /// Only transport-level failures qualify. Configuration, credential and
    /// encoding errors fail the call immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProtocolError::Io(_)
                | ProtocolError::TransportError(_)
                | ProtocolError::TlsError(_)
                | ProtocolError::ConnectionClosed
                | ProtocolError::Timeout
        )
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
