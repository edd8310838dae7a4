//! # APNs Protocol
//!
//! Client for the legacy binary push-notification protocol: notification
//! frames written over a mutually authenticated TLS connection to the
//! gateway, and invalid device tokens read back from the feedback service.
//!
//! ## Modules
//! - [`core`]: wire formats (notification frame, feedback records)
//! - [`transport`]: TCP+TLS connector
//! - [`service`]: credential lookup, connection manager, [`PushClient`]
//! - [`config`]: TOML/env configuration
//! - [`utils`]: logging, timeouts, metrics
//!
//! ## Guarantees
//! - At most one gateway connection per client; every send is serialized
//!   through one lock, so writes from different callers never interleave.
//! - Transport failures are retried up to `max_attempts` on a fresh
//!   connection; configuration and encoding errors are not.
//! - Nothing is acknowledged by the gateway. A successful send means the
//!   bytes were written, not that they were delivered.

pub mod config;
pub mod core;
pub mod error;
pub mod service;
pub mod transport;
pub mod utils;

pub use crate::config::{ApnsConfig, GatewayConfig};
pub use crate::core::feedback::FeedbackRecord;
pub use crate::core::notification::Notification;
pub use crate::core::token::DeviceToken;
pub use crate::error::{ProtocolError, Result};
pub use crate::service::PushClient;
