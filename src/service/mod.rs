//! # Service Layer
//!
//! Credential lookup, the gateway connection manager and the client API.
//!
//! ## Components
//! - **Credentials**: target name to certificate resolution
//! - **Connection**: single-connection lifecycle with bounded retry
//! - **Client**: serialized notification sends and feedback polling

pub mod client;
pub mod connection;
pub mod credentials;

pub use client::PushClient;
pub use connection::{ConnectionManager, ConnectionStrategy};
pub use credentials::{Credential, CredentialResolver, PemCredentials};
