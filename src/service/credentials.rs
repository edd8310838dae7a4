//! Per-target credential lookup.
//!
//! A target is a named destination such as "production" or "sandbox", each
//! with its own certificate. Resolution only checks that the certificate
//! source exists; parsing happens when a connection is opened.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::GatewayConfig;
use crate::error::constants::ERR_NO_CREDENTIALS;
use crate::error::{ProtocolError, Result};

/// Certificate material for one target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub target: String,
    /// PEM file holding the certificate chain and private key
    pub cert_path: PathBuf,
    pub passphrase: Option<String>,
}

/// Maps a target name to its credential
pub trait CredentialResolver: Send + Sync {
    fn resolve(&self, target: &str) -> Result<Credential>;
}

/// Resolves credentials from the `pems` and `passes` maps of the configuration
#[derive(Debug, Clone, Default)]
pub struct PemCredentials {
    pems: BTreeMap<String, PathBuf>,
    passes: BTreeMap<String, String>,
}

impl PemCredentials {
    pub fn new(pems: BTreeMap<String, PathBuf>, passes: BTreeMap<String, String>) -> Self {
        Self { pems, passes }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(config.pems.clone(), config.passes.clone())
    }
}

impl CredentialResolver for PemCredentials {
    fn resolve(&self, target: &str) -> Result<Credential> {
        if self.pems.is_empty() {
            return Err(ProtocolError::ConfigError(ERR_NO_CREDENTIALS.into()));
        }

        let cert_path = self.pems.get(target).ok_or_else(|| {
            ProtocolError::ConfigError(format!("No pem file configured for target '{target}'"))
        })?;

        if !cert_path.is_file() {
            return Err(ProtocolError::ConfigError(format!(
                "The path to your '{target}' pem file does not exist: {}",
                cert_path.display()
            )));
        }

        Ok(Credential {
            target: target.to_string(),
            cert_path: cert_path.clone(),
            passphrase: self.passes.get(target).cloned(),
        })
    }
}
