//! # Configuration Management
//!
//! Centralized configuration for the push gateway client.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment overrides via `from_env()`
//!
//! ## Concurrency
//! The client takes its own copy of the configuration at construction.
//! Nothing here is synchronized: changing a shared configuration while
//! operations are running is the caller's responsibility.

use crate::error::{ProtocolError, Result};
use crate::utils::timeout;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Level;

/// Default gateway host (sandbox environment)
pub const DEFAULT_GATEWAY_HOST: &str = "gateway.sandbox.push.apple.com";

/// Default notification gateway port
pub const DEFAULT_GATEWAY_PORT: u16 = 2195;

/// Feedback service port
pub const DEFAULT_FEEDBACK_PORT: u16 = 2196;

/// Default number of attempts for one unit of work
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ApnsConfig {
    /// Gateway and credential configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ApnsConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.gateway.apply_env();
        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.gateway.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Gateway endpoint, credentials and connection policy
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Notification gateway host
    pub host: String,

    /// Notification gateway port
    pub port: u16,

    /// Feedback service port
    pub feedback_port: u16,

    /// Target name -> path of a PEM file holding certificate and private key
    pub pems: BTreeMap<String, PathBuf>,

    /// Target name -> passphrase of the private key
    pub passes: BTreeMap<String, String>,

    /// Keep the gateway connection open across sends
    pub persistent: bool,

    /// Total attempts for one send before the last error is surfaced
    pub max_attempts: u32,

    /// Timeout for TCP connect plus TLS handshake
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,

    /// Timeout for writing one batch of notifications
    #[serde(with = "duration_serde")]
    pub write_timeout: Duration,

    /// Timeout for reading one feedback record
    #[serde(with = "duration_serde")]
    pub read_timeout: Duration,

    /// Extra CA certificate to trust besides the platform roots
    pub root_ca_path: Option<PathBuf>,

    /// Skip server certificate verification (testing only)
    pub insecure: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: String::from(DEFAULT_GATEWAY_HOST),
            port: DEFAULT_GATEWAY_PORT,
            feedback_port: DEFAULT_FEEDBACK_PORT,
            pems: BTreeMap::new(),
            passes: BTreeMap::new(),
            persistent: false,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            connect_timeout: timeout::CONNECT_TIMEOUT,
            write_timeout: timeout::WRITE_TIMEOUT,
            read_timeout: timeout::READ_TIMEOUT,
            root_ca_path: None,
            insecure: false,
        }
    }
}

impl GatewayConfig {
    /// Feedback host: the gateway host with "gateway" replaced by "feedback"
    pub fn feedback_host(&self) -> String {
        self.host.replace("gateway", "feedback")
    }

    /// Register a certificate (and optional passphrase) for a target
    pub fn with_target<S, P>(mut self, target: S, pem: P, passphrase: Option<String>) -> Self
    where
        S: Into<String>,
        P: Into<PathBuf>,
    {
        let target = target.into();
        if let Some(pass) = passphrase {
            self.passes.insert(target.clone(), pass);
        }
        self.pems.insert(target, pem.into());
        self
    }

    fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("APNS_GATEWAY_HOST") {
            self.host = host;
        }

        if let Ok(port) = std::env::var("APNS_GATEWAY_PORT") {
            if let Ok(val) = port.parse::<u16>() {
                self.port = val;
            }
        }

        if let Ok(port) = std::env::var("APNS_FEEDBACK_PORT") {
            if let Ok(val) = port.parse::<u16>() {
                self.feedback_port = val;
            }
        }

        if let Ok(persistent) = std::env::var("APNS_PERSISTENT") {
            if let Ok(val) = persistent.parse::<bool>() {
                self.persistent = val;
            }
        }

        if let Ok(attempts) = std::env::var("APNS_MAX_ATTEMPTS") {
            if let Ok(val) = attempts.parse::<u32>() {
                self.max_attempts = val;
            }
        }

        if let Ok(timeout) = std::env::var("APNS_CONNECT_TIMEOUT_MS") {
            if let Ok(val) = timeout.parse::<u64>() {
                self.connect_timeout = Duration::from_millis(val);
            }
        }
    }

    /// Validate gateway configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.host.is_empty() {
            errors.push("Gateway host cannot be empty".to_string());
        }

        if self.port == 0 {
            errors.push("Gateway port cannot be 0".to_string());
        }

        if self.feedback_port == 0 {
            errors.push("Feedback port cannot be 0".to_string());
        }

        if self.max_attempts == 0 {
            errors.push("Max attempts must be greater than 0".to_string());
        } else if self.max_attempts > 100 {
            errors.push(format!(
                "Max attempts too large: {} (maximum: 100)",
                self.max_attempts
            ));
        }

        if self.connect_timeout.as_millis() < 100 {
            errors.push("Connect timeout too short (minimum: 100ms)".to_string());
        } else if self.connect_timeout.as_secs() > 300 {
            errors.push("Connect timeout too long (maximum: 300s)".to_string());
        }

        if self.write_timeout.as_millis() < 100 {
            errors.push("Write timeout too short (minimum: 100ms)".to_string());
        }

        if self.read_timeout.as_millis() < 100 {
            errors.push("Read timeout too short (minimum: 100ms)".to_string());
        }

        for target in self.passes.keys() {
            if !self.pems.contains_key(target) {
                errors.push(format!(
                    "Passphrase configured for unknown target '{target}'"
                ));
            }
        }

        if let Some(ref ca) = self.root_ca_path {
            if !ca.exists() {
                errors.push(format!("Root CA file does not exist: {}", ca.display()));
            }
        }

        if self.insecure {
            errors.push(
                "WARNING: Certificate verification is disabled - not for production".to_string(),
            );
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to log to console
    pub log_to_console: bool,

    /// Whether to log to file
    pub log_to_file: bool,

    /// Path to log file (if log_to_file is true)
    pub log_file_path: Option<String>,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("apns-protocol"),
            log_level: Level::INFO,
            log_to_console: true,
            log_to_file: false,
            log_file_path: None,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        if self.log_to_file {
            if let Some(ref path) = self.log_file_path {
                if let Some(parent) = Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        errors.push(format!(
                            "Log file directory does not exist: {}",
                            parent.display()
                        ));
                    }
                }
            } else {
                errors.push("log_file_path must be specified when log_to_file is true".to_string());
            }
        }

        if !self.log_to_console && !self.log_to_file {
            errors
                .push("At least one logging output (console or file) must be enabled".to_string());
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
