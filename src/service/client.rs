//! # Push Client
//!
//! Sends notifications through the gateway and polls the feedback service.
//!
//! All sends, across every target, go through one lock guarding the single
//! gateway connection, so writes from concurrent callers never interleave.
//! The lock is a FIFO `tokio::sync::Mutex`: callers are served in the order
//! they started waiting.
//!
//! Feedback fetches open their own short-lived connection and never take the
//! send lock, so they can run alongside sends.
//!
//! ## Delivery semantics
//! The gateway acknowledges nothing. A batch that fails partway through is
//! retried from its first notification on a new connection, and which of the
//! earlier notifications actually reached the gateway is unknown. Callers
//! that cannot tolerate duplicates should send one notification per call.
//!
//! ## Example
//! ```ignore
//! let config = GatewayConfig::default()
//!     .with_target("sandbox", "/etc/push/sandbox.pem", None);
//! let client = PushClient::new(config)?;
//!
//! let token = DeviceToken::from_hex("<aaaa... 64 hex chars ...>")?;
//! client.send_notification(token, br#"{"aps":{"alert":"Hello"}}"#.to_vec(), "sandbox").await?;
//!
//! for record in client.fetch_feedback("sandbox").await? {
//!     println!("{} gone since {:?}", record.device_token, record.timestamp);
//! }
//! ```

use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tokio_util::codec::FramedRead;
use tracing::{debug, info, instrument, warn};

use crate::config::GatewayConfig;
use crate::core::codec::FeedbackCodec;
use crate::core::feedback::FeedbackRecord;
use crate::core::notification::Notification;
use crate::core::token::DeviceToken;
use crate::error::{ProtocolError, Result};
use crate::service::connection::{ConnectionManager, ConnectionStrategy};
use crate::service::credentials::{CredentialResolver, PemCredentials};
use crate::transport::tls::GatewayConnector;
use crate::transport::{Connector, Endpoint};
use crate::utils::metrics::Metrics;
use crate::utils::timeout::{with_timeout, CLOSE_TIMEOUT};

/// Client for the notification gateway and the feedback service
pub struct PushClient<C: Connector = GatewayConnector> {
    config: Arc<GatewayConfig>,
    resolver: Arc<dyn CredentialResolver>,
    connector: Arc<C>,
    manager: Mutex<ConnectionManager<C>>,
    metrics: Arc<Metrics>,
}

impl PushClient<GatewayConnector> {
    /// Client connecting over TLS with the certificates listed in `config`
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let resolver = Arc::new(PemCredentials::from_config(&config));
        let connector = GatewayConnector::from_config(&config)?;
        Self::with_connector(config, resolver, connector)
    }
}

impl<C: Connector> PushClient<C> {
    /// Client with a custom credential resolver and connector
    pub fn with_connector(
        config: GatewayConfig,
        resolver: Arc<dyn CredentialResolver>,
        connector: C,
    ) -> Result<Self> {
        if config.max_attempts == 0 {
            return Err(ProtocolError::ConfigError(
                "Max attempts must be greater than 0".into(),
            ));
        }
        for problem in config.validate() {
            warn!(%problem, "Gateway configuration");
        }

        let connector = Arc::new(connector);
        let metrics = Arc::new(Metrics::new());
        let manager = ConnectionManager::new(
            connector.clone(),
            Endpoint::new(config.host.clone(), config.port),
            ConnectionStrategy::from_persistent(config.persistent),
            config.max_attempts,
            metrics.clone(),
        );

        Ok(Self {
            config: Arc::new(config),
            resolver,
            connector,
            manager: Mutex::new(manager),
            metrics,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Keep the gateway connection open across sends
    pub async fn start_persistence(&self) {
        self.manager.lock().await.set_persistent(true).await;
    }

    /// Close connections after every send again, closing the open one now.
    ///
    /// Takes the send lock, so a batch already being written finishes first.
    pub async fn stop_persistence(&self) {
        self.manager.lock().await.stop_persistence().await;
    }

    pub async fn is_persistent(&self) -> bool {
        self.manager.lock().await.strategy().is_persistent()
    }

    /// Whether a gateway connection is currently open
    pub async fn is_connected(&self) -> bool {
        self.manager.lock().await.is_connected()
    }

    /// Send a single notification
    pub async fn send_notification(
        &self,
        device_token: DeviceToken,
        payload: impl Into<Bytes>,
        target: &str,
    ) -> Result<()> {
        let notification = Notification::new(device_token, payload);
        self.send_notifications(std::slice::from_ref(&notification), target)
            .await
    }

    /// Send a batch of notifications, in order, over one connection.
    ///
    /// The credential is resolved and every notification is encoded before
    /// the send lock is taken: an unknown target or an oversized payload
    /// fails the whole batch without touching the network.
    #[instrument(skip(self, notifications), fields(count = notifications.len()))]
    pub async fn send_notifications(
        &self,
        notifications: &[Notification],
        target: &str,
    ) -> Result<()> {
        let credential = self.resolver.resolve(target)?;

        let frames = notifications
            .iter()
            .map(Notification::encode)
            .collect::<Result<Vec<Bytes>>>()?;

        if frames.is_empty() {
            debug!("Empty batch, nothing to send");
            return Ok(());
        }

        let total_bytes: usize = frames.iter().map(Bytes::len).sum();
        let write_timeout = self.config.write_timeout;

        let mut manager = self.manager.lock().await;
        manager
            .run_with_connection(&credential, move |stream| {
                let frames = frames.clone();
                Box::pin(with_timeout(write_timeout, async move {
                    for frame in &frames {
                        stream.write_all(frame).await?;
                    }
                    stream.flush().await?;
                    Ok(())
                }))
            })
            .await?;
        drop(manager);

        self.metrics
            .notifications_written(notifications.len() as u64, total_bytes as u64);
        debug!(bytes = total_bytes, "Batch written");
        Ok(())
    }

    /// Fetch the device tokens the feedback service reports as invalid.
    ///
    /// Opens a dedicated connection to the feedback host (the gateway host
    /// with "gateway" replaced by "feedback"), reads records until the
    /// service closes the stream, then closes the connection. Never retried
    /// and never persistent.
    #[instrument(skip(self))]
    pub async fn fetch_feedback(&self, target: &str) -> Result<Vec<FeedbackRecord>> {
        let credential = self.resolver.resolve(target)?;
        let endpoint = Endpoint::new(self.config.feedback_host(), self.config.feedback_port);

        let stream = match self.connector.connect(&endpoint, &credential).await {
            Ok(stream) => stream,
            Err(e) => {
                self.metrics.connect_failed();
                return Err(e);
            }
        };
        self.metrics.connection_opened();
        debug!(%endpoint, "Feedback connection opened");

        let mut framed = FramedRead::new(stream, FeedbackCodec);
        let result = self.read_feedback(&mut framed).await;

        let mut stream = framed.into_inner();
        if let Err(e) = with_timeout(CLOSE_TIMEOUT, async {
            stream.shutdown().await?;
            Ok(())
        })
        .await
        {
            debug!(error = %e, "Feedback shutdown failed");
        }
        self.metrics.connection_closed();

        let records = result?;
        self.metrics.feedback_received(records.len() as u64);
        info!(count = records.len(), "Feedback received");
        Ok(records)
    }

    async fn read_feedback(
        &self,
        framed: &mut FramedRead<C::Stream, FeedbackCodec>,
    ) -> Result<Vec<FeedbackRecord>> {
        let mut records = Vec::new();

        loop {
            let next = with_timeout(self.config.read_timeout, async {
                framed.next().await.transpose()
            })
            .await;

            match next {
                Ok(Some(record)) => records.push(record),
                Ok(None) => break,
                // Peer closed without close_notify: still the end of the stream
                Err(ProtocolError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    debug!("Feedback stream closed without close_notify");
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(records)
    }
}
