//! In-memory connector shared by the integration tests.
//!
//! Streams record every byte written into one shared wire log, can be told
//! to fail, to yield between bytes, or to stall forever, and serve canned
//! bytes on read. Gateway streams stay readable-pending until the peer
//! hangs up.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use apns_protocol::error::{ProtocolError, Result};
use apns_protocol::service::credentials::{Credential, CredentialResolver};
use apns_protocol::transport::{Connector, Endpoint};
use futures::future::BoxFuture;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

pub const FEEDBACK_PORT: u16 = 2196;

/// Resolves every target to a placeholder credential
pub struct StaticResolver;

impl CredentialResolver for StaticResolver {
    fn resolve(&self, target: &str) -> Result<Credential> {
        Ok(Credential {
            target: target.to_string(),
            cert_path: PathBuf::from(format!("/certs/{target}.pem")),
            passphrase: None,
        })
    }
}

/// How the next streams handed out should behave on write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteBehavior {
    Ok,
    Fail,
    Stall,
}

#[derive(Default)]
pub struct MockConnector {
    /// Connect calls made, successful or not
    pub connects: AtomicUsize,
    /// Streams shut down by the client
    pub shutdowns: Arc<AtomicUsize>,
    /// Bytes written across all streams, in write order
    pub wire: Arc<Mutex<Vec<u8>>>,
    /// (endpoint, target) of every connect call
    pub calls: Mutex<Vec<(Endpoint, String)>>,
    fail_connects: AtomicUsize,
    failing_streams: AtomicUsize,
    always_fail_writes: bool,
    stall_writes: bool,
    yield_writes: bool,
    connect_error_fatal: bool,
    feedback_bytes: Vec<u8>,
    latest_hangup: Mutex<Option<Arc<AtomicBool>>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// First `n` connect attempts fail with a transport error
    pub fn failing_connects(mut self, n: usize) -> Self {
        self.fail_connects = AtomicUsize::new(n);
        self
    }

    /// Connect attempts fail with a credential error instead
    pub fn fatal_connect_errors(mut self) -> Self {
        self.connect_error_fatal = true;
        self
    }

    /// Writes on the first `n` streams fail with a broken pipe
    pub fn failing_streams(mut self, n: usize) -> Self {
        self.failing_streams = AtomicUsize::new(n);
        self
    }

    /// Writes on every stream fail with a broken pipe
    pub fn always_failing_writes(mut self) -> Self {
        self.always_fail_writes = true;
        self
    }

    /// Gateway writes never complete
    pub fn stalling_writes(mut self) -> Self {
        self.stall_writes = true;
        self
    }

    /// Writes go one byte at a time with a yield to the scheduler before each
    pub fn yielding_writes(mut self) -> Self {
        self.yield_writes = true;
        self
    }

    /// Bytes served to readers connecting on the feedback port
    pub fn with_feedback(mut self, bytes: Vec<u8>) -> Self {
        self.feedback_bytes = bytes;
        self
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn shutdown_count(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    pub fn wire_bytes(&self) -> Vec<u8> {
        self.wire.lock().unwrap().clone()
    }

    pub fn targets(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, t)| t.clone())
            .collect()
    }

    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(e, _)| e.clone())
            .collect()
    }

    /// The peer closes the most recently opened stream
    pub fn hang_up(&self) {
        if let Some(flag) = self.latest_hangup.lock().unwrap().as_ref() {
            flag.store(true, Ordering::SeqCst);
        }
    }

    fn take_one(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn open(&self, endpoint: &Endpoint, credential: &Credential) -> Result<MockStream> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.calls
            .lock()
            .unwrap()
            .push((endpoint.clone(), credential.target.clone()));

        if self.connect_error_fatal {
            return Err(ProtocolError::CredentialError("bad key".into()));
        }
        if Self::take_one(&self.fail_connects) {
            return Err(ProtocolError::TransportError("connection refused".into()));
        }

        let is_feedback = endpoint.port == FEEDBACK_PORT;
        let write = if is_feedback {
            WriteBehavior::Ok
        } else if self.always_fail_writes || Self::take_one(&self.failing_streams) {
            WriteBehavior::Fail
        } else if self.stall_writes {
            WriteBehavior::Stall
        } else {
            WriteBehavior::Ok
        };

        let hung_up = Arc::new(AtomicBool::new(false));
        if !is_feedback {
            *self.latest_hangup.lock().unwrap() = Some(hung_up.clone());
        }

        Ok(MockStream {
            wire: self.wire.clone(),
            shutdowns: self.shutdowns.clone(),
            write,
            yield_writes: self.yield_writes,
            yielded: false,
            read_data: if is_feedback {
                self.feedback_bytes.clone()
            } else {
                Vec::new()
            },
            read_pos: 0,
            eof_when_drained: is_feedback,
            hung_up,
        })
    }
}

impl Connector for MockConnector {
    type Stream = MockStream;

    fn connect<'a>(
        &'a self,
        endpoint: &'a Endpoint,
        credential: &'a Credential,
    ) -> BoxFuture<'a, Result<Self::Stream>> {
        Box::pin(async move { self.open(endpoint, credential) })
    }
}

pub struct MockStream {
    wire: Arc<Mutex<Vec<u8>>>,
    shutdowns: Arc<AtomicUsize>,
    write: WriteBehavior,
    yield_writes: bool,
    yielded: bool,
    read_data: Vec<u8>,
    read_pos: usize,
    /// Feedback streams end once drained; gateway streams stay open
    eof_when_drained: bool,
    hung_up: Arc<AtomicBool>,
}

impl AsyncWrite for MockStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        match this.write {
            WriteBehavior::Fail => return Poll::Ready(Err(io::ErrorKind::BrokenPipe.into())),
            WriteBehavior::Stall => return Poll::Pending,
            WriteBehavior::Ok => {}
        }

        if buf.is_empty() {
            return Poll::Ready(Ok(0));
        }

        if this.yield_writes {
            if !this.yielded {
                this.yielded = true;
                cx.waker().wake_by_ref();
                return Poll::Pending;
            }
            this.yielded = false;
            this.wire.lock().unwrap().push(buf[0]);
            return Poll::Ready(Ok(1));
        }

        this.wire.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        Poll::Ready(Ok(()))
    }
}

impl AsyncRead for MockStream {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.hung_up.load(Ordering::SeqCst) {
            return Poll::Ready(Ok(()));
        }
        if this.read_pos == this.read_data.len() && !this.eof_when_drained {
            return Poll::Pending;
        }
        let remaining = &this.read_data[this.read_pos..];
        let n = remaining.len().min(buf.remaining());
        buf.put_slice(&remaining[..n]);
        this.read_pos += n;
        Poll::Ready(Ok(()))
    }
}

/// Credential for `target` as the static resolver hands it out
pub fn credential(target: &str) -> Credential {
    StaticResolver.resolve(target).unwrap()
}
