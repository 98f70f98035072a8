//! In-process transport.
//!
//! [`MemoryConnector`] follows a script of accept/refuse outcomes and hands
//! every accepted connection's far end to the owner as a [`MemoryPeer`].
//! Useful for exercising reconnect behavior without a server.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use futures::channel::mpsc as fmpsc;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;

use fleetsync_protocols::channel::{Connection, Connector, Frame, FrameSink};
use fleetsync_protocols::error::ChannelError;

/// Result of one connection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Accept,
    Refuse(String),
    /// Never completes the handshake.
    Stall,
}

impl Outcome {
    pub fn refuse() -> Self {
        Outcome::Refuse("connection refused".to_string())
    }
}

/// Scripted in-memory [`Connector`].
#[derive(Clone)]
pub struct MemoryConnector {
    inner: Arc<Inner>,
}

struct Inner {
    script: Mutex<VecDeque<Outcome>>,
    /// Used once the script runs out.
    fallback: Mutex<Outcome>,
    attempts: Mutex<Vec<(Instant, String)>>,
    peers: mpsc::UnboundedSender<MemoryPeer>,
}

impl MemoryConnector {
    /// A connector that refuses everything until scripted otherwise.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MemoryPeer>) {
        let (peers, rx) = mpsc::unbounded_channel();
        let connector = Self {
            inner: Arc::new(Inner {
                script: Mutex::new(VecDeque::new()),
                fallback: Mutex::new(Outcome::refuse()),
                attempts: Mutex::new(Vec::new()),
                peers,
            }),
        };
        (connector, rx)
    }

    /// Queue outcomes for the next attempts, in order.
    pub fn script(&self, outcomes: impl IntoIterator<Item = Outcome>) {
        self.inner.script.lock().extend(outcomes);
    }

    /// Outcome for attempts beyond the script.
    pub fn set_fallback(&self, outcome: Outcome) {
        *self.inner.fallback.lock() = outcome;
    }

    pub fn attempt_count(&self) -> usize {
        self.inner.attempts.lock().len()
    }

    /// When each attempt was made.
    pub fn attempt_times(&self) -> Vec<Instant> {
        self.inner.attempts.lock().iter().map(|(at, _)| *at).collect()
    }

    /// URL of each attempt.
    pub fn attempt_urls(&self) -> Vec<String> {
        self.inner.attempts.lock().iter().map(|(_, url)| url.clone()).collect()
    }

    fn next_outcome(&self) -> Outcome {
        let scripted = self.inner.script.lock().pop_front();
        scripted.unwrap_or_else(|| self.inner.fallback.lock().clone())
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, url: &str) -> Result<Connection, ChannelError> {
        self.inner.attempts.lock().push((Instant::now(), url.to_string()));

        match self.next_outcome() {
            Outcome::Refuse(reason) => Err(ChannelError::ConnectionFailed(reason)),
            Outcome::Stall => std::future::pending().await,
            Outcome::Accept => {
                let (to_client, inbound) = fmpsc::unbounded();
                let (outbound, from_client) = fmpsc::unbounded();
                let peer = MemoryPeer {
                    url: url.to_string(),
                    to_client,
                    from_client,
                };
                if self.inner.peers.send(peer).is_err() {
                    return Err(ChannelError::ConnectionFailed("no peer listener".to_string()));
                }
                Ok(Connection::new(
                    Box::new(MemorySink { outbound }),
                    inbound.boxed(),
                ))
            }
        }
    }
}

struct MemorySink {
    outbound: fmpsc::UnboundedSender<String>,
}

#[async_trait]
impl FrameSink for MemorySink {
    async fn send_text(&mut self, text: String) -> Result<(), ChannelError> {
        self.outbound
            .unbounded_send(text)
            .map_err(|_| ChannelError::SendFailed("peer is gone".to_string()))
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        self.outbound.close_channel();
        Ok(())
    }
}

/// Server side of an accepted in-memory connection.
///
/// Dropping it ends the client's inbound stream.
pub struct MemoryPeer {
    url: String,
    to_client: fmpsc::UnboundedSender<Result<Frame, ChannelError>>,
    from_client: fmpsc::UnboundedReceiver<String>,
}

impl MemoryPeer {
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Push a text frame to the client. `false` if the client went away.
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.to_client.unbounded_send(Ok(Frame::Text(text.into()))).is_ok()
    }

    pub fn send_json(&self, value: &serde_json::Value) -> bool {
        self.send_text(value.to_string())
    }

    /// Next frame sent by the client; `None` once the client closed.
    pub async fn recv(&mut self) -> Option<String> {
        self.from_client.next().await
    }

    /// Close handshake initiated by the server.
    pub fn close(self) {
        let _ = self.to_client.unbounded_send(Ok(Frame::Close));
    }

    /// Drop the connection with a transport error.
    pub fn fail(self, reason: &str) {
        let _ = self
            .to_client
            .unbounded_send(Err(ChannelError::ReceiveFailed(reason.to_string())));
    }
}
