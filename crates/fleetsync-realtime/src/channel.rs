//! Reconnecting duplex channel.
//!
//! One supervisor task per connection session drives the whole lifecycle:
//!
//! ```text
//! connect ──ok──▶ Open ──peer closed / error──┐
//!    │                                        ▼
//!    └──err──────────────────────────▶ backoff (1s, 2s, 4s, ...)
//!                                             │
//!                        attempts < max ──────┘   attempts == max ──▶ exhausted
//! ```
//!
//! `disconnect()` cancels the session token, which abandons an in-flight
//! connect or a pending backoff timer and closes the open transport.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use futures::StreamExt;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use fleetsync_protocols::channel::{
    ChannelState, Connection, Connector, Frame, FrameSink, FrameStream, MessageHandler,
};
use fleetsync_protocols::error::ChannelError;
use fleetsync_protocols::message::InboundEvent;

use crate::endpoint::Endpoint;
use crate::policy::{Backoff, ReconnectPolicy};

type ReadyTx = oneshot::Sender<Result<(), ChannelError>>;
type ReadyRx = oneshot::Receiver<Result<(), ChannelError>>;

/// A logical always-available duplex connection to one endpoint.
///
/// Connection failures are never fatal: after `max_attempts` consecutive
/// failures the channel stops retrying, reports [`is_exhausted`], and the
/// caller is expected to fall back to REST polling.
///
/// [`is_exhausted`]: ReconnectingChannel::is_exhausted
pub struct ReconnectingChannel {
    shared: Arc<Shared>,
}

struct Shared {
    endpoint: Endpoint,
    connector: Arc<dyn Connector>,
    policy: ReconnectPolicy,
    state_tx: watch::Sender<ChannelState>,
    /// Only the latest registration is honored.
    handler: RwLock<Option<Arc<dyn MessageHandler>>>,
    /// Present only while the channel is open.
    sink: tokio::sync::Mutex<Option<Box<dyn FrameSink>>>,
    attempts: AtomicU32,
    exhausted: AtomicBool,
    session: Mutex<Option<Session>>,
}

struct Session {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

enum PumpExit {
    Cancelled,
    PeerClosed,
    Failed(ChannelError),
}

impl ReconnectingChannel {
    pub fn new(endpoint: Endpoint, connector: Arc<dyn Connector>, policy: ReconnectPolicy) -> Self {
        let (state_tx, _) = watch::channel(ChannelState::Closed);
        Self {
            shared: Arc::new(Shared {
                endpoint,
                connector,
                policy,
                state_tx,
                handler: RwLock::new(None),
                sink: tokio::sync::Mutex::new(None),
                attempts: AtomicU32::new(0),
                exhausted: AtomicBool::new(false),
                session: Mutex::new(None),
            }),
        }
    }

    /// Open the transport.
    ///
    /// Resolves once the transport is ready, or fails with the first
    /// connection error. A failed attempt still enters the reconnect
    /// schedule.
    ///
    /// Calling this while a session is running never opens a second
    /// transport. During an in-flight attempt it waits for that attempt to
    /// settle. During a backoff delay it returns
    /// [`ChannelError::NotConnected`] at once and leaves the scheduled retry
    /// in place; call [`disconnect`](Self::disconnect) first to force an
    /// immediate attempt.
    pub async fn connect(&self) -> Result<(), ChannelError> {
        match self.start_session() {
            Some(ready) => ready.await.unwrap_or(Err(ChannelError::Disconnected)),
            None => self.wait_settled().await,
        }
    }

    fn start_session(&self) -> Option<ReadyRx> {
        let mut session = self.shared.session.lock();
        if session.as_ref().is_some_and(|s| !s.task.is_finished()) {
            return None;
        }

        let (ready_tx, ready_rx) = oneshot::channel();
        let cancel = CancellationToken::new();
        self.shared.exhausted.store(false, Ordering::SeqCst);
        self.shared.attempts.store(0, Ordering::SeqCst);
        let task = tokio::spawn(Shared::supervise(
            self.shared.clone(),
            cancel.clone(),
            ready_tx,
        ));
        *session = Some(Session { cancel, task });
        Some(ready_rx)
    }

    async fn wait_settled(&self) -> Result<(), ChannelError> {
        let mut state_rx = self.shared.state_tx.subscribe();
        let state = match state_rx.wait_for(|s| *s != ChannelState::Connecting).await {
            Ok(state) => *state,
            Err(_) => ChannelState::Closed,
        };
        if state == ChannelState::Open {
            Ok(())
        } else {
            Err(ChannelError::NotConnected)
        }
    }

    /// Cancel any pending reconnect and close the transport. Idempotent.
    ///
    /// Must not be called from inside a [`MessageHandler`].
    pub async fn disconnect(&self) {
        let session = self.shared.session.lock().take();
        if let Some(session) = session {
            session.cancel.cancel();
            if let Err(e) = session.task.await {
                if e.is_panic() {
                    error!(endpoint = %self.shared.endpoint, "Live channel supervisor panicked");
                }
            }
            debug!(endpoint = %self.shared.endpoint, "Live channel disconnected by client");
        }
        self.shared.set_state(ChannelState::Closed);
    }

    /// Serialize `payload` and transmit it if the channel is open.
    ///
    /// Returns whether the frame went out. Messages sent while the channel is
    /// not open are logged and dropped; nothing is buffered.
    pub async fn send_message<T>(&self, payload: &T) -> bool
    where
        T: Serialize + ?Sized,
    {
        let text = match serde_json::to_string(payload) {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "Failed to serialize live message");
                return false;
            }
        };

        let mut sink = self.shared.sink.lock().await;
        let Some(sink) = sink.as_mut() else {
            error!(endpoint = %self.shared.endpoint, "Live channel is not connected, dropping message");
            return false;
        };

        trace!("Live send: {}", text);
        match sink.send_text(text).await {
            Ok(()) => true,
            Err(e) => {
                error!(endpoint = %self.shared.endpoint, error = %e, "Live channel send failed");
                false
            }
        }
    }

    /// Register the handler for inbound events, replacing any previous one.
    ///
    /// The registration survives reconnects.
    pub fn on_message(&self, handler: Arc<dyn MessageHandler>) {
        *self.shared.handler.write() = Some(handler);
    }

    pub fn state(&self) -> ChannelState {
        *self.shared.state_tx.borrow()
    }

    pub fn is_open(&self) -> bool {
        self.state() == ChannelState::Open
    }

    /// Watch state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ChannelState> {
        self.shared.state_tx.subscribe()
    }

    /// The channel gave up after the maximum number of retries.
    pub fn is_exhausted(&self) -> bool {
        self.shared.exhausted.load(Ordering::SeqCst)
    }

    /// Retries scheduled since the last successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.attempts.load(Ordering::SeqCst)
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.shared.endpoint
    }

    pub fn policy(&self) -> ReconnectPolicy {
        self.shared.policy
    }
}

impl Drop for ReconnectingChannel {
    fn drop(&mut self) {
        if let Some(session) = self.shared.session.lock().take() {
            session.cancel.cancel();
        }
    }
}

impl Shared {
    fn set_state(&self, state: ChannelState) {
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }

    async fn supervise(self: Arc<Self>, cancel: CancellationToken, ready: ReadyTx) {
        let mut ready = Some(ready);
        let mut backoff = Backoff::new(self.policy);

        loop {
            self.set_state(ChannelState::Connecting);
            let attempt = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                attempt = self.open_transport() => attempt,
            };

            match attempt {
                Ok(Connection { sink, stream }) => {
                    backoff.reset();
                    self.attempts.store(0, Ordering::SeqCst);
                    *self.sink.lock().await = Some(sink);
                    self.set_state(ChannelState::Open);
                    info!(endpoint = %self.endpoint, "Live channel connected");
                    if let Some(tx) = ready.take() {
                        let _ = tx.send(Ok(()));
                    }

                    let exit = self.pump(stream, &cancel).await;
                    let sink = self.sink.lock().await.take();
                    self.set_state(ChannelState::Closed);

                    match exit {
                        PumpExit::Cancelled => {
                            if let Some(mut sink) = sink {
                                if let Err(e) = sink.close().await {
                                    debug!(error = %e, "Live channel close handshake failed");
                                }
                            }
                            break;
                        }
                        PumpExit::PeerClosed => {
                            info!(endpoint = %self.endpoint, "Live channel closed by peer");
                        }
                        PumpExit::Failed(e) => {
                            warn!(endpoint = %self.endpoint, error = %e, "Live channel dropped");
                        }
                    }
                }
                Err(e) => {
                    self.set_state(ChannelState::Closed);
                    error!(endpoint = %self.endpoint, error = %e, "Live channel connection failed");
                    if let Some(tx) = ready.take() {
                        let _ = tx.send(Err(e));
                    }
                }
            }

            let Some(delay) = backoff.next_delay() else {
                self.exhausted.store(true, Ordering::SeqCst);
                warn!(
                    endpoint = %self.endpoint,
                    max_attempts = self.policy.max_attempts,
                    "Live channel max reconnection attempts reached, continuing with REST only"
                );
                break;
            };
            self.attempts.store(backoff.attempts(), Ordering::SeqCst);
            info!(
                endpoint = %self.endpoint,
                attempt = backoff.attempts(),
                max_attempts = self.policy.max_attempts,
                delay_ms = delay.as_millis() as u64,
                "Live channel reconnection scheduled"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.set_state(ChannelState::Closed);
    }

    /// One connect attempt, bounded by the policy's connect timeout.
    async fn open_transport(&self) -> Result<Connection, ChannelError> {
        let limit = self.policy.connect_timeout;
        match tokio::time::timeout(limit, self.connector.connect(self.endpoint.as_str())).await {
            Ok(attempt) => attempt,
            Err(_) => Err(ChannelError::ConnectionFailed(format!(
                "no handshake within {} ms",
                limit.as_millis()
            ))),
        }
    }

    /// Read frames until the peer goes away or the session is cancelled.
    async fn pump(&self, mut stream: FrameStream, cancel: &CancellationToken) -> PumpExit {
        loop {
            let frame = tokio::select! {
                biased;
                _ = cancel.cancelled() => return PumpExit::Cancelled,
                frame = stream.next() => frame,
            };

            match frame {
                Some(Ok(Frame::Text(text))) => self.dispatch(&text),
                Some(Ok(Frame::Close)) | None => return PumpExit::PeerClosed,
                Some(Err(e)) => return PumpExit::Failed(e),
            }
        }
    }

    fn dispatch(&self, text: &str) {
        trace!("Live recv: {}", text);
        let event = match InboundEvent::parse(text) {
            Ok(event) => event,
            Err(e) => {
                warn!(endpoint = %self.endpoint, error = %e, "Discarding malformed live frame");
                return;
            }
        };

        let handler = self.handler.read().clone();
        match handler {
            Some(handler) => handler.on_event(event),
            None => debug!(event_type = %event.event_type, "No live handler registered, event dropped"),
        }
    }
}

#[cfg(test)]
#[path = "channel_tests.rs"]
mod tests;
