//! Transport seam used by the live channel.
//!
//! A [`Connector`] opens one duplex connection to an endpoint and hands back
//! a [`Connection`]: an outbound [`FrameSink`] plus an inbound [`FrameStream`].
//! The reconnecting channel owns at most one connection at a time.

use std::fmt;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::ChannelError;
use crate::message::InboundEvent;

/// Lifecycle state of a live channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelState {
    Connecting,
    Open,
    #[default]
    Closed,
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelState::Connecting => write!(f, "connecting"),
            ChannelState::Open => write!(f, "open"),
            ChannelState::Closed => write!(f, "closed"),
        }
    }
}

/// A frame received from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Text payload, expected to hold one JSON document.
    Text(String),
    /// Peer-initiated close.
    Close,
}

/// Inbound half of a connection. Ends (`None`) when the peer goes away.
pub type FrameStream = BoxStream<'static, Result<Frame, ChannelError>>;

/// Outbound half of a connection.
#[async_trait]
pub trait FrameSink: Send {
    /// Transmit one text frame.
    async fn send_text(&mut self, text: String) -> Result<(), ChannelError>;

    /// Close the connection gracefully.
    async fn close(&mut self) -> Result<(), ChannelError>;
}

/// An established duplex connection.
pub struct Connection {
    pub sink: Box<dyn FrameSink>,
    pub stream: FrameStream,
}

impl Connection {
    pub fn new(sink: Box<dyn FrameSink>, stream: FrameStream) -> Self {
        Self { sink, stream }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

/// Opens transports to an endpoint URL.
///
/// Resolves once the transport reports ready; fails if the transport reports
/// an error first.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Connection, ChannelError>;
}

/// Receiver of decoded inbound events.
///
/// Invoked on the channel's receive task in arrival order, so implementations
/// should hand work off rather than block.
pub trait MessageHandler: Send + Sync {
    fn on_event(&self, event: InboundEvent);
}

impl<F> MessageHandler for F
where
    F: Fn(InboundEvent) + Send + Sync,
{
    fn on_event(&self, event: InboundEvent) {
        self(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_channel_state_default_is_closed() {
        assert_eq!(ChannelState::default(), ChannelState::Closed);
    }

    #[test]
    fn test_channel_state_display() {
        assert_eq!(ChannelState::Connecting.to_string(), "connecting");
        assert_eq!(ChannelState::Open.to_string(), "open");
        assert_eq!(ChannelState::Closed.to_string(), "closed");
    }

    #[test]
    fn test_channel_state_serialization() {
        let json = serde_json::to_string(&ChannelState::Open).unwrap();
        assert_eq!(json, "\"open\"");
    }

    #[test]
    fn test_closure_as_message_handler() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let handler: Arc<dyn MessageHandler> = Arc::new(move |_event: InboundEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let event = InboundEvent::parse(r#"{"type":"location_update"}"#).unwrap();
        handler.on_event(event.clone());
        handler.on_event(event);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
