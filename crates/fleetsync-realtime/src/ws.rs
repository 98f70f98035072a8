//! WebSocket transport.

use async_trait::async_trait;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt, future};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use fleetsync_protocols::channel::{Connection, Connector, Frame, FrameSink};
use fleetsync_protocols::error::ChannelError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

/// [`Connector`] over `ws://` / `wss://`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Connection, ChannelError> {
        let (ws_stream, response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| ChannelError::ConnectionFailed(format!("WebSocket: {}", e)))?;
        debug!(status = %response.status(), "WebSocket handshake complete");

        let (ws_sink, ws_source) = ws_stream.split();
        let stream = ws_source
            .filter_map(|msg| future::ready(decode(msg)))
            .boxed();

        Ok(Connection::new(Box::new(WsFrameSink { inner: ws_sink }), stream))
    }
}

/// Map a transport message to a channel frame. Control frames are skipped.
fn decode(msg: Result<Message, tungstenite::Error>) -> Option<Result<Frame, ChannelError>> {
    match msg {
        Ok(Message::Text(text)) => Some(Ok(Frame::Text(text.as_str().to_string()))),
        Ok(Message::Binary(data)) => match String::from_utf8(data.to_vec()) {
            Ok(text) => Some(Ok(Frame::Text(text))),
            Err(_) => {
                trace!("Skipping non-UTF-8 binary frame");
                None
            }
        },
        Ok(Message::Close(frame)) => {
            debug!(?frame, "WebSocket close frame received");
            Some(Ok(Frame::Close))
        }
        Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => None,
        Err(e) => Some(Err(ChannelError::ReceiveFailed(e.to_string()))),
    }
}

struct WsFrameSink {
    inner: WsSink,
}

#[async_trait]
impl FrameSink for WsFrameSink {
    async fn send_text(&mut self, text: String) -> Result<(), ChannelError> {
        self.inner
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| ChannelError::SendFailed(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        self.inner
            .close()
            .await
            .map_err(|e| ChannelError::SendFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text() {
        let frame = decode(Ok(Message::Text("{\"type\":\"x\"}".into())));
        assert!(matches!(frame, Some(Ok(Frame::Text(t))) if t == "{\"type\":\"x\"}"));
    }

    #[test]
    fn test_decode_binary_utf8() {
        let frame = decode(Ok(Message::Binary(b"{}".to_vec().into())));
        assert!(matches!(frame, Some(Ok(Frame::Text(t))) if t == "{}"));
    }

    #[test]
    fn test_decode_skips_control_frames() {
        assert!(decode(Ok(Message::Ping(Vec::new().into()))).is_none());
        assert!(decode(Ok(Message::Pong(Vec::new().into()))).is_none());
        assert!(decode(Ok(Message::Binary(vec![0xff, 0xfe].into()))).is_none());
    }

    #[test]
    fn test_decode_close() {
        assert!(matches!(decode(Ok(Message::Close(None))), Some(Ok(Frame::Close))));
    }

    #[test]
    fn test_decode_error() {
        let frame = decode(Err(tungstenite::Error::ConnectionClosed));
        assert!(matches!(frame, Some(Err(ChannelError::ReceiveFailed(_)))));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Nothing listens on the discard port.
        let result = WsConnector::new().connect("ws://127.0.0.1:9/").await;
        assert!(matches!(result, Err(ChannelError::ConnectionFailed(_))));
    }
}
