//! Live channel errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Channel not connected")]
    NotConnected,

    #[error("Channel disconnected")]
    Disconnected,

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
