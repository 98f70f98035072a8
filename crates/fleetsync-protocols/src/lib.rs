//! # FleetSync Protocols
//!
//! Core protocol definitions for the FleetSync client.
//! Contains interface definitions, wire messages and domain types - no
//! network or storage implementations.
//!
//! ## Core Traits
//!
//! - [`Connector`] / [`FrameSink`] - Duplex transport used by the live channel
//! - [`MessageHandler`] - Receiver of inbound live events
//! - [`CredentialStore`] - Access to persisted bearer credentials
//! - [`FleetApi`] - REST operations consumed by the dashboards
//! - [`GeolocationSource`] - Producer of position samples

pub mod api;
pub mod channel;
pub mod credential;
pub mod error;
pub mod geolocation;
pub mod message;
pub mod types;

// Re-export core traits
pub use api::FleetApi;
pub use channel::{ChannelState, Connection, Connector, Frame, FrameSink, FrameStream, MessageHandler};
pub use credential::{CredentialStore, StoredCredentials};
pub use geolocation::GeolocationSource;
pub use message::{EventKind, InboundEvent, OutboundMessage};
pub use error::{ApiError, ChannelError, CredentialError, GeolocationError};
pub use types::*;
