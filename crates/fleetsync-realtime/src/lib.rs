//! # FleetSync Realtime
//!
//! Live synchronization with the fleet backend over WebSocket.
//!
//! [`ReconnectingChannel`] keeps one logical duplex connection to an endpoint
//! and retries with exponential backoff after unexpected closure. When it
//! gives up, callers keep working over REST polling.
//!
//! Two specializations sit on top of it:
//!
//! - [`LocationTrackingClient`] pushes position samples for one truck.
//! - [`AdminDashboardClient`] receives fleet-wide change notifications.

mod admin;
mod channel;
mod endpoint;
mod factory;
pub mod memory;
mod policy;
mod tracking;
mod ws;

pub use admin::AdminDashboardClient;
pub use channel::ReconnectingChannel;
pub use endpoint::{Endpoint, websocket_origin};
pub use factory::ChannelFactory;
pub use policy::{Backoff, ReconnectPolicy};
pub use tracking::LocationTrackingClient;
pub use ws::WsConnector;
