//! Error types for the FleetSync protocol layer.

mod api;
mod channel;
mod credential;
mod geolocation;

pub use api::*;
pub use channel::*;
pub use credential::*;
pub use geolocation::*;
