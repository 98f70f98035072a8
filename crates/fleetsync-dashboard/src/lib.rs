//! # FleetSync Dashboard
//!
//! Headless controllers behind the driver and admin dashboards. Each one
//! combines REST fetches, an optional live channel and local state, and
//! publishes view snapshots through `watch` channels.
//!
//! A live channel that never connects is not an error: the driver keeps
//! reporting over REST and the admin dashboard keeps polling.

mod admin;
mod driver;
mod error;
mod geolocation;
mod live;

#[cfg(test)]
mod fake;

pub use admin::{AdminDashboard, AdminView, DashboardHandle};
pub use driver::{DriverDashboard, DriverView, TrackingSession};
pub use error::DashboardError;
pub use geolocation::{ReplaySource, StaticSource};
