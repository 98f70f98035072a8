//! # FleetSync API
//!
//! REST access to the fleet backend.
//!
//! [`ApiClient`] implements [`FleetApi`](fleetsync_protocols::FleetApi) plus
//! the auth, truck, location and route endpoints the dashboards don't need.
//! Tokens live in a [`CredentialStore`](fleetsync_protocols::CredentialStore);
//! [`FileCredentialStore`] is the default for the CLI.

mod client;
mod credentials;
mod resources;

pub use client::ApiClient;
pub use credentials::{FileCredentialStore, MemoryCredentialStore};
