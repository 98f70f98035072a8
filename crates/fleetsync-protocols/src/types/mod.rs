//! Domain types shared across FleetSync crates.

mod fleet;
mod location;

pub use fleet::*;
pub use location::*;
