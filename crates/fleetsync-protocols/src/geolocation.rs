//! Position source seam.

use async_trait::async_trait;

use crate::error::GeolocationError;
use crate::types::LocationSample;

/// Produces the device's current position on demand.
#[async_trait]
pub trait GeolocationSource: Send + Sync {
    async fn current_position(&self) -> Result<LocationSample, GeolocationError>;
}
