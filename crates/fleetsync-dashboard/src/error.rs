//! Dashboard controller errors.

use thiserror::Error;

use fleetsync_protocols::error::{ApiError, GeolocationError};

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("No truck assigned to this driver")]
    NoTruckAssigned,

    #[error("Driver data not loaded")]
    NotLoaded,

    #[error("Failed to access location: {0}")]
    Position(#[from] GeolocationError),

    #[error(transparent)]
    Api(#[from] ApiError),
}
