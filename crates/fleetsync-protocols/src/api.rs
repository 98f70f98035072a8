//! REST operations consumed by the dashboard controllers.

use async_trait::async_trait;

use crate::error::ApiError;
use crate::types::{
    DashboardData, DeliveryRoute, Location, LocationHistory, NewLocation, RouteId, Truck,
    TruckDraft, TruckId, User, UserId,
};

/// Fleet backend as seen by the dashboards.
#[async_trait]
pub trait FleetApi: Send + Sync {
    /// Profile of the logged-in user.
    async fn current_user(&self) -> Result<User, ApiError>;

    async fn list_trucks(&self) -> Result<Vec<Truck>, ApiError>;

    async fn create_truck(&self, draft: &TruckDraft) -> Result<Truck, ApiError>;

    /// Assign `driver` to a truck, or unassign when `None`.
    async fn assign_driver(&self, truck: TruckId, driver: Option<UserId>) -> Result<Truck, ApiError>;

    async fn list_drivers(&self) -> Result<Vec<User>, ApiError>;

    /// Locations, newest first, optionally for one truck.
    async fn list_locations(&self, truck: Option<TruckId>) -> Result<Vec<Location>, ApiError>;

    async fn report_location(&self, location: &NewLocation) -> Result<Location, ApiError>;

    async fn location_history(&self, truck: TruckId, limit: Option<u32>) -> Result<LocationHistory, ApiError>;

    async fn list_routes(&self) -> Result<Vec<DeliveryRoute>, ApiError>;

    async fn complete_route(&self, route: RouteId) -> Result<DeliveryRoute, ApiError>;

    async fn dashboard(&self) -> Result<DashboardData, ApiError>;
}
