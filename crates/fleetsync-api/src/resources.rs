//! Backend endpoints.

use async_trait::async_trait;
use reqwest::Method;
use tracing::info;

use fleetsync_protocols::api::FleetApi;
use fleetsync_protocols::credential::StoredCredentials;
use fleetsync_protocols::error::ApiError;
use fleetsync_protocols::types::{
    AuthResponse, DashboardData, DeliveryRoute, Location, LocationHistory, LoginCredentials,
    NewLocation, ProfileUpdate, RegisterData, RouteDraft, RouteId, Truck, TruckDraft, TruckId,
    User, UserId,
};

use crate::client::{ApiClient, Call};

// Auth
impl ApiClient {
    /// Log in and persist the issued tokens.
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<AuthResponse, ApiError> {
        let call = Call::post("auth/login/").anonymous().json(credentials)?;
        let auth: AuthResponse = self.fetch(call).await?;
        self.store_tokens(&auth)?;
        info!(user = %auth.user.username, role = ?auth.user.role, "Logged in");
        Ok(auth)
    }

    /// Create an account and persist the issued tokens.
    pub async fn register(&self, data: &RegisterData) -> Result<AuthResponse, ApiError> {
        let call = Call::post("auth/register/").anonymous().json(data)?;
        let auth: AuthResponse = self.fetch(call).await?;
        self.store_tokens(&auth)?;
        info!(user = %auth.user.username, "Registered");
        Ok(auth)
    }

    /// Forget the stored tokens. The backend keeps no session to end.
    pub fn logout(&self) -> Result<(), ApiError> {
        self.credentials().clear()?;
        Ok(())
    }

    fn store_tokens(&self, auth: &AuthResponse) -> Result<(), ApiError> {
        let stored = StoredCredentials::new(auth.access.clone(), Some(auth.refresh.clone()));
        self.credentials().save(&stored)?;
        Ok(())
    }

    pub async fn profile(&self) -> Result<User, ApiError> {
        self.fetch(Call::get("auth/profile/")).await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        self.fetch(Call::new(Method::PUT, "auth/profile/update/").json(update)?)
            .await
    }

    pub async fn drivers(&self) -> Result<Vec<User>, ApiError> {
        self.fetch(Call::get("auth/drivers/")).await
    }
}

// Trucks
impl ApiClient {
    pub async fn trucks(&self) -> Result<Vec<Truck>, ApiError> {
        self.fetch(Call::get("tracking/trucks/")).await
    }

    pub async fn truck(&self, id: TruckId) -> Result<Truck, ApiError> {
        let path = format!("tracking/trucks/{}/", id);
        self.fetch(Call::get(&path)).await
    }

    pub async fn add_truck(&self, draft: &TruckDraft) -> Result<Truck, ApiError> {
        self.fetch(Call::post("tracking/trucks/").json(draft)?).await
    }

    pub async fn update_truck(&self, id: TruckId, draft: &TruckDraft) -> Result<Truck, ApiError> {
        let path = format!("tracking/trucks/{}/", id);
        self.fetch(Call::new(Method::PUT, &path).json(draft)?).await
    }

    pub async fn delete_truck(&self, id: TruckId) -> Result<(), ApiError> {
        let path = format!("tracking/trucks/{}/", id);
        self.fire(Call::new(Method::DELETE, &path)).await
    }

    /// Assign a driver, or clear the assignment with `None`.
    pub async fn set_driver(&self, truck: TruckId, driver: Option<UserId>) -> Result<Truck, ApiError> {
        let path = format!("tracking/trucks/{}/assign-driver/", truck);
        let body = serde_json::json!({ "driver_id": driver });
        self.fetch(Call::post(&path).json(&body)?).await
    }
}

// Locations
impl ApiClient {
    pub async fn locations(&self, truck: Option<TruckId>) -> Result<Vec<Location>, ApiError> {
        let mut call = Call::get("tracking/locations/");
        if let Some(truck) = truck {
            call = call.query("truck_id", truck);
        }
        self.fetch(call).await
    }

    pub async fn create_location(&self, location: &NewLocation) -> Result<Location, ApiError> {
        self.fetch(Call::post("tracking/locations/").json(location)?)
            .await
    }

    /// Most recent position of a truck.
    pub async fn live_location(&self, truck: TruckId) -> Result<Location, ApiError> {
        let path = format!("tracking/trucks/{}/live-location/", truck);
        self.fetch(Call::get(&path)).await
    }

    pub async fn history(&self, truck: TruckId, limit: Option<u32>) -> Result<LocationHistory, ApiError> {
        let path = format!("tracking/trucks/{}/location-history/", truck);
        let mut call = Call::get(&path);
        if let Some(limit) = limit {
            call = call.query("limit", limit);
        }
        self.fetch(call).await
    }
}

// Routes
impl ApiClient {
    pub async fn routes(&self) -> Result<Vec<DeliveryRoute>, ApiError> {
        self.fetch(Call::get("tracking/routes/")).await
    }

    pub async fn route(&self, id: RouteId) -> Result<DeliveryRoute, ApiError> {
        let path = format!("tracking/routes/{}/", id);
        self.fetch(Call::get(&path)).await
    }

    pub async fn create_route(&self, draft: &RouteDraft) -> Result<DeliveryRoute, ApiError> {
        self.fetch(Call::post("tracking/routes/").json(draft)?).await
    }

    pub async fn update_route(&self, id: RouteId, draft: &RouteDraft) -> Result<DeliveryRoute, ApiError> {
        let path = format!("tracking/routes/{}/", id);
        self.fetch(Call::new(Method::PUT, &path).json(draft)?).await
    }

    pub async fn delete_route(&self, id: RouteId) -> Result<(), ApiError> {
        let path = format!("tracking/routes/{}/", id);
        self.fire(Call::new(Method::DELETE, &path)).await
    }

    pub async fn start_route(&self, id: RouteId) -> Result<DeliveryRoute, ApiError> {
        let path = format!("tracking/routes/{}/start/", id);
        self.fetch(Call::post(&path)).await
    }

    pub async fn finish_route(&self, id: RouteId) -> Result<DeliveryRoute, ApiError> {
        let path = format!("tracking/routes/{}/complete/", id);
        self.fetch(Call::post(&path)).await
    }

    pub async fn dashboard_summary(&self) -> Result<DashboardData, ApiError> {
        self.fetch(Call::get("tracking/dashboard/")).await
    }
}

#[async_trait]
impl FleetApi for ApiClient {
    async fn current_user(&self) -> Result<User, ApiError> {
        self.profile().await
    }

    async fn list_trucks(&self) -> Result<Vec<Truck>, ApiError> {
        self.trucks().await
    }

    async fn create_truck(&self, draft: &TruckDraft) -> Result<Truck, ApiError> {
        self.add_truck(draft).await
    }

    async fn assign_driver(&self, truck: TruckId, driver: Option<UserId>) -> Result<Truck, ApiError> {
        self.set_driver(truck, driver).await
    }

    async fn list_drivers(&self) -> Result<Vec<User>, ApiError> {
        self.drivers().await
    }

    async fn list_locations(&self, truck: Option<TruckId>) -> Result<Vec<Location>, ApiError> {
        self.locations(truck).await
    }

    async fn report_location(&self, location: &NewLocation) -> Result<Location, ApiError> {
        self.create_location(location).await
    }

    async fn location_history(&self, truck: TruckId, limit: Option<u32>) -> Result<LocationHistory, ApiError> {
        self.history(truck, limit).await
    }

    async fn list_routes(&self) -> Result<Vec<DeliveryRoute>, ApiError> {
        self.routes().await
    }

    async fn complete_route(&self, route: RouteId) -> Result<DeliveryRoute, ApiError> {
        self.finish_route(route).await
    }

    async fn dashboard(&self) -> Result<DashboardData, ApiError> {
        self.dashboard_summary().await
    }
}
