//! Scripted in-memory backend for controller tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use fleetsync_protocols::api::FleetApi;
use fleetsync_protocols::error::ApiError;
use fleetsync_protocols::types::*;

pub(crate) fn at() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

pub(crate) fn user(id: UserId, role: UserRole) -> User {
    User {
        id,
        username: format!("user{}", id),
        email: format!("user{}@example.com", id),
        role,
        phone_number: None,
        is_active_duty: true,
        created_at: at(),
    }
}

pub(crate) fn truck(id: TruckId, driver: Option<UserId>) -> Truck {
    Truck {
        id,
        truck_number: format!("TRK-{:03}", id),
        license_plate: format!("KA01AB{:04}", id),
        model: "Tata Ace".to_string(),
        driver,
        driver_details: None,
        status: TruckStatus::Active,
        created_at: at(),
        updated_at: at(),
    }
}

pub(crate) fn location(id: u64, truck: TruckId) -> Location {
    Location {
        id,
        truck,
        driver: 1,
        latitude: "12.971600".to_string(),
        longitude: "77.594600".to_string(),
        speed: 0.0,
        heading: 0.0,
        accuracy: 5.0,
        timestamp: at(),
    }
}

pub(crate) fn route(id: RouteId, truck: TruckId, driver: UserId, status: RouteStatus) -> DeliveryRoute {
    DeliveryRoute {
        id,
        truck,
        driver,
        start_location: "Depot".to_string(),
        end_location: "Warehouse".to_string(),
        start_latitude: "12.9716".to_string(),
        start_longitude: "77.5946".to_string(),
        end_latitude: "13.0827".to_string(),
        end_longitude: "80.2707".to_string(),
        status,
        started_at: None,
        completed_at: None,
        created_at: at(),
        updated_at: at(),
    }
}

#[derive(Default)]
pub(crate) struct FakeApi {
    pub user: Mutex<Option<User>>,
    pub trucks: Mutex<Vec<Truck>>,
    pub drivers: Mutex<Vec<User>>,
    pub locations: Mutex<Vec<Location>>,
    pub routes: Mutex<Vec<DeliveryRoute>>,
    pub fail_locations: AtomicBool,
    pub fail_routes: AtomicBool,
    pub fail_reports: AtomicBool,
    pub dashboard_delays: Mutex<VecDeque<Duration>>,
    /// 1-based `dashboard` call numbers that fail after their delay.
    pub failing_dashboard_calls: Mutex<Vec<usize>>,
    pub reported: Mutex<Vec<NewLocation>>,
    pub history_limits: Mutex<Vec<(TruckId, Option<u32>)>>,
    pub completed: Mutex<Vec<RouteId>>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl FakeApi {
    pub fn calls(&self, name: &str) -> usize {
        self.calls.lock().get(name).copied().unwrap_or(0)
    }

    fn bump(&self, name: &'static str) -> usize {
        let mut calls = self.calls.lock();
        let n = calls.entry(name).or_insert(0);
        *n += 1;
        *n
    }

    fn failure(flag: &AtomicBool) -> Result<(), ApiError> {
        if flag.load(Ordering::SeqCst) {
            Err(ApiError::Network("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl FleetApi for FakeApi {
    async fn current_user(&self) -> Result<User, ApiError> {
        self.bump("current_user");
        self.user.lock().clone().ok_or(ApiError::Unauthenticated)
    }

    async fn list_trucks(&self) -> Result<Vec<Truck>, ApiError> {
        self.bump("list_trucks");
        Ok(self.trucks.lock().clone())
    }

    async fn create_truck(&self, draft: &TruckDraft) -> Result<Truck, ApiError> {
        self.bump("create_truck");
        let mut trucks = self.trucks.lock();
        let mut created = truck(trucks.len() as u64 + 1, draft.driver);
        created.truck_number = draft.truck_number.clone();
        trucks.push(created.clone());
        Ok(created)
    }

    async fn assign_driver(&self, truck_id: TruckId, driver: Option<UserId>) -> Result<Truck, ApiError> {
        self.bump("assign_driver");
        let mut trucks = self.trucks.lock();
        let found = trucks
            .iter_mut()
            .find(|t| t.id == truck_id)
            .ok_or_else(|| ApiError::NotFound(format!("truck {}", truck_id)))?;
        found.driver = driver;
        Ok(found.clone())
    }

    async fn list_drivers(&self) -> Result<Vec<User>, ApiError> {
        self.bump("list_drivers");
        Ok(self.drivers.lock().clone())
    }

    async fn list_locations(&self, truck_id: Option<TruckId>) -> Result<Vec<Location>, ApiError> {
        self.bump("list_locations");
        Self::failure(&self.fail_locations)?;
        Ok(self
            .locations
            .lock()
            .iter()
            .filter(|l| truck_id.is_none_or(|id| l.truck == id))
            .cloned()
            .collect())
    }

    async fn report_location(&self, location: &NewLocation) -> Result<Location, ApiError> {
        self.bump("report_location");
        Self::failure(&self.fail_reports)?;
        let mut reported = self.reported.lock();
        reported.push(location.clone());
        Ok(Location {
            id: reported.len() as u64,
            truck: location.truck,
            driver: 1,
            latitude: location.latitude.clone(),
            longitude: location.longitude.clone(),
            speed: location.speed,
            heading: location.heading,
            accuracy: location.accuracy,
            timestamp: at(),
        })
    }

    async fn location_history(&self, truck_id: TruckId, limit: Option<u32>) -> Result<LocationHistory, ApiError> {
        self.bump("location_history");
        self.history_limits.lock().push((truck_id, limit));
        let mut locations: Vec<Location> = self
            .locations
            .lock()
            .iter()
            .filter(|l| l.truck == truck_id)
            .cloned()
            .collect();
        if let Some(limit) = limit {
            locations.truncate(limit as usize);
        }
        Ok(LocationHistory {
            truck_id,
            locations,
        })
    }

    async fn list_routes(&self) -> Result<Vec<DeliveryRoute>, ApiError> {
        self.bump("list_routes");
        Self::failure(&self.fail_routes)?;
        Ok(self.routes.lock().clone())
    }

    async fn complete_route(&self, route_id: RouteId) -> Result<DeliveryRoute, ApiError> {
        self.bump("complete_route");
        self.completed.lock().push(route_id);
        let mut routes = self.routes.lock();
        let found = routes
            .iter_mut()
            .find(|r| r.id == route_id)
            .ok_or_else(|| ApiError::NotFound(format!("route {}", route_id)))?;
        found.status = RouteStatus::Completed;
        Ok(found.clone())
    }

    async fn dashboard(&self) -> Result<DashboardData, ApiError> {
        let n = self.bump("dashboard");
        let delay = self.dashboard_delays.lock().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_dashboard_calls.lock().contains(&n) {
            return Err(ApiError::Network("connection reset".to_string()));
        }
        let trucks = self.trucks.lock().clone();
        Ok(DashboardData {
            total_trucks: n as u64,
            active_trucks: trucks.iter().filter(|t| t.status == TruckStatus::Active).count() as u64,
            active_routes: 0,
            trucks,
            active_routes_data: Vec::new(),
        })
    }
}
