//! Fleet entities as served by the backend REST API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = u64;
pub type TruckId = u64;
pub type RouteId = u64;

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Driver,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub is_active_duty: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruckStatus {
    #[default]
    Active,
    Inactive,
    Maintenance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Truck {
    pub id: TruckId,
    pub truck_number: String,
    pub license_plate: String,
    pub model: String,
    #[serde(default)]
    pub driver: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_details: Option<User>,
    pub status: TruckStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating or updating a truck.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TruckDraft {
    pub truck_number: String,
    pub license_plate: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TruckStatus>,
}

/// A persisted position report.
///
/// Coordinates travel as decimal strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: u64,
    pub truck: TruckId,
    pub driver: UserId,
    pub latitude: String,
    pub longitude: String,
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub heading: f64,
    #[serde(default)]
    pub accuracy: f64,
    pub timestamp: DateTime<Utc>,
}

impl Location {
    /// Parsed `(latitude, longitude)`, if both are well-formed.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let lat = self.latitude.trim().parse().ok()?;
        let lon = self.longitude.trim().parse().ok()?;
        Some((lat, lon))
    }
}

/// Payload for reporting a position over REST.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLocation {
    pub truck: TruckId,
    pub latitude: String,
    pub longitude: String,
    pub speed: f64,
    pub heading: f64,
    pub accuracy: f64,
}

impl NewLocation {
    pub fn from_sample(truck: TruckId, sample: &super::LocationSample) -> Self {
        Self {
            truck,
            latitude: sample.latitude.to_string(),
            longitude: sample.longitude.to_string(),
            speed: sample.speed,
            heading: sample.heading,
            accuracy: sample.accuracy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationHistory {
    pub truck_id: TruckId,
    pub locations: Vec<Location>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRoute {
    pub id: RouteId,
    pub truck: TruckId,
    pub driver: UserId,
    pub start_location: String,
    pub end_location: String,
    pub start_latitude: String,
    pub start_longitude: String,
    pub end_latitude: String,
    pub end_longitude: String,
    pub status: RouteStatus,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating or updating a route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteDraft {
    pub truck: TruckId,
    pub driver: UserId,
    pub start_location: String,
    pub end_location: String,
    pub start_latitude: String,
    pub start_longitude: String,
    pub end_latitude: String,
    pub end_longitude: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RouteStatus>,
}

/// Fleet-wide summary shown on the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardData {
    pub total_trucks: u64,
    pub active_trucks: u64,
    pub active_routes: u64,
    #[serde(default)]
    pub trucks: Vec<Truck>,
    #[serde(default)]
    pub active_routes_data: Vec<DeliveryRoute>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterData {
    pub username: String,
    pub password: String,
    pub password_confirm: String,
    pub email: String,
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

/// Partial profile update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active_duty: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub access: String,
    pub refresh: String,
}

#[cfg(test)]
#[path = "fleet_tests.rs"]
mod tests;
