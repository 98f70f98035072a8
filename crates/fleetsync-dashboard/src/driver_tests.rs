use std::sync::atomic::Ordering;

use tokio::sync::mpsc;

use fleetsync_api::MemoryCredentialStore;
use fleetsync_protocols::credential::StoredCredentials;
use fleetsync_protocols::types::UserRole;
use fleetsync_realtime::memory::{MemoryConnector, MemoryPeer, Outcome};
use fleetsync_realtime::{ReconnectPolicy, websocket_origin};

use super::*;
use crate::fake::{FakeApi, location, route, truck, user};
use crate::geolocation::StaticSource;

struct Fixture {
    api: Arc<FakeApi>,
    connector: MemoryConnector,
    peers: mpsc::UnboundedReceiver<MemoryPeer>,
    dashboard: DriverDashboard,
}

fn fixture_with(position: LocationSample, live: bool) -> Fixture {
    let api = Arc::new(FakeApi::default());
    *api.user.lock() = Some(user(1, UserRole::Driver));
    api.trucks.lock().extend([truck(7, Some(2)), truck(3, Some(1))]);
    api.locations.lock().extend((1..=30).map(|i| location(i, 3)));
    api.routes.lock().extend([
        route(10, 3, 1, RouteStatus::Pending),
        route(11, 3, 1, RouteStatus::InProgress),
        route(12, 7, 2, RouteStatus::InProgress),
    ]);

    let (connector, peers) = MemoryConnector::new();
    connector.set_fallback(Outcome::Accept);
    let factory = ChannelFactory::new(
        websocket_origin("http://localhost:8000/api", None).unwrap(),
        Arc::new(connector.clone()),
        ReconnectPolicy::default(),
    );
    let credentials = Arc::new(MemoryCredentialStore::with_credentials(StoredCredentials::new(
        "driver-jwt",
        None,
    )));

    let dashboard = DriverDashboard::new(
        api.clone(),
        Arc::new(StaticSource::new(position)),
        live.then_some(factory),
        credentials,
        DriverConfig::default(),
    );

    Fixture {
        api,
        connector,
        peers,
        dashboard,
    }
}

fn fixture() -> Fixture {
    fixture_with(LocationSample::new(12.9, 77.6).with_speed(10.0), true)
}

#[tokio::test]
async fn test_load_finds_assigned_truck() {
    let f = fixture();
    f.dashboard.load().await.unwrap();

    let view = f.dashboard.view();
    assert_eq!(view.truck.as_ref().map(|t| t.id), Some(3));
    assert_eq!(view.locations.len(), 20);
    assert_eq!(view.current_route.as_ref().map(|r| r.id), Some(11));
    assert!(view.error.is_none());
}

#[tokio::test]
async fn test_load_without_truck() {
    let f = fixture();
    *f.api.user.lock() = Some(user(5, UserRole::Driver));

    let result = f.dashboard.load().await;
    assert!(matches!(result, Err(DashboardError::NoTruckAssigned)));

    let view = f.dashboard.view();
    assert!(view.truck.is_none());
    assert_eq!(view.error.as_deref(), Some("No truck assigned to this driver"));
}

#[tokio::test]
async fn test_load_degrades_secondary_fetches() {
    let f = fixture();
    f.api.fail_locations.store(true, Ordering::SeqCst);
    f.api.fail_routes.store(true, Ordering::SeqCst);

    f.dashboard.load().await.unwrap();

    let view = f.dashboard.view();
    assert!(view.truck.is_some());
    assert!(view.locations.is_empty());
    assert!(view.current_route.is_none());
}

#[tokio::test]
async fn test_start_tracking_requires_load() {
    let f = fixture();
    let result = f.dashboard.start_tracking().await;
    assert!(matches!(result, Err(DashboardError::NotLoaded)));
}

#[tokio::test]
async fn test_start_tracking_position_failure() {
    let f = fixture_with(LocationSample::new(120.0, 77.6), true);
    f.dashboard.load().await.unwrap();

    let result = f.dashboard.start_tracking().await;
    assert!(matches!(result, Err(DashboardError::Position(_))));
    assert!(!f.dashboard.is_tracking().await);
    assert!(!f.dashboard.view().tracking);
    assert_eq!(f.api.calls("report_location"), 0);
    assert_eq!(f.connector.attempt_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_tracking_reports_over_rest_and_live() {
    let mut f = fixture();
    f.dashboard.load().await.unwrap();

    assert!(f.dashboard.start_tracking().await.unwrap());
    assert_eq!(f.api.reported.lock().len(), 1, "initial report goes over REST");
    let mut peer = f.peers.recv().await.unwrap();
    assert_eq!(peer.url(), "ws://localhost:8000/ws/tracking/3/?token=driver-jwt");

    tokio::time::sleep(Duration::from_millis(5100)).await;
    assert_eq!(f.api.reported.lock().len(), 2);

    let frame: serde_json::Value = serde_json::from_str(&peer.recv().await.unwrap()).unwrap();
    assert_eq!(frame["type"], "location_update");
    assert_eq!(frame["latitude"], 12.9);
    assert_eq!(frame["speed"], 10.0);

    let view = f.dashboard.view();
    assert!(view.tracking);
    assert_eq!(view.live, ChannelState::Open);
    assert_eq!(view.reports_sent, 2);

    // Second start is a no-op.
    assert!(!f.dashboard.start_tracking().await.unwrap());
    assert_eq!(f.connector.attempt_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_tracking_cleans_up() {
    let mut f = fixture();
    f.dashboard.load().await.unwrap();
    f.dashboard.start_tracking().await.unwrap();
    let mut peer = f.peers.recv().await.unwrap();

    f.dashboard.stop_tracking().await;
    assert!(peer.recv().await.is_none(), "live channel closed");
    assert!(!f.dashboard.is_tracking().await);

    let reports = f.api.reported.lock().len();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(f.api.reported.lock().len(), reports);
    assert_eq!(f.connector.attempt_count(), 1);

    let view = f.dashboard.view();
    assert!(!view.tracking);
    assert_eq!(view.live, ChannelState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_dashboard_stops_session() {
    let mut f = fixture();
    f.dashboard.load().await.unwrap();
    f.dashboard.start_tracking().await.unwrap();
    let mut peer = f.peers.recv().await.unwrap();

    let api = f.api.clone();
    drop(f.dashboard);
    assert!(peer.recv().await.is_none());

    let reports = api.reported.lock().len();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(api.reported.lock().len(), reports);
}

#[tokio::test(start_paused = true)]
async fn test_live_failure_keeps_rest_reporting() {
    let f = fixture();
    f.connector.set_fallback(Outcome::refuse());
    f.dashboard.load().await.unwrap();

    assert!(f.dashboard.start_tracking().await.unwrap());
    tokio::time::sleep(Duration::from_millis(10_100)).await;

    assert_eq!(f.api.reported.lock().len(), 3);
    assert_ne!(f.dashboard.view().live, ChannelState::Open);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_live_handshake_does_not_block_reporting() {
    let f = fixture();
    f.connector.set_fallback(Outcome::Stall);
    f.dashboard.load().await.unwrap();

    let started = tokio::time::timeout(Duration::from_secs(1), f.dashboard.start_tracking()).await;
    assert!(started.expect("start_tracking must not wait for the handshake").unwrap());
    assert!(f.dashboard.is_tracking().await);

    tokio::time::sleep(Duration::from_millis(60_100)).await;
    assert_eq!(f.api.reported.lock().len(), 13, "initial report plus twelve ticks");
    assert!(f.connector.attempt_count() >= 1);
    assert_ne!(f.dashboard.view().live, ChannelState::Open);

    tokio::time::timeout(Duration::from_secs(1), f.dashboard.stop_tracking())
        .await
        .expect("stop_tracking must not wait for the handshake");
    assert!(!f.dashboard.is_tracking().await);
}

#[tokio::test(start_paused = true)]
async fn test_rest_failure_skips_live_send() {
    let mut f = fixture();
    f.api.fail_reports.store(true, Ordering::SeqCst);
    f.dashboard.load().await.unwrap();
    f.dashboard.start_tracking().await.unwrap();
    let mut peer = f.peers.recv().await.unwrap();

    let received = tokio::time::timeout(Duration::from_secs(12), peer.recv()).await;
    assert!(received.is_err(), "nothing sent live when REST rejects the report");
    assert_eq!(f.dashboard.view().reports_sent, 0);
}

#[tokio::test(start_paused = true)]
async fn test_tracking_without_live_sync() {
    let f = fixture_with(LocationSample::new(12.9, 77.6), false);
    f.dashboard.load().await.unwrap();

    assert!(f.dashboard.start_tracking().await.unwrap());
    tokio::time::sleep(Duration::from_millis(5100)).await;

    assert_eq!(f.api.reported.lock().len(), 2);
    assert_eq!(f.connector.attempt_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_complete_route_stops_tracking_and_reloads() {
    let mut f = fixture();
    f.dashboard.load().await.unwrap();
    f.dashboard.start_tracking().await.unwrap();
    let mut peer = f.peers.recv().await.unwrap();

    f.dashboard.complete_route(11).await.unwrap();

    assert_eq!(*f.api.completed.lock(), vec![11]);
    assert!(!f.dashboard.is_tracking().await);
    assert!(peer.recv().await.is_none());
    assert!(f.dashboard.view().current_route.is_none());
    assert_eq!(f.api.calls("list_trucks"), 2);
}

#[tokio::test]
async fn test_complete_unknown_route() {
    let f = fixture();
    f.dashboard.load().await.unwrap();

    let result = f.dashboard.complete_route(99).await;
    assert!(matches!(result, Err(DashboardError::Api(_))));
    assert!(f.dashboard.view().error.is_some());
}
