//! Driver dashboard controller.
//!
//! Finds the driver's truck, shows recent positions and the active route,
//! and runs location tracking: every report goes to REST first and is
//! mirrored on the live channel when that channel is open.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use fleetsync_config::DriverConfig;
use fleetsync_protocols::api::FleetApi;
use fleetsync_protocols::channel::ChannelState;
use fleetsync_protocols::credential::CredentialStore;
use fleetsync_protocols::geolocation::GeolocationSource;
use fleetsync_protocols::types::{
    DeliveryRoute, Location, LocationSample, NewLocation, RouteId, RouteStatus, Truck, TruckId,
    User,
};
use fleetsync_realtime::{ChannelFactory, LocationTrackingClient};

use crate::error::DashboardError;
use crate::live::{next_state, ticker};

/// Snapshot published to driver dashboard subscribers.
#[derive(Debug, Clone, Default)]
pub struct DriverView {
    pub user: Option<User>,
    pub truck: Option<Truck>,
    /// Most recent first.
    pub locations: Vec<Location>,
    pub current_route: Option<DeliveryRoute>,
    pub tracking: bool,
    pub live: ChannelState,
    pub last_report: Option<LocationSample>,
    pub reports_sent: u64,
    pub error: Option<String>,
}

/// A running tracking session.
///
/// Owns the periodic reporter and the live channel. Dropping it stops both.
pub struct TrackingSession {
    truck: TruckId,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl TrackingSession {
    pub fn truck(&self) -> TruckId {
        self.truck
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop reporting and wait for the live channel to close.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if e.is_panic() {
                    error!(truck = self.truck, "Location reporter panicked");
                }
            }
        }
    }
}

impl Drop for TrackingSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct Shared {
    api: Arc<dyn FleetApi>,
    geolocation: Arc<dyn GeolocationSource>,
    view: watch::Sender<DriverView>,
}

/// Headless driver dashboard.
pub struct DriverDashboard {
    shared: Arc<Shared>,
    channels: Option<ChannelFactory>,
    credentials: Arc<dyn CredentialStore>,
    config: DriverConfig,
    session: Mutex<Option<TrackingSession>>,
}

impl DriverDashboard {
    /// `channels` is `None` when live sync is disabled.
    pub fn new(
        api: Arc<dyn FleetApi>,
        geolocation: Arc<dyn GeolocationSource>,
        channels: Option<ChannelFactory>,
        credentials: Arc<dyn CredentialStore>,
        config: DriverConfig,
    ) -> Self {
        let (view, _) = watch::channel(DriverView::default());
        Self {
            shared: Arc::new(Shared {
                api,
                geolocation,
                view,
            }),
            channels,
            credentials,
            config,
            session: Mutex::new(None),
        }
    }

    pub fn view(&self) -> DriverView {
        self.shared.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DriverView> {
        self.shared.view.subscribe()
    }

    pub async fn is_tracking(&self) -> bool {
        self.session.lock().await.as_ref().is_some_and(TrackingSession::is_running)
    }

    /// Load the driver's truck, recent positions and active route.
    ///
    /// Only a missing truck (or a failed profile/truck fetch) is an error;
    /// positions and routes degrade to empty.
    pub async fn load(&self) -> Result<(), DashboardError> {
        let api = &self.shared.api;

        let loaded = async {
            let user = api.current_user().await?;
            let trucks = api.list_trucks().await?;
            Ok::<_, DashboardError>((user, trucks))
        }
        .await;
        let (user, trucks) = match loaded {
            Ok(loaded) => loaded,
            Err(e) => {
                error!(error = %e, "Failed to load driver data");
                self.shared.publish_error(&e);
                return Err(e);
            }
        };

        let Some(truck) = trucks.into_iter().find(|t| t.driver == Some(user.id)) else {
            warn!(user = %user.username, "No truck assigned to this driver");
            let err = DashboardError::NoTruckAssigned;
            self.shared.view.send_modify(|v| {
                v.user = Some(user);
                v.truck = None;
                v.error = Some(err.to_string());
            });
            return Err(err);
        };

        let locations = match api.list_locations(Some(truck.id)).await {
            Ok(mut locations) => {
                locations.truncate(self.config.history_limit);
                locations
            }
            Err(e) => {
                warn!(truck = truck.id, error = %e, "Failed to load locations");
                Vec::new()
            }
        };

        let current_route = match api.list_routes().await {
            Ok(routes) => routes
                .into_iter()
                .find(|r| r.driver == user.id && r.status == RouteStatus::InProgress),
            Err(e) => {
                warn!(error = %e, "Failed to load routes");
                None
            }
        };

        debug!(
            truck = truck.id,
            locations = locations.len(),
            route = ?current_route.as_ref().map(|r| r.id),
            "Driver data loaded"
        );
        self.shared.view.send_modify(|v| {
            v.user = Some(user);
            v.truck = Some(truck);
            v.locations = locations;
            v.current_route = current_route;
            v.error = None;
        });
        Ok(())
    }

    /// Begin periodic location reporting for the loaded truck.
    ///
    /// Returns `false` if a session is already running. A failed initial
    /// position read aborts; a live channel that won't connect does not.
    /// The live connect runs inside the reporter, so this returns as soon
    /// as the first REST report is done.
    pub async fn start_tracking(&self) -> Result<bool, DashboardError> {
        let mut slot = self.session.lock().await;
        if slot.as_ref().is_some_and(TrackingSession::is_running) {
            return Ok(false);
        }

        let truck = self
            .shared
            .view
            .borrow()
            .truck
            .as_ref()
            .map(|t| t.id)
            .ok_or(DashboardError::NotLoaded)?;

        let sample = match self.shared.geolocation.current_position().await {
            Ok(sample) => sample,
            Err(e) => {
                error!(error = %e, "Failed to get initial location");
                let err = DashboardError::from(e);
                self.shared.publish_error(&err);
                return Err(err);
            }
        };
        self.shared.view.send_modify(|v| {
            v.tracking = true;
            v.error = None;
        });
        self.shared.report(truck, sample, None).await;

        let client = self.live_client(truck);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(report_loop(
            self.shared.clone(),
            truck,
            client,
            self.config.report_interval(),
            cancel.clone(),
        ));
        info!(truck, interval_secs = self.config.report_interval_seconds, "Location tracking started");

        *slot = Some(TrackingSession {
            truck,
            cancel,
            task: Some(task),
        });
        Ok(true)
    }

    fn live_client(&self, truck: TruckId) -> Option<LocationTrackingClient> {
        let factory = self.channels.as_ref()?;
        match factory.tracking(truck, self.credentials.as_ref()) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!(error = %e, "Live tracking unavailable, using REST API only");
                None
            }
        }
    }

    /// Stop the running session, if any.
    pub async fn stop_tracking(&self) {
        let session = self.session.lock().await.take();
        if let Some(session) = session {
            let truck = session.truck();
            session.stop().await;
            info!(truck, "Location tracking stopped");
        }
        self.shared.view.send_modify(|v| {
            v.tracking = false;
            v.live = ChannelState::Closed;
        });
    }

    /// Mark a route completed, stop tracking and reload.
    pub async fn complete_route(&self, route: RouteId) -> Result<(), DashboardError> {
        if let Err(e) = self.shared.api.complete_route(route).await {
            error!(route, error = %e, "Failed to complete route");
            let err = DashboardError::from(e);
            self.shared.publish_error(&err);
            return Err(err);
        }
        info!(route, "Route completed");
        self.shared.view.send_modify(|v| v.current_route = None);
        self.stop_tracking().await;
        self.load().await
    }
}

impl Shared {
    fn publish_error(&self, err: &DashboardError) {
        let message = err.to_string();
        self.view.send_modify(|v| v.error = Some(message));
    }

    /// REST first; the live copy goes out only if REST accepted it and the
    /// channel is open.
    async fn report(&self, truck: TruckId, sample: LocationSample, live: Option<&LocationTrackingClient>) {
        let location = NewLocation::from_sample(truck, &sample);
        if let Err(e) = self.api.report_location(&location).await {
            error!(truck, error = %e, "Failed to send location update");
            return;
        }

        if let Some(client) = live.filter(|c| c.is_open()) {
            client.send_location_update(sample).await;
        }

        self.view.send_modify(|v| {
            v.last_report = Some(sample);
            v.reports_sent += 1;
        });
    }
}

async fn report_loop(
    shared: Arc<Shared>,
    truck: TruckId,
    client: Option<LocationTrackingClient>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut states = client.as_ref().map(|c| c.subscribe_state());
    if let Some(client) = &client {
        let state = client.state();
        shared.view.send_modify(|v| v.live = state);
    }

    // Reports keep flowing over REST while the handshake is pending.
    let connecting = async {
        if let Some(client) = &client {
            match client.connect().await {
                Ok(()) => info!(truck, "Live tracking connected"),
                Err(e) => warn!(error = %e, "Live tracking connection failed, using REST API only"),
            }
        }
    };
    tokio::pin!(connecting);
    let mut settled = client.is_none();

    let mut ticker = ticker(period);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            () = &mut connecting, if !settled => settled = true,
            state = next_state(&mut states) => {
                debug!(truck, %state, "Live tracking state changed");
                shared.view.send_modify(|v| v.live = state);
            }
            _ = ticker.tick() => {
                match shared.geolocation.current_position().await {
                    Ok(sample) => shared.report(truck, sample, client.as_ref()).await,
                    Err(e) => error!(truck, error = %e, "Failed to get location"),
                }
            }
        }
    }

    if let Some(client) = &client {
        client.disconnect().await;
    }
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
