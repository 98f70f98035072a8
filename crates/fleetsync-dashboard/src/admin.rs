//! Admin dashboard controller.
//!
//! Keeps a fleet-wide snapshot fresh. Live `location_update` events trigger
//! a full reload; a polling ticker covers the time the live channel is not
//! open. Snapshots are sequenced so a slow response can never overwrite a
//! newer one.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::{Notify, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use fleetsync_config::AdminConfig;
use fleetsync_protocols::api::FleetApi;
use fleetsync_protocols::channel::ChannelState;
use fleetsync_protocols::credential::CredentialStore;
use fleetsync_protocols::message::{EventKind, InboundEvent};
use fleetsync_protocols::types::{DashboardData, Location, Truck, TruckDraft, TruckId, User, UserId};
use fleetsync_realtime::{AdminDashboardClient, ChannelFactory};

use crate::error::DashboardError;
use crate::live::{next_state, ticker};

/// Snapshot published to admin dashboard subscribers.
#[derive(Debug, Clone, Default)]
pub struct AdminView {
    pub dashboard: DashboardData,
    pub drivers: Vec<User>,
    pub selected_truck: Option<Truck>,
    pub selected_locations: Vec<Location>,
    pub live: ChannelState,
    pub error: Option<String>,
    /// Sequence of the applied summary response.
    pub summary_revision: u64,
    /// Sequence of the applied history response.
    pub history_revision: u64,
}

/// Cheap, cloneable access to the controller's current state.
///
/// Live handlers hold one of these instead of capturing state, so they
/// always act on the latest selection.
#[derive(Clone)]
pub struct DashboardHandle {
    inner: Arc<Inner>,
}

struct Inner {
    api: Arc<dyn FleetApi>,
    view: watch::Sender<AdminView>,
    selected: RwLock<Option<Truck>>,
    summary_seq: AtomicU64,
    history_seq: AtomicU64,
    history_limit: u32,
    refresh_requested: Notify,
}

impl DashboardHandle {
    fn new(api: Arc<dyn FleetApi>, history_limit: usize) -> Self {
        let (view, _) = watch::channel(AdminView::default());
        Self {
            inner: Arc::new(Inner {
                api,
                view,
                selected: RwLock::new(None),
                summary_seq: AtomicU64::new(0),
                history_seq: AtomicU64::new(0),
                history_limit: u32::try_from(history_limit).unwrap_or(u32::MAX),
                refresh_requested: Notify::new(),
            }),
        }
    }

    pub fn view(&self) -> AdminView {
        self.inner.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AdminView> {
        self.inner.view.subscribe()
    }

    pub fn selected_truck(&self) -> Option<Truck> {
        self.inner.selected.read().clone()
    }

    /// Ask the run loop for a full reload. Bursts coalesce into one.
    pub fn request_refresh(&self) {
        self.inner.refresh_requested.notify_one();
    }

    /// Reload the summary and drivers, plus the selected truck's history.
    pub async fn refresh(&self) -> Result<(), DashboardError> {
        let api = &self.inner.api;
        let seq = self.inner.summary_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let selected = self.selected_truck();

        let history = async {
            match &selected {
                Some(truck) => Some(self.load_history(truck.clone()).await),
                None => None,
            }
        };
        let (dashboard, drivers, history) = tokio::join!(api.dashboard(), api.list_drivers(), history);

        let result = match (dashboard, drivers) {
            (Ok(dashboard), Ok(drivers)) => {
                if !self.apply_summary(seq, dashboard, drivers) {
                    debug!(seq, "Discarding stale dashboard snapshot");
                }
                Ok(())
            }
            (Err(e), _) | (_, Err(e)) => {
                error!(error = %e, "Failed to load dashboard data");
                let err = DashboardError::from(e);
                if self.inner.summary_seq.load(Ordering::SeqCst) == seq {
                    self.publish_error(&err);
                } else {
                    debug!(seq, "Not showing failure of a superseded refresh");
                }
                Err(err)
            }
        };

        match history {
            Some(Err(e)) if result.is_ok() => Err(e),
            _ => result,
        }
    }

    /// Select a truck and load its recent positions.
    pub async fn select_truck(&self, truck: Truck) -> Result<(), DashboardError> {
        *self.inner.selected.write() = Some(truck.clone());
        self.load_history(truck).await
    }

    pub fn clear_selection(&self) {
        *self.inner.selected.write() = None;
        self.inner.history_seq.fetch_add(1, Ordering::SeqCst);
        self.inner.view.send_modify(|v| {
            v.selected_truck = None;
            v.selected_locations.clear();
        });
    }

    async fn load_history(&self, truck: Truck) -> Result<(), DashboardError> {
        let seq = self.inner.history_seq.fetch_add(1, Ordering::SeqCst) + 1;
        match self
            .inner
            .api
            .location_history(truck.id, Some(self.inner.history_limit))
            .await
        {
            Ok(history) => {
                if !self.apply_history(seq, truck, history.locations) {
                    debug!(seq, "Discarding stale truck history");
                }
                Ok(())
            }
            Err(e) => {
                error!(truck = truck.id, error = %e, "Failed to load truck locations");
                let err = DashboardError::from(e);
                if self.inner.history_seq.load(Ordering::SeqCst) == seq {
                    self.publish_error(&err);
                } else {
                    debug!(seq, "Not showing failure of a superseded history load");
                }
                Err(err)
            }
        }
    }

    /// Apply a summary unless a newer one is already shown.
    fn apply_summary(&self, seq: u64, dashboard: DashboardData, drivers: Vec<User>) -> bool {
        self.inner.view.send_if_modified(|v| {
            if seq <= v.summary_revision {
                return false;
            }
            v.dashboard = dashboard;
            v.drivers = drivers;
            v.summary_revision = seq;
            v.error = None;
            true
        })
    }

    fn apply_history(&self, seq: u64, truck: Truck, locations: Vec<Location>) -> bool {
        self.inner.view.send_if_modified(|v| {
            if seq <= v.history_revision {
                return false;
            }
            v.selected_truck = Some(truck);
            v.selected_locations = locations;
            v.history_revision = seq;
            true
        })
    }

    fn publish_error(&self, err: &DashboardError) {
        let message = err.to_string();
        self.inner.view.send_modify(|v| v.error = Some(message));
    }

    fn set_live(&self, state: ChannelState) {
        self.inner.view.send_if_modified(|v| {
            let changed = v.live != state;
            v.live = state;
            changed
        });
    }

    /// Live event entry point.
    pub fn handle_event(&self, event: &InboundEvent) {
        match event.kind() {
            EventKind::LocationUpdate => self.request_refresh(),
            EventKind::Error => warn!(event = ?event.fields, "Live channel reported an error"),
            _ => debug!(event_type = %event.event_type, "Ignoring live event"),
        }
    }
}

/// Headless admin dashboard.
pub struct AdminDashboard {
    handle: DashboardHandle,
    channels: Option<ChannelFactory>,
    credentials: Arc<dyn CredentialStore>,
    config: AdminConfig,
}

impl AdminDashboard {
    /// `channels` is `None` when live sync is disabled.
    pub fn new(
        api: Arc<dyn FleetApi>,
        channels: Option<ChannelFactory>,
        credentials: Arc<dyn CredentialStore>,
        config: AdminConfig,
    ) -> Self {
        Self {
            handle: DashboardHandle::new(api, config.history_limit),
            channels,
            credentials,
            config,
        }
    }

    pub fn handle(&self) -> DashboardHandle {
        self.handle.clone()
    }

    pub fn view(&self) -> AdminView {
        self.handle.view()
    }

    pub fn subscribe(&self) -> watch::Receiver<AdminView> {
        self.handle.subscribe()
    }

    pub async fn refresh(&self) -> Result<(), DashboardError> {
        self.handle.refresh().await
    }

    pub async fn select_truck(&self, truck: Truck) -> Result<(), DashboardError> {
        self.handle.select_truck(truck).await
    }

    pub async fn create_truck(&self, draft: &TruckDraft) -> Result<Truck, DashboardError> {
        let truck = match self.handle.inner.api.create_truck(draft).await {
            Ok(truck) => truck,
            Err(e) => {
                error!(error = %e, "Failed to create truck");
                let err = DashboardError::from(e);
                self.handle.publish_error(&err);
                return Err(err);
            }
        };
        info!(truck = truck.id, number = %truck.truck_number, "Truck created");
        self.handle.refresh().await?;
        Ok(truck)
    }

    /// Assign `driver` to `truck`, or unassign with `None`.
    pub async fn assign_driver(&self, truck: TruckId, driver: Option<UserId>) -> Result<Truck, DashboardError> {
        let updated = match self.handle.inner.api.assign_driver(truck, driver).await {
            Ok(updated) => updated,
            Err(e) => {
                error!(truck, error = %e, "Failed to assign driver");
                let err = DashboardError::from(e);
                self.handle.publish_error(&err);
                return Err(err);
            }
        };
        info!(truck, driver = ?driver, "Driver assignment updated");
        self.handle.refresh().await?;
        Ok(updated)
    }

    /// Drive the dashboard until `cancel` fires.
    ///
    /// Live connection problems never end the loop; the dashboard simply
    /// keeps polling.
    pub async fn run(&self, cancel: CancellationToken) {
        if let Err(e) = self.handle.refresh().await {
            warn!(error = %e, "Initial dashboard load failed");
        }

        let live = self.live_client();
        let mut states = live.as_ref().map(|c| c.subscribe_state());
        if let Some(client) = &live {
            self.handle.set_live(client.state());
        }

        // Polling runs while the handshake is pending.
        let connecting = async {
            if let Some(client) = &live {
                match client.connect().await {
                    Ok(()) => info!("Live admin updates connected"),
                    Err(e) => warn!(error = %e, "Live admin connection failed, using REST polling"),
                }
            }
        };
        tokio::pin!(connecting);
        let mut settled = live.is_none();

        let mut ticker = ticker(self.config.poll_interval());

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                () = &mut connecting, if !settled => settled = true,
                state = next_state(&mut states) => {
                    debug!(%state, "Admin live channel state changed");
                    self.handle.set_live(state);
                }
                _ = self.handle.inner.refresh_requested.notified() => {
                    if let Err(e) = self.handle.refresh().await {
                        warn!(error = %e, "Live-triggered refresh failed");
                    }
                }
                _ = ticker.tick() => {
                    if live.as_ref().is_some_and(AdminDashboardClient::is_open) {
                        continue;
                    }
                    debug!("Polling dashboard");
                    if let Err(e) = self.handle.refresh().await {
                        warn!(error = %e, "Dashboard poll failed");
                    }
                }
            }
        }

        if let Some(client) = &live {
            client.disconnect().await;
        }
        self.handle.set_live(ChannelState::Closed);
        info!("Admin dashboard stopped");
    }

    /// Admin client with its event handler registered, not yet connected.
    fn live_client(&self) -> Option<AdminDashboardClient> {
        let factory = self.channels.as_ref()?;
        let client = match factory.admin_dashboard(self.credentials.as_ref()) {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "Live updates unavailable, using REST polling");
                return None;
            }
        };

        let handle = self.handle.clone();
        client.on_message(Arc::new(move |event: InboundEvent| handle.handle_event(&event)));
        Some(client)
    }
}

#[cfg(test)]
#[path = "admin_tests.rs"]
mod tests;
