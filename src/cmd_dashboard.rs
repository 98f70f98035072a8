//! Driver and admin dashboard commands.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use fleetsync_config::Config;
use fleetsync_dashboard::{AdminDashboard, AdminView, DriverDashboard, DriverView, ReplaySource, StaticSource};
use fleetsync_protocols::geolocation::GeolocationSource;
use fleetsync_protocols::types::{LocationSample, RouteId, TruckId};

use crate::services::Services;

/// Where the driver's positions come from.
pub(crate) enum PositionSource {
    Fixed { latitude: f64, longitude: f64 },
    Replay(PathBuf),
}

impl PositionSource {
    fn open(self) -> Result<Arc<dyn GeolocationSource>, Box<dyn std::error::Error>> {
        Ok(match self {
            PositionSource::Fixed { latitude, longitude } => {
                Arc::new(StaticSource::new(LocationSample::new(latitude, longitude)))
            }
            PositionSource::Replay(path) => {
                let source = ReplaySource::from_file(&path)?;
                info!(path = %path.display(), samples = source.len(), "Replaying recorded track");
                Arc::new(source)
            }
        })
    }
}

pub(crate) async fn driver(
    config: &Config,
    position: PositionSource,
    complete_route: Option<RouteId>,
) -> Result<(), Box<dyn std::error::Error>> {
    let services = Services::build(config)?;
    let dashboard = DriverDashboard::new(
        services.api.clone(),
        position.open()?,
        services.channels.clone(),
        services.credentials.clone(),
        config.driver.clone(),
    );

    dashboard.load().await?;
    print_driver(&dashboard.view());

    if let Some(route) = complete_route {
        dashboard.complete_route(route).await?;
        println!("Route {} completed", route);
        return Ok(());
    }

    dashboard.start_tracking().await?;
    println!("Tracking started, press Ctrl-C to stop");

    let mut views = dashboard.subscribe();
    let mut reported = views.borrow().reports_sent;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                if view.reports_sent != reported {
                    reported = view.reports_sent;
                    print_report(&view);
                }
            }
        }
    }

    dashboard.stop_tracking().await;
    println!("Tracking stopped after {} reports", reported);
    Ok(())
}

fn print_driver(view: &DriverView) {
    if let Some(user) = &view.user {
        println!("Driver:   {}", user.username);
    }
    if let Some(truck) = &view.truck {
        println!("Truck:    {} ({}, {})", truck.truck_number, truck.license_plate, truck.model);
    }
    match &view.current_route {
        Some(route) => println!("Route:    #{} {} -> {}", route.id, route.start_location, route.end_location),
        None => println!("Route:    none in progress"),
    }
    if let Some(last) = view.locations.first() {
        println!("Last fix: {}, {} at {}", last.latitude, last.longitude, last.timestamp);
    }
}

fn print_report(view: &DriverView) {
    if let Some(sample) = &view.last_report {
        println!(
            "#{:<4} {:>10.6} {:>11.6}  live: {}",
            view.reports_sent, sample.latitude, sample.longitude, view.live
        );
    }
}

pub(crate) async fn admin(config: &Config, truck: Option<TruckId>) -> Result<(), Box<dyn std::error::Error>> {
    let services = Services::build(config)?;
    let dashboard = Arc::new(AdminDashboard::new(
        services.api.clone(),
        services.channels.clone(),
        services.credentials.clone(),
        config.admin.clone(),
    ));

    if let Some(id) = truck {
        match services.api.truck(id).await {
            Ok(truck) => dashboard.select_truck(truck).await?,
            Err(e) => warn!(truck = id, error = %e, "Cannot select truck"),
        }
    }

    let cancel = CancellationToken::new();
    let runner = tokio::spawn({
        let dashboard = dashboard.clone();
        let cancel = cancel.clone();
        async move { dashboard.run(cancel).await }
    });

    let mut views = dashboard.subscribe();
    let mut shown = (0, 0);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                let revision = (view.summary_revision, view.history_revision);
                if revision != shown {
                    shown = revision;
                    print_admin(&view);
                }
            }
        }
    }

    cancel.cancel();
    runner.await?;
    Ok(())
}

fn print_admin(view: &AdminView) {
    let data = &view.dashboard;
    println!(
        "Trucks: {} total, {} active | Routes in progress: {} | Drivers: {} | live: {}",
        data.total_trucks,
        data.active_trucks,
        data.active_routes,
        view.drivers.len(),
        view.live
    );
    for truck in &data.trucks {
        let driver = truck
            .driver_details
            .as_ref()
            .map(|d| d.username.as_str())
            .unwrap_or("-");
        println!("  {:<12} {:<14} {:<12} {}", truck.truck_number, truck.license_plate, format!("{:?}", truck.status), driver);
    }
    if let Some(truck) = &view.selected_truck {
        println!("  {} history: {} positions", truck.truck_number, view.selected_locations.len());
        if let Some(latest) = view.selected_locations.first() {
            println!("    latest {}, {} at {}", latest.latitude, latest.longitude, latest.timestamp);
        }
    }
    if let Some(error) = &view.error {
        println!("  error: {}", error);
    }
}
