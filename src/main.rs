//! FleetSync - fleet tracking client
//!
//! Main entry point for the FleetSync CLI.

mod cli;
mod cmd_dashboard;
mod cmd_session;
mod services;

use std::path::Path;

use clap::Parser;
use tracing::{info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use fleetsync_config::{Config, ConfigLoader, ConfigValidator, LoggingConfig};
use fleetsync_protocols::types::RegisterData;

use crate::cli::{Cli, Commands};
use crate::cmd_dashboard::PositionSource;

fn init_tracing(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = logging.resolved_directory();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("fleetsync")
        .filename_suffix("log")
        .max_log_files(14)
        .build(&log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Keeps the writer flushing until exit.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(true)
                .with_writer(std::io::stderr),
        )
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .init();

    Ok(())
}

/// Load the config file (defaults when absent) and reject invalid settings.
fn load_config(path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    let config = ConfigLoader::load_or_default(path)?;
    let warnings = ConfigValidator::validate(&config).into_result()?;
    for warning in warnings {
        warn!(field = %warning.path, "{}", warning.message);
    }
    Ok(config)
}

fn check_config(path: &Path, show: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigLoader::load_or_default(path)?;
    let result = ConfigValidator::validate(&config);

    for warning in &result.warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }
    for error in &result.errors {
        println!("error: {}: {}", error.path, error.message);
    }
    if show {
        println!("{}", serde_json::to_string_pretty(&config)?);
    }

    if !result.is_valid() {
        return Err(format!("{} has {} error(s)", path.display(), result.errors.len()).into());
    }
    println!("{} is valid", path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Commands::CheckConfig { show } = cli.command {
        return check_config(&cli.config, show);
    }

    let config = load_config(&cli.config)?;
    init_tracing(&config.logging)?;
    info!(config = %cli.config.display(), api = %config.api.base_url, "FleetSync starting");

    match cli.command {
        Commands::Login { username, password } => {
            cmd_session::login(&config, username, password).await
        }
        Commands::Register {
            username,
            email,
            role,
            phone,
            password,
        } => {
            let data = RegisterData {
                username,
                password_confirm: password.clone(),
                password,
                email,
                role: role.into(),
                phone_number: phone,
            };
            cmd_session::register(&config, data).await
        }
        Commands::Logout => cmd_session::logout(&config),
        Commands::Driver {
            latitude,
            longitude,
            replay,
            complete_route,
        } => {
            let position = match (replay, latitude, longitude) {
                (Some(path), _, _) => PositionSource::Replay(path),
                (None, Some(latitude), Some(longitude)) => PositionSource::Fixed { latitude, longitude },
                _ => return Err("either --replay or both --latitude and --longitude are required".into()),
            };
            cmd_dashboard::driver(&config, position, complete_route).await
        }
        Commands::Admin { truck } => cmd_dashboard::admin(&config, truck).await,
        Commands::CheckConfig { .. } => Ok(()),
    }
}
