//! CLI definitions for FleetSync.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use fleetsync_protocols::types::UserRole;

/// FleetSync CLI.
#[derive(Parser)]
#[command(name = "fleetsync")]
#[command(about = "Fleet tracking client: live location sync and dispatcher dashboards")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/fleetsync.toml", global = true, env = "FLEETSYNC_CONFIG")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Log in and store tokens
    Login {
        username: String,

        /// Password (prefer the environment variable)
        #[arg(long, env = "FLEETSYNC_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account and store its tokens
    Register {
        username: String,

        #[arg(long)]
        email: String,

        #[arg(long, value_enum, default_value_t = RoleArg::Driver)]
        role: RoleArg,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long, env = "FLEETSYNC_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget stored tokens
    Logout,

    /// Run the driver dashboard and report positions until Ctrl-C
    Driver {
        /// Fixed latitude to report
        #[arg(long, allow_hyphen_values = true, required_unless_present = "replay")]
        latitude: Option<f64>,

        /// Fixed longitude to report
        #[arg(long, allow_hyphen_values = true, required_unless_present = "replay")]
        longitude: Option<f64>,

        /// Replay a recorded track (JSON array of samples)
        #[arg(long, conflicts_with_all = ["latitude", "longitude"])]
        replay: Option<PathBuf>,

        /// Mark this route completed instead of tracking
        #[arg(long)]
        complete_route: Option<u64>,
    },

    /// Run the admin dashboard until Ctrl-C
    Admin {
        /// Show location history for this truck
        #[arg(long)]
        truck: Option<u64>,
    },

    /// Validate the configuration file
    CheckConfig {
        /// Print the effective configuration as JSON
        #[arg(long)]
        show: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum RoleArg {
    Admin,
    Driver,
}

impl From<RoleArg> for UserRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Admin => UserRole::Admin,
            RoleArg::Driver => UserRole::Driver,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_driver_accepts_negative_coordinates() {
        let cli = Cli::try_parse_from([
            "fleetsync",
            "driver",
            "--latitude",
            "-33.86",
            "--longitude",
            "151.2",
        ])
        .unwrap();
        match cli.command {
            Commands::Driver {
                latitude, longitude, ..
            } => {
                assert_eq!(latitude, Some(-33.86));
                assert_eq!(longitude, Some(151.2));
            }
            _ => panic!("expected driver command"),
        }
    }

    #[test]
    fn test_driver_requires_position() {
        assert!(Cli::try_parse_from(["fleetsync", "driver"]).is_err());
        assert!(Cli::try_parse_from(["fleetsync", "driver", "--replay", "track.json"]).is_ok());
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["fleetsync", "logout", "--config", "/tmp/fleet.toml"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("/tmp/fleet.toml"));
    }
}
