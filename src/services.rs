//! Wiring shared by every command.

use std::sync::Arc;

use tracing::{debug, warn};

use fleetsync_api::{ApiClient, FileCredentialStore};
use fleetsync_config::Config;
use fleetsync_realtime::ChannelFactory;

pub(crate) struct Services {
    pub api: Arc<ApiClient>,
    pub credentials: Arc<FileCredentialStore>,
    /// `None` when live sync is disabled or its endpoint is unusable.
    pub channels: Option<ChannelFactory>,
}

impl Services {
    pub fn build(config: &Config) -> Result<Self, Box<dyn std::error::Error>> {
        let credentials = Arc::new(FileCredentialStore::new(config.credentials.resolved_path()));
        let api = Arc::new(ApiClient::from_config(&config.api, credentials.clone())?);

        let channels = if config.realtime.enabled {
            match ChannelFactory::from_config(config) {
                Ok(factory) => {
                    debug!(factory = ?factory, "Live sync enabled");
                    Some(factory)
                }
                Err(e) => {
                    warn!(error = %e, "Live sync disabled");
                    None
                }
            }
        } else {
            debug!("Live sync disabled by configuration");
            None
        };

        Ok(Self {
            api,
            credentials,
            channels,
        })
    }
}
