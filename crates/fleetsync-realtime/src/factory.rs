//! Builds live clients from configuration.

use std::sync::Arc;

use url::Url;

use fleetsync_config::Config;
use fleetsync_protocols::channel::Connector;
use fleetsync_protocols::credential::CredentialStore;
use fleetsync_protocols::error::ChannelError;
use fleetsync_protocols::types::TruckId;

use crate::admin::AdminDashboardClient;
use crate::endpoint::websocket_origin;
use crate::policy::ReconnectPolicy;
use crate::tracking::LocationTrackingClient;
use crate::ws::WsConnector;

/// Shared origin, transport and policy for every live client.
#[derive(Clone)]
pub struct ChannelFactory {
    origin: Url,
    connector: Arc<dyn Connector>,
    policy: ReconnectPolicy,
}

impl ChannelFactory {
    pub fn new(origin: Url, connector: Arc<dyn Connector>, policy: ReconnectPolicy) -> Self {
        Self {
            origin,
            connector,
            policy,
        }
    }

    /// WebSocket transport; origin derived from `[api]` unless `[realtime].ws_url` is set.
    pub fn from_config(config: &Config) -> Result<Self, ChannelError> {
        let origin = websocket_origin(&config.api.base_url, config.realtime.ws_url.as_deref())?;
        Ok(Self::new(
            origin,
            Arc::new(WsConnector::new()),
            ReconnectPolicy::from_config(&config.realtime),
        ))
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn policy(&self) -> ReconnectPolicy {
        self.policy
    }

    pub fn tracking(
        &self,
        truck: TruckId,
        credentials: &dyn CredentialStore,
    ) -> Result<LocationTrackingClient, ChannelError> {
        LocationTrackingClient::new(
            truck,
            &self.origin,
            credentials,
            self.connector.clone(),
            self.policy,
        )
    }

    pub fn admin_dashboard(
        &self,
        credentials: &dyn CredentialStore,
    ) -> Result<AdminDashboardClient, ChannelError> {
        AdminDashboardClient::new(&self.origin, credentials, self.connector.clone(), self.policy)
    }
}

impl std::fmt::Debug for ChannelFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelFactory")
            .field("origin", &self.origin.as_str())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
