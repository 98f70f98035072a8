//! Fleet-wide change notifications for the admin dashboard.

use std::sync::Arc;

use tokio::sync::watch;
use url::Url;

use fleetsync_protocols::channel::{ChannelState, Connector, MessageHandler};
use fleetsync_protocols::credential::CredentialStore;
use fleetsync_protocols::error::ChannelError;

use crate::channel::ReconnectingChannel;
use crate::endpoint::Endpoint;
use crate::policy::ReconnectPolicy;

/// Receive-only client for `ws/admin/dashboard/`.
///
/// The server pushes `location_update` and `truck_status_update` events;
/// nothing is ever sent on this channel.
pub struct AdminDashboardClient {
    channel: ReconnectingChannel,
}

impl AdminDashboardClient {
    pub fn new(
        origin: &Url,
        credentials: &dyn CredentialStore,
        connector: Arc<dyn Connector>,
        policy: ReconnectPolicy,
    ) -> Result<Self, ChannelError> {
        let token = credentials
            .access_token()
            .map_err(|e| ChannelError::MissingCredential(e.to_string()))?;
        let endpoint = Endpoint::admin_dashboard(origin, &token)?;

        Ok(Self {
            channel: ReconnectingChannel::new(endpoint, connector, policy),
        })
    }

    pub async fn connect(&self) -> Result<(), ChannelError> {
        self.channel.connect().await
    }

    pub async fn disconnect(&self) {
        self.channel.disconnect().await
    }

    pub fn on_message(&self, handler: Arc<dyn MessageHandler>) {
        self.channel.on_message(handler)
    }

    pub fn state(&self) -> ChannelState {
        self.channel.state()
    }

    pub fn is_open(&self) -> bool {
        self.channel.is_open()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ChannelState> {
        self.channel.subscribe_state()
    }

    pub fn is_exhausted(&self) -> bool {
        self.channel.is_exhausted()
    }

    pub fn channel(&self) -> &ReconnectingChannel {
        &self.channel
    }
}
