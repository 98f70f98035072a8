//! Driver-side location push client.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;
use url::Url;

use fleetsync_protocols::channel::{ChannelState, Connector, MessageHandler};
use fleetsync_protocols::credential::CredentialStore;
use fleetsync_protocols::error::ChannelError;
use fleetsync_protocols::message::OutboundMessage;
use fleetsync_protocols::types::{LocationSample, TruckId};

use crate::channel::ReconnectingChannel;
use crate::endpoint::Endpoint;
use crate::policy::ReconnectPolicy;

/// Pushes position samples for one truck over `ws/tracking/<truck>/`.
///
/// The access token is read from the credential store once, here; a token
/// refreshed later only takes effect for a newly built client.
pub struct LocationTrackingClient {
    truck: TruckId,
    channel: ReconnectingChannel,
}

impl LocationTrackingClient {
    pub fn new(
        truck: TruckId,
        origin: &Url,
        credentials: &dyn CredentialStore,
        connector: Arc<dyn Connector>,
        policy: ReconnectPolicy,
    ) -> Result<Self, ChannelError> {
        let token = credentials
            .access_token()
            .map_err(|e| ChannelError::MissingCredential(e.to_string()))?;
        let endpoint = Endpoint::tracking(origin, truck, &token)?;
        debug!(truck, endpoint = %endpoint, "Location tracking client created");

        Ok(Self {
            truck,
            channel: ReconnectingChannel::new(endpoint, connector, policy),
        })
    }

    pub fn truck(&self) -> TruckId {
        self.truck
    }

    pub async fn connect(&self) -> Result<(), ChannelError> {
        self.channel.connect().await
    }

    pub async fn disconnect(&self) {
        self.channel.disconnect().await
    }

    /// Send one `location_update` frame. Returns whether it went out.
    pub async fn send_location_update(&self, sample: LocationSample) -> bool {
        self.channel
            .send_message(&OutboundMessage::location_update(sample))
            .await
    }

    /// Echoes and errors pushed back on the tracking channel.
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
