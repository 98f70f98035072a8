//! WebSocket endpoint URLs.

use std::fmt;

use url::Url;

use fleetsync_protocols::error::ChannelError;
use fleetsync_protocols::types::TruckId;

const TOKEN_PARAM: &str = "token";

/// A live channel endpoint, credential included.
///
/// `Display` and [`Endpoint::redacted`] hide the token so the URL can be
/// logged.
#[derive(Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
}

impl Endpoint {
    /// `<origin>/ws/tracking/<truck>/?token=<token>`
    pub fn tracking(origin: &Url, truck: TruckId, token: &str) -> Result<Self, ChannelError> {
        Self::build(origin, &format!("ws/tracking/{}/", truck), token)
    }

    /// `<origin>/ws/admin/dashboard/?token=<token>`
    pub fn admin_dashboard(origin: &Url, token: &str) -> Result<Self, ChannelError> {
        Self::build(origin, "ws/admin/dashboard/", token)
    }

    fn build(origin: &Url, path: &str, token: &str) -> Result<Self, ChannelError> {
        if token.is_empty() {
            return Err(ChannelError::MissingCredential("empty access token".to_string()));
        }

        let mut base = origin.clone();
        if !base.path().ends_with('/') {
            let dir = format!("{}/", base.path());
            base.set_path(&dir);
        }
        let mut url = base
            .join(path)
            .map_err(|e| ChannelError::InvalidEndpoint(e.to_string()))?;
        url.set_query(None);
        url.set_fragment(None);
        url.query_pairs_mut().append_pair(TOKEN_PARAM, token);

        Ok(Self { url })
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// URL with the token value masked.
    pub fn redacted(&self) -> String {
        let pairs: Vec<(String, String)> = self
            .url
            .query_pairs()
            .map(|(k, v)| {
                let v = if k == TOKEN_PARAM { "***".to_string() } else { v.into_owned() };
                (k.into_owned(), v)
            })
            .collect();
        let mut shown = self.url.clone();
        shown.query_pairs_mut().clear().extend_pairs(pairs);
        shown.to_string()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Endpoint").field(&self.redacted()).finish()
    }
}

/// WebSocket origin for the backend.
///
/// An explicit `override_url` wins; otherwise the scheme follows the API's
/// transport security (`https` -> `wss`, `http` -> `ws`) on the same host.
pub fn websocket_origin(api_base: &str, override_url: Option<&str>) -> Result<Url, ChannelError> {
    let source = override_url.unwrap_or(api_base);
    let mut url = Url::parse(source).map_err(|e| ChannelError::InvalidEndpoint(format!("{}: {}", source, e)))?;

    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(ChannelError::InvalidEndpoint(format!(
                "unsupported scheme '{}'",
                other
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| ChannelError::InvalidEndpoint(format!("cannot use scheme {}", scheme)))?;

    // The API path (e.g. `/api`) is not part of the WebSocket routes.
    if override_url.is_none() {
        url.set_path("/");
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}
