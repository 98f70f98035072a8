//! HTTP plumbing: URL building, bearer auth, one-shot token refresh.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use fleetsync_config::ApiConfig;
use fleetsync_protocols::credential::{CredentialStore, StoredCredentials};
use fleetsync_protocols::error::ApiError;

const REFRESH_PATH: &str = "auth/token/refresh/";

/// Typed client for the fleet backend REST API.
///
/// Every authenticated call carries `Authorization: Bearer <access>`. On a
/// 401 the client refreshes the access token once and retries; if the
/// refresh itself fails, both stored tokens are cleared and the call fails
/// with [`ApiError::AuthExpired`].
pub struct ApiClient {
    http: Client,
    base: Url,
    credentials: Arc<dyn CredentialStore>,
    /// Serializes token refreshes so concurrent 401s refresh only once.
    refresh_lock: tokio::sync::Mutex<()>,
}

/// One request, replayable after a token refresh.
pub(crate) struct Call<'a> {
    pub method: Method,
    pub path: &'a str,
    pub query: Vec<(&'static str, String)>,
    pub body: Option<Value>,
    pub authenticated: bool,
}

impl<'a> Call<'a> {
    pub fn new(method: Method, path: &'a str) -> Self {
        Self {
            method,
            path,
            query: Vec::new(),
            body: None,
            authenticated: true,
        }
    }

    pub fn get(path: &'a str) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: &'a str) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn query(mut self, key: &'static str, value: impl ToString) -> Self {
        self.query.push((key, value.to_string()));
        self
    }

    pub fn json<T: serde::Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to encode request: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn anonymous(mut self) -> Self {
        self.authenticated = false;
        self
    }
}

#[derive(Deserialize)]
struct RefreshResponse {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

impl ApiClient {
    /// Create a client rooted at `base_url` (e.g. `http://localhost:8000/api`).
    pub fn new(
        base_url: &str,
        timeout: Duration,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, ApiError> {
        let mut base = Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl(format!("{}: expected http or https", base_url)));
        }
        if !base.path().ends_with('/') {
            let dir = format!("{}/", base.path());
            base.set_path(&dir);
        }

        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base,
            credentials,
            refresh_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn from_config(config: &ApiConfig, credentials: Arc<dyn CredentialStore>) -> Result<Self, ApiError> {
        Self::new(&config.base_url, config.timeout(), credentials)
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", path, e)))
    }

    /// Perform `call` and decode a JSON response body.
    pub(crate) async fn fetch<T: DeserializeOwned>(&self, call: Call<'_>) -> Result<T, ApiError> {
        let path = call.path;
        let body = self.execute(call).await?;
        serde_json::from_str(&body)
            .map_err(|e| ApiError::InvalidResponse(format!("{}: {}", path, e)))
    }

    /// Perform `call`, discarding any response body.
    pub(crate) async fn fire(&self, call: Call<'_>) -> Result<(), ApiError> {
        self.execute(call).await.map(|_| ())
    }

    async fn execute(&self, call: Call<'_>) -> Result<String, ApiError> {
        let token = if call.authenticated { self.stored_access_token()? } else { None };
        let (status, body) = self.send_once(&call, token.as_deref()).await?;

        if status != StatusCode::UNAUTHORIZED || !call.authenticated {
            return into_result(status, body, call.path);
        }

        debug!(path = call.path, "Access token rejected, refreshing");
        let token = self.refresh_access_token(token.as_deref()).await?;
        let (status, body) = self.send_once(&call, Some(&token)).await?;
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthenticated);
        }
        into_result(status, body, call.path)
    }

    async fn send_once(&self, call: &Call<'_>, token: Option<&str>) -> Result<(StatusCode, String), ApiError> {
        let url = self.url(call.path)?;
        debug!("{} {}", call.method, url.path());

        let mut request = self.http.request(call.method.clone(), url);
        if !call.query.is_empty() {
            request = request.query(&call.query);
        }
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = &call.body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok((status, body))
    }

    fn stored_access_token(&self) -> Result<Option<String>, ApiError> {
        Ok(self.credentials.load()?.map(|c| c.access_token))
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// `rejected` is the token that just got a 401. If another call already
    /// replaced it, the newer token is reused instead of refreshing again.
    async fn refresh_access_token(&self, rejected: Option<&str>) -> Result<String, ApiError> {
        let _guard = self.refresh_lock.lock().await;

        let stored = self.credentials.load()?;
        let Some(stored) = stored else {
            return Err(ApiError::Unauthenticated);
        };
        if rejected.is_some_and(|t| t != stored.access_token) {
            return Ok(stored.access_token);
        }
        let Some(refresh) = stored.refresh_token.clone() else {
            return Err(ApiError::Unauthenticated);
        };

        let call = Call::post(REFRESH_PATH)
            .anonymous()
            .json(&serde_json::json!({ "refresh": refresh.as_str() }))?;
        let outcome = match self.send_once(&call, None).await {
            Ok((status, body)) if status.is_success() => serde_json::from_str::<RefreshResponse>(&body)
                .map_err(|e| ApiError::InvalidResponse(e.to_string())),
            Ok((status, body)) => Err(status_error(status, &body, REFRESH_PATH)),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(fresh) => {
                let renewed = StoredCredentials::new(fresh.access.clone(), fresh.refresh.or(Some(refresh)));
                self.credentials.save(&renewed)?;
                debug!("Access token refreshed");
                Ok(fresh.access)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, clearing stored credentials");
                if let Err(clear_err) = self.credentials.clear() {
                    warn!(error = %clear_err, "Failed to clear stored credentials");
                }
                Err(ApiError::AuthExpired)
            }
        }
    }
}

fn into_result(status: StatusCode, body: String, path: &str) -> Result<String, ApiError> {
    if status.is_success() {
        Ok(body)
    } else {
        Err(status_error(status, &body, path))
    }
}

fn status_error(status: StatusCode, body: &str, path: &str) -> ApiError {
    match status {
        StatusCode::UNAUTHORIZED => ApiError::Unauthenticated,
        StatusCode::NOT_FOUND => ApiError::NotFound(path.to_string()),
        _ => ApiError::Status {
            status: status.as_u16(),
            message: error_message(body),
        },
    }
}

/// Human-readable message from an error body.
///
/// The backend answers with `{"detail": ..}`, `{"error": ..}`, or a map of
/// field errors; anything else is passed through.
pub(crate) fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_string();
    };

    for key in ["detail", "error", "message"] {
        if let Some(text) = value.get(key).and_then(Value::as_str) {
            return text.to_string();
        }
    }

    match value {
        Value::Object(fields) => fields
            .iter()
            .map(|(field, errors)| match errors {
                Value::Array(items) => {
                    let joined: Vec<String> = items
                        .iter()
                        .map(|i| i.as_str().map(str::to_string).unwrap_or_else(|| i.to_string()))
                        .collect();
                    format!("{}: {}", field, joined.join(" "))
                }
                Value::String(s) => format!("{}: {}", field, s),
                other => format!("{}: {}", field, other),
            })
            .collect::<Vec<_>>()
            .join("; "),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
