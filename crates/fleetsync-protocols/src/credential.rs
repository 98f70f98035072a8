//! Persisted bearer credentials.

use serde::{Deserialize, Serialize};

use crate::error::CredentialError;

/// Tokens issued by the backend at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl StoredCredentials {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
        }
    }
}

/// Client-side credential storage.
///
/// Live channels read the access token once at construction; refreshing it
/// is the REST layer's job.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<StoredCredentials>, CredentialError>;

    fn save(&self, credentials: &StoredCredentials) -> Result<(), CredentialError>;

    fn clear(&self) -> Result<(), CredentialError>;

    /// Current access token, or [`CredentialError::Missing`].
    fn access_token(&self) -> Result<String, CredentialError> {
        self.load()?
            .map(|c| c.access_token)
            .ok_or(CredentialError::Missing)
    }
}
