//! REST API errors.

use thiserror::Error;

use super::CredentialError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error ({status}): {message}")]
    Status { status: u16, message: String },

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Session expired, please log in again")]
    AuthExpired,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),
}

impl ApiError {
    /// Whether the failure came from the transport rather than the server.
    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }

    /// HTTP status for server-side failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Unauthenticated | ApiError::AuthExpired => Some(401),
            ApiError::NotFound(_) => Some(404),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let err = ApiError::Status {
            status: 403,
            message: "Admin access required".to_string(),
        };
        let display = err.to_string();
        assert!(display.contains("403"));
        assert!(display.contains("Admin access required"));
    }

    #[test]
    fn test_status_accessor() {
        assert_eq!(ApiError::AuthExpired.status(), Some(401));
        assert_eq!(ApiError::NotFound("truck 3".to_string()).status(), Some(404));
        assert_eq!(ApiError::Network("refused".to_string()).status(), None);
    }

    #[test]
    fn test_is_network() {
        assert!(ApiError::Network("timeout".to_string()).is_network());
        assert!(!ApiError::Unauthenticated.is_network());
    }

    #[test]
    fn test_credential_error_from() {
        let err = ApiError::from(CredentialError::Missing);
        assert!(err.to_string().contains("Credential"));
    }
}
