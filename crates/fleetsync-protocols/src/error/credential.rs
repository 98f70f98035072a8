//! Credential store errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("No stored credentials")]
    Missing,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt credential file: {0}")]
    Corrupt(String),
}
