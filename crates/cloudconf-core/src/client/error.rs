//! Client error types

use thiserror::Error;

use super::transport::TransportError;
use crate::credentials::CredentialError;

/// Errors that can occur while fetching remote configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error(transparent)]
    Credentials(#[from] CredentialError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A password and an explicit `Authorization` header were both configured
    #[error("you must set either 'password' or 'authorization', but not both")]
    ConflictingAuthorization,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No server had an environment for the request (fail-fast only)
    #[error("no environment found for name={name}, profiles={profiles}, label={label}")]
    NotFound {
        name: String,
        profiles: String,
        label: String,
    },
}

pub type ClientResult<T> = Result<T, ClientError>;
