use std::time::Duration;

use thiserror::Error;

use crate::actor_framework::{FrameworkError, ValidationError};
use crate::credentials::CredentialError;

/// Errors that can occur during account operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AccountError {
    #[error("{0}")]
    Validation(String),
    #[error("Account not found: {0}")]
    NotFound(String),
    #[error("Account {id} was modified concurrently (expected revision {expected}, current {current})")]
    Conflict { id: String, expected: u64, current: u64 },
    #[error("Idempotency key {0} was already used for a different account")]
    KeyReused(String),
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Account storage error: {0}")]
    Storage(String),
    #[error("Credential hashing failed: {0}")]
    Credential(String),
    #[error("Account store did not answer within {0:?}")]
    Timeout(Duration),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<FrameworkError> for AccountError {
    fn from(e: FrameworkError) -> Self {
        match e {
            FrameworkError::Validation(v) => Self::Validation(v.to_string()),
            FrameworkError::NotFound(id) => Self::NotFound(id),
            FrameworkError::Conflict {
                id,
                expected,
                current,
            } => Self::Conflict {
                id,
                expected,
                current,
            },
            FrameworkError::KeyReused(key) => Self::KeyReused(key),
            FrameworkError::Storage(s) => Self::Storage(s.to_string()),
            e @ (FrameworkError::ActorClosed | FrameworkError::ActorDropped) => {
                Self::ActorCommunicationError(e.to_string())
            }
        }
    }
}

impl From<CredentialError> for AccountError {
    fn from(e: CredentialError) -> Self {
        Self::Credential(e.to_string())
    }
}

impl From<ValidationError> for AccountError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e.to_string())
    }
}
