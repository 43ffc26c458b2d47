use std::time::Duration;

use thiserror::Error;

use crate::actor_framework::ValidationError;
use crate::storage::StorageError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SettingsError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("Settings storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Settings service did not answer within {0:?}")]
    Timeout(Duration),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}
