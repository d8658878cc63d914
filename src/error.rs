use thiserror::Error;

use crate::{dao::storage::StorageError, state::scheduler::SchedulerError};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Bot is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Caller is not allowed to perform the operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Invalid input provided by the caller.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// The chat platform rejected or failed a request.
    #[error("platform request failed")]
    Platform(#[from] PlatformError),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<SchedulerError> for ServiceError {
    fn from(err: SchedulerError) -> Self {
        ServiceError::InvalidState(err.to_string())
    }
}

/// Failures talking to the chat platform.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Discord returned an error or was unreachable.
    #[error("discord request failed: {0}")]
    Discord(#[from] Box<serenity::Error>),
    /// The bot has not connected to the gateway yet.
    #[error("the bot is not connected to discord yet")]
    NotConnected,
}

impl From<serenity::Error> for ServiceError {
    fn from(err: serenity::Error) -> Self {
        ServiceError::Platform(err.into())
    }
}

impl From<serenity::Error> for PlatformError {
    fn from(err: serenity::Error) -> Self {
        PlatformError::Discord(Box::new(err))
    }
}
