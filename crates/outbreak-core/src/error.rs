//! Error types for the outbreak engine and its collaborators.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by repositories, dispatchers, configuration and data loading.
///
/// The engine itself never returns these to its caller: every failure is
/// logged and confined to the cluster or municipality being processed.
#[derive(Debug, Error)]
pub enum OutbreakError {
    /// A case repository query failed
    #[error("repository query failed: {0}")]
    Repository(String),

    /// Notification delivery failed
    #[error("notification dispatch failed: {0}")]
    Dispatch(String),

    /// An external call did not complete in time
    #[error("{operation} timed out after {elapsed:?}")]
    Timeout {
        operation: &'static str,
        elapsed: Duration,
    },

    /// Configuration could not be loaded or is invalid
    #[error("configuration error: {0}")]
    Config(String),

    /// Input data violates a model constraint
    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result alias used across the crate
pub type OutbreakResult<T> = Result<T, OutbreakError>;

impl From<toml::de::Error> for OutbreakError {
    fn from(e: toml::de::Error) -> Self {
        OutbreakError::Config(e.to_string())
    }
}

/// Await `call`, failing with [`OutbreakError::Timeout`] once `limit` elapses
pub async fn with_timeout<T, F>(operation: &'static str, limit: Duration, call: F) -> OutbreakResult<T>
where
    F: Future<Output = OutbreakResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(OutbreakError::Timeout {
            operation,
            elapsed: limit,
        }),
    }
}
