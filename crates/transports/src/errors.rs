//! Adapter error types.
//!
//! Only construction errors leave this crate. Per-request failures are
//! reported to the lifecycle as events and never returned.

use thiserror::Error;

/// Errors produced while building a [`crate::NativeEnvironment`].
#[derive(Debug, Error)]
pub enum EnvironmentError {
    /// The underlying HTTP client could not be built (for example, the TLS
    /// backend failed to initialise).
    #[error("failed to build the {variant} HTTP client: {source}")]
    Client {
        /// Which adapter's client failed.
        variant: &'static str,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
}

/// Why a legacy exchange produced no response.
#[derive(Debug, Error)]
pub(crate) enum LegacyFailure {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("non-success status {0}")]
    Status(reqwest::StatusCode),
}
