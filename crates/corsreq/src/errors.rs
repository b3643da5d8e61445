//! Error types for the request domain.
//!
//! Errors split by *when* they happen:
//!
//! - [`SelectorError`]: startup. No transport can be used at all.
//! - [`RequestError::MissingArgument`] / [`RequestError::InvalidMethod`]:
//!   construction. Returned synchronously from the factory; they never reach a
//!   completion callback.
//! - [`RequestError::Failed`]: lifecycle. Delivered only through the
//!   completion callback, never returned.
//!
//! [`ConfigError`] covers configuration loading in the binaries.

use thiserror::Error;

use crate::{FailureReason, Method, Target};

/// Name prefixed to every error message produced by this crate.
pub const COMPONENT: &str = "corsreq";

// ---------------------------------------------------------------------------
// Request errors
// ---------------------------------------------------------------------------

/// Errors produced while constructing or running a single request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// Fewer than two positional arguments (method and target) were supplied.
    #[error("{COMPONENT}: missing argument")]
    MissingArgument,

    /// The method was neither GET nor POST (case-insensitively).
    #[error("{COMPONENT}: bad method {method:?}")]
    InvalidMethod {
        /// The method text as supplied by the caller.
        method: String,
    },

    /// The lifecycle ended without a response.
    ///
    /// Only ever delivered through the completion callback.
    #[error("{COMPONENT}: {method} {target}: {reason}")]
    Failed {
        /// Method of the failed request.
        method: Method,
        /// Target of the failed request.
        target: Target,
        /// Which event ended the lifecycle.
        reason: FailureReason,
    },
}

impl RequestError {
    /// Returns the failure reason for lifecycle errors, `None` for
    /// construction errors.
    pub fn reason(&self) -> Option<FailureReason> {
        match self {
            Self::Failed { reason, .. } => Some(*reason),
            Self::MissingArgument | Self::InvalidMethod { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Startup errors
// ---------------------------------------------------------------------------

/// Errors produced while probing the environment for a transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    /// Neither the credentialed transport nor the legacy fallback is available.
    ///
    /// Fatal: nothing in this crate can be used without a transport.
    #[error(
        "{COMPONENT} requires either a credentialed cross-origin transport or a legacy cross-origin transport"
    )]
    NoTransportAvailable,
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors produced while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration file '{path}': {source}")]
    Read {
        /// Path that was being read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration content could not be parsed or failed validation.
    #[error("invalid configuration: {message}")]
    Invalid {
        /// Description of the configuration problem.
        message: String,
    },
}
