//! Shared value types for the request domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! invariants (a [`Method`] is always GET or POST, a [`Response`] only carries
//! parsed JSON when its text is valid JSON) and participate in the lifecycle's
//! decisions.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::RequestError;

// ---------------------------------------------------------------------------
// Method
// ---------------------------------------------------------------------------

/// The HTTP method of a request.
///
/// Only the two methods both transports can carry are representable. Text is
/// parsed case-insensitively; anything else is rejected with
/// [`RequestError::InvalidMethod`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
}

impl Method {
    /// Returns the upper-case wire name of the method.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl FromStr for Method {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            _ => Err(RequestError::InvalidMethod {
                method: s.to_owned(),
            }),
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Transport kind
// ---------------------------------------------------------------------------

/// Which transport variant a client was built on.
///
/// Decided once by [`crate::TransportSelector::probe`]; never changes for the
/// lifetime of the [`crate::Client`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Credentialed cross-origin transport with real status codes.
    Primary,
    /// Legacy cross-origin-only transport. Reports no status codes.
    Fallback,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Fallback => f.write_str("fallback"),
        }
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// A completed response as delivered to the completion callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// HTTP status code. Always `200` on the fallback transport, which has no
    /// status reporting of its own.
    pub status: u16,
    /// The raw response body.
    pub text: String,
    /// The body parsed as JSON, or `None` when `text` is not valid JSON.
    pub json: Option<serde_json::Value>,
}

impl Response {
    /// Builds a response from a status and raw body, decoding the body as
    /// JSON when possible.
    pub fn new(status: u16, text: impl Into<String>) -> Self {
        let text = text.into();
        let json = serde_json::from_str(&text).ok();
        Self { status, text, json }
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Why a request lifecycle ended without a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The transport reported a network-level error.
    Error,
    /// The transport finished without a status (CORS rejection, connection
    /// reset, aborted mid-flight).
    Incomplete,
    /// The client-side timeout expired first.
    Timeout,
    /// The holder called [`crate::RequestHandle::abort`].
    Aborted,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => f.write_str("error"),
            Self::Incomplete => f.write_str("incomplete"),
            Self::Timeout => f.write_str("timeout"),
            Self::Aborted => f.write_str("aborted"),
        }
    }
}

/// State of a request lifecycle.
///
/// Moves from `Pending` to one of the terminal variants exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// No terminal event has been observed yet.
    Pending,
    /// Ended without a response.
    Failed(FailureReason),
    /// Ended with a response carrying this status.
    Succeeded(u16),
}

impl Outcome {
    /// Returns `true` once the lifecycle has left `Pending`.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}
