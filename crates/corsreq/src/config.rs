//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings applied to every request a [`crate::Client`] constructs.
///
/// The default is no client-side timeout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Client-side timeout in milliseconds. `0` disables it.
    pub timeout_ms: u64,
}

impl ClientConfig {
    /// A configuration with the given timeout. [`Duration::ZERO`] disables it.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout_ms: duration_to_millis(timeout),
        }
    }

    /// The configured timeout, or `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

pub(crate) fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
