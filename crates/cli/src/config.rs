//! CLI configuration: an optional TOML file, overridden by flags.
//!
//! ```toml
//! [client]
//! timeout_ms = 5000
//!
//! [environment]
//! primary = true
//! fallback = true
//! legacy_native_timeout_ms = 0
//! user_agent = "corsreq/0.1.0"
//! ```

use std::path::Path;

use clap::ValueEnum;
use corsreq::{ClientConfig, ConfigError};
use serde::Deserialize;
use transports::EnvironmentConfig;

/// Contents of the configuration file. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct FileConfig {
    pub(crate) client: ClientConfig,
    pub(crate) environment: EnvironmentConfig,
}

impl FileConfig {
    /// Whether the fallback transport's own timeout is the only timer. It never
    /// settles a request, so a stalled fallback request would wait forever.
    pub(crate) fn only_native_timeout(&self) -> bool {
        self.client.timeout().is_none() && self.environment.legacy_native_timeout_ms > 0
    }

    /// Reads and parses the file at `path`.
    pub(crate) fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    pub(crate) fn parse(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|err| ConfigError::Invalid {
            message: err.to_string(),
        })
    }
}

/// Which transport the operator wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub(crate) enum TransportChoice {
    /// Whatever the probe picks.
    #[default]
    Auto,
    /// Only offer the credentialed transport.
    Primary,
    /// Only offer the legacy transport.
    Fallback,
}

impl TransportChoice {
    /// Restricts `environment` to the chosen transport.
    pub(crate) fn apply(self, environment: &mut EnvironmentConfig) {
        match self {
            Self::Auto => {}
            Self::Primary => {
                environment.primary = true;
                environment.fallback = false;
            }
            Self::Fallback => {
                environment.primary = false;
                environment.fallback = true;
            }
        }
    }
}
