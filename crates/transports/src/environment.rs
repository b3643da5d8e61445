//! The native environment: which adapters exist in this process.

use std::sync::Arc;
use std::time::Duration;

use corsreq::{Environment, TransportFactory};
use serde::{Deserialize, Serialize};

use crate::{EnvironmentError, HttpTransportFactory, LegacyTransportFactory};

/// Which adapters [`NativeEnvironment`] offers, and how they are built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnvironmentConfig {
    /// Offer the credentialed primary transport.
    pub primary: bool,
    /// Offer the legacy fallback transport.
    pub fallback: bool,
    /// Native timeout of the fallback transport in milliseconds. `0` (the
    /// default) disables it. Its expiry never settles a request, so only the
    /// client timeout bounds a stalled fallback request.
    pub legacy_native_timeout_ms: u64,
    /// `User-Agent` sent by both adapters.
    pub user_agent: String,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            primary: true,
            fallback: true,
            legacy_native_timeout_ms: 0,
            user_agent: concat!("corsreq/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

/// An [`Environment`] backed by real `reqwest` adapters.
#[derive(Debug, Clone)]
pub struct NativeEnvironment {
    primary: Option<Arc<HttpTransportFactory>>,
    fallback: Option<Arc<LegacyTransportFactory>>,
}

impl NativeEnvironment {
    /// Builds the adapters enabled by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`EnvironmentError::Client`] if an HTTP client cannot be built.
    pub fn new(config: &EnvironmentConfig) -> Result<Self, EnvironmentError> {
        let primary = if config.primary {
            let client = reqwest::Client::builder()
                .cookie_store(true)
                .user_agent(config.user_agent.as_str())
                .build()
                .map_err(|source| EnvironmentError::Client {
                    variant: "primary",
                    source,
                })?;
            Some(Arc::new(HttpTransportFactory::new(client)))
        } else {
            None
        };

        let fallback = if config.fallback {
            let client = reqwest::Client::builder()
                .user_agent(config.user_agent.as_str())
                .build()
                .map_err(|source| EnvironmentError::Client {
                    variant: "fallback",
                    source,
                })?;
            let native_timeout = (config.legacy_native_timeout_ms > 0)
                .then(|| Duration::from_millis(config.legacy_native_timeout_ms));
            Some(Arc::new(LegacyTransportFactory::new(client, native_timeout)))
        } else {
            None
        };

        tracing::debug!(
            primary = primary.is_some(),
            fallback = fallback.is_some(),
            "native environment built"
        );
        Ok(Self { primary, fallback })
    }
}

impl Environment for NativeEnvironment {
    fn credentialed_transport(&self) -> Option<Arc<dyn TransportFactory>> {
        self.primary
            .clone()
            .map(|factory| factory as Arc<dyn TransportFactory>)
    }

    fn legacy_transport(&self) -> Option<Arc<dyn TransportFactory>> {
        self.fallback
            .clone()
            .map(|factory| factory as Arc<dyn TransportFactory>)
    }
}
