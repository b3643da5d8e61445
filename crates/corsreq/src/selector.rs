//! Transport selection.
//!
//! Probes an [`Environment`] once and settles on exactly one transport variant
//! for everything built from the resulting [`Selection`].

use std::sync::Arc;

use crate::{Environment, SelectorError, TransportFactory, TransportKind};

/// The transport variant chosen for a client, together with its factory.
///
/// Immutable once created.
#[derive(Clone)]
pub struct Selection {
    kind: TransportKind,
    factory: Arc<dyn TransportFactory>,
}

impl Selection {
    /// The chosen variant.
    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    /// Factory for transports of the chosen variant.
    pub fn factory(&self) -> &Arc<dyn TransportFactory> {
        &self.factory
    }
}

impl std::fmt::Debug for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selection")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Picks the transport variant for an environment.
pub struct TransportSelector;

impl TransportSelector {
    /// Probes `env` in priority order.
    ///
    /// 1. A credentialed transport (one whose factory reports
    ///    [`TransportFactory::supports_credentials`]) is selected as
    ///    [`TransportKind::Primary`].
    /// 2. Otherwise a legacy transport is selected as
    ///    [`TransportKind::Fallback`].
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError::NoTransportAvailable`] when neither capability
    /// is present.
    pub fn probe(env: &dyn Environment) -> Result<Selection, SelectorError> {
        let selection = if let Some(factory) = env
            .credentialed_transport()
            .filter(|factory| factory.supports_credentials())
        {
            Selection {
                kind: TransportKind::Primary,
                factory,
            }
        } else if let Some(factory) = env.legacy_transport() {
            Selection {
                kind: TransportKind::Fallback,
                factory,
            }
        } else {
            tracing::error!("no usable transport in this environment");
            return Err(SelectorError::NoTransportAvailable);
        };

        tracing::info!(transport = %selection.kind, "transport selected");
        Ok(selection)
    }
}
