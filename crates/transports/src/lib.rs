//! corsreq transport adapters.
//!
//! Implements the [`corsreq::Transport`], [`corsreq::TransportFactory`] and
//! [`corsreq::Environment`] ports over `reqwest`.
//!
//! | Adapter | Variant | Credentials | Status codes | Optional hooks |
//! |---------|---------|-------------|--------------|----------------|
//! | [`HttpTransport`] | primary | cookie store | real | none |
//! | [`LegacyTransport`] | fallback | none | none (non-2xx is an error) | progress, native timeout |
//!
//! [`NativeEnvironment`] advertises whichever adapters its
//! [`EnvironmentConfig`] enables, so an operator can force the fallback path.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** All HTTP details (URL parsing, headers, body reads)
//! live here. The [`corsreq`] crate sees only the port traits and the events
//! reported through [`corsreq::EventSink`].

mod environment;
mod errors;
mod http;
mod legacy;

pub use environment::{EnvironmentConfig, NativeEnvironment};
pub use errors::EnvironmentError;
pub use http::{HttpTransport, HttpTransportFactory};
pub use legacy::{LegacyTransport, LegacyTransportFactory};

/// Content type of every request body. Plain text keeps cross-origin requests
/// "simple" (no preflight), and is the only body type the legacy transport can
/// send.
pub(crate) const BODY_CONTENT_TYPE: &str = "text/plain;charset=UTF-8";

pub(crate) fn to_reqwest(method: corsreq::Method) -> reqwest::Method {
    match method {
        corsreq::Method::Get => reqwest::Method::GET,
        corsreq::Method::Post => reqwest::Method::POST,
    }
}
