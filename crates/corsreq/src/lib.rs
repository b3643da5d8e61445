//! Cross-origin HTTP requests over one of two transports, with one lifecycle.
//!
//! `corsreq` normalises a modern credentialed transport and a legacy
//! cross-origin fallback into a single request contract:
//!
//! - the completion callback runs **exactly once**, whichever of transport
//!   error, transport completion, client timeout, or explicit abort happens
//!   first;
//! - a client-side timeout is enforced regardless of the transport's own;
//! - abort is idempotent;
//! - payloads are encoded and responses decoded automatically.
//!
//! ## Architectural Layer
//!
//! **Domain logic + port definitions.** This crate performs no network I/O.
//! It defines the [`Transport`] capability it needs; the `transports` crate
//! supplies concrete adapters.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | `RequestId`, `Target` |
//! | [`types`] | `Method`, `TransportKind`, `Response`, `Outcome`, `FailureReason` |
//! | [`errors`] | `RequestError`, `SelectorError`, `ConfigError` |
//! | [`payload`] | Payload encoding |
//! | [`transport`] | `Transport`, `TransportFactory`, `Environment` ports and the event sink |
//! | [`selector`] | Transport selection |
//! | [`lifecycle`] | The request lifecycle state machine and `RequestHandle` |
//! | [`config`] | `ClientConfig` |
//! | [`client`] | The `Client` factory surface |
//!
//! ## Example
//!
//! ```no_run
//! # async fn demo(env: &dyn corsreq::Environment) -> Result<(), Box<dyn std::error::Error>> {
//! use corsreq::{Client, ClientConfig};
//!
//! let client = Client::probe(env, ClientConfig::default())?;
//! let handle = client
//!     .post("https://api.example.com/items")
//!     .json(&serde_json::json!({ "name": "widget" }))
//!     .on_complete(|result| match result {
//!         Ok(res) => println!("{} {}", res.status, res.text),
//!         Err(err) => eprintln!("{err}"),
//!     })
//!     .send();
//! handle.abort();
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod errors;
pub mod identifiers;
pub mod lifecycle;
pub mod payload;
pub mod selector;
pub mod transport;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use client::{Arg, Client, RequestBuilder};
pub use config::ClientConfig;
pub use errors::{ConfigError, RequestError, SelectorError, COMPONENT};
pub use identifiers::{RequestId, Target};
pub use lifecycle::{Completion, PreparedRequest, RequestHandle, RequestLifecycle};
pub use payload::Payload;
pub use selector::{Selection, TransportSelector};
pub use transport::{
    Environment, EventHooks, EventSink, EventStream, LoadSnapshot, ReadyState, Transport,
    TransportEvent, TransportFactory,
};
pub use types::{FailureReason, Method, Outcome, Response, TransportKind};
