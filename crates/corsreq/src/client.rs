//! The request factory.
//!
//! A [`Client`] is built once from a transport [`Selection`] and a
//! [`ClientConfig`], then constructs one [`RequestLifecycle`] per call. Two
//! call surfaces lead to the same construction path:
//!
//! - the typed builder: [`Client::request`], [`Client::get`], [`Client::post`];
//! - the positional surface: [`Client::call`] over a list of [`Arg`]s, which
//!   accepts the shapes `(method, target)`, `(method, target, callback)`,
//!   `(method, target, payload)` and `(method, target, payload, callback)`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::config::duration_to_millis;
use crate::{
    ClientConfig, Completion, Environment, Method, Payload, PreparedRequest, RequestError,
    RequestHandle, RequestLifecycle, Response, Selection, SelectorError, Target,
    TransportKind, TransportSelector,
};

fn noop() -> Completion {
    Box::new(|_| {})
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Constructs requests on one transport variant.
///
/// The variant is fixed at construction. The timeout may be changed at any
/// time; it applies to requests constructed afterwards.
pub struct Client {
    selection: Selection,
    timeout_ms: AtomicU64,
}

impl Client {
    /// Builds a client on an existing selection.
    pub fn new(selection: Selection, config: ClientConfig) -> Self {
        Self {
            selection,
            timeout_ms: AtomicU64::new(config.timeout_ms),
        }
    }

    /// Probes `env` and builds a client on the selected transport.
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError::NoTransportAvailable`] when the environment
    /// offers no usable transport.
    pub fn probe(env: &dyn Environment, config: ClientConfig) -> Result<Self, SelectorError> {
        Ok(Self::new(TransportSelector::probe(env)?, config))
    }

    /// The transport variant in use.
    pub fn transport_kind(&self) -> TransportKind {
        self.selection.kind()
    }

    /// Whether the credentialed primary transport is in use.
    pub fn using_primary(&self) -> bool {
        self.transport_kind() == TransportKind::Primary
    }

    /// Whether the legacy fallback transport is in use.
    pub fn using_fallback(&self) -> bool {
        self.transport_kind() == TransportKind::Fallback
    }

    /// The client-side timeout, or `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_ms.load(Ordering::Relaxed) {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Sets the client-side timeout. [`Duration::ZERO`] disables it.
    pub fn set_timeout(&self, timeout: Duration) {
        self.timeout_ms
            .store(duration_to_millis(timeout), Ordering::Relaxed);
    }

    // -- typed surface -------------------------------------------------------

    /// Starts building a request, parsing `method` case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidMethod`] unless `method` is GET or POST.
    pub fn request(
        &self,
        method: &str,
        target: impl Into<Target>,
    ) -> Result<RequestBuilder<'_>, RequestError> {
        Ok(self.builder(method.parse()?, target.into()))
    }

    /// Starts building a GET request.
    pub fn get(&self, target: impl Into<Target>) -> RequestBuilder<'_> {
        self.builder(Method::Get, target.into())
    }

    /// Starts building a POST request.
    pub fn post(&self, target: impl Into<Target>) -> RequestBuilder<'_> {
        self.builder(Method::Post, target.into())
    }

    fn builder(&self, method: Method, target: Target) -> RequestBuilder<'_> {
        RequestBuilder {
            client: self,
            request: PreparedRequest {
                method,
                target,
                payload: None,
            },
            completion: None,
        }
    }

    // -- positional surface --------------------------------------------------

    /// Constructs a request from positional arguments.
    ///
    /// Shapes:
    ///
    /// | Arguments | Payload | Completion |
    /// |-----------|---------|------------|
    /// | `method, target` | none | no-op |
    /// | `method, target, callback` | none | `callback` |
    /// | `method, target, payload` | `payload` | no-op |
    /// | `method, target, payload, callback` | `payload` | `callback` |
    ///
    /// The three-argument shapes are told apart only by whether the third
    /// argument is an [`Arg::Callback`]. Arguments past the fourth are ignored.
    ///
    /// # Errors
    ///
    /// - [`RequestError::MissingArgument`] for fewer than two arguments, or a
    ///   callback in the target position.
    /// - [`RequestError::InvalidMethod`] unless the first argument is GET or
    ///   POST text.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn call(&self, args: Vec<Arg>) -> Result<RequestHandle, RequestError> {
        if args.len() < 2 {
            return Err(RequestError::MissingArgument);
        }
        let mut args = args.into_iter();
        let method = match args.next() {
            Some(Arg::Text(text)) => text.parse::<Method>()?,
            Some(Arg::Value(Value::String(text))) => text.parse::<Method>()?,
            Some(Arg::Value(other)) => {
                return Err(RequestError::InvalidMethod {
                    method: other.to_string(),
                })
            }
            Some(Arg::Callback(_)) => {
                return Err(RequestError::InvalidMethod {
                    method: "<callback>".to_owned(),
                })
            }
            None => return Err(RequestError::MissingArgument),
        };
        let target = match args.next() {
            Some(Arg::Text(text)) => Target::new(text),
            Some(Arg::Value(Value::String(text))) => Target::new(text),
            Some(Arg::Value(other)) => Target::new(other.to_string()),
            Some(Arg::Callback(_)) | None => return Err(RequestError::MissingArgument),
        };

        let (payload, completion) = match (args.next(), args.next()) {
            (None, _) => (None, None),
            (Some(Arg::Callback(done)), None) => (None, Some(done)),
            (Some(third), None) => (third.into_payload(), None),
            (Some(third), Some(fourth)) => (third.into_payload(), fourth.into_callback()),
        };

        Ok(self.start(
            PreparedRequest {
                method,
                target,
                payload,
            },
            completion.unwrap_or_else(noop),
        ))
    }

    /// [`Client::call`] with the method bound to GET; `args` start at the target.
    ///
    /// # Errors
    ///
    /// As [`Client::call`].
    pub fn call_get(&self, args: Vec<Arg>) -> Result<RequestHandle, RequestError> {
        self.call(prepend(Method::Get, args))
    }

    /// [`Client::call`] with the method bound to POST; `args` start at the target.
    ///
    /// # Errors
    ///
    /// As [`Client::call`].
    pub fn call_post(&self, args: Vec<Arg>) -> Result<RequestHandle, RequestError> {
        self.call(prepend(Method::Post, args))
    }

    fn start(&self, request: PreparedRequest, completion: Completion) -> RequestHandle {
        RequestLifecycle::start(&self.selection, request, self.timeout(), completion)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("transport", &self.transport_kind())
            .field("timeout", &self.timeout())
            .finish()
    }
}

fn prepend(method: Method, args: Vec<Arg>) -> Vec<Arg> {
    let mut all = Vec::with_capacity(args.len() + 1);
    all.push(Arg::Text(method.as_str().to_owned()));
    all.extend(args);
    all
}

// ---------------------------------------------------------------------------
// Positional arguments
// ---------------------------------------------------------------------------

/// One positional argument to [`Client::call`].
pub enum Arg {
    /// Text: a method, a target, or a payload sent verbatim.
    Text(String),
    /// A JSON value used as a payload (or, when it is a string, as text).
    Value(Value),
    /// A completion callback.
    Callback(Completion),
}

impl Arg {
    /// Wraps a closure as a completion callback argument.
    pub fn callback<F>(done: F) -> Self
    where
        F: FnOnce(Result<Response, RequestError>) + Send + 'static,
    {
        Self::Callback(Box::new(done))
    }

    fn into_payload(self) -> Option<Payload> {
        match self {
            Self::Text(text) => Some(Payload::Text(text)),
            Self::Value(value) => Some(Payload::Value(value)),
            Self::Callback(_) => None,
        }
    }

    fn into_callback(self) -> Option<Completion> {
        match self {
            Self::Callback(done) => Some(done),
            Self::Text(_) | Self::Value(_) => None,
        }
    }
}

impl std::fmt::Debug for Arg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// A request being configured on the typed surface.
#[must_use = "a request is only constructed by `send`"]
pub struct RequestBuilder<'a> {
    client: &'a Client,
    request: PreparedRequest,
    completion: Option<Completion>,
}

impl RequestBuilder<'_> {
    /// Sets the payload.
    pub fn payload(mut self, payload: impl Into<Payload>) -> Self {
        self.request.payload = Some(payload.into());
        self
    }

    /// Sets a text payload, sent verbatim even if it looks like JSON.
    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.request.payload = Some(Payload::Text(body.into()));
        self
    }

    /// Sets the payload from any serialisable value.
    ///
    /// A value that cannot be encoded results in an empty body; the request
    /// still goes ahead.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        self.request.payload = Some(Payload::from_serialize(value));
        self
    }

    /// Sets the completion callback. Without one, the result is discarded.
    pub fn on_complete<F>(mut self, done: F) -> Self
    where
        F: FnOnce(Result<Response, RequestError>) + Send + 'static,
    {
        self.completion = Some(Box::new(done));
        self
    }

    /// Constructs the request and schedules it.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn send(self) -> RequestHandle {
        self.client
            .start(self.request, self.completion.unwrap_or_else(noop))
    }
}

impl std::fmt::Debug for RequestBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("request", &self.request)
            .field("has_completion", &self.completion.is_some())
            .finish()
    }
}
