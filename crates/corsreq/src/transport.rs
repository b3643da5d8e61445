//! Transport port definitions.
//!
//! A transport is the capability that actually moves bytes: it is opened with
//! a method and target, sent once with an optional body, may be aborted, and
//! reports what happens through an [`EventSink`]. The request lifecycle
//! depends only on these traits; concrete adapters live in the `transports`
//! crate.
//!
//! ## Event model
//!
//! | Event | Meaning |
//! |-------|---------|
//! | [`TransportEvent::Error`] | Network-level failure before a usable response |
//! | [`TransportEvent::Load`] | Progress towards (or arrival of) a response; see [`ReadyState`] |
//! | [`TransportEvent::Progress`] | Body bytes arrived (fallback transport only) |
//! | [`TransportEvent::NativeTimeout`] | The transport's own timeout fired (fallback transport only) |
//!
//! Events are queued on an unbounded channel, so an adapter may emit them from
//! any task, or synchronously from inside [`Transport::send`], without
//! coordinating with the lifecycle.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::{Method, Target};

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// How far a transport has progressed through a request.
///
/// Mirrors the ready states of the primary transport. Only [`ReadyState::Done`]
/// is final; earlier load notifications are ignored by the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReadyState {
    /// Created but not opened.
    Unsent,
    /// `open` has been called.
    Opened,
    /// Status line and headers have arrived.
    HeadersReceived,
    /// Body is arriving.
    Loading,
    /// The request is finished, successfully or not.
    Done,
}

/// A load notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSnapshot {
    /// Progress at the time of the notification.
    pub ready_state: ReadyState,
    /// Status code, if the transport reports one. `Some(0)` means the request
    /// finished without a real HTTP status.
    pub status: Option<u16>,
    /// Body text received so far.
    pub text: String,
}

impl LoadSnapshot {
    /// A final notification carrying `status` and the complete body.
    pub fn done(status: Option<u16>, text: impl Into<String>) -> Self {
        Self {
            ready_state: ReadyState::Done,
            status,
            text: text.into(),
        }
    }
}

/// Something a transport reports to its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Network-level failure.
    Error,
    /// Load progress or completion.
    Load(LoadSnapshot),
    /// Body bytes arrived.
    Progress,
    /// The transport's native timeout elapsed.
    NativeTimeout,
}

/// Which optional event hooks the lifecycle has bound.
///
/// The legacy fallback transport completes more reliably when every hook has a
/// handler, so the lifecycle binds both hooks (as no-ops) for that variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventHooks {
    /// Deliver [`TransportEvent::Progress`].
    pub progress: bool,
    /// Deliver [`TransportEvent::NativeTimeout`].
    pub native_timeout: bool,
}

impl EventHooks {
    /// Only the mandatory error and load hooks.
    pub fn none() -> Self {
        Self::default()
    }

    /// Every hook, including progress and native timeout.
    pub fn all() -> Self {
        Self {
            progress: true,
            native_timeout: true,
        }
    }
}

/// Receiving half of a transport's event channel.
pub type EventStream = mpsc::UnboundedReceiver<TransportEvent>;

/// Handle through which a transport reports events.
///
/// Cloneable so that adapters can move a copy into their I/O task. Emitting
/// after the lifecycle has finished is harmless: the event is dropped.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<TransportEvent>,
    hooks: EventHooks,
}

impl EventSink {
    /// Creates a sink with the given hooks bound, and the stream it feeds.
    pub fn channel(hooks: EventHooks) -> (Self, EventStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, hooks }, rx)
    }

    /// Hooks the receiving lifecycle has bound.
    pub fn hooks(&self) -> EventHooks {
        self.hooks
    }

    /// Reports a network-level failure.
    pub fn error(&self) {
        self.emit(TransportEvent::Error);
    }

    /// Reports load progress or completion.
    pub fn load(&self, snapshot: LoadSnapshot) {
        self.emit(TransportEvent::Load(snapshot));
    }

    /// Reports body progress. Dropped unless the progress hook is bound.
    pub fn progress(&self) {
        if self.hooks.progress {
            self.emit(TransportEvent::Progress);
        }
    }

    /// Reports a native timeout. Dropped unless the native-timeout hook is bound.
    pub fn native_timeout(&self) {
        if self.hooks.native_timeout {
            self.emit(TransportEvent::NativeTimeout);
        }
    }

    fn emit(&self, event: TransportEvent) {
        // A closed channel means the lifecycle already settled.
        let _ = self.tx.send(event);
    }
}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// One live request on a concrete transport.
///
/// Owned exclusively by a single lifecycle and dropped when that lifecycle
/// reaches a terminal state. Adapters should release any in-flight I/O on
/// drop.
pub trait Transport: Send {
    /// Prepares the request and registers the sink for all later events.
    ///
    /// Must not perform I/O; an unusable target is reported as
    /// [`TransportEvent::Error`] after [`Transport::send`].
    fn open(&mut self, method: Method, target: &Target, sink: EventSink);

    /// Starts the request with the given body. Called at most once.
    fn send(&mut self, body: Option<String>);

    /// Cancels the request. Events emitted afterwards are ignored.
    fn abort(&mut self);
}

/// Creates transports of one variant.
pub trait TransportFactory: Send + Sync {
    /// Whether requests made through this factory carry credentials
    /// (cookies) across origins. Required for the primary variant.
    fn supports_credentials(&self) -> bool {
        false
    }

    /// Creates a fresh, unopened transport.
    fn create(&self) -> Box<dyn Transport>;
}

/// The hosting environment, as seen by the transport selector.
pub trait Environment {
    /// The modern credentialed transport, if the environment has one.
    fn credentialed_transport(&self) -> Option<Arc<dyn TransportFactory>>;

    /// The legacy cross-origin transport, if the environment has one.
    fn legacy_transport(&self) -> Option<Arc<dyn TransportFactory>>;
}
