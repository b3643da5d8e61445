//! The request lifecycle state machine.
//!
//! One lifecycle owns one in-flight request from construction to its single
//! terminal transition. Four sources race to end it:
//!
//! | Source | Transition |
//! |--------|------------|
//! | transport error event | `Failed(Error)` |
//! | transport final load event | `Succeeded(status)` or `Failed(Incomplete)` |
//! | client timeout | `Failed(Timeout)` |
//! | [`RequestHandle::abort`] | `Failed(Aborted)` |
//!
//! Every source funnels into one `settle` routine, which performs the Pending
//! check and the transition under one lock and takes the completion closure
//! out of the state in the same step. Whoever gets there first wins; everyone
//! later finds a terminal outcome and no closure to call.
//!
//! ## Scheduling
//!
//! Construction is synchronous: the payload is encoded and the transport
//! opened before the factory returns. A driver task then yields once to the
//! scheduler before issuing `send` (legacy transports misbehave when `send`
//! follows `open` within the same tick), re-checking for a terminal outcome
//! first. The same task consumes transport events and the timeout deadline,
//! which is fixed at construction time.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::Instrument as _;

use crate::{
    EventHooks, EventSink, EventStream, FailureReason, Method, Outcome, Payload, ReadyState,
    RequestError, RequestId, Response, Selection, Target, Transport, TransportEvent,
    TransportKind,
};

/// Callback receiving the single terminal result of a request.
pub type Completion = Box<dyn FnOnce(Result<Response, RequestError>) + Send + 'static>;

/// A validated request, ready to be started.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    /// Normalised method.
    pub method: Method,
    /// Destination, passed through unvalidated.
    pub target: Target,
    /// Optional payload, encoded at construction.
    pub payload: Option<Payload>,
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

enum Terminal {
    Failed(FailureReason),
    Succeeded(Response),
}

struct State {
    outcome: Outcome,
    /// Present until the terminal transition.
    transport: Option<Box<dyn Transport>>,
    /// Present until the terminal transition; taking it is what makes the
    /// callback once-only.
    completion: Option<Completion>,
}

struct Shared {
    id: RequestId,
    method: Method,
    target: Target,
    kind: TransportKind,
    span: tracing::Span,
    state: Mutex<State>,
    settled: Notify,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn outcome(&self) -> Outcome {
        self.lock().outcome
    }

    /// Performs the terminal transition if the lifecycle is still pending.
    ///
    /// Returns `false` when another source already settled it. When `cancel`
    /// is set the transport is told to abort before it is released. The
    /// completion runs after the lock is dropped.
    fn settle(&self, terminal: Terminal, cancel: bool) -> bool {
        let _entered = self.span.enter();

        let (completion, transport) = {
            let mut state = self.lock();
            if state.outcome.is_terminal() {
                tracing::debug!(outcome = ?state.outcome, "already settled; event dropped");
                return false;
            }
            state.outcome = match &terminal {
                Terminal::Failed(reason) => Outcome::Failed(*reason),
                Terminal::Succeeded(response) => Outcome::Succeeded(response.status),
            };
            let mut transport = state.transport.take();
            if cancel {
                if let Some(transport) = transport.as_mut() {
                    transport.abort();
                }
            }
            (state.completion.take(), transport)
        };
        drop(transport);
        self.settled.notify_one();

        let result = match terminal {
            Terminal::Failed(reason) => {
                tracing::warn!(%reason, "request failed");
                Err(RequestError::Failed {
                    method: self.method,
                    target: self.target.clone(),
                    reason,
                })
            }
            Terminal::Succeeded(response) => {
                tracing::info!(status = response.status, "request completed");
                Ok(response)
            }
        };
        if let Some(completion) = completion {
            completion(result);
        }
        true
    }

    /// Issues the deferred `send`, unless an abort or timeout got there first.
    fn send_if_pending(&self, body: Option<String>) {
        let mut state = self.lock();
        if state.outcome.is_terminal() {
            tracing::debug!(outcome = ?state.outcome, "send suppressed");
            return;
        }
        if let Some(transport) = state.transport.as_mut() {
            tracing::debug!(has_body = body.is_some(), "send issued");
            transport.send(body);
        }
    }

    fn on_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::Error => {
                self.settle(Terminal::Failed(FailureReason::Error), false);
            }
            TransportEvent::Load(snapshot) => match self.kind {
                TransportKind::Primary => {
                    if snapshot.ready_state != ReadyState::Done {
                        tracing::trace!(ready_state = ?snapshot.ready_state, "load not final; ignored");
                        return;
                    }
                    match snapshot.status {
                        Some(0) | None => {
                            self.settle(Terminal::Failed(FailureReason::Incomplete), false);
                        }
                        Some(status) => {
                            self.settle(
                                Terminal::Succeeded(Response::new(status, snapshot.text)),
                                false,
                            );
                        }
                    }
                }
                // The fallback transport has no status reporting; its load is
                // always final and always a success.
                TransportKind::Fallback => {
                    self.settle(Terminal::Succeeded(Response::new(200, snapshot.text)), false);
                }
            },
            other @ (TransportEvent::Progress | TransportEvent::NativeTimeout) => {
                tracing::trace!(event = ?other, "hook bound as no-op");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Starts request lifecycles on a selected transport.
pub struct RequestLifecycle;

impl RequestLifecycle {
    /// Constructs a lifecycle and schedules its driver task.
    ///
    /// Synchronously encodes the payload, creates and opens the transport, and
    /// fixes the timeout deadline (when `timeout` is non-zero). The `send`
    /// itself happens on the next scheduler tick.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start(
        selection: &Selection,
        request: PreparedRequest,
        timeout: Option<Duration>,
        completion: Completion,
    ) -> RequestHandle {
        let id = RequestId::new_random();
        let kind = selection.kind();
        let span = tracing::info_span!(
            "corsreq.request",
            request_id = %id,
            method = %request.method,
            url = %request.target,
            transport = %kind,
        );

        let body = {
            let _entered = span.enter();
            request.payload.as_ref().and_then(Payload::encode)
        };
        let deadline = timeout
            .filter(|timeout| !timeout.is_zero())
            .map(|timeout| Instant::now() + timeout);

        let hooks = match kind {
            TransportKind::Primary => EventHooks::none(),
            TransportKind::Fallback => EventHooks::all(),
        };
        let (sink, events) = EventSink::channel(hooks);
        let mut transport = selection.factory().create();
        transport.open(request.method, &request.target, sink);

        let shared = Arc::new(Shared {
            id,
            method: request.method,
            target: request.target,
            kind,
            span: span.clone(),
            state: Mutex::new(State {
                outcome: Outcome::Pending,
                transport: Some(transport),
                completion: Some(completion),
            }),
            settled: Notify::new(),
        });

        tokio::spawn(drive(Arc::clone(&shared), body, events, deadline).instrument(span));

        RequestHandle { shared }
    }
}

async fn drive(
    shared: Arc<Shared>,
    body: Option<String>,
    mut events: EventStream,
    deadline: Option<Instant>,
) {
    tokio::task::yield_now().await;
    shared.send_if_pending(body);

    let timeout = async move {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(timeout);

    let mut events_open = true;
    loop {
        tokio::select! {
            () = shared.settled.notified() => break,
            event = events.recv(), if events_open => match event {
                Some(event) => shared.on_event(event),
                None => events_open = false,
            },
            () = &mut timeout => {
                shared.settle(Terminal::Failed(FailureReason::Timeout), false);
                break;
            }
        }
        if shared.outcome().is_terminal() {
            break;
        }
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// The caller's handle on a started request.
///
/// Dropping the handle does not cancel the request.
#[derive(Clone)]
pub struct RequestHandle {
    shared: Arc<Shared>,
}

impl RequestHandle {
    /// Cancels the request if it is still pending.
    ///
    /// Tells the transport to abort, fails the request with
    /// [`FailureReason::Aborted`], and runs the completion. Once the request
    /// has settled by any route, this does nothing, so it is safe to call
    /// repeatedly and from inside the completion itself.
    pub fn abort(&self) {
        self.shared
            .settle(Terminal::Failed(FailureReason::Aborted), true);
    }

    /// Identifier recorded on this request's tracing span.
    pub fn id(&self) -> RequestId {
        self.shared.id
    }

    /// Method of the request.
    pub fn method(&self) -> Method {
        self.shared.method
    }

    /// Target of the request.
    pub fn target(&self) -> &Target {
        &self.shared.target
    }

    /// Current state of the lifecycle.
    pub fn outcome(&self) -> Outcome {
        self.shared.outcome()
    }

    /// Returns `true` once the lifecycle has reached a terminal state.
    pub fn is_settled(&self) -> bool {
        self.outcome().is_terminal()
    }
}

impl std::fmt::Debug for RequestHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestHandle")
            .field("id", &self.shared.id)
            .field("method", &self.shared.method)
            .field("target", &self.shared.target)
            .field("outcome", &self.outcome())
            .finish()
    }
}
