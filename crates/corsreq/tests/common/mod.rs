//! Shared helpers for integration tests.
//!
//! Provides a scripted in-memory [`Transport`] whose every call is recorded,
//! an [`Environment`] exposing it as either variant, and a collector for
//! completion results.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use corsreq::{
    Client, ClientConfig, Environment, EventSink, LoadSnapshot, Method, RequestError, Response,
    Target, Transport, TransportEvent, TransportFactory, TransportKind,
};

/// Everything the scripted transports of one factory have seen.
#[derive(Default)]
pub struct Wire {
    pub opened: Vec<(Method, Target)>,
    pub sent: Vec<Option<String>>,
    pub aborts: usize,
    pub dropped: usize,
    pub sinks: Vec<EventSink>,
}

/// Shared view of a [`Wire`].
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Wire>>);

// Each integration test binary compiles `common` independently, so some
// helpers are unused in any single binary.
#[allow(dead_code)]
impl Recorder {
    pub fn with<R>(&self, f: impl FnOnce(&Wire) -> R) -> R {
        f(&self.0.lock().expect("recorder lock"))
    }

    /// Sink handed to the most recently opened transport.
    pub fn sink(&self) -> EventSink {
        self.with(|wire| wire.sinks.last().cloned().expect("a transport was opened"))
    }

    pub fn sent(&self) -> Vec<Option<String>> {
        self.with(|wire| wire.sent.clone())
    }

    pub fn aborts(&self) -> usize {
        self.with(|wire| wire.aborts)
    }

    pub fn dropped(&self) -> usize {
        self.with(|wire| wire.dropped)
    }

    pub fn opened(&self) -> Vec<(Method, Target)> {
        self.with(|wire| wire.opened.clone())
    }
}

/// A transport that records calls and optionally replies from inside `send`.
pub struct ScriptedTransport {
    recorder: Recorder,
    on_send: Vec<TransportEvent>,
    sink: Option<EventSink>,
}

impl Transport for ScriptedTransport {
    fn open(&mut self, method: Method, target: &Target, sink: EventSink) {
        let mut wire = self.recorder.0.lock().expect("recorder lock");
        wire.opened.push((method, target.clone()));
        wire.sinks.push(sink.clone());
        self.sink = Some(sink);
    }

    fn send(&mut self, body: Option<String>) {
        self.recorder
            .0
            .lock()
            .expect("recorder lock")
            .sent
            .push(body);
        if let Some(sink) = &self.sink {
            for event in self.on_send.drain(..) {
                match event {
                    TransportEvent::Error => sink.error(),
                    TransportEvent::Load(snapshot) => sink.load(snapshot),
                    TransportEvent::Progress => sink.progress(),
                    TransportEvent::NativeTimeout => sink.native_timeout(),
                }
            }
        }
    }

    fn abort(&mut self) {
        self.recorder.0.lock().expect("recorder lock").aborts += 1;
    }
}

impl Drop for ScriptedTransport {
    fn drop(&mut self) {
        if let Ok(mut wire) = self.recorder.0.lock() {
            wire.dropped += 1;
        }
    }
}

/// Factory for [`ScriptedTransport`]s.
pub struct ScriptedFactory {
    recorder: Recorder,
    credentials: bool,
    on_send: Vec<TransportEvent>,
}

impl TransportFactory for ScriptedFactory {
    fn supports_credentials(&self) -> bool {
        self.credentials
    }

    fn create(&self) -> Box<dyn Transport> {
        Box::new(ScriptedTransport {
            recorder: self.recorder.clone(),
            on_send: self.on_send.clone(),
            sink: None,
        })
    }
}

/// Environment offering one scripted transport as the given variant.
pub struct ScriptedEnvironment {
    kind: TransportKind,
    factory: Arc<ScriptedFactory>,
}

#[allow(dead_code)]
impl ScriptedEnvironment {
    pub fn new(kind: TransportKind) -> (Self, Recorder) {
        Self::replying(kind, Vec::new())
    }

    /// Transports from this environment emit `on_send` synchronously from
    /// inside `send`.
    pub fn replying(kind: TransportKind, on_send: Vec<TransportEvent>) -> (Self, Recorder) {
        let recorder = Recorder::default();
        let factory = Arc::new(ScriptedFactory {
            recorder: recorder.clone(),
            credentials: kind == TransportKind::Primary,
            on_send,
        });
        (Self { kind, factory }, recorder)
    }
}

impl Environment for ScriptedEnvironment {
    fn credentialed_transport(&self) -> Option<Arc<dyn TransportFactory>> {
        (self.kind == TransportKind::Primary)
            .then(|| Arc::clone(&self.factory) as Arc<dyn TransportFactory>)
    }

    fn legacy_transport(&self) -> Option<Arc<dyn TransportFactory>> {
        (self.kind == TransportKind::Fallback)
            .then(|| Arc::clone(&self.factory) as Arc<dyn TransportFactory>)
    }
}

/// Builds a client on a scripted transport of the given variant.
#[allow(dead_code)]
pub fn client(kind: TransportKind, timeout: Duration) -> (Client, Recorder) {
    let (env, recorder) = ScriptedEnvironment::new(kind);
    let client = Client::probe(&env, ClientConfig::with_timeout(timeout)).expect("probe");
    (client, recorder)
}

/// Collects completion results.
#[derive(Clone, Default)]
pub struct Results(Arc<Mutex<Vec<Result<Response, RequestError>>>>);

#[allow(dead_code)]
impl Results {
    pub fn callback(&self) -> impl FnOnce(Result<Response, RequestError>) + Send + 'static {
        let results = self.clone();
        move |result| results.0.lock().expect("results lock").push(result)
    }

    pub fn count(&self) -> usize {
        self.0.lock().expect("results lock").len()
    }

    pub fn take(&self) -> Vec<Result<Response, RequestError>> {
        std::mem::take(&mut *self.0.lock().expect("results lock"))
    }

    /// The single result delivered so far.
    pub fn only(&self) -> Result<Response, RequestError> {
        let mut all = self.take();
        assert_eq!(all.len(), 1, "expected exactly one completion");
        all.remove(0)
    }
}

/// A final load carrying `status` and `text`.
#[allow(dead_code)]
pub fn done(status: u16, text: &str) -> LoadSnapshot {
    LoadSnapshot::done(Some(status), text)
}

/// Lets every ready task on the current-thread runtime run.
pub async fn tick() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}
