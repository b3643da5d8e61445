//! Primary transport: credentialed HTTP with real status codes.
//!
//! Requests share one `reqwest::Client` with a cookie store, so cookies set by
//! one origin are sent back on later requests to it. Load notifications follow
//! the primary ready-state sequence: one `HeadersReceived` as soon as the
//! status line arrives, then a final `Done`. A body that cannot be read to the
//! end (connection reset, truncated content) finishes as `Done` with status 0.

use corsreq::{
    EventSink, LoadSnapshot, Method, ReadyState, Target, Transport, TransportFactory,
};
use reqwest::header::CONTENT_TYPE;
use tokio::task::JoinHandle;

use crate::{to_reqwest, BODY_CONTENT_TYPE};

/// Creates [`HttpTransport`]s sharing one credentialed client.
#[derive(Debug, Clone)]
pub struct HttpTransportFactory {
    client: reqwest::Client,
}

impl HttpTransportFactory {
    /// Wraps `client`. The client should have a cookie store enabled.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl TransportFactory for HttpTransportFactory {
    fn supports_credentials(&self) -> bool {
        true
    }

    fn create(&self) -> Box<dyn Transport> {
        Box::new(HttpTransport::new(self.client.clone()))
    }
}

/// One request on the primary transport.
///
/// The exchange runs on its own task from `send` onwards; aborting or dropping
/// the transport cancels that task.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    opened: Option<(Method, Target, EventSink)>,
    task: Option<JoinHandle<()>>,
}

impl HttpTransport {
    /// Creates an unopened transport on `client`.
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            opened: None,
            task: None,
        }
    }
}

impl Transport for HttpTransport {
    fn open(&mut self, method: Method, target: &Target, sink: EventSink) {
        self.opened = Some((method, target.clone(), sink));
    }

    fn send(&mut self, body: Option<String>) {
        let Some((method, target, sink)) = self.opened.as_ref() else {
            tracing::warn!("send called on an unopened transport");
            return;
        };
        let url = match reqwest::Url::parse(target.as_str()) {
            Ok(url) => url,
            Err(err) => {
                tracing::debug!(url = %target, error = %err, "target is not a URL");
                sink.error();
                return;
            }
        };

        let mut request = self.client.request(to_reqwest(*method), url);
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, BODY_CONTENT_TYPE).body(body);
        }
        self.task = Some(tokio::spawn(exchange(request, sink.clone())));
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for HttpTransport {
    fn drop(&mut self) {
        self.abort();
    }
}

async fn exchange(request: reqwest::RequestBuilder, sink: EventSink) {
    let response = match request.send().await {
        Ok(response) => response,
        Err(err) => {
            tracing::debug!(error = %err, "primary request failed");
            sink.error();
            return;
        }
    };

    let status = response.status().as_u16();
    sink.load(LoadSnapshot {
        ready_state: ReadyState::HeadersReceived,
        status: Some(status),
        text: String::new(),
    });

    match response.text().await {
        Ok(text) => sink.load(LoadSnapshot::done(Some(status), text)),
        Err(err) => {
            tracing::debug!(status, error = %err, "primary body read failed");
            sink.load(LoadSnapshot::done(Some(0), String::new()));
        }
    }
}
