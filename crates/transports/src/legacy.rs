//! Fallback transport: legacy cross-origin requests without status codes.
//!
//! Behaves like the old cross-domain request object it stands in for:
//!
//! - no credentials are sent;
//! - only `http` and `https` targets are accepted;
//! - the status code is never reported: a 2xx response completes with its
//!   body, anything else is an error;
//! - every received body chunk fires a progress event, and the transport's own
//!   (optional) timeout fires a native-timeout event and nothing else.
//!
//! The last two only reach the lifecycle when it has bound those hooks.

use std::time::Duration;

use corsreq::{EventSink, LoadSnapshot, Method, Target, Transport, TransportFactory};
use reqwest::header::CONTENT_TYPE;
use tokio::task::JoinHandle;

use crate::errors::LegacyFailure;
use crate::{to_reqwest, BODY_CONTENT_TYPE};

/// Creates [`LegacyTransport`]s.
#[derive(Debug, Clone)]
pub struct LegacyTransportFactory {
    client: reqwest::Client,
    native_timeout: Option<Duration>,
}

impl LegacyTransportFactory {
    /// Wraps `client`. `native_timeout` is the transport's own timeout; `None`
    /// disables it.
    pub fn new(client: reqwest::Client, native_timeout: Option<Duration>) -> Self {
        Self {
            client,
            native_timeout,
        }
    }

    /// The transport's own timeout, if enabled.
    pub fn native_timeout(&self) -> Option<Duration> {
        self.native_timeout
    }
}

impl TransportFactory for LegacyTransportFactory {
    fn create(&self) -> Box<dyn Transport> {
        Box::new(LegacyTransport {
            client: self.client.clone(),
            native_timeout: self.native_timeout,
            opened: None,
            task: None,
        })
    }
}

/// One request on the fallback transport.
#[derive(Debug)]
pub struct LegacyTransport {
    client: reqwest::Client,
    native_timeout: Option<Duration>,
    opened: Option<(Method, Target, EventSink)>,
    task: Option<JoinHandle<()>>,
}

impl Transport for LegacyTransport {
    fn open(&mut self, method: Method, target: &Target, sink: EventSink) {
        if !(sink.hooks().progress && sink.hooks().native_timeout) {
            tracing::debug!("legacy transport opened without all hooks bound");
        }
        self.opened = Some((method, target.clone(), sink));
    }

    fn send(&mut self, body: Option<String>) {
        let Some((method, target, sink)) = self.opened.as_ref() else {
            tracing::warn!("send called on an unopened transport");
            return;
        };
        let url = match reqwest::Url::parse(target.as_str()) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            Ok(url) => {
                tracing::debug!(url = %target, scheme = url.scheme(), "scheme not supported by the legacy transport");
                sink.error();
                return;
            }
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
        self.task = Some(tokio::spawn(run(request, sink.clone(), self.native_timeout)));
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for LegacyTransport {
    fn drop(&mut self) {
        self.abort();
    }
}

async fn run(request: reqwest::RequestBuilder, sink: EventSink, native_timeout: Option<Duration>) {
    let result = match native_timeout {
        Some(limit) => match tokio::time::timeout(limit, exchange(request, &sink)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!(?limit, "legacy native timeout");
                sink.native_timeout();
                return;
            }
        },
        None => exchange(request, &sink).await,
    };

    match result {
        Ok(text) => sink.load(LoadSnapshot::done(None, text)),
        Err(err) => {
            tracing::debug!(error = %err, "legacy request failed");
            sink.error();
        }
    }
}

async fn exchange(request: reqwest::RequestBuilder, sink: &EventSink) -> Result<String, LegacyFailure> {
    let mut response = request.send().await?;
    if !response.status().is_success() {
        return Err(LegacyFailure::Status(response.status()));
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        body.extend_from_slice(&chunk);
        sink.progress();
    }
    Ok(String::from_utf8_lossy(&body).into_owned())
}
