//! Adapters against a throw-away local HTTP responder.

use std::time::Duration;

use corsreq::{
    Client, ClientConfig, EventHooks, EventSink, FailureReason, Method, ReadyState,
    RequestError, Response, Target, Transport, TransportEvent, TransportFactory, TransportKind,
};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use transports::{EnvironmentConfig, LegacyTransportFactory, NativeEnvironment};

const LIMIT: Duration = Duration::from_secs(10);

/// Accepts one connection, captures the request, and writes `reply`
/// verbatim. With `reply == None` the connection is held open without
/// answering.
async fn respond_once(reply: Option<&'static str>) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let url = format!("http://{}/resource", listener.local_addr().expect("addr"));
    let task = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let request = read_request(&mut socket).await;
        match reply {
            Some(reply) => {
                socket.write_all(reply.as_bytes()).await.expect("write");
                socket.shutdown().await.ok();
            }
            None => tokio::time::sleep(LIMIT).await,
        }
        request
    });
    (url, task)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = socket.read(&mut chunk).await.expect("read");
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text[..end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn client(kind: TransportKind) -> Client {
    let config = EnvironmentConfig {
        primary: kind == TransportKind::Primary,
        fallback: true,
        ..EnvironmentConfig::default()
    };
    let env = NativeEnvironment::new(&config).expect("environment");
    let client = Client::probe(&env, ClientConfig::default()).expect("probe");
    assert_eq!(client.transport_kind(), kind);
    client
}

async fn fetch(builder: corsreq::RequestBuilder<'_>) -> Result<Response, RequestError> {
    let (tx, rx) = oneshot::channel();
    builder
        .on_complete(move |result| {
            let _ = tx.send(result);
        })
        .send();
    tokio::time::timeout(LIMIT, rx)
        .await
        .expect("completion within limit")
        .expect("completion delivered")
}

// ---------------------------------------------------------------------------
// Primary
// ---------------------------------------------------------------------------

#[tokio::test]
async fn primary_reports_real_status_and_json() {
    let (url, server) = respond_once(Some(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 7\r\n\r\n{\"a\":1}",
    ))
    .await;
    let client = client(TransportKind::Primary);

    let res = fetch(client.request("get", url.as_str()).expect("method"))
        .await
        .expect("success");

    assert_eq!(res.status, 200);
    assert_eq!(res.json, Some(json!({ "a": 1 })));
    assert!(server.await.expect("server").starts_with("GET /resource HTTP/1.1"));
}

#[tokio::test]
async fn primary_error_statuses_are_responses() {
    let (url, _server) = respond_once(Some(
        "HTTP/1.1 404 Not Found\r\nContent-Length: 7\r\n\r\nmissing",
    ))
    .await;
    let client = client(TransportKind::Primary);

    let res = fetch(client.get(url.as_str())).await.expect("a response");
    assert_eq!((res.status, res.text.as_str()), (404, "missing"));
}

#[tokio::test]
async fn primary_posts_json_as_plain_text() {
    let (url, server) = respond_once(Some("HTTP/1.1 204 No Content\r\n\r\n")).await;
    let client = client(TransportKind::Primary);

    let res = fetch(client.post(url.as_str()).payload(json!({ "a": 1 })))
        .await
        .expect("success");
    assert_eq!(res.status, 204);

    let request = server.await.expect("server");
    assert!(request.starts_with("POST /resource HTTP/1.1"));
    assert!(request
        .to_ascii_lowercase()
        .contains("content-type: text/plain;charset=utf-8"));
    assert!(request.ends_with(r#"{"a":1}"#));
}

#[tokio::test]
async fn primary_truncated_body_is_incomplete() {
    let (url, _server) = respond_once(Some(
        "HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\nshort",
    ))
    .await;
    let client = client(TransportKind::Primary);

    let err = fetch(client.get(url.as_str())).await.expect_err("incomplete");
    assert_eq!(err.reason(), Some(FailureReason::Incomplete));
}

#[tokio::test]
async fn primary_refused_connection_is_an_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let url = format!("http://{}/gone", listener.local_addr().expect("addr"));
    drop(listener);
    let client = client(TransportKind::Primary);

    let err = fetch(client.get(url.as_str())).await.expect_err("error");
    assert_eq!(err.reason(), Some(FailureReason::Error));
    assert_eq!(err.to_string(), format!("corsreq: GET {url}: error"));
}

#[tokio::test]
async fn unparseable_target_is_an_error() {
    let client = client(TransportKind::Primary);
    let err = fetch(client.get("not a url")).await.expect_err("error");
    assert_eq!(err.reason(), Some(FailureReason::Error));
}

#[tokio::test]
async fn primary_reports_headers_before_done() {
    let (url, _server) = respond_once(Some(
        "HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok",
    ))
    .await;
    let env = NativeEnvironment::new(&EnvironmentConfig::default()).expect("environment");
    let factory = corsreq::Environment::credentialed_transport(&env).expect("primary");

    let (sink, mut events) = EventSink::channel(EventHooks::none());
    let mut transport = factory.create();
    transport.open(Method::Get, &Target::new(url), sink);
    transport.send(None);

    let mut states = Vec::new();
    while let Ok(Some(event)) = tokio::time::timeout(LIMIT, events.recv()).await {
        let snapshot = match event {
            TransportEvent::Load(snapshot) => snapshot,
            other => panic!("unexpected event {other:?}"),
        };
        states.push((snapshot.ready_state, snapshot.status));
        if snapshot.ready_state == ReadyState::Done {
            break;
        }
    }
    assert_eq!(
        states,
        [
            (ReadyState::HeadersReceived, Some(200)),
            (ReadyState::Done, Some(200))
        ]
    );
}

// ---------------------------------------------------------------------------
// Fallback
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fallback_synthesizes_200_and_skips_non_json() {
    let (url, _server) = respond_once(Some(
        "HTTP/1.1 201 Created\r\nContent-Length: 5\r\n\r\nhello",
    ))
    .await;
    let client = client(TransportKind::Fallback);

    let res = fetch(client.get(url.as_str())).await.expect("success");
    assert_eq!(res.status, 200);
    assert_eq!(res.text, "hello");
    assert_eq!(res.json, None);
}

#[tokio::test]
async fn fallback_treats_non_success_as_error() {
    let (url, _server) = respond_once(Some(
        "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 4\r\n\r\noops",
    ))
    .await;
    let client = client(TransportKind::Fallback);

    let err = fetch(client.get(url.as_str())).await.expect_err("error");
    assert_eq!(err.reason(), Some(FailureReason::Error));
}

#[tokio::test]
async fn fallback_rejects_non_http_schemes() {
    let client = client(TransportKind::Fallback);
    let err = fetch(client.get("file:///etc/hosts")).await.expect_err("error");
    assert_eq!(err.reason(), Some(FailureReason::Error));
}

#[tokio::test]
async fn fallback_reports_progress_when_hooked() {
    let (url, _server) = respond_once(Some(
        "HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello",
    ))
    .await;
    let factory = LegacyTransportFactory::new(reqwest_client(), None);

    let (sink, mut events) = EventSink::channel(EventHooks::all());
    let mut transport = factory.create();
    transport.open(Method::Get, &Target::new(url), sink);
    transport.send(None);

    let mut seen = Vec::new();
    while let Ok(Some(event)) = tokio::time::timeout(LIMIT, events.recv()).await {
        let last = matches!(event, TransportEvent::Load(_) | TransportEvent::Error);
        seen.push(event);
        if last {
            break;
        }
    }
    assert!(seen.contains(&TransportEvent::Progress));
    assert_eq!(
        seen.last(),
        Some(&TransportEvent::Load(corsreq::LoadSnapshot::done(None, "hello")))
    );
}

#[tokio::test]
async fn fallback_native_timeout_is_only_a_hook() {
    let (url, _server) = respond_once(None).await;
    let factory = LegacyTransportFactory::new(reqwest_client(), Some(Duration::from_millis(50)));

    let (sink, mut events) = EventSink::channel(EventHooks::all());
    let mut transport = factory.create();
    transport.open(Method::Get, &Target::new(url), sink);
    transport.send(None);

    let event = tokio::time::timeout(LIMIT, events.recv())
        .await
        .expect("event within limit");
    assert_eq!(event, Some(TransportEvent::NativeTimeout));
}

#[tokio::test]
async fn client_timeout_wins_over_a_silent_fallback() {
    let (url, _server) = respond_once(None).await;
    let client = client(TransportKind::Fallback);
    client.set_timeout(Duration::from_millis(100));

    let err = fetch(client.get(url.as_str())).await.expect_err("timeout");
    assert_eq!(err.reason(), Some(FailureReason::Timeout));
}

#[tokio::test]
async fn abort_cancels_the_exchange() {
    let (url, _server) = respond_once(None).await;
    let client = client(TransportKind::Primary);
    let (tx, rx) = oneshot::channel();

    let handle = client
        .get(url.as_str())
        .on_complete(move |result| {
            let _ = tx.send(result);
        })
        .send();
    tokio::time::sleep(Duration::from_millis(20)).await;
    handle.abort();

    let err = rx.await.expect("completion").expect_err("aborted");
    assert_eq!(err.reason(), Some(FailureReason::Aborted));
}

fn reqwest_client() -> reqwest::Client {
    reqwest::Client::new()
}
