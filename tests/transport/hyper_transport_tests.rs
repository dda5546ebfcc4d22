use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{HeaderMap as AxumHeaders, StatusCode as AxumStatus};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use civix_client::prelude::*;
use serde_json::{Value, json};
use tokio::sync::mpsc;

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("test server");
    });
    addr
}

fn manager(addr: SocketAddr, retry: RetryPolicy, timeout: Duration, session: Session) -> RequestManager {
    let mut config = ClientConfig::for_origin(&format!("http://{addr}"));
    config.retry = retry;
    config.request_timeout = timeout;
    RequestManager::http(config, Arc::new(SessionStore::with_session(session)))
        .expect("valid test configuration")
}

#[derive(Clone, Default)]
struct Hits(Arc<AtomicUsize>);

impl Hits {
    fn bump(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

#[tokio::test]
async fn json_round_trip_over_http() {
    let hits = Hits::default();
    let router = Router::new()
        .route(
            "/users/5",
            get(|State(hits): State<Hits>, headers: AxumHeaders| async move {
                hits.bump();
                Json(json!({
                    "id": 5,
                    "auth": headers.get("authorization").and_then(|v| v.to_str().ok()),
                    "accept": headers.get("accept").and_then(|v| v.to_str().ok()),
                }))
            }),
        )
        .with_state(hits.clone());
    let addr = serve(router).await;
    let manager = manager(addr, RetryPolicy::default(), Duration::from_secs(5), Session::with_token("t0k"));

    let payload = manager
        .request("/users/5", RequestOptions::get())
        .await
        .expect("request succeeds");
    assert_eq!(payload["id"], 5);
    assert_eq!(payload["auth"], "Bearer t0k");
    assert_eq!(payload["accept"], "application/json");

    manager
        .request("/users/5", RequestOptions::get())
        .await
        .expect("cached");
    assert_eq!(hits.count(), 1);
}

#[tokio::test]
async fn status_errors_and_retries_over_http() {
    let hits = Hits::default();
    let router = Router::new()
        .route(
            "/missing",
            get(|| async { (AxumStatus::NOT_FOUND, Json(json!({"error": "Not found"}))) }),
        )
        .route(
            "/flaky",
            get(|State(hits): State<Hits>| async move {
                if hits.bump() < 3 {
                    (AxumStatus::SERVICE_UNAVAILABLE, Json(json!({"error": "busy"})))
                } else {
                    (AxumStatus::OK, Json(json!({"ok": true})))
                }
            }),
        )
        .with_state(hits.clone());
    let addr = serve(router).await;
    let retry = RetryPolicy::default()
        .with_max_attempts(3)
        .with_base_delay(Duration::from_millis(10));
    let manager = manager(addr, retry, Duration::from_secs(5), Session::default());

    let err = manager
        .request("/missing", RequestOptions::get())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));

    let payload = manager
        .request("/flaky", RequestOptions::get())
        .await
        .expect("third attempt succeeds");
    assert_eq!(*payload, json!({"ok": true}));
    assert_eq!(hits.count(), 3);
}

#[tokio::test]
async fn slow_responses_time_out() {
    let router = Router::new().route(
        "/slow",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(json!({}))
        }),
    );
    let addr = serve(router).await;
    let manager = manager(
        addr,
        RetryPolicy::no_retry(),
        Duration::from_millis(100),
        Session::default(),
    );

    let err = manager
        .request("/slow", RequestOptions::get())
        .await
        .unwrap_err();
    assert!(err.is_timeout());
}

#[tokio::test]
async fn refused_connections_are_request_errors() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("address");
    drop(listener);

    let manager = manager(addr, RetryPolicy::no_retry(), Duration::from_secs(2), Session::default());
    let err = manager
        .request("/anything", RequestOptions::get())
        .await
        .unwrap_err();
    assert!(err.is_request());
    assert!(err.is_retryable());
}

async fn socket_session(mut socket: WebSocket, token: Option<String>) {
    let hello = json!({
        "messageType": "new_notification",
        "data": {"id": 1, "type": "welcome", "title": token}
    });
    if socket.send(Message::Text(hello.to_string())).await.is_err() {
        return;
    }

    while let Some(Ok(message)) = socket.recv().await {
        let Message::Text(text) = message else {
            continue;
        };
        let frame: Value = serde_json::from_str(&text).unwrap_or_default();
        if frame["messageType"] == "send_message" {
            let echo = json!({
                "messageType": "message_sent",
                "data": {
                    "id": 77,
                    "conversationId": frame["data"]["conversationId"],
                    "senderId": 1,
                    "content": frame["data"]["content"],
                    "createdAt": "2024-05-01T12:00:00Z"
                }
            });
            if socket.send(Message::Text(echo.to_string())).await.is_err() {
                return;
            }
        } else if frame["messageType"] == "typing_stop" {
            socket.send(Message::Close(None)).await.ok();
            return;
        }
    }
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> ServerEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("event in time")
        .expect("event channel open")
}

#[tokio::test]
async fn websocket_messaging_end_to_end() {
    let router = Router::new().route(
        "/ws",
        get(|ws: WebSocketUpgrade, Query(query): Query<HashMap<String, String>>| async move {
            let token = query.get("token").cloned();
            ws.on_upgrade(move |socket| socket_session(socket, token))
                .into_response()
        }),
    );
    let addr = serve(router).await;

    let config = ClientConfig::for_origin(&format!("http://{addr}"));
    let session = Arc::new(SessionStore::with_session(Session::with_token("legacy-token")));
    let client = MessagingClient::websocket(&config, session).expect("valid test configuration");

    let (tx, mut rx) = mpsc::unbounded_channel();
    for message_type in [MessageType::NewNotification, MessageType::MessageSent] {
        let tx = tx.clone();
        client.on(message_type, move |event| {
            tx.send(event.clone()).ok();
            Ok(())
        });
    }

    let mut states = client.watch_state();
    client.connect().expect("connect");
    tokio::time::timeout(
        Duration::from_secs(5),
        states.wait_for(|state| *state == ConnectionState::Connected),
    )
    .await
    .expect("connected in time")
    .expect("state channel open");

    let ServerEvent::NewNotification(hello) = next_event(&mut rx).await else {
        panic!("expected the welcome notification");
    };
    assert_eq!(hello.title.as_deref(), Some("legacy-token"));

    client.send_message("c-4", "see you there").expect("queued");
    let ServerEvent::MessageSent(sent) = next_event(&mut rx).await else {
        panic!("expected the echo");
    };
    assert_eq!(sent.conversation_id, "c-4");
    assert_eq!(sent.content, "see you there");

    // The test server closes on typing_stop; a server close is final
    client.stop_typing("c-4").expect("queued");
    tokio::time::timeout(
        Duration::from_secs(5),
        states.wait_for(|state| *state == ConnectionState::Disconnected),
    )
    .await
    .expect("closed in time")
    .expect("state channel open");
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(client.state(), ConnectionState::Disconnected);
}
