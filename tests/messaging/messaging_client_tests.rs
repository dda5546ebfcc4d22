use std::sync::{Arc, Mutex};
use std::time::Duration;

use civix_client::prelude::*;
use civix_client::testing::{MockConnect, MockConnector};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::Instant;

fn client(connector: &Arc<MockConnector>, session: Option<Session>, max_attempts: u32) -> MessagingClient {
    let mut config = ClientConfig::for_origin("http://api.test");
    config.messaging.max_reconnect_attempts = max_attempts;
    let store = match session {
        Some(session) => SessionStore::with_session(session),
        None => SessionStore::new(),
    };
    MessagingClient::new(&config, Arc::new(store), connector.clone())
        .expect("valid test configuration")
}

async fn wait_for(client: &MessagingClient, state: ConnectionState) {
    client
        .watch_state()
        .wait_for(|current| *current == state)
        .await
        .expect("state channel open");
}

#[tokio::test(start_paused = true)]
async fn exhausted_reconnect_budget_disables_the_client() {
    let connector = Arc::new(MockConnector::failing());
    let client = client(&connector, Some(Session::with_token("t")), 3);

    let start = Instant::now();
    client.connect().expect("first connect is accepted");
    wait_for(&client, ConnectionState::Disabled).await;

    assert_eq!(connector.attempts(), 3);
    // 1s then 2s between the three attempts
    assert!(start.elapsed() >= Duration::from_secs(3));

    let err = client.connect().unwrap_err();
    assert!(err.is_disabled());

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(connector.attempts(), 3);
    assert_eq!(client.state(), ConnectionState::Disabled);

    client.disconnect();
    assert_eq!(client.state(), ConnectionState::Disabled);
}

#[tokio::test(start_paused = true)]
async fn connect_without_session_does_nothing() {
    let connector = Arc::new(MockConnector::accepting());
    let client = client(&connector, None, 3);

    client.connect().expect("no-op without session");
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(connector.attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn successful_connect_resets_the_attempt_counter() {
    let connector = Arc::new(MockConnector::scripted(
        [MockConnect::Fail, MockConnect::Fail],
        MockConnect::Accept,
    ));
    let client = client(&connector, Some(Session::with_cookie("civix_session=1")), 5);

    client.connect().expect("connect");
    wait_for(&client, ConnectionState::Connected).await;

    assert_eq!(connector.attempts(), 3);
    assert_eq!(client.reconnect_attempts(), 0);

    let (url, session) = connector.connections().remove(0);
    assert_eq!(url.as_str(), "ws://api.test/ws");
    assert_eq!(session.cookie.as_deref(), Some("civix_session=1"));
}

#[tokio::test(start_paused = true)]
async fn frames_reach_every_healthy_handler() {
    let connector = Arc::new(MockConnector::accepting());
    let client = client(&connector, Some(Session::with_token("t")), 3);

    let (tx, mut rx) = mpsc::unbounded_channel();
    client.on(MessageType::NewMessage, |_| Err("handler rejected event".into()));
    client.on(MessageType::NewMessage, |_| panic!("handler bug"));
    client.on(MessageType::NewMessage, move |event| {
        tx.send(event.clone()).ok();
        Ok(())
    });

    client.connect().expect("connect");
    wait_for(&client, ConnectionState::Connected).await;
    let socket = connector.take_socket().expect("accepted socket");

    socket.push_frame("{not json").await;
    socket
        .push_event(
            "new_message",
            json!({
                "id": "m-1",
                "conversationId": "c-9",
                "senderId": "u-3",
                "content": "Meeting moved to 7pm",
                "createdAt": "2024-05-01T12:00:00Z"
            }),
        )
        .await;

    let event = rx.recv().await.expect("handler ran");
    let ServerEvent::NewMessage(message) = event else {
        panic!("unexpected event {event:?}");
    };
    assert_eq!(message.content, "Meeting moved to 7pm");
    assert_eq!(client.state(), ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn server_close_does_not_reconnect() {
    let connector = Arc::new(MockConnector::accepting());
    let client = client(&connector, Some(Session::with_token("t")), 3);

    client.connect().expect("connect");
    wait_for(&client, ConnectionState::Connected).await;
    connector.take_socket().expect("accepted socket").close().await;

    wait_for(&client, ConnectionState::Disconnected).await;
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(connector.attempts(), 1);
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn transport_errors_reconnect() {
    let connector = Arc::new(MockConnector::accepting());
    let client = client(&connector, Some(Session::with_token("t")), 3);

    client.connect().expect("connect");
    wait_for(&client, ConnectionState::Connected).await;
    connector.take_socket().expect("first socket").fail("connection reset").await;

    wait_for(&client, ConnectionState::Disconnected).await;
    wait_for(&client, ConnectionState::Connected).await;

    assert_eq!(connector.attempts(), 2);
    assert!(connector.take_socket().is_some());
}

#[tokio::test(start_paused = true)]
async fn outgoing_events_require_a_connection() {
    let connector = Arc::new(MockConnector::accepting());
    let client = client(&connector, Some(Session::with_token("t")), 3);

    let err = client.send_message("c-1", "hello").unwrap_err();
    assert!(matches!(err.kind(), Kind::NotConnected));

    client.connect().expect("connect");
    wait_for(&client, ConnectionState::Connected).await;
    let mut socket = connector.take_socket().expect("accepted socket");

    client.send_message("c-1", "hello").expect("queued");
    client.start_typing("c-1").expect("queued");
    client
        .mark_read("c-1", &["m-1".to_string()])
        .expect("queued");

    assert_eq!(
        socket.next_sent().await,
        Some(json!({"messageType": "send_message", "data": {"conversationId": "c-1", "content": "hello"}}))
    );
    assert_eq!(
        socket.next_sent().await,
        Some(json!({"messageType": "typing_start", "data": {"conversationId": "c-1"}}))
    );
    assert_eq!(
        socket.next_sent().await.map(|frame| frame["messageType"].clone()),
        Some(json!("mark_read"))
    );
}

#[tokio::test(start_paused = true)]
async fn disconnect_cancels_the_connection() {
    let connector = Arc::new(MockConnector::accepting());
    let client = client(&connector, Some(Session::with_token("t")), 3);

    client.connect().expect("connect");
    wait_for(&client, ConnectionState::Connected).await;

    client.disconnect();
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert!(client.stop_typing("c-1").is_err());

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(connector.attempts(), 1);

    client.connect().expect("reconnect after disconnect");
    wait_for(&client, ConnectionState::Connected).await;
    assert_eq!(connector.attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn state_listeners_see_every_transition() {
    let connector = Arc::new(MockConnector::scripted([MockConnect::Fail], MockConnect::Accept));
    let client = client(&connector, Some(Session::with_token("t")), 3);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    client.on_state_change(move |state| sink.lock().unwrap().push(state));
    client.on_state_change(|_| panic!("listener bug"));

    client.connect().expect("connect");
    wait_for(&client, ConnectionState::Connected).await;

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            ConnectionState::Connecting,
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            ConnectionState::Connected,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn listener_may_disconnect_while_connecting() {
    let connector = Arc::new(MockConnector::accepting());
    let client = Arc::new(client(&connector, Some(Session::with_token("t")), 3));

    let weak = Arc::downgrade(&client);
    client.on_state_change(move |state| {
        if state == ConnectionState::Connecting {
            if let Some(client) = weak.upgrade() {
                client.disconnect();
            }
        }
    });

    client.connect().expect("connect returns");
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(connector.attempts(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn connect_from_a_plain_thread_uses_the_client_runtime() {
    let connector = Arc::new(MockConnector::accepting());
    let client = Arc::new(client(&connector, Some(Session::with_token("t")), 3));

    let remote = Arc::clone(&client);
    let outcome = std::thread::spawn(move || remote.connect())
        .join()
        .expect("connect thread finished");
    assert!(outcome.is_ok());

    tokio::time::timeout(Duration::from_secs(5), wait_for(&client, ConnectionState::Connected))
        .await
        .expect("connected in time");
    assert_eq!(connector.attempts(), 1);
}

#[test]
fn connect_without_any_runtime_is_an_error() {
    let connector = Arc::new(MockConnector::accepting());
    let client = client(&connector, Some(Session::with_token("t")), 3);

    let err = client.connect().unwrap_err();
    assert!(err.is_builder());
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(connector.attempts(), 0);
}
