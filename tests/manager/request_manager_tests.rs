use std::sync::Arc;
use std::time::Duration;

use civix_client::prelude::*;
use civix_client::testing::{MockReply, MockTransport};
use serde::Deserialize;
use serde_json::json;
use tokio::time::Instant;
use tokio_test::{assert_err, assert_ok};

fn manager(transport: &Arc<MockTransport>, retry: RetryPolicy) -> RequestManager {
    let mut config = ClientConfig::for_origin("http://api.test");
    config.retry = retry;
    RequestManager::new(config, transport.clone(), Arc::new(SessionStore::new()))
        .expect("valid test configuration")
}

fn fast_retries(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::default()
        .with_max_attempts(max_attempts)
        .with_base_delay(Duration::from_millis(10))
}

#[tokio::test(start_paused = true)]
async fn concurrent_identical_requests_share_one_call() {
    let transport = Arc::new(MockTransport::new().with_latency(Duration::from_millis(100)));
    transport.get("/users/5", 200, json!({"id": 5, "name": "Ada"}));
    let manager = manager(&transport, RetryPolicy::default());

    let (first, second) = tokio::join!(
        manager.request("/users/5", RequestOptions::get()),
        manager.request("/users/5", RequestOptions::get()),
    );

    let first = assert_ok!(first);
    let second = assert_ok!(second);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first["name"], "Ada");
    assert_eq!(transport.calls_to("/users/5"), 1);
    assert_eq!(manager.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn abandoned_request_still_settles_and_caches() {
    let transport = Arc::new(MockTransport::new().with_latency(Duration::from_millis(100)));
    transport.get("/users/7", 200, json!({"id": 7}));
    let manager = manager(&transport, RetryPolicy::default());

    let gave_up = tokio::time::timeout(
        Duration::from_millis(10),
        manager.request("/users/7", RequestOptions::get()),
    )
    .await;
    assert!(gave_up.is_err());
    assert_eq!(manager.in_flight(), 1);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(manager.in_flight(), 0);
    assert_eq!(manager.cache_stats().writes, 1);

    let cached = assert_ok!(manager.request("/users/7", RequestOptions::get()).await);
    assert_eq!(cached["id"], 7);
    assert_eq!(transport.calls_to("/users/7"), 1);
}

#[tokio::test(start_paused = true)]
async fn different_bodies_are_not_deduplicated() {
    let transport = Arc::new(MockTransport::new().with_latency(Duration::from_millis(50)));
    transport.reply(Method::POST, "/search", MockReply::json(200, json!({"results": []})));
    let manager = manager(&transport, RetryPolicy::default());

    let (a, b) = tokio::join!(
        manager.request("/search", RequestOptions::post(json!({"q": "parks"}))),
        manager.request("/search", RequestOptions::post(json!({"q": "schools"}))),
    );

    assert_ok!(a);
    assert_ok!(b);
    assert_eq!(transport.calls_to("/search"), 2);
}

#[tokio::test(start_paused = true)]
async fn cached_response_expires_after_its_timeout() {
    let transport = Arc::new(MockTransport::new());
    transport.get("/feed", 200, json!({"items": [1, 2, 3]}));
    let manager = manager(&transport, RetryPolicy::default());
    let options = || RequestOptions::get().cache_timeout(Duration::from_millis(1000));

    assert_ok!(manager.request("/feed", options()).await);
    assert_eq!(transport.calls_to("/feed"), 1);

    tokio::time::advance(Duration::from_millis(500)).await;
    let cached = assert_ok!(manager.request("/feed", options()).await);
    assert_eq!(cached["items"][2], 3);
    assert_eq!(transport.calls_to("/feed"), 1);

    tokio::time::advance(Duration::from_millis(1000)).await;
    assert_ok!(manager.request("/feed", options()).await);
    assert_eq!(transport.calls_to("/feed"), 2);

    let stats = manager.cache_stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.writes, 2);
}

#[tokio::test(start_paused = true)]
async fn bypass_cache_goes_to_the_network_and_refreshes_the_entry() {
    let transport = Arc::new(MockTransport::new());
    transport
        .get("/profile", 200, json!({"bio": "old"}))
        .get("/profile", 200, json!({"bio": "new"}));
    let manager = manager(&transport, RetryPolicy::default());

    assert_ok!(manager.request("/profile", RequestOptions::get()).await);
    let fresh = assert_ok!(manager.request("/profile", RequestOptions::get().bypass_cache()).await);
    assert_eq!(fresh["bio"], "new");
    assert_eq!(transport.calls_to("/profile"), 2);

    let cached = assert_ok!(manager.request("/profile", RequestOptions::get()).await);
    assert_eq!(cached["bio"], "new");
    assert_eq!(transport.calls_to("/profile"), 2);
}

#[tokio::test(start_paused = true)]
async fn client_errors_are_not_retried() {
    let transport = Arc::new(MockTransport::new());
    transport.get("/users/404", 404, json!({"error": "User not found"}));
    let manager = manager(&transport, fast_retries(5));

    let err = assert_err!(manager.request("/users/404", RequestOptions::get()).await);
    assert!(err.is_client_error());
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    assert_eq!(err.endpoint(), Some("/users/404"));
    assert!(err.to_string().contains("User not found"));
    assert_eq!(transport.calls_to("/users/404"), 1);
}

#[tokio::test(start_paused = true)]
async fn server_errors_are_retried_with_doubling_delays() {
    let transport = Arc::new(MockTransport::new());
    for _ in 0..3 {
        transport.get("/flaky", 500, json!({"error": "upstream"}));
    }
    transport.get("/flaky", 200, json!({"ok": true}));

    let policy = RetryPolicy::default().with_max_attempts(4);
    let manager = manager(&transport, policy);

    let start = Instant::now();
    let payload = assert_ok!(manager.request("/flaky", RequestOptions::get()).await);
    let elapsed = start.elapsed();

    assert_eq!(*payload, json!({"ok": true}));
    assert_eq!(transport.calls_to("/flaky"), 4);
    // 1s + 2s + 4s
    assert!(elapsed >= Duration::from_secs(7), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(7100), "elapsed {elapsed:?}");

    let stats = manager.retry_stats();
    assert_eq!(stats.retries, 3);
    assert_eq!(stats.successes, 1);
    assert_eq!(manager.frequency("/flaky").total, 4);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_surface_the_last_error() {
    let transport = Arc::new(MockTransport::new());
    transport.get("/down", 503, json!({"message": "maintenance"}));
    let manager = manager(&transport, fast_retries(3));

    let err = assert_err!(manager.request("/down", RequestOptions::get()).await);
    assert!(err.is_server_error());
    assert_eq!(transport.calls_to("/down"), 3);
    assert_eq!(manager.retry_stats().failures, 1);
}

#[tokio::test(start_paused = true)]
async fn rate_limit_waits_for_retry_after() {
    let transport = Arc::new(MockTransport::new());
    transport
        .reply(
            Method::GET,
            "/trending",
            MockReply::json(429, json!({"error": "slow down"})).with_header("retry-after", "2"),
        )
        .get("/trending", 200, json!({"topics": ["zoning"]}));
    let manager = manager(&transport, fast_retries(3));

    let start = Instant::now();
    assert_ok!(manager.request("/trending", RequestOptions::get()).await);
    let elapsed = start.elapsed();

    assert_eq!(transport.calls_to("/trending"), 2);
    assert!(elapsed >= Duration::from_secs(2), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(2100), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn network_failures_are_retried() {
    let transport = Arc::new(MockTransport::new());
    transport
        .reply(Method::GET, "/events", MockReply::NetworkError("connection reset".into()))
        .get("/events", 200, json!([]));
    let manager = manager(&transport, fast_retries(2));

    assert_ok!(manager.request("/events", RequestOptions::get()).await);
    assert_eq!(transport.calls_to("/events"), 2);
}

#[tokio::test(start_paused = true)]
async fn failures_are_never_cached() {
    let transport = Arc::new(MockTransport::new());
    transport
        .get("/petitions", 500, json!({"error": "boom"}))
        .get("/petitions", 200, json!({"petitions": []}));
    let manager = manager(&transport, RetryPolicy::no_retry());

    assert_err!(manager.request("/petitions", RequestOptions::get()).await);
    assert_eq!(manager.in_flight(), 0);
    assert_eq!(manager.cache_stats().writes, 0);

    assert_ok!(manager.request("/petitions", RequestOptions::get()).await);
    assert_ok!(manager.request("/petitions", RequestOptions::get()).await);
    assert_eq!(transport.calls_to("/petitions"), 2);
}

#[tokio::test(start_paused = true)]
async fn joined_callers_share_the_failure() {
    let transport = Arc::new(MockTransport::new().with_latency(Duration::from_millis(100)));
    transport.get("/votes", 502, json!({}));
    let manager = manager(&transport, RetryPolicy::no_retry());

    let (a, b) = tokio::join!(
        manager.request("/votes", RequestOptions::get()),
        manager.request("/votes", RequestOptions::get()),
    );

    assert_eq!(assert_err!(a).status(), Some(StatusCode::BAD_GATEWAY));
    assert_eq!(assert_err!(b).status(), Some(StatusCode::BAD_GATEWAY));
    assert_eq!(transport.calls_to("/votes"), 1);
    assert_eq!(manager.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn invalidate_drops_cached_entries() {
    let transport = Arc::new(MockTransport::new());
    transport.get("/feed", 200, json!({"items": []}));
    let manager = manager(&transport, RetryPolicy::default());

    assert_ok!(manager.request("/feed", RequestOptions::get()).await);
    assert_eq!(manager.invalidate("/feed"), 1);
    assert_ok!(manager.request("/feed", RequestOptions::get()).await);
    assert_eq!(transport.calls_to("/feed"), 2);

    manager.clear_cache();
    assert_eq!(manager.cache_stats().entries, 0);
}

#[derive(Debug, Deserialize, PartialEq)]
struct Representative {
    id: u64,
    name: String,
    district: String,
}

#[tokio::test(start_paused = true)]
async fn request_json_decodes_into_types() {
    let transport = Arc::new(MockTransport::new());
    transport.get(
        "/representatives/3",
        200,
        json!({"id": 3, "name": "J. Ortiz", "district": "7th"}),
    );
    let manager = manager(&transport, RetryPolicy::default());

    let rep: Representative = assert_ok!(
        manager
            .request_json("/representatives/3", RequestOptions::get())
            .await
    );
    assert_eq!(rep.district, "7th");

    let err = assert_err!(
        manager
            .request_json::<Vec<Representative>>("/representatives/3", RequestOptions::get())
            .await
    );
    assert!(err.is_decode());
}

#[tokio::test(start_paused = true)]
async fn session_credentials_reach_the_transport() {
    let transport = Arc::new(MockTransport::new());
    transport.reply(Method::POST, "/comments", MockReply::json(201, json!({"id": 1})));
    let session = Arc::new(SessionStore::with_session(
        Session::with_cookie("civix_session=abc").csrf("tok"),
    ));
    let manager = RequestManager::new(
        ClientConfig::for_origin("http://api.test"),
        transport.clone(),
        session,
    )
    .expect("valid test configuration");

    assert_ok!(
        manager
            .request("/comments", RequestOptions::post(json!({"text": "agree"})))
            .await
    );

    let sent = transport.requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].headers["cookie"], "civix_session=abc");
    assert_eq!(sent[0].headers["x-csrf-token"], "tok");
    assert_eq!(sent[0].headers["content-type"], "application/json");
}
