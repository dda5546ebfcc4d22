use std::sync::Arc;
use std::time::Duration;

use civix_client::prelude::*;
use civix_client::testing::{MockReply, MockTransport};
use serde_json::json;

fn manager(transport: &Arc<MockTransport>) -> RequestManager {
    let mut config = ClientConfig::for_origin("http://api.test");
    config.retry = RetryPolicy::no_retry();
    RequestManager::new(config, transport.clone(), Arc::new(SessionStore::new()))
        .expect("valid test configuration")
}

#[tokio::test(start_paused = true)]
async fn batch_reports_partial_success() {
    let transport = Arc::new(MockTransport::new().with_latency(Duration::from_millis(20)));
    transport
        .get("/users/1", 200, json!({"id": 1}))
        .get("/users/2", 500, json!({"error": "boom"}))
        .get("/feed", 200, json!({"items": []}));
    let manager = manager(&transport);

    let response = manager
        .batch([
            BatchRequest::new("/users/1").with_id("alice"),
            BatchRequest::new("/users/2").with_id("bob"),
            BatchRequest::new("/feed"),
        ])
        .await;

    assert_eq!(response.len(), 3);
    assert_eq!(response.get("alice").unwrap().as_ref().unwrap()["id"], 1);
    assert!(response.get("bob").unwrap().as_ref().unwrap_err().is_server_error());
    assert!(response.get("/feed").unwrap().is_ok());
    assert_eq!(response.successes().count(), 2);
    assert_eq!(response.failures().map(|(key, _)| key).collect::<Vec<_>>(), vec!["bob"]);
}

#[tokio::test(start_paused = true)]
async fn batch_serves_cached_entries_without_network() {
    let transport = Arc::new(MockTransport::new());
    transport
        .get("/feed", 200, json!({"items": [1]}))
        .get("/notifications", 200, json!([]));
    let manager = manager(&transport);

    manager
        .request("/feed", RequestOptions::get())
        .await
        .expect("warm the cache");

    let response = manager
        .batch([
            BatchRequest::new("/feed"),
            BatchRequest::new("/notifications"),
        ])
        .await;

    assert!(response.get("/feed").unwrap().is_ok());
    assert!(response.get("/notifications").unwrap().is_ok());
    assert_eq!(transport.calls_to("/feed"), 1);
    assert_eq!(transport.calls_to("/notifications"), 1);

    let refreshed = manager
        .batch([BatchRequest::new("/feed").options(RequestOptions::get().bypass_cache())])
        .await;
    assert!(refreshed.get("/feed").unwrap().is_ok());
    assert_eq!(transport.calls_to("/feed"), 2);
}

#[tokio::test(start_paused = true)]
async fn batch_entries_share_in_flight_requests() {
    let transport = Arc::new(MockTransport::new().with_latency(Duration::from_millis(50)));
    transport.reply(Method::GET, "/districts", MockReply::json(200, json!(["7th"])));
    let manager = manager(&transport);

    let response = manager
        .batch([
            BatchRequest::new("/districts").with_id("a"),
            BatchRequest::new("/districts").with_id("b"),
        ])
        .await;

    assert_eq!(response.successes().count(), 2);
    assert_eq!(transport.calls_to("/districts"), 1);
}
