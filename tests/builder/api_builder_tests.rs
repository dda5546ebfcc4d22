use std::sync::Arc;
use std::time::Duration;

use civix::testing::{MockConnector, MockReply, MockTransport};
use civix::{ApiBuilder, Civix, ClientConfig, Method, MessagingClient, RequestManager, Session, SessionStore};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

fn setup() -> (Arc<MockTransport>, Civix) {
    let transport = Arc::new(MockTransport::new());
    let session = Arc::new(SessionStore::new());
    let config = ClientConfig::for_origin("http://api.test");
    let manager = RequestManager::new(config.clone(), transport.clone(), Arc::clone(&session))
        .expect("valid test configuration");
    let messaging = MessagingClient::new(&config, Arc::clone(&session), Arc::new(MockConnector::accepting()))
        .expect("valid test configuration");
    (transport, Civix::from_parts(session, manager, messaging))
}

#[derive(Debug, Deserialize, PartialEq)]
struct Post {
    id: u64,
    title: String,
}

#[derive(Serialize)]
struct NewPost<'a> {
    title: &'a str,
}

#[tokio::test(start_paused = true)]
async fn get_decodes_and_caches() {
    let (transport, civix) = setup();
    transport.get("/posts/1", 200, json!({"id": 1, "title": "Budget hearing"}));

    let post: Post = assert_ok!(civix.api().get("/posts/1").await);
    assert_eq!(post.title, "Budget hearing");

    let again: Post = assert_ok!(civix.api().get("/posts/1").await);
    assert_eq!(again, post);
    assert_eq!(transport.calls_to("/posts/1"), 1);

    let _: Post = assert_ok!(civix.api().bypass_cache().get("/posts/1").await);
    assert_eq!(transport.calls_to("/posts/1"), 2);
}

#[tokio::test(start_paused = true)]
async fn body_methods_send_json() {
    let (transport, civix) = setup();
    transport.reply(
        Method::POST,
        "/posts",
        MockReply::json(201, json!({"id": 9, "title": "Bike lanes"})),
    );

    let created: Post = assert_ok!(
        civix
            .api()
            .header_str("x-client-build", "412")
            .body(&NewPost { title: "Bike lanes" })
            .post("/posts")
            .await
    );
    assert_eq!(created.id, 9);

    let sent = transport.requests();
    assert_eq!(sent[0].method, Method::POST);
    assert_eq!(sent[0].json_body(), Some(json!({"title": "Bike lanes"})));
    assert_eq!(sent[0].headers["x-client-build"], "412");
}

#[tokio::test(start_paused = true)]
async fn explicit_credentials_override_the_session() {
    let (transport, civix) = setup();
    civix.session().set(Session::with_token("session-token"));
    transport.get("/auth/me", 200, json!({"id": 1, "title": "me"}));

    let _: Post = assert_ok!(civix.api().bearer_auth("override").get("/auth/me").await);
    assert_eq!(transport.requests()[0].headers["authorization"], "Bearer override");
}

#[tokio::test(start_paused = true)]
async fn decode_failures_name_the_endpoint() {
    let (transport, civix) = setup();
    transport.get("/posts/2", 200, json!({"unexpected": true}));

    let err = assert_err!(civix.api().get::<Post>("/posts/2").await);
    assert!(err.is_decode());
    assert_eq!(err.endpoint(), Some("/posts/2"));
}

#[tokio::test(start_paused = true)]
async fn cache_timeout_applies_per_request() {
    let (transport, civix) = setup();
    transport.get("/feed", 200, json!([]));

    assert_ok!(civix.api().cache_timeout(Duration::from_millis(100)).fetch("/feed").await);
    tokio::time::advance(Duration::from_millis(150)).await;
    assert_ok!(civix.api().fetch("/feed").await);
    assert_eq!(transport.calls_to("/feed"), 2);
}

#[tokio::test(start_paused = true)]
async fn sign_in_connects_and_sign_out_clears_state() {
    let (transport, civix) = setup();
    transport.get("/feed", 200, json!([]));
    assert_ok!(civix.api().fetch("/feed").await);

    civix.sign_in(Session::with_token("t"));
    let mut states = civix.messaging().watch_state();
    assert_ok!(
        states
            .wait_for(|state| state.is_connected())
            .await
            .map(|_| ())
    );

    civix.sign_out();
    assert!(!civix.messaging().state().is_connected());
    assert!(civix.session().get().is_none());
    assert_eq!(civix.manager().cache_stats().entries, 0);
}

#[test]
fn builder_exposes_accumulated_options() {
    let (_, civix) = setup();
    let builder = ApiBuilder::new(civix.manager())
        .bypass_cache()
        .skip_content_type()
        .csrf_token("abc");

    assert!(builder.options().bypass_cache);
    assert!(builder.options().skip_content_type);
    assert_eq!(builder.options().headers["x-csrf-token"], "abc");
}
