use async_trait::async_trait;
use bridge_desktop::{ReqwestHttpClient, RouterLocation};
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::navigation::Location;
use core_auth::{AuthError, Authorizer};
use core_connection::{
    ConnectionError, ConnectionRegistry, FileDescriptor, RequestConfig, ResponseData,
};
use core_runtime::events::{ConnectionEvent, CoreEvent, EventBus};
use mockall::mock;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mock! {
    Auth {}

    #[async_trait]
    impl Authorizer for Auth {
        async fn authorize(&self, redirect_uri: &str) -> core_auth::Result<String>;
    }
}

/// Transport that never answers.
struct HangingHttp;

#[async_trait]
impl HttpClient for HangingHttp {
    async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
        std::future::pending().await
    }
}

fn location(pathname: &str) -> Arc<RouterLocation> {
    Arc::new(RouterLocation::new(Location {
        href: format!("https://app.example.com{}", pathname),
        pathname: pathname.to_string(),
    }))
}

#[tokio::test]
async fn test_send_through_base_url_with_camel_case() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/jobs"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 1,
            "items": [{ "job_id": 5, "input_file": { "file_name": "a.csv" } }]
        })))
        .mount(&server)
        .await;

    let registry = ConnectionRegistry::new(
        &format!("{}/api", server.uri()),
        Arc::new(ReqwestHttpClient::new()),
        location("/jobs"),
    )
    .unwrap();

    let response = registry
        .send(RequestConfig::get("/jobs").query("page", "2"))
        .await
        .unwrap();

    assert_eq!(
        response.data,
        ResponseData::Json(json!({
            "totalCount": 1,
            "items": [{ "jobId": 5, "inputFile": { "fileName": "a.csv" } }]
        }))
    );
    assert!(registry.contains_key("/jobs"));
}

#[tokio::test]
async fn test_bearer_token_on_every_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "user_name": "ana" })))
        .expect(2)
        .mount(&server)
        .await;

    let mut auth = MockAuth::new();
    auth.expect_authorize()
        .withf(|uri: &str| uri == "https://app.example.com/profile")
        .times(2)
        .returning(|_| Ok("tok".to_string()));

    let registry = ConnectionRegistry::new(
        &server.uri(),
        Arc::new(ReqwestHttpClient::new()),
        location("/profile"),
    )
    .unwrap()
    .with_authorizer(Arc::new(auth));

    for _ in 0..2 {
        let response = registry.send(RequestConfig::get("/me")).await.unwrap();
        assert_eq!(response.json::<serde_json::Value>().unwrap()["userName"], "ana");
    }
}

#[tokio::test]
async fn test_unauthenticated_request_never_reaches_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut auth = MockAuth::new();
    auth.expect_authorize()
        .returning(|_| Err(AuthError::NotAuthenticated));

    let registry = ConnectionRegistry::new(
        &server.uri(),
        Arc::new(ReqwestHttpClient::new()),
        location("/"),
    )
    .unwrap()
    .with_authorizer(Arc::new(auth));

    let error = registry.send(RequestConfig::get("/me")).await.unwrap_err();
    assert!(matches!(error, ConnectionError::Unauthorized(_)));
}

#[tokio::test]
async fn test_error_response_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/jobs"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "detail": "Name is required" })),
        )
        .mount(&server)
        .await;

    let registry = ConnectionRegistry::new(
        &server.uri(),
        Arc::new(ReqwestHttpClient::new()),
        location("/jobs"),
    )
    .unwrap();

    let error = registry
        .send(RequestConfig::post("/jobs").json(&json!({})).unwrap())
        .await
        .unwrap_err();

    assert_eq!(error.status(), Some(400));
    assert_eq!(error.user_message(), "Name is required");
}

#[tokio::test]
async fn test_abort_cancels_in_flight_request() {
    let registry = Arc::new(
        ConnectionRegistry::new("https://api.example.com", Arc::new(HangingHttp), location("/jobs"))
            .unwrap(),
    );

    let pending = {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move { registry.send_with_key(RequestConfig::get("/slow"), "view").await })
    };

    // Wait until the request has registered its entry.
    while !registry.contains_key("view") {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert!(registry.abort_and_delete("view"));

    let result = tokio::time::timeout(Duration::from_secs(5), pending)
        .await
        .expect("request should finish after abort")
        .unwrap();
    assert!(matches!(result, Err(ConnectionError::Cancelled)));
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_aborted_key_gets_fresh_entry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let registry = ConnectionRegistry::new(
        &server.uri(),
        Arc::new(ReqwestHttpClient::new()),
        location("/jobs"),
    )
    .unwrap();

    let first = registry.get("view");
    registry.abort_and_delete("view");

    let response = registry
        .send_with_key(RequestConfig::get("/ping"), "view")
        .await
        .unwrap();

    assert_eq!(response.data, ResponseData::Raw("ok".into()));
    assert!(first.is_cancelled());
    assert!(!registry.get("view").is_cancelled());
}

#[tokio::test]
async fn test_upload_config_through_registry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/projects/3/files"))
        .and(header("content-range", "bytes=0-4/4"))
        .and(header_exists("content-type"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "file_id": 11 })))
        .mount(&server)
        .await;

    let registry = ConnectionRegistry::new(
        &server.uri(),
        Arc::new(ReqwestHttpClient::new()),
        location("/projects/3"),
    )
    .unwrap();

    let file = FileDescriptor::new("a.txt", &b"abcd"[..]);
    let response = registry
        .send(ConnectionRegistry::build_upload_config(&file, "/projects/3/files"))
        .await
        .unwrap();

    assert_eq!(response.status, 201);
    assert_eq!(response.data, ResponseData::Json(json!({ "fileId": 11 })));

    let received = server.received_requests().await.unwrap();
    let content_type = received[0]
        .headers
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("multipart/form-data; boundary="));
}

#[tokio::test]
async fn test_registry_emits_connection_events() {
    let bus = EventBus::new(16);
    let mut events = bus.subscribe();

    let registry = ConnectionRegistry::new(
        "https://api.example.com",
        Arc::new(HangingHttp),
        location("/jobs"),
    )
    .unwrap()
    .with_event_bus(bus);

    let entry = registry.get("/jobs");
    registry.get("/jobs");
    registry.abort_and_delete("/jobs");

    let created = events.recv().await.unwrap();
    assert_eq!(
        created,
        CoreEvent::Connection(ConnectionEvent::Created {
            key: "/jobs".to_string(),
            connection_id: entry.id().to_string(),
        })
    );

    let aborted = events.recv().await.unwrap();
    assert_eq!(
        aborted,
        CoreEvent::Connection(ConnectionEvent::Aborted {
            key: "/jobs".to_string(),
            connection_id: entry.id().to_string(),
        })
    );
}
