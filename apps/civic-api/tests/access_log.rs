use axum::{
    Router,
    body::{Body, Bytes},
    extract::ConnectInfo,
    http::{Request, StatusCode, header},
    middleware,
    response::Response,
    routing::post,
};
use civic_api::bootstrap::buffer_config;
use civic_api::middleware::access_log::{OVERSIZED_BODY, UNDECODABLE_BODY, access_log};
use civic_api::routes::create_router;
use civic_api::{AccessLogState, AppState};
use civic_auth::JwtManager;
use civic_config::{ApiLogConfig, SkipRoutes};
use civic_pipeline::LogBuffer;
use civic_storage::{InMemoryApiLogStore, InMemoryUserStore, UserRecord, UserStore};
use domain::RequestBody;
use futures::{StreamExt, stream};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    store: Arc<InMemoryApiLogStore>,
    buffer: LogBuffer,
    jwt: Arc<JwtManager>,
}

impl TestApp {
    fn new(config: ApiLogConfig) -> Self {
        let store = Arc::new(InMemoryApiLogStore::new());
        let buffer = LogBuffer::from_store(store.clone(), buffer_config(&config));
        let jwt = Arc::new(JwtManager::new("test-secret".to_string(), 3600));
        let state = AppState {
            jwt: jwt.clone(),
            access_log: AccessLogState::new(Some(buffer.clone()), config),
        };
        Self {
            router: create_router(state),
            store,
            buffer,
            jwt,
        }
    }

    fn immediate() -> Self {
        Self::new(ApiLogConfig {
            max_buffer_size: 1,
            ..ApiLogConfig::default()
        })
    }

    fn token(&self, user_id: &str) -> String {
        self.jwt.issue_access_token(user_id).unwrap()
    }

    async fn send(&self, req: Request<Body>) -> Response {
        self.router.clone().oneshot(req).await.unwrap()
    }
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn password_is_redacted_and_written_at_capacity_one() {
    let app = TestApp::immediate();

    let response = app
        .send(post_json("/api/echo", json!({"password": "x", "note": "y"})))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    // 下游收到的仍是原始请求体
    let echoed = body_json(response).await;
    assert_eq!(echoed["data"], json!({"password": "x", "note": "y"}));

    assert_eq!(app.store.batches(), vec![1]);
    let stored = app.store.records();
    let record = &stored[0].record;
    assert_eq!(
        record.body,
        RequestBody::Json(json!({"password": "***HIDDEN***", "note": "y"}))
    );
    assert_eq!(record.path, "/api/echo");
    assert_eq!(record.method, "POST");
    assert_eq!(record.status_code, 200);
    assert_eq!(record.user_id, None);
    assert_eq!(app.buffer.pending().await, 0);
}

#[tokio::test]
async fn exempt_route_and_method_produce_no_record() {
    let app = TestApp::new(ApiLogConfig {
        max_buffer_size: 1,
        skip_routes: SkipRoutes::new().with_route("/api/pages/:slug", ["GET"]),
        ..ApiLogConfig::default()
    });

    let response = app.send(get("/api/pages/city-council")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_json(response).await;
    assert_eq!(page["data"]["title"], "City Council");

    assert!(app.store.is_empty());
    assert_eq!(app.buffer.pending().await, 0);
}

#[tokio::test]
async fn forwarded_for_first_entry_wins() {
    let app = TestApp::immediate();
    let mut req = Request::builder()
        .uri("/health")
        .header("x-forwarded-for", "200.1.23.3, 10.0.0.1")
        .body(Body::empty())
        .unwrap();
    let peer: SocketAddr = "10.9.9.9:41000".parse().unwrap();
    req.extensions_mut().insert(ConnectInfo(peer));

    app.send(req).await;

    assert_eq!(app.store.records()[0].record.ip_address, "200.1.23.3");
}

#[tokio::test]
async fn peer_address_used_without_forwarded_header() {
    let app = TestApp::immediate();
    let mut req = get("/health");
    let peer: SocketAddr = "10.9.9.9:41000".parse().unwrap();
    req.extensions_mut().insert(ConnectInfo(peer));
    app.send(req).await;
    app.send(get("/health")).await;

    let stored = app.store.records();
    assert_eq!(stored[0].record.ip_address, "10.9.9.9");
    assert_eq!(stored[1].record.ip_address, "");
    // GET 无请求体，记录为空对象
    assert_eq!(stored[0].record.body, RequestBody::Json(json!({})));
}

#[tokio::test]
async fn authenticated_principal_is_recorded() {
    let app = TestApp::immediate();
    let mut req = post_json("/api/echo", json!({"a": 1}));
    req.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {}", app.token("user-7")).parse().unwrap(),
    );
    app.send(req).await;

    let mut bad = post_json("/api/echo", json!({"a": 2}));
    bad.headers_mut()
        .insert(header::AUTHORIZATION, "Bearer not-a-jwt".parse().unwrap());
    let response = app.send(bad).await;
    assert_eq!(response.status(), StatusCode::OK);

    let stored = app.store.records();
    assert_eq!(stored[0].record.user_id.as_deref(), Some("user-7"));
    assert_eq!(stored[1].record.user_id, None);
}

#[tokio::test]
async fn media_admin_and_disabled_requests_are_skipped() {
    let app = TestApp::immediate();
    let response = app.send(get("/media/uploads/logo.png")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let mut admin = get("/admin/status");
    admin.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {}", app.token("admin")).parse().unwrap(),
    );
    let response = app.send(admin).await;
    assert_eq!(response.status(), StatusCode::OK);
    let status = body_json(response).await;
    assert_eq!(status["data"]["apiLogEnabled"], true);
    assert_eq!(status["data"]["apiLogPending"], 0);
    assert!(app.store.is_empty());

    let disabled = TestApp::new(ApiLogConfig {
        max_buffer_size: 1,
        logging_disabled: true,
        ..ApiLogConfig::default()
    });
    let response = disabled
        .send(post_json("/api/echo", json!({"token": "t"})))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(disabled.store.is_empty());
}

#[tokio::test]
async fn missing_buffer_passes_requests_through() {
    let config = ApiLogConfig::default();
    let state = AppState {
        jwt: Arc::new(JwtManager::new("test-secret".to_string(), 3600)),
        access_log: AccessLogState::new(None, config),
    };
    let router = create_router(state);

    let response = router
        .oneshot(post_json("/api/echo", json!({"note": "kept"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["note"], "kept");
}

#[tokio::test]
async fn form_body_is_decoded_and_redacted() {
    let app = TestApp::immediate();
    let req = Request::builder()
        .method("POST")
        .uri("/api/echo")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("username=ana&password=secret"))
        .unwrap();
    let response = app.send(req).await;
    // echo 只接受 JSON，状态码如实记录
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let record = &app.store.records()[0].record;
    assert_eq!(record.status_code, 415);
    assert_eq!(
        record.body,
        RequestBody::Json(json!({"username": "ana", "password": "***HIDDEN***"}))
    );
}

#[tokio::test]
async fn undecodable_body_gets_placeholder() {
    let app = TestApp::immediate();
    let req = Request::builder()
        .method("POST")
        .uri("/api/echo")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("hello there"))
        .unwrap();
    app.send(req).await;

    assert_eq!(
        app.store.records()[0].record.body,
        RequestBody::Undecodable(UNDECODABLE_BODY.to_string())
    );
}

#[tokio::test]
async fn oversized_body_is_forwarded_but_not_captured() {
    let app = TestApp::new(ApiLogConfig {
        max_buffer_size: 1,
        body_capture_limit_bytes: 16,
        ..ApiLogConfig::default()
    });
    let payload = json!({"note": "a body longer than sixteen bytes"});
    let mut req = post_json("/api/echo", payload.clone());
    let len = payload.to_string().len();
    req.headers_mut()
        .insert(header::CONTENT_LENGTH, len.to_string().parse().unwrap());

    let response = app.send(req).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"], payload);
    assert_eq!(
        app.store.records()[0].record.body,
        RequestBody::Undecodable(OVERSIZED_BODY.to_string())
    );
}

#[tokio::test]
async fn unmatched_routes_are_still_recorded() {
    let app = TestApp::immediate();
    let response = app.send(get("/api/unknown")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let record = &app.store.records()[0].record;
    assert_eq!(record.path, "/api/unknown");
    assert_eq!(record.status_code, 404);
}

#[tokio::test]
async fn records_wait_in_buffer_below_capacity() {
    let app = TestApp::new(ApiLogConfig::default());
    for _ in 0..3 {
        app.send(get("/health")).await;
    }
    assert!(app.store.is_empty());
    assert_eq!(app.buffer.pending().await, 3);

    let outcome = app.buffer.flush().await;
    assert_eq!(outcome.written, 3);
    assert_eq!(app.store.batches(), vec![3]);
}

#[tokio::test]
async fn deleting_user_keeps_their_records() {
    let app = TestApp::immediate();
    let users = InMemoryUserStore::new(app.store.clone());
    users
        .create_user(UserRecord {
            user_id: "user-1".to_string(),
            username: "ana".to_string(),
        })
        .await
        .unwrap();

    let token = app.token("user-1");
    for _ in 0..10 {
        let mut req = get("/health");
        req.headers_mut().insert(
            header::AUTHORIZATION,
            format!("Bearer {token}").parse().unwrap(),
        );
        app.send(req).await;
    }
    assert_eq!(app.store.len(), 10);

    assert!(users.delete_user("user-1").await.unwrap());
    let stored = app.store.records();
    assert_eq!(stored.len(), 10);
    assert!(stored.iter().all(|row| row.record.user_id.is_none()));
}

#[tokio::test]
async fn responses_carry_request_ids() {
    let app = TestApp::immediate();
    let response = app.send(get("/health")).await;
    assert!(response.headers().contains_key("x-request-id"));
    assert!(response.headers().contains_key("x-trace-id"));
    assert_eq!(body_json(response).await, json!({"ok": true}));
}

#[tokio::test]
async fn metrics_require_login() {
    let app = TestApp::immediate();
    let response = app.send(get("/metrics")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let mut req = get("/metrics");
    req.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {}", app.token("ops")).parse().unwrap(),
    );
    let response = app.send(req).await;
    assert_eq!(response.status(), StatusCode::OK);
    let snapshot = body_json(response).await;
    assert!(snapshot["data"]["logsEnqueued"].as_u64().unwrap() >= 1);
}

/// 只挂访问日志拦截器、handler 不读请求体的路由。
fn body_ignoring_router(limit: usize) -> (Router, Arc<InMemoryApiLogStore>) {
    let config = ApiLogConfig {
        max_buffer_size: 1,
        body_capture_limit_bytes: limit,
        ..ApiLogConfig::default()
    };
    let store = Arc::new(InMemoryApiLogStore::new());
    let buffer = LogBuffer::from_store(store.clone(), buffer_config(&config));
    let router = Router::new()
        .route("/ignore", post(|| async { "handler-ok" }))
        .layer(middleware::from_fn_with_state(
            AccessLogState::new(Some(buffer), config),
            access_log,
        ));
    (router, store)
}

#[tokio::test]
async fn body_read_error_still_reaches_handler() {
    let (router, store) = body_ignoring_router(1024);
    let chunks = vec![
        Ok(Bytes::from_static(b"abc")),
        Err(std::io::Error::other("client reset")),
    ];
    let req = Request::builder()
        .method("POST")
        .uri("/ignore")
        .body(Body::from_stream(stream::iter(chunks)))
        .unwrap();

    let response = router.oneshot(req).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let text = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(text.as_ref(), b"handler-ok");
    let stored = store.records();
    assert_eq!(stored.len(), 1);
    assert_eq!(
        stored[0].record.body,
        RequestBody::Undecodable(UNDECODABLE_BODY.to_string())
    );
}

#[tokio::test]
async fn chunked_upload_is_not_buffered_past_limit() {
    let (router, store) = body_ignoring_router(16);
    let pulled = Arc::new(AtomicUsize::new(0));
    let counter = pulled.clone();
    let chunks = stream::iter(0..64).map(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok::<_, std::io::Error>(Bytes::from(vec![b'a'; 1024 * 1024]))
    });
    let req = Request::builder()
        .method("POST")
        .uri("/ignore")
        .body(Body::from_stream(chunks))
        .unwrap();

    let response = router.oneshot(req).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(pulled.load(Ordering::SeqCst), 1);
    assert_eq!(
        store.records()[0].record.body,
        RequestBody::Undecodable(OVERSIZED_BODY.to_string())
    );
}

#[tokio::test]
async fn chunked_oversized_body_reaches_handler_intact() {
    let app = TestApp::new(ApiLogConfig {
        max_buffer_size: 1,
        body_capture_limit_bytes: 16,
        ..ApiLogConfig::default()
    });
    let chunks = vec![
        Ok::<_, std::io::Error>(Bytes::from_static(b"{\"note\": ")),
        Ok(Bytes::from_static(b"\"a body longer than ")),
        Ok(Bytes::from_static(b"sixteen bytes\"}")),
    ];
    let req = Request::builder()
        .method("POST")
        .uri("/api/echo")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from_stream(stream::iter(chunks)))
        .unwrap();

    let response = app.send(req).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["data"],
        json!({"note": "a body longer than sixteen bytes"})
    );
    assert_eq!(
        app.store.records()[0].record.body,
        RequestBody::Undecodable(OVERSIZED_BODY.to_string())
    );
}

#[tokio::test]
async fn media_root_is_skipped() {
    let app = TestApp::immediate();
    let response = app.send(get("/media")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(app.store.is_empty());
}
