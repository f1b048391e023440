use axum::{Router, body::Body, http::Request, routing::get};
use order_service::{
    AppConfig, AppState, create_router,
    models::{MessageResponse, Order},
    repository::InMemoryOrderStore,
    request_timeout, serve,
    service::OrderManager,
};
use std::{sync::Arc, time::Duration};
use tower::ServiceExt;
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};

pub struct TestApp {
    pub address: String,
    pub store: Arc<InMemoryOrderStore>,
    shutdown: oneshot::Sender<()>,
    server: JoinHandle<std::io::Result<()>>,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }
}

async fn spawn_app() -> TestApp {
    let store = Arc::new(InMemoryOrderStore::new());
    let state = AppState {
        orders: Arc::new(OrderManager::new(store.clone())),
        config: AppConfig::default(),
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let (shutdown, signal) = oneshot::channel::<()>();
    let server = tokio::spawn(serve(listener, router, async move {
        let _ = signal.await;
    }));

    TestApp {
        address,
        store,
        shutdown,
        server,
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = reqwest::get(app.url("/health")).await.expect("req fail");

    assert_eq!(response.status(), 200);
    let body: MessageResponse = response.json().await.unwrap();
    assert_eq!(body.message, "ok");
}

#[tokio::test]
async fn test_order_lifecycle() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // Create
    let response = client
        .post(app.url("/api/v1/orders"))
        .json(&serde_json::json!({ "description": "ten chairs", "state": 1 }))
        .send()
        .await
        .expect("post fail");
    assert_eq!(response.status(), 201);
    assert_eq!(
        response.headers()["content-type"],
        "application/json",
        "uniform content type"
    );
    assert!(response.headers().contains_key("x-request-id"));
    let created: Order = response.json().await.unwrap();
    assert_ne!(created.id, 0);

    // Read
    let fetched: Order = client
        .get(app.url(&format!("/api/v1/orders/{}", created.id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched, created);

    // Update (create_at in the body is ignored)
    let response = client
        .put(app.url(&format!("/api/v1/orders/{}", created.id)))
        .json(&serde_json::json!({
            "description": "twelve chairs", "state": 2, "create_at": "01/01/2000 00:00:00"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let updated: Order = response.json().await.unwrap();
    assert_eq!(updated.description, "twelve chairs");
    assert_eq!(updated.created_at, created.created_at);

    // Delete twice
    let url = app.url(&format!("/api/v1/orders/{}", created.id));
    let first = client.delete(&url).send().await.unwrap();
    assert_eq!(first.status(), 200);
    let body: MessageResponse = first.json().await.unwrap();
    assert_eq!(body.message, "Successfully Deleted");

    let second = client.delete(&url).send().await.unwrap();
    assert_eq!(second.status(), 404);

    let gone = client.get(&url).send().await.unwrap();
    assert_eq!(gone.status(), 404);
}

#[tokio::test]
async fn test_wire_format_uses_create_at_key() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let body: serde_json::Value = client
        .post(app.url("/api/v1/orders"))
        .json(&serde_json::json!({
            "description": "stamped", "state": 4, "create_at": "15/08/2023 14:30:00"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["create_at"], "15/08/2023 14:30:00");
    assert_eq!(body["state"], 4);
    assert!(body.get("created_at").is_none());
}

#[tokio::test]
async fn test_bad_requests() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // Undecodable body
    let response = client
        .post(app.url("/api/v1/orders"))
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // Missing content type is still a malformed request
    let response = client
        .post(app.url("/api/v1/orders"))
        .body(r#"{"description":"x","state":1}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // Field validation
    let response = client
        .post(app.url("/api/v1/orders"))
        .json(&serde_json::json!({ "description": "x", "state": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: MessageResponse = response.json().await.unwrap();
    assert_eq!(body.message, "Incorrect fields: state|");

    // Non-integer id
    let response = client.get(app.url("/api/v1/orders/abc")).send().await.unwrap();
    assert_eq!(response.status(), 400);

    // Paging
    for query in [
        "page_id=0&page_size=5",
        "page_id=1&page_size=3",
        "page_id=1&page_size=11",
        "page_size=5",
        "page_id=1",
        "",
    ] {
        let response = client
            .get(app.url(&format!("/api/v1/orders?{query}")))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400, "query {query:?}");
    }

    assert_eq!(app.store.calls(), 0, "no bad request reaches the store");
}

#[tokio::test]
async fn test_list_returns_empty_array_not_null() {
    let app = spawn_app().await;
    let response = reqwest::get(app.url("/api/v1/orders?page_id=1&page_size=5"))
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "[]");
}

#[tokio::test]
async fn test_unmatched_route_is_empty_404() {
    let app = spawn_app().await;
    let response = reqwest::get(app.url("/api/v2/orders")).await.unwrap();

    assert_eq!(response.status(), 404);
    assert!(response.text().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_graceful_shutdown() {
    let app = spawn_app().await;
    let health = app.url("/health");
    let response = reqwest::get(&health).await.unwrap();
    assert_eq!(response.status(), 200);
    drop(response);

    app.shutdown.send(()).unwrap();
    let result = app.server.await.expect("server task panicked");
    assert!(result.is_ok());

    assert!(reqwest::get(&health).await.is_err());
}

#[tokio::test]
async fn test_slow_request_is_gateway_timeout() {
    let router = Router::new()
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                "late"
            }),
        )
        .layer(request_timeout(Duration::from_millis(20)));

    let response = router
        .oneshot(Request::get("/slow").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), 504);
}
