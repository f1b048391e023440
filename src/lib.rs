use axum::{
    Router,
    extract::FromRef,
    http::{HeaderName, HeaderValue, StatusCode, header},
    middleware,
};
use std::{future::Future, io, time::Duration};
use tokio::{net::TcpListener, sync::oneshot, task::JoinError};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application layers, leaf-first: model, store, service, HTTP.
pub mod models;
pub mod repository;
pub mod service;
pub mod error;
pub mod auth;
pub mod handlers;
pub mod config;

// Route tables split by access level.
pub mod routes;
use routes::{orders, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use repository::{InMemoryOrderStore, OrderStoreState, PostgresOrderStore};
pub use service::{OrderManager, OrderServiceState};

/// Upper bound on the time a single request may take before it is answered with 504.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// How long in-flight requests get to finish once shutdown starts.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(15);

/// ApiDoc
///
/// OpenAPI document for the order API, served at `/api-docs/openapi.json`
/// and rendered by the Swagger UI at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_order, handlers::list_orders, handlers::create_order,
        handlers::update_order, handlers::delete_order, handlers::health
    ),
    components(
        schemas(
            models::Order, models::CreateOrderRequest, models::UpdateOrderRequest,
            models::MessageResponse,
        )
    ),
    tags(
        (name = "orders", description = "Order CRUD API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The immutable container shared by every request: the order service and the
/// loaded configuration. Built once by `main` (store, then service, then state).
#[derive(Clone)]
pub struct AppState {
    /// Service Layer: order operations over the injected store.
    pub orders: OrderServiceState,
    /// Configuration: consulted by the auth middleware for the token secret.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for OrderServiceState {
    fn from_ref(app_state: &AppState) -> OrderServiceState {
        app_state.orders.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routing table, applies the auth gate when enabled and wraps
/// everything in the cross-cutting layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let mut order_routes = orders::order_routes();
    if state.config.auth_enabled {
        // route_layer: unmatched paths still fall through to 404, not 401.
        order_routes = order_routes.route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));
    }

    let api = Router::new()
        .nest("/api/v1", order_routes)
        .merge(public::public_routes())
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        ));

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api)
        .fallback(|| async { StatusCode::NOT_FOUND })
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(request_timeout(REQUEST_TIMEOUT))
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// Answers 504 Gateway Timeout and drops the handler future once `limit` elapses.
pub fn request_timeout(limit: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::GATEWAY_TIMEOUT, limit)
}

/// trace_span_logger
///
/// Access-log span for every request, correlated by `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}

/// serve
///
/// Runs the server until `shutdown` resolves, then stops accepting
/// connections and waits up to [`SHUTDOWN_GRACE`] for in-flight requests.
/// After that it returns without waiting further. Connections still open at
/// that point are left running and go away when the runtime is dropped.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = stop_rx.await;
    });
    let mut server = tokio::spawn(async move { server.await });

    tokio::select! {
        result = &mut server => return joined(result),
        () = shutdown => tracing::info!("shutdown signal received, draining in-flight requests"),
    }

    let _ = stop_tx.send(());
    match tokio::time::timeout(SHUTDOWN_GRACE, &mut server).await {
        Ok(result) => joined(result),
        Err(_) => {
            tracing::warn!(
                grace_secs = SHUTDOWN_GRACE.as_secs(),
                "grace period elapsed, leaving remaining connections to the runtime"
            );
            server.abort();
            Ok(())
        }
    }
}

fn joined(result: Result<io::Result<()>, JoinError>) -> io::Result<()> {
    result.map_err(io::Error::other)?
}
