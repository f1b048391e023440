use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints reachable without a bearer token regardless of configuration.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Used by load balancers and orchestration probes. Answers 503 when
        // the order store cannot be reached.
        .route("/health", get(handlers::health))
}
