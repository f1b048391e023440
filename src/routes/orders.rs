use crate::{AppState, handlers};
use axum::{
    Router,
    routing::get,
};

/// Order Router Module
///
/// Maps the five order operations onto `/api/v1/orders`. Anything else under
/// the prefix falls through to the application-wide 404 fallback.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        // GET /api/v1/orders?page_id=..&page_size=..
        // POST /api/v1/orders
        .route(
            "/orders",
            get(handlers::list_orders).post(handlers::create_order),
        )
        // GET/PUT/DELETE /api/v1/orders/{id}
        // The id is parsed by the handler so that a non-integer answers 400.
        .route(
            "/orders/{id}",
            get(handlers::get_order)
                .put(handlers::update_order)
                .delete(handlers::delete_order),
        )
}
