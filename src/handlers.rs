use crate::{
    AppState,
    error::ApiError,
    models::{
        CreateOrderRequest, FieldOrder, MessageResponse, Order, PageParams, UpdateOrderRequest,
        incorrect_fields,
    },
};
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use validator::Validate;

/// Smallest and largest accepted `page_size`.
pub const MIN_PAGE_SIZE: i64 = 5;
pub const MAX_PAGE_SIZE: i64 = 10;

// --- Request Parsing Helpers ---

/// Parses the `{id}` path segment. Runs before the service is touched.
fn parse_id(raw: &str) -> Result<i32, ApiError> {
    raw.parse::<i32>().map_err(|_| {
        tracing::info!(id = raw, "rejected non-integer order id");
        ApiError::MalformedRequest(format!("invalid order id: {raw:?}"))
    })
}

fn required_number(name: &str, value: Option<&str>) -> Result<i64, ApiError> {
    let value = value.ok_or_else(|| ApiError::MalformedRequest(format!("{name} is required")))?;
    value
        .parse::<i64>()
        .map_err(|_| ApiError::MalformedRequest(format!("{name} must be an integer")))
}

/// pagination
///
/// Turns `page_id` / `page_size` into `(limit, offset)`.
/// `page_id` must be at least 1 and `page_size` within
/// [`MIN_PAGE_SIZE`, `MAX_PAGE_SIZE`].
pub fn pagination(params: &PageParams) -> Result<(i64, i64), ApiError> {
    let page_id = required_number("page_id", params.page_id.as_deref())?;
    let page_size = required_number("page_size", params.page_size.as_deref())?;

    if page_id < 1 {
        return Err(ApiError::MalformedRequest(
            "page_id must be greater than or equal to 1".to_string(),
        ));
    }
    if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(ApiError::MalformedRequest(format!(
            "page_size must be between {MIN_PAGE_SIZE} and {MAX_PAGE_SIZE}"
        )));
    }

    let offset = (page_id - 1)
        .checked_mul(page_size)
        .ok_or_else(|| ApiError::MalformedRequest("page_id is too large".to_string()))?;
    Ok((page_size, offset))
}

/// Decodes and validates a JSON body, producing the 400 variants on failure.
fn validated<T: Validate + FieldOrder>(
    payload: Result<Json<T>, JsonRejection>,
) -> Result<T, ApiError> {
    let Json(payload) = payload.map_err(|rejection| {
        tracing::info!(error = %rejection, "could not decode order payload");
        ApiError::MalformedRequest(rejection.body_text())
    })?;

    payload.validate().map_err(|errors| {
        tracing::info!(error = %errors, "order payload failed validation");
        ApiError::ValidationFailed(incorrect_fields::<T>(&errors))
    })?;

    Ok(payload)
}

// --- Handlers ---

/// get_order
///
/// Retrieves a single order by id.
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = i32, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Found", body = Order),
        (status = 400, description = "Invalid id", body = MessageResponse),
        (status = 404, description = "Not Found", body = MessageResponse),
        (status = 500, description = "Store failure", body = MessageResponse)
    )
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let id = parse_id(&raw_id)?;
    let order = state.orders.get_order(id).await?;
    Ok(Json(order))
}

/// list_orders
///
/// Lists one page of orders. Always returns an array, empty past the last page.
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(PageParams),
    responses(
        (status = 200, description = "One page of orders", body = [Order]),
        (status = 400, description = "Missing or out-of-range paging parameters", body = MessageResponse),
        (status = 500, description = "Store failure", body = MessageResponse)
    )
)]
pub async fn list_orders(
    State(state): State<AppState>,
    query: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let Query(params) = query.map_err(|rejection| ApiError::MalformedRequest(rejection.body_text()))?;
    let (limit, offset) = pagination(&params)?;
    let orders = state.orders.list_orders(limit, offset).await?;
    Ok(Json(orders))
}

/// create_order
///
/// Creates an order. The store assigns the id and, when `create_at` is
/// absent, the creation timestamp.
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Created", body = Order),
        (status = 400, description = "Undecodable body or invalid fields", body = MessageResponse),
        (status = 500, description = "Store failure", body = MessageResponse)
    )
)]
pub async fn create_order(
    State(state): State<AppState>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let request = validated(payload)?;
    let order = state.orders.create_order(request.into()).await?;
    tracing::info!(id = order.id, "order created");
    Ok((StatusCode::CREATED, Json(order)))
}

/// update_order
///
/// Replaces the description and state of an existing order.
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}",
    params(("id" = i32, Path, description = "Order ID")),
    request_body = UpdateOrderRequest,
    responses(
        (status = 200, description = "Updated", body = Order),
        (status = 400, description = "Invalid id, body or fields", body = MessageResponse),
        (status = 404, description = "Not Found", body = MessageResponse),
        (status = 500, description = "Store failure", body = MessageResponse)
    )
)]
pub async fn update_order(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    payload: Result<Json<UpdateOrderRequest>, JsonRejection>,
) -> Result<Json<Order>, ApiError> {
    let id = parse_id(&raw_id)?;
    let request = validated(payload)?;
    let order = state.orders.update_order(id, request.into()).await?;
    Ok(Json(order))
}

/// delete_order
///
/// Deletes an order. A second delete of the same id answers 404.
#[utoipa::path(
    delete,
    path = "/api/v1/orders/{id}",
    params(("id" = i32, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 400, description = "Invalid id", body = MessageResponse),
        (status = 404, description = "Not Found", body = MessageResponse),
        (status = 500, description = "Store failure", body = MessageResponse)
    )
)]
pub async fn delete_order(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&raw_id)?;
    state.orders.delete_order(id).await?;
    tracing::info!(id, "order deleted");
    Ok(Json(MessageResponse::new("Successfully Deleted")))
}

/// health
///
/// Liveness plus a store round-trip. Never behind auth.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Store reachable", body = MessageResponse),
        (status = 503, description = "Store unreachable", body = MessageResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> Result<Json<MessageResponse>, ApiError> {
    state.orders.health().await?;
    Ok(Json(MessageResponse::new("ok")))
}
