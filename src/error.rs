use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{models::MessageResponse, service::OrderError};

/// ApiError
///
/// The HTTP-facing error taxonomy. Every variant renders as
/// `{"message": ...}` with its status code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("no orders found")]
    NotFound,
    /// Body decoded but one or more fields broke a rule. Carries the
    /// `Incorrect fields: ...` message.
    #[error("{0}")]
    ValidationFailed(String),
    /// Unparseable path id, query string or body.
    #[error("{0}")]
    MalformedRequest(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("internal server error")]
    Internal,
    #[error("service unavailable")]
    Unavailable,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::ValidationFailed(_) | ApiError::MalformedRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Handlers only distinguish "not found" from everything else; all other
/// service failures become a 500 without detail.
impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::NotFound => ApiError::NotFound,
            OrderError::Unavailable => ApiError::Unavailable,
            _ => ApiError::Internal,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(MessageResponse::new(self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_errors_map_to_coarse_statuses() {
        assert_eq!(ApiError::from(OrderError::NotFound).status_code(), StatusCode::NOT_FOUND);
        for err in [
            OrderError::GetFailed,
            OrderError::ListFailed,
            OrderError::CreateFailed,
            OrderError::UpdateFailed,
            OrderError::DeleteFailed,
        ] {
            assert_eq!(ApiError::from(err), ApiError::Internal);
        }
    }

    #[test]
    fn bad_requests_share_status() {
        assert_eq!(
            ApiError::ValidationFailed("Incorrect fields: state|".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::MalformedRequest("invalid order id".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
