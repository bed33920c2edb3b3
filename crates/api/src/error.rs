//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use order_store::OrderStoreError;
use saga::SagaError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// The gateway did not attach an identity.
    Unauthorized(String),
    /// Saga operation error.
    Saga(SagaError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Saga(err) => saga_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn saga_error_to_response(err: SagaError) -> (StatusCode, String) {
    let status = match &err {
        SagaError::NoPartsSpecified => StatusCode::BAD_REQUEST,
        SagaError::PartNotFound { .. } | SagaError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        SagaError::PartOutOfStock(_)
        | SagaError::OrderCannotBePaid { .. }
        | SagaError::OrderCannotBeCancelled { .. } => StatusCode::CONFLICT,
        SagaError::PaymentFailed(_) => StatusCode::BAD_GATEWAY,
        SagaError::Store(OrderStoreError::NotFound(_)) => StatusCode::NOT_FOUND,
        SagaError::Store(
            OrderStoreError::StatusMismatch { .. } | OrderStoreError::InvalidTransition(_),
        ) => StatusCode::CONFLICT,
        SagaError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
    }

    (status, err.to_string())
}

impl From<SagaError> for ApiError {
    fn from(err: SagaError) -> Self {
        ApiError::Saga(err)
    }
}

#[cfg(test)]
mod tests {
    use common::{OrderId, PartId};
    use domain::OrderStatus;

    use super::*;

    fn status_of(err: SagaError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_saga_error_mapping() {
        let order_id = OrderId::new();
        assert_eq!(status_of(SagaError::NoPartsSpecified), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(SagaError::OrderNotFound(order_id)), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(SagaError::PartNotFound {
                part_id: PartId::from("P9"),
                reason: "not found".to_string(),
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(SagaError::PartOutOfStock(PartId::from("P0"))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(SagaError::OrderCannotBePaid {
                order_id,
                status: OrderStatus::Paid,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(SagaError::PaymentFailed("declined".to_string())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(SagaError::Store(OrderStoreError::Unavailable("down".to_string()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_client_errors() {
        assert_eq!(
            ApiError::BadRequest("bad".to_string()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Unauthorized("who".to_string()).into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
