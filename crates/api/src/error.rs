//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use commit::{CommitError, ErrorCode};
use order_store::StoreError;
use serde_json::{Value, json};
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
///
/// Every error renders as `{"error": {"type", "code", "data"}}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed path or body.
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Commit(#[from] CommitError),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Commit(CommitError::Store(err))
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Commit(err) => commit_status(err),
        }
    }

    fn body(&self) -> Value {
        match self {
            ApiError::BadRequest(message) => json!({
                "type": "validation",
                "code": "bad_request",
                "data": { "message": message },
            }),
            ApiError::Commit(err) => match err.failure() {
                Some(failure) => json!({
                    "type": err.error_type(),
                    "code": failure.code,
                    "data": failure.data,
                }),
                None => json!({
                    "type": err.error_type(),
                    "code": fallback_code(err),
                    "data": { "message": err.to_string() },
                }),
            },
        }
    }
}

fn commit_status(err: &CommitError) -> StatusCode {
    match err {
        CommitError::Validation(failure) if failure.code == ErrorCode::InvalidState => {
            StatusCode::CONFLICT
        }
        CommitError::Validation(_) => StatusCode::BAD_REQUEST,
        CommitError::Processing(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CommitError::OrderNotFound(_) | CommitError::OfferNotFound(_) => StatusCode::NOT_FOUND,
        CommitError::Gateway { .. } => StatusCode::BAD_GATEWAY,
        CommitError::Store(StoreError::ConcurrencyConflict { .. }) => StatusCode::CONFLICT,
        CommitError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn fallback_code(err: &CommitError) -> &'static str {
    match err {
        CommitError::OrderNotFound(_) => "order_not_found",
        CommitError::OfferNotFound(_) => "offer_not_found",
        CommitError::Gateway { .. } => "gateway_error",
        CommitError::Store(StoreError::ConcurrencyConflict { .. }) => "concurrency_conflict",
        _ => "internal_error",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = json!({ "error": self.body() });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::OrderId;

    #[test]
    fn test_invalid_state_is_conflict() {
        let err = ApiError::from(CommitError::validation(ErrorCode::InvalidState));
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.body()["code"], "invalid_state");
        assert_eq!(err.body()["type"], "validation");
    }

    #[test]
    fn test_processing_carries_data() {
        let err = ApiError::from(CommitError::processing_with(
            ErrorCode::ArtworkVersionMismatch,
            json!({ "artwork_id": "artwork-a" }),
        ));
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.body()["data"]["artwork_id"], "artwork-a");
    }

    #[test]
    fn test_not_found() {
        let err = ApiError::from(CommitError::OrderNotFound(OrderId::new()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.body()["type"], "not_found");
        assert_eq!(err.body()["code"], "order_not_found");
    }

    #[test]
    fn test_gateway_is_bad_gateway() {
        let err = ApiError::from(CommitError::gateway("payment", "timeout"));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.body()["type"], "gateway");
    }
}
