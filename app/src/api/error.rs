use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain::TrackerError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};
use utoipa::ToSchema;

/// JSON body of every error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Tracker(#[from] TrackerError),
    #[error("Missing bearer token")]
    MissingIdentity,
    #[error("Invalid or expired bearer token")]
    InvalidIdentity,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingIdentity | ApiError::InvalidIdentity => StatusCode::UNAUTHORIZED,
            ApiError::Tracker(e) => match e {
                TrackerError::NotFound { .. } => StatusCode::NOT_FOUND,
                TrackerError::AlreadyExists { .. } => StatusCode::CONFLICT,
                TrackerError::Unauthorized { .. } => StatusCode::FORBIDDEN,
                TrackerError::Validation(_) => StatusCode::BAD_REQUEST,
                TrackerError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                TrackerError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {self}");
            "Internal server error".to_string()
        } else {
            debug!("Request rejected with {status}: {self}");
            self.to_string()
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use domain::market_data::MarketDataError;

    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                ApiError::from(TrackerError::NotFound {
                    entity: "Holding",
                    id: "x".to_string(),
                }),
                StatusCode::NOT_FOUND,
            ),
            (
                TrackerError::AlreadyExists {
                    entity: "Holding",
                    key: "BTC".to_string(),
                }
                .into(),
                StatusCode::CONFLICT,
            ),
            (
                TrackerError::Unauthorized {
                    entity: "Holding",
                    id: "x".to_string(),
                }
                .into(),
                StatusCode::FORBIDDEN,
            ),
            (
                TrackerError::Validation("bad".to_string()).into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                TrackerError::UpstreamUnavailable(MarketDataError::Unavailable("down".to_string()))
                    .into(),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                TrackerError::Storage("disk".to_string()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (ApiError::MissingIdentity, StatusCode::UNAUTHORIZED),
            (ApiError::InvalidIdentity, StatusCode::UNAUTHORIZED),
        ];
        for (error, status) in cases {
            assert_eq!(error.status(), status, "{error}");
        }
    }

    #[tokio::test]
    async fn test_storage_details_are_hidden() {
        let response = ApiError::from(TrackerError::Storage("connection refused".to_string()))
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.error, "Internal server error");
    }
}
