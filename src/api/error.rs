use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use tracing::error;

use crate::lang::UnsupportedLang;
use crate::users::{InvalidUser, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<UnsupportedLang> for ApiError {
    fn from(e: UnsupportedLang) -> Self {
        ApiError::InvalidInput(e.to_string())
    }
}

impl From<InvalidUser> for ApiError {
    fn from(e: InvalidUser) -> Self {
        ApiError::InvalidInput(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        let body = json!({
            "status": "error",
            "message": self.to_string(),
            "code": status.as_u16(),
            "data": [],
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(
            ApiError::InvalidInput("bad".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(ApiError::NotFound("User").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Store(StoreError::Database(sqlx::Error::PoolClosed)).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn store_errors_keep_database_prefix() {
        let err = ApiError::from(StoreError::Database(sqlx::Error::PoolClosed));
        assert!(err.to_string().starts_with("Database error: "), "{err}");
    }

    #[test]
    fn not_found_names_the_resource() {
        assert_eq!(ApiError::NotFound("User").to_string(), "User not found");
    }
}
