use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid id")]
    InvalidId,
    #[error("{0}")]
    Validation(String),
    #[error("not found")]
    NotFound,
    #[error("unauthorized")]
    Unauthorized,
    #[error("database error")]
    Database,
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidId => "INVALID_ID",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Database => "DB_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidId | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Database | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if let Self::Internal(err) = &self {
            tracing::error!("API internal error: {err:#}");
        }
        let body = json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}

impl From<paceline_core::error::CoreError> for ApiError {
    fn from(e: paceline_core::error::CoreError) -> Self {
        use paceline_core::error::CoreError;
        match e {
            CoreError::InvalidId => ApiError::InvalidId,
            CoreError::Validation(msg) => ApiError::Validation(msg),
            CoreError::NotFound => ApiError::NotFound,
            CoreError::Unauthorized => ApiError::Unauthorized,
            CoreError::Database(err) => {
                tracing::error!("database error: {err}");
                ApiError::Database
            }
            CoreError::Internal(msg) => ApiError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

impl From<paceline_db::DbError> for ApiError {
    fn from(e: paceline_db::DbError) -> Self {
        match e {
            paceline_db::DbError::NotFound => ApiError::NotFound,
            paceline_db::DbError::Sqlx(err) => {
                tracing::error!("database error: {err}");
                ApiError::Database
            }
        }
    }
}
