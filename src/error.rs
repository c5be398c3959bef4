use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{models::ValidationError, object_id::ParseObjectIdError, store::StoreError};

/// Everything a film handler can fail with. Clients only ever see a 500 for
/// these; the body carries the error as-is.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Cast(#[from] ParseObjectIdError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Body(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Serialize)]
struct ErrorBody {
    name: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Map<String, Value>>,
}

impl AppError {
    pub fn name(&self) -> &'static str {
        match self {
            AppError::Cast(_) => "CastError",
            AppError::Validation(_) => "ValidationError",
            AppError::Body(_) => "SyntaxError",
            AppError::Store(_) => "StoreError",
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Body(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::warn!(kind = self.name(), error = %self, "film request failed");

        let name = self.name();
        let message = self.to_string();
        let errors = match self {
            AppError::Validation(err) => Some(err.errors),
            _ => None,
        };
        let body = ErrorBody { name, message, errors };

        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
