use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde_json::json;

use crate::validation::ValidationErrors;

/// Message returned for every failed login, whatever the cause.
pub const LOGIN_FAILED: &str = "Unable to login.";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    #[error("Unable to login.")]
    Authentication,

    #[error("Please authenticate.")]
    Unauthorized,

    #[error("Not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(#[from] surrealdb::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Validation(_) | Error::Authentication => StatusCode::BAD_REQUEST,
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::Database(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Error::Validation(errors) => json!({
                "error": errors.message(),
                "fields": errors.fields(),
            }),
            Error::Authentication | Error::Unauthorized | Error::NotFound => {
                json!({ "error": self.to_string() })
            }
            Error::Database(e) => {
                tracing::error!("Database error: {}", e);
                json!({ "error": "Internal server error" })
            }
            Error::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                json!({ "error": "Internal server error" })
            }
        };

        (status, Json(body)).into_response()
    }
}
