use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::auth::repo::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    InvalidInput(&'static str),
    #[error("Email already exists")]
    DuplicateEmail,
    #[error("User not found")]
    UserNotFound,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error(transparent)]
    Store(StoreError),
    #[error("password hashing failed: {0}")]
    Password(anyhow::Error),
    #[error("token signing failed: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => Self::DuplicateEmail,
            other => Self::Store(other),
        }
    }
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) | Self::DuplicateEmail | Self::InvalidCredentials => {
                StatusCode::BAD_REQUEST
            }
            Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Store(_) | Self::Password(_) | Self::Token(_) | Self::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            // Detail stays in the logs; clients get a generic body.
            error!(error = %self, "request failed");
            return (status, Json(json!({ "error": "Internal server error" }))).into_response();
        }
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}
