use axum::{
    Json,
    extract::rejection::FormRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::{database::RegistryError, storage::StorageError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{route} is missing required fields: {}", .fields.join(", "))]
    MissingField {
        route: &'static str,
        fields: Vec<&'static str>,
    },

    #[error("{parameter} is a required parameter for route {route}")]
    MissingParameter {
        route: &'static str,
        parameter: &'static str,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No user in the database with name {user}, route is {route}")]
    UserNotFound { user: String, route: &'static str },

    #[error("User {0} is already in the database")]
    UserAlreadyExists(String),

    #[error("No dashboard at {0}")]
    DashboardNotFound(String),

    #[error("User registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Blob store error: {0}")]
    Storage(#[from] StorageError),
}

impl AppError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        AppError::InvalidRequest(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Registry(_) | AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

/// JSON error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: u16,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let body = ErrorResponse {
            error: self.to_string(),
            status: status.as_u16(),
        };

        (status, Json(body)).into_response()
    }
}
