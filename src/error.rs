use rocket::Request;
use rocket::http::Status;
use rocket::response::{self, Responder, status};
use rocket::serde::json::Json;

use crate::auth::AuthError;
use crate::models::ErrorEnvelope;

const INTERNAL_MESSAGE: &str = "Something went wrong";

/// Error half of every handler result; documented by okapi as a JSON body.
pub type ErrorResponse = status::Custom<Json<ErrorEnvelope>>;

/// Failure surfaced to clients. Every handler error funnels through here.
#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    Unauthorized(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            ApiError::Validation(_) => Status::BadRequest,
            ApiError::Unauthorized(_) => Status::Unauthorized,
            ApiError::NotFound(_) => Status::NotFound,
            ApiError::Conflict(_) => Status::Conflict,
            ApiError::Internal(_) => Status::InternalServerError,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::Validation(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg) => msg,
            ApiError::Internal(_) => INTERNAL_MESSAGE,
        }
    }

    /// Build from a bare status, as produced by catchers.
    pub fn from_status(status: Status, message: Option<String>) -> Self {
        let message = message.unwrap_or_else(|| status.reason_lossy().to_string());
        match status.code {
            401 => ApiError::Unauthorized(message),
            404 => ApiError::NotFound(message),
            409 => ApiError::Conflict(message),
            code if code >= 500 => ApiError::Internal(message),
            _ => ApiError::Validation(message),
        }
    }

    /// Log and render into the error envelope.
    pub fn into_response(self) -> ErrorResponse {
        let status = self.status();
        match &self {
            ApiError::Internal(detail) => log::error!("internal error: {}", detail),
            other => log::debug!("request rejected with {}: {}", status.code, other),
        }
        status::Custom(status, Json(ErrorEnvelope::new(status, self.message())))
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Internal(detail) => write!(f, "internal error: {detail}"),
            other => f.write_str(other.message()),
        }
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        self.into_response().respond_to(request)
    }
}

impl From<ApiError> for ErrorResponse {
    fn from(err: ApiError) -> Self {
        err.into_response()
    }
}

impl From<AuthError> for ErrorResponse {
    fn from(err: AuthError) -> Self {
        ApiError::from(err).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let message = err.to_string();
        match err.status().code {
            400 => ApiError::Validation(message),
            401 => ApiError::Unauthorized(message),
            404 => ApiError::NotFound(message),
            409 => ApiError::Conflict(message),
            _ => ApiError::Internal(message),
        }
    }
}
