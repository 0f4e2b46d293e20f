//! Response envelopes shared by every route.

use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Success envelope: `{statusCode, data, message, success}`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub data: T,
    pub message: String,
    pub success: bool,
}

impl<T> ApiResponse<T> {
    pub fn new(status: Status, data: T, message: impl Into<String>) -> Self {
        Self {
            status_code: status.code,
            data,
            message: message.into(),
            success: status.code < 400,
        }
    }

    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self::new(Status::Ok, data, message)
    }

    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self::new(Status::Created, data, message)
    }

    /// Wrap as a Rocket responder whose HTTP status equals `status_code`.
    pub fn respond(self) -> status::Custom<Json<Self>> {
        let status = Status::from_code(self.status_code).unwrap_or(Status::Ok);
        status::Custom(status, Json(self))
    }
}

/// Error envelope: `{statusCode, data: null, message, success: false, errors}`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub status_code: u16,
    pub data: Option<serde_json::Value>,
    pub message: String,
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl ErrorEnvelope {
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status_code: status.code,
            data: None,
            message: message.into(),
            success: false,
            errors: Vec::new(),
        }
    }
}
