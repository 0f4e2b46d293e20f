//! Lightweight service health endpoint used for readiness checks and tests.

use rocket::get;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};

use crate::models::ApiResponse;

/// Basic response payload describing API health.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct HealthResponse {
    /// Static status string reporting application readiness.
    pub status: String,
}

/// Health check endpoint returning a trivial JSON payload.
#[openapi(tag = "Health")]
#[get("/health")]
pub fn health_check() -> status::Custom<Json<ApiResponse<HealthResponse>>> {
    ApiResponse::ok(
        HealthResponse {
            status: "ok".to_string(),
        },
        "Service is healthy",
    )
    .respond()
}
