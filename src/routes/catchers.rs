//! Catchers that wrap framework-level failures in the error envelope.

use rocket::http::Status;
use rocket::{Catcher, Request, catch, catchers};

use crate::auth::guards::AuthRejection;
use crate::error::ApiError;

#[catch(401)]
fn unauthorized(request: &Request<'_>) -> ApiError {
    let rejection = request.local_cache(AuthRejection::default);
    ApiError::Unauthorized(
        rejection
            .0
            .clone()
            .unwrap_or_else(|| "Unauthorized request".to_string()),
    )
}

#[catch(422)]
fn unprocessable(_request: &Request<'_>) -> ApiError {
    ApiError::Validation("Request body is malformed".to_string())
}

#[catch(default)]
fn fallback(status: Status, _request: &Request<'_>) -> ApiError {
    ApiError::from_status(status, None)
}

pub fn all() -> Vec<Catcher> {
    catchers![unauthorized, unprocessable, fallback]
}
