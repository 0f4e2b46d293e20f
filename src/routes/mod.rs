//! HTTP route handlers grouped by resource domain.
//!
//! Handlers annotated with `#[openapi]` are collected by `rocket_okapi`
//! into the generated OpenAPI document.

pub mod catchers;
pub mod health;
pub mod users;

use rocket::Route;
use rocket_okapi::openapi_get_routes;

/// Every route served under `/api/v1`.
pub fn api_routes() -> Vec<Route> {
    let mut routes = openapi_get_routes![
        health::health_check,
        users::register,
        users::login,
        users::logout,
        users::change_password,
        users::current_user,
        users::update_account,
    ];
    routes.extend(rocket::routes![users::refresh_access_token]);
    routes
}
