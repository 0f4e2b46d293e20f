//! `/users` endpoints: registration, login, logout, refresh, and account
//! maintenance.

use chrono::{DateTime, Utc};
use rocket::http::{Cookie, CookieJar, SameSite};
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{State, get, patch, post};
use rocket_okapi::openapi;
use time::Duration as TimeDuration;

use crate::auth::responses::{
    ChangePasswordRequest, Empty, LoginRequest, LoginResponse, RefreshRequest, RegisterRequest,
    TokenPairResponse, UpdateAccountRequest,
};
use crate::auth::{AuthConfig, AuthState, AuthUser, TokenPair, UserProfile};
use crate::error::ErrorResponse;
use crate::models::ApiResponse;

type RouteResult<T> = Result<status::Custom<Json<ApiResponse<T>>>, ErrorResponse>;

#[openapi(tag = "Users")]
#[post("/users/register", data = "<payload>")]
pub async fn register(
    state: &State<AuthState>,
    payload: Json<RegisterRequest>,
) -> RouteResult<UserProfile> {
    let profile = state.register(payload.into_inner().into()).await?;
    Ok(ApiResponse::created(profile, "User registered successfully").respond())
}

#[openapi(tag = "Users")]
#[post("/users/login", data = "<payload>")]
pub async fn login(
    state: &State<AuthState>,
    cookies: &CookieJar<'_>,
    payload: Json<LoginRequest>,
) -> RouteResult<LoginResponse> {
    let outcome = state
        .login(payload.identifier(), &payload.password)
        .await?;

    set_session_cookies(cookies, &state.config, &outcome.tokens);

    Ok(ApiResponse::ok(
        LoginResponse {
            user: outcome.user,
            access_token: outcome.tokens.access_token,
            refresh_token: outcome.tokens.refresh_token,
        },
        "User logged in successfully",
    )
    .respond())
}

#[openapi(tag = "Users")]
#[post("/users/logout")]
pub async fn logout(
    state: &State<AuthState>,
    cookies: &CookieJar<'_>,
    user: AuthUser,
) -> RouteResult<Empty> {
    state.logout(&user).await?;
    clear_session_cookies(cookies, &state.config);
    Ok(ApiResponse::ok(Empty::default(), "User logged out").respond())
}

/// The refresh token is read from its cookie, falling back to the JSON body.
#[post("/users/refresh-token", data = "<payload>")]
pub async fn refresh_access_token(
    state: &State<AuthState>,
    cookies: &CookieJar<'_>,
    payload: Option<Json<RefreshRequest>>,
) -> RouteResult<TokenPairResponse> {
    let from_cookie = cookies
        .get(&state.config.refresh_cookie_name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty());
    let presented =
        from_cookie.or_else(|| payload.and_then(|body| body.into_inner().refresh_token));

    let tokens = state.rotate_refresh_token(presented.as_deref()).await?;
    set_session_cookies(cookies, &state.config, &tokens);

    Ok(ApiResponse::ok(TokenPairResponse::from(&tokens), "Access token refreshed").respond())
}

#[openapi(tag = "Users")]
#[post("/users/change-password", data = "<payload>")]
pub async fn change_password(
    state: &State<AuthState>,
    user: AuthUser,
    payload: Json<ChangePasswordRequest>,
) -> RouteResult<Empty> {
    state
        .change_password(
            &user,
            &payload.old_password,
            &payload.new_password,
            &payload.confirm_password,
        )
        .await?;
    Ok(ApiResponse::ok(Empty::default(), "Password changed successfully").respond())
}

#[openapi(tag = "Users")]
#[get("/users/current-user")]
pub async fn current_user(user: AuthUser) -> RouteResult<UserProfile> {
    Ok(ApiResponse::ok(user.profile, "Current user fetched successfully").respond())
}

#[openapi(tag = "Users")]
#[patch("/users/update-account", data = "<payload>")]
pub async fn update_account(
    state: &State<AuthState>,
    user: AuthUser,
    payload: Json<UpdateAccountRequest>,
) -> RouteResult<UserProfile> {
    let profile = state
        .update_account(&user, &payload.full_name, &payload.email)
        .await?;
    Ok(ApiResponse::ok(profile, "Account details updated successfully").respond())
}

/// Max-age tracks the token's own expiry so the cookie never outlives it.
fn session_cookie(
    config: &AuthConfig,
    name: &str,
    value: String,
    expires_at: DateTime<Utc>,
) -> Cookie<'static> {
    let max_age_secs = (expires_at - Utc::now()).num_seconds().max(0);
    let mut cookie = Cookie::build((name.to_string(), value))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::seconds(max_age_secs))
        .build();

    if let Some(domain) = &config.cookie_domain {
        cookie.set_domain(domain.clone());
    }

    cookie
}

fn set_session_cookies(cookies: &CookieJar<'_>, config: &AuthConfig, tokens: &TokenPair) {
    cookies.add(session_cookie(
        config,
        &config.access_cookie_name,
        tokens.access_token.clone(),
        tokens.access_token_expires_at,
    ));
    cookies.add(session_cookie(
        config,
        &config.refresh_cookie_name,
        tokens.refresh_token.clone(),
        tokens.refresh_token_expires_at,
    ));
}

fn clear_session_cookies(cookies: &CookieJar<'_>, config: &AuthConfig) {
    for name in [&config.access_cookie_name, &config.refresh_cookie_name] {
        let mut cookie = Cookie::build((name.clone(), String::new()))
            .path("/")
            .http_only(true)
            .secure(true)
            .removal()
            .build();

        if let Some(domain) = &config.cookie_domain {
            cookie.set_domain(domain.clone());
        }
        cookies.add(cookie);
    }
}
