use std::sync::Arc;

use auth_api::auth::responses::{LoginResponse, TokenPairResponse};
use auth_api::auth::{AuthState, CredentialStore, MemoryCredentialStore, UserProfile};
use auth_api::models::ApiResponse;
use auth_api::routes::api_routes;
use auth_api::test_support::{TestRocketBuilder, memory_auth_state};
use rocket::http::{ContentType, Cookie, Header, SameSite, Status};
use rocket::local::asynchronous::{Client, LocalResponse};
use rocket::serde::json::json;

async fn client() -> (Client, AuthState, Arc<MemoryCredentialStore>) {
    let (state, store) = memory_auth_state();
    let client = TestRocketBuilder::new()
        .mount_api_routes(api_routes())
        .manage_auth_state(state.clone())
        .async_client()
        .await;
    (client, state, store)
}

async fn register_alice(client: &Client) {
    let response = client
        .post("/api/v1/users/register")
        .header(ContentType::JSON)
        .body(
            json!({
                "fullName": "Alice Liddell",
                "email": "alice@example.com",
                "username": "alice",
                "password": "P1"
            })
            .to_string(),
        )
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Created);
}

async fn login_alice(client: &Client) -> LoginResponse {
    let response = client
        .post("/api/v1/users/login")
        .header(ContentType::JSON)
        .body(json!({"username": "alice", "password": "P1"}).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body: ApiResponse<LoginResponse> = response.into_json().await.expect("login payload");
    body.data
}

async fn refresh_with_cookie<'c>(client: &'c Client, token: &str) -> LocalResponse<'c> {
    client
        .post("/api/v1/users/refresh-token")
        .cookie(Cookie::new("refreshToken", token.to_string()))
        .dispatch()
        .await
}

async fn error_message(response: LocalResponse<'_>) -> String {
    let body: serde_json::Value = response.into_json().await.expect("error envelope");
    assert_eq!(body["success"], false);
    assert!(body["data"].is_null());
    assert_eq!(body["errors"], json!([]));
    body["message"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn login_sets_cookies_and_returns_sanitized_user() {
    let (client, state, store) = client().await;
    register_alice(&client).await;

    let response = client
        .post("/api/v1/users/login")
        .header(ContentType::JSON)
        .body(json!({"username": "alice", "password": "P1"}).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let access_cookie = response.cookies().get("accessToken").cloned().expect("access cookie");
    let refresh_cookie = response
        .cookies()
        .get("refreshToken")
        .cloned()
        .expect("refresh cookie");
    for cookie in [&access_cookie, &refresh_cookie] {
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    }

    // Cookie lifetimes follow the issued tokens' expiry.
    let access_max_age = access_cookie.max_age().expect("access max-age").whole_seconds();
    assert!(access_max_age > 890 && access_max_age <= 900, "{access_max_age}");
    let refresh_max_age = refresh_cookie.max_age().expect("refresh max-age").whole_seconds();
    assert!(
        refresh_max_age > 863_990 && refresh_max_age <= 864_000,
        "{refresh_max_age}"
    );

    let body: serde_json::Value = response.into_json().await.expect("json");
    assert_eq!(body["statusCode"], 200);
    assert_eq!(body["success"], true);
    let user = &body["data"]["user"];
    assert_eq!(user["username"], "alice");
    assert!(user.get("password").is_none());
    assert!(user.get("passwordHash").is_none());
    assert!(user.get("refreshToken").is_none());

    let refresh_token = body["data"]["refreshToken"].as_str().expect("refresh token");
    assert_eq!(refresh_cookie.value(), refresh_token);
    assert_eq!(access_cookie.value(), body["data"]["accessToken"].as_str().expect("access"));

    let user_id = user["id"].as_str().expect("id").parse().expect("uuid");
    let claims = state
        .jwt_service
        .decode_access_token(access_cookie.value())
        .expect("claims");
    assert_eq!(claims.sub, user["id"].as_str().expect("id"));
    assert!(claims.exp > claims.iat);

    let stored = store
        .find_by_id(user_id)
        .await
        .expect("lookup")
        .expect("user");
    assert_eq!(stored.refresh_token.as_deref(), Some(refresh_token));
}

#[tokio::test]
async fn login_error_statuses() {
    let (client, _, _) = client().await;
    register_alice(&client).await;

    let cases = [
        (json!({"password": "P1"}), Status::BadRequest),
        (json!({"email": "nobody@example.com", "password": "P1"}), Status::NotFound),
        (json!({"email": "alice@example.com", "password": "wrong"}), Status::Unauthorized),
    ];
    for (payload, expected) in cases {
        let response = client
            .post("/api/v1/users/login")
            .header(ContentType::JSON)
            .body(payload.to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), expected, "{payload}");
        let body: serde_json::Value = response.into_json().await.expect("json");
        assert_eq!(body["statusCode"], expected.code);
    }
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let (client, _, _) = client().await;
    register_alice(&client).await;

    let response = client
        .post("/api/v1/users/register")
        .header(ContentType::JSON)
        .body(
            json!({
                "fullName": "Other Alice",
                "email": "ALICE@example.com",
                "username": "alice2",
                "password": "P1"
            })
            .to_string(),
        )
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Conflict);

    let response = client
        .post("/api/v1/users/register")
        .header(ContentType::JSON)
        .body(json!({"username": "bob"}).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
    assert_eq!(error_message(response).await, "All fields are required");
}

#[tokio::test]
async fn refresh_rotates_once_and_rejects_replay() {
    let (client, _, _) = client().await;
    register_alice(&client).await;
    let login = login_alice(&client).await;

    let response = refresh_with_cookie(&client, &login.refresh_token).await;
    assert_eq!(response.status(), Status::Ok);
    let rotated_cookie = response
        .cookies()
        .get("refreshToken")
        .map(|cookie| cookie.value().to_string())
        .expect("rotated cookie");
    let body: ApiResponse<TokenPairResponse> = response.into_json().await.expect("pair");
    assert_ne!(body.data.refresh_token, login.refresh_token);
    assert_eq!(rotated_cookie, body.data.refresh_token);

    let replay = refresh_with_cookie(&client, &login.refresh_token).await;
    assert_eq!(replay.status(), Status::Unauthorized);

    let current = refresh_with_cookie(&client, &body.data.refresh_token).await;
    assert_eq!(current.status(), Status::Ok);
}

#[tokio::test]
async fn refresh_accepts_body_token() {
    let (client, _, _) = client().await;
    register_alice(&client).await;
    let login = login_alice(&client).await;

    let response = client
        .post("/api/v1/users/refresh-token")
        .header(ContentType::JSON)
        .body(json!({"refreshToken": login.refresh_token}).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let missing = client.post("/api/v1/users/refresh-token").dispatch().await;
    assert_eq!(missing.status(), Status::Unauthorized);
    assert_eq!(
        error_message(missing).await,
        "Unauthorized request - no token provided"
    );
}

#[tokio::test]
async fn logout_clears_session() {
    let (client, _, _) = client().await;
    register_alice(&client).await;
    let login = login_alice(&client).await;

    let response = client
        .post("/api/v1/users/logout")
        .cookie(Cookie::new("accessToken", login.access_token.clone()))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    for name in ["accessToken", "refreshToken"] {
        let cleared = response
            .cookies()
            .get(name)
            .map(|cookie| cookie.value().is_empty())
            .unwrap_or(true);
        assert!(cleared, "{name} cookie should be cleared");
    }

    let refresh = refresh_with_cookie(&client, &login.refresh_token).await;
    assert_eq!(refresh.status(), Status::Unauthorized);
}

#[tokio::test]
async fn protected_route_requires_valid_token() {
    let (client, state, store) = client().await;
    register_alice(&client).await;
    let login = login_alice(&client).await;

    let response = client.get("/api/v1/users/current-user").dispatch().await;
    assert_eq!(response.status(), Status::Unauthorized);
    assert_eq!(
        error_message(response).await,
        "Unauthorized request - no token provided"
    );

    let response = client
        .get("/api/v1/users/current-user")
        .header(Header::new(
            "Authorization",
            format!("Bearer {}", login.access_token),
        ))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body: ApiResponse<UserProfile> = response.into_json().await.expect("profile");
    assert_eq!(body.data.username, "alice");

    let response = client
        .get("/api/v1/users/current-user")
        .header(Header::new("Authorization", "Bearer not-a-token"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);

    let response = client
        .get("/api/v1/users/current-user")
        .header(Header::new(
            "Authorization",
            format!("Bearer {}", login.refresh_token),
        ))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);

    let user_id = state
        .jwt_service
        .decode_access_token(&login.access_token)
        .expect("claims")
        .sub
        .parse()
        .expect("uuid");
    assert!(store.remove(user_id));
    let response = client
        .get("/api/v1/users/current-user")
        .cookie(Cookie::new("accessToken", login.access_token.clone()))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);
    assert_eq!(
        error_message(response).await,
        "Invalid token - user not found"
    );
}

#[tokio::test]
async fn cookie_token_takes_precedence_over_header() {
    let (client, _, _) = client().await;
    register_alice(&client).await;
    let login = login_alice(&client).await;

    let response = client
        .get("/api/v1/users/current-user")
        .cookie(Cookie::new("accessToken", "garbage"))
        .header(Header::new(
            "Authorization",
            format!("Bearer {}", login.access_token),
        ))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);
}

#[tokio::test]
async fn change_password_flow() {
    let (client, _, _) = client().await;
    register_alice(&client).await;
    let login = login_alice(&client).await;
    let auth = Header::new("Authorization", format!("Bearer {}", login.access_token));

    let response = client
        .post("/api/v1/users/change-password")
        .header(ContentType::JSON)
        .header(auth.clone())
        .body(
            json!({"oldPassword": "wrong", "newPassword": "P2", "confirmPassword": "P2"})
                .to_string(),
        )
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);

    let response = client
        .post("/api/v1/users/change-password")
        .header(ContentType::JSON)
        .header(auth.clone())
        .body(
            json!({"oldPassword": "P1", "newPassword": "P2", "confirmPassword": "P2"})
                .to_string(),
        )
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    // Existing refresh token survives the password change.
    let refresh = refresh_with_cookie(&client, &login.refresh_token).await;
    assert_eq!(refresh.status(), Status::Ok);

    let response = client
        .post("/api/v1/users/login")
        .header(ContentType::JSON)
        .body(json!({"username": "alice", "password": "P2"}).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
}

#[tokio::test]
async fn update_account_details() {
    let (client, _, _) = client().await;
    register_alice(&client).await;
    let login = login_alice(&client).await;

    let response = client
        .patch("/api/v1/users/update-account")
        .header(ContentType::JSON)
        .header(Header::new(
            "Authorization",
            format!("Bearer {}", login.access_token),
        ))
        .body(json!({"fullName": "Alice L.", "email": "alice@wonderland.test"}).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body: ApiResponse<UserProfile> = response.into_json().await.expect("profile");
    assert_eq!(body.data.email, "alice@wonderland.test");
    assert_eq!(body.data.full_name, "Alice L.");
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let (client, _, _) = client().await;

    let response = client
        .post("/api/v1/users/login")
        .header(ContentType::JSON)
        .body("{not json")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
    let body: serde_json::Value = response.into_json().await.expect("envelope");
    assert_eq!(body["statusCode"], 400);
}
