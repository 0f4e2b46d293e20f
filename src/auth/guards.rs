use rocket::Request;
use rocket::State;
use rocket::request::{FromRequest, Outcome};
use rocket_okapi::request::OpenApiFromRequest;
use uuid::Uuid;

use crate::auth::jwt::subject_id;
use crate::auth::store::UserProfile;
use crate::auth::{AuthError, AuthResult, AuthState};

/// Sanitized identity attached to a request that passed the access-token check.
#[derive(Debug, Clone, OpenApiFromRequest)]
pub struct AuthUser {
    pub profile: UserProfile,
}

impl AuthUser {
    pub fn id(&self) -> Uuid {
        self.profile.id
    }
}

/// Message of the last auth rejection on this request, read back by the
/// 401 catcher.
#[derive(Debug, Default)]
pub struct AuthRejection(pub Option<String>);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthUser {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let state = match request.guard::<&State<AuthState>>().await {
            Outcome::Success(state) => state,
            _ => {
                let err = AuthError::Config("AuthState not available".into());
                return Outcome::Error((err.status(), err));
            }
        };

        let token = access_token_from_request(request, &state.config.access_cookie_name);
        match state.authenticate(token.as_deref()).await {
            Ok(user) => Outcome::Success(user),
            Err(err) => {
                log::debug!("rejecting {} {}: {}", request.method(), request.uri(), err);
                let message = err.to_string();
                request.local_cache(|| AuthRejection(Some(message)));
                Outcome::Error((err.status(), err))
            }
        }
    }
}

impl AuthState {
    /// Verify an access token and resolve the identity it names.
    ///
    /// Read-only: never writes to the store.
    pub async fn authenticate(&self, token: Option<&str>) -> AuthResult<AuthUser> {
        let token = token.ok_or(AuthError::NoToken)?;
        let claims = self.jwt_service.decode_access_token(token)?;
        let user_id = subject_id(&claims.sub)?;

        let profile = self
            .store
            .find_profile(user_id)
            .await?
            .ok_or(AuthError::UnknownIdentity)?;

        Ok(AuthUser { profile })
    }
}

/// The access-token cookie wins over an `Authorization: Bearer` header.
fn access_token_from_request(request: &Request<'_>, cookie_name: &str) -> Option<String> {
    if let Some(cookie) = request.cookies().get(cookie_name) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    let header = request.headers().get_one("Authorization")?;
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("Bearer") && !token.is_empty() {
        Some(token.to_string())
    } else {
        None
    }
}
