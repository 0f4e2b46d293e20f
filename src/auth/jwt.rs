use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::auth::store::User;
use crate::auth::config::MAX_TOKEN_TTL_SECS;
use crate::auth::{AuthConfig, AuthError, AuthResult};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AccessTokenClaims {
    pub sub: String,
    pub username: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RefreshTokenClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

#[derive(Debug, Clone)]
pub struct SignedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// One signing secret with its lifetime.
struct TokenKey {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenKey {
    fn new(secret: &str, ttl_secs: i64) -> AuthResult<Self> {
        let ttl = Some(ttl_secs)
            .filter(|secs| (1..=MAX_TOKEN_TTL_SECS).contains(secs))
            .and_then(Duration::try_seconds)
            .ok_or_else(|| {
                AuthError::Config(format!("token lifetime {ttl_secs}s is out of range"))
            })?;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        })
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> AuthResult<DateTime<Utc>> {
        now.checked_add_signed(self.ttl)
            .ok_or_else(|| AuthError::Config("token expiry overflows the clock".into()))
    }
}

/// Mints and verifies access and refresh tokens, each under its own secret.
pub struct JwtService {
    access: TokenKey,
    refresh: TokenKey,
    validation: Validation,
}

impl JwtService {
    pub fn from_config(config: &AuthConfig) -> AuthResult<Self> {
        if config.access_token_secret.is_empty() || config.refresh_token_secret.is_empty() {
            return Err(AuthError::Config("token signing secrets are missing".into()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation.leeway = 0;

        Ok(Self {
            access: TokenKey::new(&config.access_token_secret, config.access_token_ttl_secs)?,
            refresh: TokenKey::new(&config.refresh_token_secret, config.refresh_token_ttl_secs)?,
            validation,
        })
    }

    pub fn issue_access_token(&self, user: &User) -> AuthResult<SignedToken> {
        let now = Utc::now();
        let expires_at = self.access.expiry_from(now)?;

        let claims = AccessTokenClaims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            email: user.email.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.access.encoding_key)?;
        Ok(SignedToken { token, expires_at })
    }

    pub fn issue_refresh_token(&self, user: &User) -> AuthResult<SignedToken> {
        let now = Utc::now();
        let expires_at = self.refresh.expiry_from(now)?;

        let claims = RefreshTokenClaims {
            sub: user.id.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.refresh.encoding_key)?;
        Ok(SignedToken { token, expires_at })
    }

    pub fn decode_access_token(&self, token: &str) -> AuthResult<AccessTokenClaims> {
        self.verify(token, &self.access.decoding_key)
    }

    pub fn decode_refresh_token(&self, token: &str) -> AuthResult<RefreshTokenClaims> {
        self.verify(token, &self.refresh.decoding_key)
    }

    fn verify<C: DeserializeOwned>(&self, token: &str, key: &DecodingKey) -> AuthResult<C> {
        decode::<C>(token, key, &self.validation)
            .map(|data| data.claims)
            .map_err(AuthError::from_verification)
    }
}

/// Parse the `sub` claim back into an identity id.
pub fn subject_id(sub: &str) -> AuthResult<Uuid> {
    sub.parse::<Uuid>().map_err(|_| AuthError::TokenMalformed)
}
