//! Session lifecycle: login, logout, and refresh-token rotation.
//!
//! Each identity holds a single stored refresh token. Login overwrites it,
//! rotation compare-and-sets it, logout clears it. A refresh token is only
//! honoured while it still equals the stored value, so a rotated-out token
//! is rejected even though its signature and expiry are intact.

use chrono::{DateTime, Utc};

use crate::auth::jwt::subject_id;
use crate::auth::store::{User, UserProfile};
use crate::auth::{AuthError, AuthResult, AuthState, AuthUser};

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_token_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: UserProfile,
    pub tokens: TokenPair,
}

/// Furthest step a refresh attempt reached before it was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationStage {
    NoToken,
    TokenPresented,
    SignatureChecked,
    IdentityResolved,
    MatchChecked,
}

impl AuthState {
    pub async fn login(&self, identifier: Option<&str>, password: &str) -> AuthResult<LoginOutcome> {
        let identifier = identifier
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(AuthError::MissingIdentifier)?;

        let user = self
            .store
            .find_by_login(identifier)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !self
            .password_service
            .verify_password(password, &user.password_hash)
        {
            log::info!("failed login for user {}", user.id);
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.issue_pair(&user)?;

        // Single session slot: any refresh token held by another client dies here.
        if !self
            .store
            .replace_refresh_token(user.id, Some(&tokens.refresh_token))
            .await?
        {
            return Err(AuthError::UserNotFound);
        }

        log::info!("user {} logged in", user.id);
        Ok(LoginOutcome {
            user: user.profile(),
            tokens,
        })
    }

    pub async fn logout(&self, user: &AuthUser) -> AuthResult<()> {
        self.store.replace_refresh_token(user.id(), None).await?;
        log::info!("user {} logged out", user.id());
        Ok(())
    }

    /// Exchange a refresh token for a new access/refresh pair.
    pub async fn rotate_refresh_token(&self, presented: Option<&str>) -> AuthResult<TokenPair> {
        let mut stage = RotationStage::NoToken;
        let result = self.try_rotate(presented, &mut stage).await;

        if let Err(err) = &result {
            match err {
                AuthError::RefreshTokenReused => {
                    log::warn!("refresh rejected at {:?}: {}", stage, err)
                }
                _ => log::debug!("refresh rejected at {:?}: {}", stage, err),
            }
        }

        result
    }

    async fn try_rotate(
        &self,
        presented: Option<&str>,
        stage: &mut RotationStage,
    ) -> AuthResult<TokenPair> {
        let presented = presented
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::NoToken)?;
        *stage = RotationStage::TokenPresented;

        let claims = self.jwt_service.decode_refresh_token(presented)?;
        let user_id = subject_id(&claims.sub)?;
        *stage = RotationStage::SignatureChecked;

        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UnknownIdentity)?;
        *stage = RotationStage::IdentityResolved;

        let matches = user
            .refresh_token
            .as_deref()
            .is_some_and(|stored| constant_time_eq(stored.as_bytes(), presented.as_bytes()));
        if !matches {
            return Err(AuthError::RefreshTokenReused);
        }
        *stage = RotationStage::MatchChecked;

        let tokens = self.issue_pair(&user)?;

        // A concurrent rotation of the same token may have won since the read above.
        if !self
            .store
            .swap_refresh_token(user.id, presented, &tokens.refresh_token)
            .await?
        {
            return Err(AuthError::RefreshTokenReused);
        }

        log::debug!("rotated refresh token for user {}", user.id);
        Ok(tokens)
    }

    fn issue_pair(&self, user: &User) -> AuthResult<TokenPair> {
        let access = self.jwt_service.issue_access_token(user)?;
        let refresh = self.jwt_service.issue_refresh_token(user)?;
        Ok(TokenPair {
            access_token: access.token,
            access_token_expires_at: access.expires_at,
            refresh_token: refresh.token,
            refresh_token_expires_at: refresh.expires_at,
        })
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (&x, &y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }

    result == 0
}
