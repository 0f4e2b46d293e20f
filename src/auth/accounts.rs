//! Account operations that do not touch session state: registration,
//! password change, and profile details.

use crate::auth::store::{NewUser, UserProfile};
use crate::auth::{AuthError, AuthResult, AuthState, AuthUser};

#[derive(Debug, Clone)]
pub struct Registration {
    pub full_name: String,
    pub email: String,
    pub username: String,
    pub password: String,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
}

impl AuthState {
    pub async fn register(&self, registration: Registration) -> AuthResult<UserProfile> {
        let required = [
            &registration.full_name,
            &registration.email,
            &registration.username,
            &registration.password,
        ];
        if required.iter().any(|field| field.trim().is_empty()) {
            return Err(AuthError::MissingFields);
        }
        validate_email(&registration.email)?;
        if registration.username.contains('@') {
            return Err(AuthError::InvalidUsername);
        }

        let password_hash = self
            .password_service
            .hash_password(&registration.password)?;

        let user = self
            .store
            .create(NewUser {
                username: registration.username,
                email: registration.email,
                full_name: registration.full_name,
                avatar: non_blank(registration.avatar),
                cover_image: non_blank(registration.cover_image),
                password_hash,
            })
            .await?;

        log::info!("registered user {} ({})", user.id, user.username);
        Ok(user.profile())
    }

    /// Replace the caller's password. Existing sessions stay valid.
    pub async fn change_password(
        &self,
        user: &AuthUser,
        old_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> AuthResult<()> {
        if new_password != confirm_password {
            return Err(AuthError::PasswordConfirmationMismatch);
        }

        let record = self
            .store
            .find_by_id(user.id())
            .await?
            .ok_or(AuthError::UnknownIdentity)?;

        if !self
            .password_service
            .verify_password(old_password, &record.password_hash)
        {
            return Err(AuthError::IncorrectPassword);
        }
        if new_password.trim().is_empty() {
            return Err(AuthError::MissingFields);
        }

        let password_hash = self.password_service.hash_password(new_password)?;
        if !self
            .store
            .update_password_hash(record.id, &password_hash)
            .await?
        {
            return Err(AuthError::UnknownIdentity);
        }

        log::info!("user {} changed password", record.id);
        Ok(())
    }

    pub async fn update_account(
        &self,
        user: &AuthUser,
        full_name: &str,
        email: &str,
    ) -> AuthResult<UserProfile> {
        if full_name.trim().is_empty() || email.trim().is_empty() {
            return Err(AuthError::MissingFields);
        }
        validate_email(email)?;

        self.store
            .update_account(user.id(), full_name, email)
            .await?
            .ok_or(AuthError::UnknownIdentity)
    }
}

fn validate_email(email: &str) -> AuthResult<()> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(AuthError::InvalidEmail),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
