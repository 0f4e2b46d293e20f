use rocket::http::Status;
use thiserror::Error;

use crate::auth::store::StoreError;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("username or email is required")]
    MissingIdentifier,
    #[error("All fields are required")]
    MissingFields,
    #[error("email address is invalid")]
    InvalidEmail,
    #[error("username must not contain '@'")]
    InvalidUsername,
    #[error("new password and confirmation do not match")]
    PasswordConfirmationMismatch,
    #[error("invalid old password")]
    IncorrectPassword,
    #[error("Unauthorized request - no token provided")]
    NoToken,
    #[error("token expired")]
    TokenExpired,
    #[error("invalid token signature")]
    TokenInvalid,
    #[error("malformed token")]
    TokenMalformed,
    #[error("Invalid token - user not found")]
    UnknownIdentity,
    #[error("refresh token is expired or already used")]
    RefreshTokenReused,
    #[error("invalid user credentials")]
    InvalidCredentials,
    #[error("user does not exist")]
    UserNotFound,
    #[error("user with this {0} already exists")]
    Conflict(&'static str),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("password hashing error: {0}")]
    PasswordHash(String),
    #[error("store error: {0}")]
    Store(StoreError),
}

impl AuthError {
    pub fn status(&self) -> Status {
        match self {
            AuthError::MissingIdentifier
            | AuthError::MissingFields
            | AuthError::InvalidEmail
            | AuthError::InvalidUsername
            | AuthError::PasswordConfirmationMismatch
            | AuthError::IncorrectPassword => Status::BadRequest,
            AuthError::NoToken
            | AuthError::TokenExpired
            | AuthError::TokenInvalid
            | AuthError::TokenMalformed
            | AuthError::UnknownIdentity
            | AuthError::RefreshTokenReused
            | AuthError::InvalidCredentials => Status::Unauthorized,
            AuthError::UserNotFound => Status::NotFound,
            AuthError::Conflict(_) => Status::Conflict,
            AuthError::Config(_)
            | AuthError::Jwt(_)
            | AuthError::PasswordHash(_)
            | AuthError::Store(_) => Status::InternalServerError,
        }
    }

    /// Classify a verification failure from `jsonwebtoken`.
    pub fn from_verification(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => AuthError::TokenInvalid,
            _ => AuthError::TokenMalformed,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(field) => AuthError::Conflict(field),
            other => AuthError::Store(other),
        }
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        AuthError::PasswordHash(err.to_string())
    }
}

impl From<argon2::Error> for AuthError {
    fn from(err: argon2::Error) -> Self {
        AuthError::PasswordHash(err.to_string())
    }
}
