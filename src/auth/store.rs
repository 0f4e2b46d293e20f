//! Persistence seam for identity records.
//!
//! Core auth flows only talk to [`CredentialStore`]; [`PgCredentialStore`]
//! backs the running service and
//! [`MemoryCredentialStore`](crate::auth::memory_store::MemoryCredentialStore)
//! backs tests and local tooling.

use chrono::{DateTime, Utc};
use rocket_db_pools::sqlx::{self, FromRow, PgPool};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate {0}")]
    Duplicate(&'static str),
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// A registered identity, including its secrets.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
    pub password_hash: String,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            avatar: self.avatar.clone(),
            cover_image: self.cover_image.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Outward projection of a [`User`] with the password hash and refresh
/// token stripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[schemars(with = "String")]
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
    pub password_hash: String,
}

#[rocket::async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a new identity. Username and email must be unique.
    async fn create(&self, user: NewUser) -> StoreResult<User>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Look up an identity without loading its password hash or refresh token.
    async fn find_profile(&self, id: Uuid) -> StoreResult<Option<UserProfile>>;

    /// Look up an identity by login. Identifiers containing `@` match the
    /// email column, anything else the username column.
    async fn find_by_login(&self, identifier: &str) -> StoreResult<Option<User>>;

    /// Overwrite the stored refresh token. Returns `false` if the identity is gone.
    async fn replace_refresh_token(&self, id: Uuid, token: Option<&str>) -> StoreResult<bool>;

    /// Replace the stored refresh token only if it still equals `expected`.
    async fn swap_refresh_token(&self, id: Uuid, expected: &str, new: &str) -> StoreResult<bool>;

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> StoreResult<bool>;

    async fn update_account(
        &self,
        id: Uuid,
        full_name: &str,
        email: &str,
    ) -> StoreResult<Option<UserProfile>>;
}

/// Lower-cased, trimmed form used for usernames and emails.
pub fn normalize_login(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Unique login column. Usernames never contain `@`, so the two never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Username,
    Email,
}

impl LoginField {
    pub fn of(identifier: &str) -> Self {
        if identifier.contains('@') {
            LoginField::Email
        } else {
            LoginField::Username
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            LoginField::Username => "username",
            LoginField::Email => "email",
        }
    }

    pub fn value_of(self, user: &User) -> &str {
        match self {
            LoginField::Username => &user.username,
            LoginField::Email => &user.email,
        }
    }
}

const USER_COLUMNS: &str = "id, username, email, full_name, avatar, cover_image, password_hash, refresh_token, created_at, updated_at";
const PROFILE_COLUMNS: &str =
    "id, username, email, full_name, avatar, cover_image, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[rocket::async_trait]
impl CredentialStore for PgCredentialStore {
    async fn create(&self, user: NewUser) -> StoreResult<User> {
        let sql = format!(
            "INSERT INTO users (id, username, email, full_name, avatar, cover_image, password_hash) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(normalize_login(&user.username))
            .bind(normalize_login(&user.email))
            .bind(user.full_name.trim())
            .bind(user.avatar)
            .bind(user.cover_image)
            .bind(user.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(map_unique_violation)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_profile(&self, id: Uuid) -> StoreResult<Option<UserProfile>> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM users WHERE id = $1");
        let profile = sqlx::query_as::<_, UserProfile>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    async fn find_by_login(&self, identifier: &str) -> StoreResult<Option<User>> {
        let needle = normalize_login(identifier);
        let column = LoginField::of(&needle).column();
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(needle)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn replace_refresh_token(&self, id: Uuid, token: Option<&str>) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE users SET refresh_token = $2, updated_at = now() WHERE id = $1")
                .bind(id)
                .bind(token)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn swap_refresh_token(&self, id: Uuid, expected: &str, new: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET refresh_token = $3, updated_at = now() WHERE id = $1 AND refresh_token = $2",
        )
        .bind(id)
        .bind(expected)
        .bind(new)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn update_account(
        &self,
        id: Uuid,
        full_name: &str,
        email: &str,
    ) -> StoreResult<Option<UserProfile>> {
        let sql = format!(
            "UPDATE users SET full_name = $2, email = $3, updated_at = now() WHERE id = $1 RETURNING {PROFILE_COLUMNS}"
        );
        sqlx::query_as::<_, UserProfile>(&sql)
            .bind(id)
            .bind(full_name.trim())
            .bind(normalize_login(email))
            .fetch_optional(&self.pool)
            .await
            .map_err(map_unique_violation)
    }
}

fn map_unique_violation(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            let field = match db_err.constraint() {
                Some("users_username_key") => "username",
                Some("users_email_key") => "email",
                _ => "username or email",
            };
            return StoreError::Duplicate(field);
        }
    }
    StoreError::Sqlx(err)
}
